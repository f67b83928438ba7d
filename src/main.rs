// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser;
use edgefirst_mjpeg_sw::{
    device::Format,
    image::{Image, JPEG, RGB3},
    mjpeg_sw::{device_mjpeg_sw_open, OPTION_COMPRESSION_QUALITY},
    DeviceError,
};
use std::{error::Error, fs, io, sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

fn init_logging(args: &Args) -> Option<tracy_client::Client> {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stdout_log = tracing_subscriber::fmt::layer().with_filter(level);
    let journald = tracing_journald::layer()
        .ok()
        .map(|layer| layer.with_filter(level));

    let client = args.tracy.then(tracy_client::Client::start);
    let tracy = client
        .as_ref()
        .map(|_| tracing_tracy::TracyLayer::default().with_filter(level));

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(journald)
        .with(tracy)
        .init();
    client
}

fn update_fps(prev: &mut Instant, history: &mut [i64], index: &mut usize) -> i64 {
    let now = Instant::now();

    let elapsed = now.duration_since(*prev);
    *prev = now;

    history[*index] = 1e9 as i64 / (elapsed.as_nanos() as i64).max(1);
    *index = (*index + 1) % history.len();

    (history.iter().sum::<i64>() as f64 / history.len() as f64).round() as i64
}

/// Moving colour bars standing in for frames from the upstream pipeline.
fn test_pattern(width: u32, height: u32, frame: usize) -> Result<Image, DeviceError> {
    let mut img = Image::new(width, height, RGB3)?;
    for y in 0..height {
        for (x, px) in img.row_mut(y).chunks_exact_mut(3).enumerate() {
            let bar = (x + frame * 8) * 8 / width.max(1) as usize;
            px[0] = if bar & 1 != 0 { 0xe0 } else { 0x20 };
            px[1] = if bar & 2 != 0 { 0xe0 } else { 0x20 };
            px[2] = (y * 255 / height.max(1)) as u8;
        }
    }
    Ok(img)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let _tracy = init_logging(&args);
    let (width, height) = (args.size[0], args.size[1]);

    let mut dev = device_mjpeg_sw_open("JPEG", "mjpeg-sw")?;
    dev.set_option(OPTION_COMPRESSION_QUALITY, &args.quality.to_string())?;
    let nbufs = dev.open_buffer_list(true, Format::new(width, height, JPEG, args.buffers))?;
    if nbufs == 0 {
        return Err("no capture buffers configured".into());
    }

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir)?;
    }

    let frames = (0..nbufs)
        .map(|i| test_pattern(width, height, i).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;

    dev.set_stream(true)?;

    let mut submitted = 0;
    let mut completed = 0;
    let mut prev = Instant::now();
    let mut history = vec![0; 30];
    let mut index = 0;

    while completed < args.frames {
        while submitted < args.frames {
            let list = dev.buffer_list_mut().ok_or("buffer list closed")?;
            let Some(slot) = list.free_buffer() else {
                break;
            };
            if let Some(buf) = list.buffer_mut(slot) {
                buf.attach_source(Arc::clone(&frames[submitted % frames.len()]));
            }

            let now = Instant::now();
            dev.enqueue(slot, "main")?;
            debug!("enqueue buf{} took {:?}", slot, now.elapsed());
            submitted += 1;
        }

        let mut pfd = dev.pollfd(true)?;
        let ret = unsafe { libc::poll(&mut pfd, 1, args.poll_timeout) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(Box::new(err));
        }
        if ret == 0 {
            warn!("poll timed out after {}ms", args.poll_timeout);
            continue;
        }

        if pfd.revents & libc::POLLIN != 0 {
            let fps = update_fps(&mut prev, &mut history, &mut index);
            match dev.dequeue() {
                Ok(buf) => {
                    info!(
                        "frame {} buf{} {}x{} jpeg: {}KB fps: {}",
                        completed,
                        buf.index(),
                        width,
                        height,
                        buf.data().len() / 1024,
                        fps
                    );
                    if let Some(dir) = &args.output {
                        fs::write(dir.join(format!("frame-{:04}.jpg", completed)), buf.data())?;
                    }
                    completed += 1;
                }
                Err(e) => error!("dequeue failed: {}", e),
            }
        }
        if pfd.revents & libc::POLLHUP != 0 {
            return Err("completion channel closed".into());
        }
    }

    dev.set_stream(false)?;
    dev.close();
    Ok(())
}
