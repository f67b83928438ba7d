// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_mjpeg_sw::{
    device::{Device, Format},
    image::{Image, JPEG, RGB3},
    mjpeg_sw::{device_mjpeg_sw_open, MjpegSw},
    DeviceError,
};
use serial_test::serial;
use std::{error::Error, io, sync::Arc};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

fn open_device(nbufs: usize) -> Result<Device<MjpegSw>, Box<dyn Error>> {
    let mut dev = device_mjpeg_sw_open("JPEG", "test")?;
    let n = dev.open_buffer_list(true, Format::new(WIDTH, HEIGHT, JPEG, nbufs))?;
    assert_eq!(n, nbufs);
    Ok(dev)
}

fn uniform(rgb: [u8; 3]) -> Image {
    let mut img = Image::new(WIDTH, HEIGHT, RGB3).unwrap();
    for px in img.as_slice_mut().chunks_exact_mut(3) {
        px.copy_from_slice(&rgb);
    }
    img
}

fn noise(seed: u32) -> Image {
    let mut img = Image::new(WIDTH, HEIGHT, RGB3).unwrap();
    let mut state = seed.max(1);
    for (i, b) in img.as_slice_mut().iter_mut().enumerate() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        // Smooth ramp plus noise so quality changes show up in the size.
        *b = ((i % 192) as u32 + (state & 0x3f)) as u8;
    }
    img
}

fn attach(dev: &mut Device<MjpegSw>, index: usize, img: Image) {
    dev.buffer_list_mut()
        .unwrap()
        .buffer_mut(index)
        .unwrap()
        .attach_source(Arc::new(img));
}

fn readable(dev: &Device<MjpegSw>, can_dequeue: bool) -> bool {
    let mut pfd = dev.pollfd(can_dequeue).unwrap();
    let n = unsafe { libc::poll(&mut pfd, 1, 0) };
    assert!(n >= 0);
    pfd.revents & libc::POLLIN != 0
}

#[test]
#[serial]
fn test_fifo_order() -> Result<(), Box<dyn Error>> {
    let mut dev = open_device(4)?;
    for index in 0..4 {
        attach(&mut dev, index, noise(index as u32 + 1));
    }

    let order = [2, 0, 3, 1];
    for index in order {
        dev.enqueue(index, "test")?;
    }
    assert_eq!(dev.buffer_list().unwrap().count_enqueued(), 4);

    for expected in order {
        let buf = dev.dequeue()?;
        assert_eq!(buf.index(), expected);
        assert!(buf.used() > 0);
        assert_eq!(&buf.data()[..2], &[0xff, 0xd8]);
    }
    assert_eq!(dev.buffer_list().unwrap().count_enqueued(), 0);
    Ok(())
}

#[test]
#[serial]
fn test_many_buffers_in_flight() -> Result<(), Box<dyn Error>> {
    let nbufs = 32;
    let mut dev = open_device(nbufs)?;
    assert_eq!(dev.name(), "JPEG");
    assert_eq!(dev.path(), "test");

    let list = dev.buffer_list().unwrap();
    assert!(list.do_capture());
    assert_eq!(list.nbufs(), nbufs);
    assert_eq!(list.format().nbufs, nbufs);
    for (i, buf) in list.buffers().enumerate() {
        assert_eq!(buf.index(), i);
        assert!(buf.source().is_none());
        assert!(!buf.is_enqueued());
    }

    let frame = Arc::new(noise(9));
    for index in (0..nbufs).rev() {
        dev.buffer_list_mut()
            .unwrap()
            .buffer_mut(index)
            .unwrap()
            .attach_source(Arc::clone(&frame));
        dev.enqueue(index, "test")?;
    }
    assert_eq!(dev.buffer_list().unwrap().count_enqueued(), nbufs);
    assert_eq!(dev.buffer_list().unwrap().free_buffer(), None);

    for expected in (0..nbufs).rev() {
        let buf = dev.dequeue()?;
        assert_eq!(buf.index(), expected);
        assert!(buf.used() > 0);
    }
    assert!(dev
        .buffer_list()
        .unwrap()
        .buffers()
        .all(|buf| !buf.is_enqueued() && buf.source().is_some()));
    Ok(())
}

#[test]
#[serial]
fn test_missing_source() -> Result<(), Box<dyn Error>> {
    let mut dev = open_device(2)?;

    let err = dev.enqueue(0, "test").unwrap_err();
    assert!(matches!(err, DeviceError::MissingSource(0)));

    let pfd = dev.pollfd(true)?;
    assert_eq!(pfd.events & libc::POLLIN, 0);
    assert!(!readable(&dev, true));
    match dev.dequeue() {
        Err(DeviceError::ChannelRead(e)) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
        Err(e) => panic!("unexpected error {}", e),
        Ok(buf) => panic!("buffer {} delivered without source", buf.index()),
    }
    Ok(())
}

#[test]
#[serial]
fn test_quality_monotonic() -> Result<(), Box<dyn Error>> {
    let mut dev = open_device(1)?;
    attach(&mut dev, 0, noise(42));

    let mut prev = 0;
    for quality in [10, 30, 50, 70, 90, 100] {
        dev.set_option("compression_quality", &quality.to_string())?;
        dev.enqueue(0, "test")?;
        let size = dev.dequeue()?.used();
        println!("quality {} size {}", quality, size);
        assert!(size >= prev, "quality {} gave {} < {}", quality, size, prev);
        prev = size;
    }
    Ok(())
}

#[test]
#[serial]
fn test_round_trip() -> Result<(), Box<dyn Error>> {
    let color = [200u8, 100, 50];
    let mut dev = open_device(1)?;
    dev.set_option("compression_quality", "100")?;
    attach(&mut dev, 0, uniform(color));
    dev.enqueue(0, "test")?;

    let buf = dev.dequeue()?;
    let decoded = turbojpeg::decompress(buf.data(), turbojpeg::PixelFormat::RGB)?;
    assert_eq!(decoded.width, WIDTH as usize);
    assert_eq!(decoded.height, HEIGHT as usize);

    for y in 0..decoded.height {
        let row = &decoded.pixels[y * decoded.pitch..][..decoded.width * 3];
        for px in row.chunks_exact(3) {
            for c in 0..3 {
                let diff = (px[c] as i32 - color[c] as i32).abs();
                assert!(diff <= 4, "pixel {:?} too far from {:?}", px, color);
            }
        }
    }
    Ok(())
}

#[test]
#[serial]
fn test_padded_stride_matches_packed() -> Result<(), Box<dyn Error>> {
    let packed = noise(7);
    let mut padded = Image::with_stride(WIDTH, HEIGHT, RGB3, WIDTH as usize * 3 + 100)?;
    for y in 0..HEIGHT {
        padded.row_mut(y).copy_from_slice(packed.row(y));
    }

    let mut dev = open_device(2)?;
    attach(&mut dev, 0, packed);
    attach(&mut dev, 1, padded);
    dev.enqueue(0, "test")?;
    dev.enqueue(1, "test")?;

    let first = dev.dequeue()?.data().to_vec();
    let second = dev.dequeue()?.data().to_vec();
    assert_eq!(first, second);
    Ok(())
}

#[test]
#[serial]
fn test_poll_readiness() -> Result<(), Box<dyn Error>> {
    let mut dev = open_device(2)?;
    attach(&mut dev, 0, uniform([10, 20, 30]));
    attach(&mut dev, 1, uniform([30, 20, 10]));

    let pfd = dev.pollfd(true)?;
    assert_eq!(pfd.events, libc::POLLHUP);
    assert!(!readable(&dev, true));

    dev.enqueue(0, "test")?;
    assert_eq!(dev.pollfd(false)?.events, libc::POLLHUP);
    assert!(!readable(&dev, false));
    assert_eq!(dev.pollfd(true)?.events, libc::POLLHUP | libc::POLLIN);
    assert!(readable(&dev, true));

    dev.enqueue(1, "test")?;
    dev.dequeue()?;
    assert!(readable(&dev, true));
    dev.dequeue()?;
    assert!(!readable(&dev, true));
    assert_eq!(dev.pollfd(true)?.events, libc::POLLHUP);
    Ok(())
}

#[test]
#[serial]
fn test_encode_without_streaming() -> Result<(), Box<dyn Error>> {
    let mut dev = open_device(1)?;
    attach(&mut dev, 0, uniform([1, 2, 3]));
    assert!(!dev.buffer_list().unwrap().is_streaming());
    dev.enqueue(0, "test")?;
    assert_eq!(dev.dequeue()?.index(), 0);

    dev.set_stream(true)?;
    assert!(dev.buffer_list().unwrap().is_streaming());
    dev.enqueue(0, "test")?;
    dev.set_stream(false)?;
    assert_eq!(dev.dequeue()?.index(), 0);
    Ok(())
}

#[test]
#[serial]
fn test_output_direction_rejected() -> Result<(), Box<dyn Error>> {
    let baseline = open_fds();
    let mut dev = device_mjpeg_sw_open("JPEG", "test")?;

    let err = dev
        .open_buffer_list(false, Format::new(WIDTH, HEIGHT, JPEG, 2))
        .unwrap_err();
    assert!(matches!(err, DeviceError::UnsupportedDirection(_)));
    assert!(dev.buffer_list().is_none());
    assert_eq!(open_fds(), baseline);

    dev.close_buffer_list();
    dev.close();
    dev.close();
    assert_eq!(open_fds(), baseline);
    Ok(())
}

#[test]
#[serial]
fn test_close_twice() -> Result<(), Box<dyn Error>> {
    let baseline = open_fds();
    let mut dev = open_device(3)?;
    assert_eq!(open_fds(), baseline + 2);

    attach(&mut dev, 0, uniform([0, 0, 0]));
    dev.enqueue(0, "test")?;

    dev.close_buffer_list();
    assert_eq!(open_fds(), baseline);
    dev.close_buffer_list();
    dev.close();
    dev.close();
    assert_eq!(open_fds(), baseline);

    assert!(matches!(
        dev.enqueue(0, "test"),
        Err(DeviceError::NotOpen(_))
    ));
    assert!(matches!(
        dev.open_buffer_list(true, Format::new(WIDTH, HEIGHT, JPEG, 1)),
        Err(DeviceError::NotOpen(_))
    ));
    drop(dev);
    assert_eq!(open_fds(), baseline);
    Ok(())
}

#[test]
#[serial]
fn test_drop_releases_descriptors() -> Result<(), Box<dyn Error>> {
    let baseline = open_fds();
    for _ in 0..16 {
        let mut dev = open_device(2)?;
        attach(&mut dev, 1, noise(3));
        dev.enqueue(1, "test")?;
    }
    assert_eq!(open_fds(), baseline);
    Ok(())
}
