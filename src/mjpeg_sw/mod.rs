// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Software MJPEG capture backend.
//!
//! Each enqueued buffer is compressed inline from its attached raw frame and
//! its index is then written to a [`CompletionChannel`]. Consumers wait on
//! the channel's poll descriptor and dequeue exactly as they would from a
//! hardware encoder, even though the frame is already done by the time
//! `enqueue` returns.

mod channel;
mod encoder;

pub use channel::CompletionChannel;
pub use encoder::{JpegEncoder, INITIAL_OUTPUT_SIZE, QUALITY_RANGE};

use crate::{
    device::{Buffer, BufferList, Device, DeviceHw},
    error::DeviceError,
};
use tracing::{debug, info, instrument, warn};

/// Compression quality used until `compression_quality` is set.
pub const DEFAULT_QUALITY: i32 = 80;

pub const OPTION_COMPRESSION_QUALITY: &str = "compression_quality";

/// Device configuration of the software MJPEG backend.
#[derive(Debug)]
pub struct MjpegSw {
    quality: i32,
}

impl Default for MjpegSw {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

impl MjpegSw {
    pub fn quality(&self) -> i32 {
        self.quality
    }
}

/// Opens a device backed by the software MJPEG encoder.
pub fn device_mjpeg_sw_open(name: &str, path: &str) -> Result<Device<MjpegSw>, DeviceError> {
    Device::open(name, path, MjpegSw::default())
}

impl DeviceHw for MjpegSw {
    type BufferState = JpegEncoder;
    type ListState = CompletionChannel;

    fn device_open(&mut self, name: &str) -> Result<(), DeviceError> {
        self.quality = DEFAULT_QUALITY;
        debug!("{}: software jpeg quality:{}", name, self.quality);
        Ok(())
    }

    fn device_close(&mut self) {}

    fn device_set_option(&mut self, key: &str, value: &str) -> Result<bool, DeviceError> {
        if key != OPTION_COMPRESSION_QUALITY {
            return Ok(false);
        }
        let quality = value
            .trim()
            .parse::<i32>()
            .map_err(|_| DeviceError::InvalidOption {
                key: key.to_owned(),
                value: value.to_owned(),
            })?;
        if !QUALITY_RANGE.contains(&quality) {
            warn!(
                "compression quality {} outside {:?}, encoder will clamp it",
                quality, QUALITY_RANGE
            );
        }
        self.quality = quality;
        info!("Set compression quality to {}", self.quality);
        Ok(true)
    }

    fn buffer_open(&mut self, buf: &Buffer<Self>) -> Result<JpegEncoder, DeviceError> {
        let encoder = JpegEncoder::new()?;
        debug!("{}: output buffer {} bytes", buf.name(), encoder.capacity());
        Ok(encoder)
    }

    fn buffer_close(&mut self, buf: &mut Buffer<Self>) {
        if buf.hw.take().is_some() {
            debug!("{}: encoder released", buf.name);
        }
        buf.used = 0;
    }

    #[instrument(skip(self, list))]
    fn buffer_enqueue(
        &mut self,
        list: &mut BufferList<Self>,
        index: usize,
        who: &str,
    ) -> Result<(), DeviceError> {
        let channel = list
            .hw
            .as_ref()
            .ok_or(DeviceError::NotOpen("completion channel"))?;
        let nbufs = list.bufs.len();
        let buf = list
            .bufs
            .get_mut(index)
            .ok_or(DeviceError::InvalidIndex { index, nbufs })?;

        let source = buf.source.as_ref().ok_or(DeviceError::MissingSource(index))?;
        let encoder = buf.hw.as_mut().ok_or(DeviceError::NotOpen("buffer"))?;

        // The buffer only takes the new length once its index is delivered.
        buf.used = 0;
        let used = encoder.encode(source, self.quality)?;
        channel.push(index)?;
        buf.used = used;

        debug!(
            "{}: encoded {} from {} quality:{} for {}",
            buf.name, used, source, self.quality, who
        );
        Ok(())
    }

    fn buffer_list_dequeue(&mut self, list: &mut BufferList<Self>) -> Result<usize, DeviceError> {
        let channel = list
            .hw
            .as_ref()
            .ok_or(DeviceError::NotOpen("completion channel"))?;
        channel.pop()
    }

    fn buffer_list_pollfd(
        &self,
        list: &BufferList<Self>,
        can_dequeue: bool,
    ) -> Result<libc::pollfd, DeviceError> {
        let channel = list
            .hw
            .as_ref()
            .ok_or(DeviceError::NotOpen("completion channel"))?;
        channel.pollfd(can_dequeue, list.count_enqueued())
    }

    fn buffer_list_open(&mut self, list: &mut BufferList<Self>) -> Result<usize, DeviceError> {
        if !list.do_capture {
            return Err(DeviceError::UnsupportedDirection(list.name.clone()));
        }
        let nbufs = list.fmt.nbufs;
        let channel = CompletionChannel::new(nbufs)?;
        if let Some(capacity) = channel.capacity() {
            if capacity < nbufs {
                return Err(DeviceError::ChannelCapacity { nbufs, capacity });
            }
        }
        list.hw = Some(channel);
        Ok(nbufs)
    }

    fn buffer_list_close(&mut self, list: &mut BufferList<Self>) {
        if let Some(mut channel) = list.hw.take() {
            channel.close();
        }
    }

    fn buffer_list_set_stream(
        &mut self,
        list: &mut BufferList<Self>,
        on: bool,
    ) -> Result<(), DeviceError> {
        debug!("{}: set stream {} (no-op)", list.name, on);
        Ok(())
    }
}
