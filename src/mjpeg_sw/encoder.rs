// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::DeviceError,
    image::{Image, RGB3},
};
use tracing::trace;
use turbojpeg::{Compressor, PixelFormat, Subsamp};

/// Bytes reserved for the output of a freshly opened buffer.
pub const INITIAL_OUTPUT_SIZE: usize = 1024 * 1024;

/// Lowest and highest quality accepted by the compressor.
pub const QUALITY_RANGE: std::ops::RangeInclusive<i32> = 1..=100;

/// Per-buffer JPEG encoder state.
///
/// Owns the compressed output of one buffer slot. The output grows to the
/// compressor's worst-case bound for the frame being encoded and keeps its
/// size across encodes, so a slot only reallocates when the frame gets
/// bigger.
pub struct JpegEncoder {
    compressor: Option<Compressor>,
    output: Vec<u8>,
    used: usize,
}

impl JpegEncoder {
    /// Reserves the initial output buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Allocation`] when the memory cannot be reserved.
    pub fn new() -> Result<Self, DeviceError> {
        let mut output = Vec::new();
        output
            .try_reserve_exact(INITIAL_OUTPUT_SIZE)
            .map_err(|_| DeviceError::Allocation(INITIAL_OUTPUT_SIZE))?;
        output.resize(INITIAL_OUTPUT_SIZE, 0);
        Ok(Self {
            compressor: None,
            output,
            used: 0,
        })
    }

    /// Compresses `source` into the output buffer and returns the number of
    /// bytes written.
    ///
    /// Every call starts from a fresh compressor, the one used by the
    /// previous call is destroyed first. `quality` is clamped to
    /// [`QUALITY_RANGE`]. Only 3-component packed RGB sources are accepted.
    pub fn encode(&mut self, source: &Image, quality: i32) -> Result<usize, DeviceError> {
        if source.format() != RGB3 {
            return Err(DeviceError::UnsupportedFormat(source.format()));
        }
        let width = source.width() as usize;
        let height = source.height() as usize;

        self.used = 0;
        self.compressor = None;
        let compressor = self.compressor.insert(Compressor::new()?);
        compressor.set_quality(quality.clamp(*QUALITY_RANGE.start(), *QUALITY_RANGE.end()))?;
        compressor.set_subsamp(Subsamp::Sub2x2)?;

        let capacity = compressor.buf_len(width, height)?;
        if self.output.len() < capacity {
            let extra = capacity - self.output.len();
            self.output
                .try_reserve_exact(extra)
                .map_err(|_| DeviceError::Allocation(capacity))?;
            self.output.resize(capacity, 0);
            trace!("output grown to {} bytes", capacity);
        }

        let image = turbojpeg::Image {
            pixels: source.as_slice(),
            width,
            pitch: source.stride(),
            height,
            format: PixelFormat::RGB,
        };
        let written = compressor.compress_to_slice(image, &mut self.output)?;
        self.used = written;
        Ok(written)
    }

    /// Bytes written by the last successful encode.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Total size of the output buffer.
    pub fn capacity(&self) -> usize {
        self.output.len()
    }
}

impl AsRef<[u8]> for JpegEncoder {
    fn as_ref(&self) -> &[u8] {
        &self.output[..self.used]
    }
}
