// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::error::DeviceError;
use core::fmt;

/// Four-character pixel format code, as used by V4L2.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &c in &self.0 {
            let c = if c.is_ascii_graphic() { c as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// RGB 24-bit pixel format (8 bits per channel, no alpha)
pub const RGB3: FourCC = FourCC(*b"RGB3");

/// RGBX 32-bit pixel format (8 bits per channel, unused alpha)
pub const RGBX: FourCC = FourCC(*b"RGBX");

/// RGBA 32-bit pixel format (8 bits per channel, with alpha)
pub const RGBA: FourCC = FourCC(*b"RGBA");

/// YUYV 4:2:2 YUV packed format (common camera output format)
pub const YUYV: FourCC = FourCC(*b"YUYV");

/// NV12 4:2:0 YUV semi-planar format (efficient for video encoding)
pub const NV12: FourCC = FourCC(*b"NV12");

/// Baseline JPEG compressed frames
pub const JPEG: FourCC = FourCC(*b"JPEG");

/// Minimum number of bytes in one scanline of `format`.
///
/// Compressed formats have no fixed row size and report zero.
pub const fn format_row_stride(format: FourCC, width: u32) -> usize {
    match format.0 {
        [b'R', b'G', b'B', b'3'] => 3 * width as usize,
        [b'R', b'G', b'B', b'X'] => 4 * width as usize,
        [b'R', b'G', b'B', b'A'] => 4 * width as usize,
        [b'Y', b'U', b'Y', b'V'] => 2 * width as usize,
        [b'N', b'V', b'1', b'2'] => width as usize / 2 + width as usize,
        _ => 0,
    }
}

pub const fn image_size(width: u32, height: u32, format: FourCC) -> usize {
    format_row_stride(format, width) * height as usize
}

/// Raw frame in CPU memory, as handed over by the upstream capture pipeline.
///
/// Rows are `stride` bytes apart. The stride may be larger than the packed
/// row size when the producer pads each scanline.
///
/// # Example
///
/// ```
/// use edgefirst_mjpeg_sw::image::{Image, RGB3};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = Image::with_stride(640, 480, RGB3, 2048)?;
/// assert_eq!(img.row(1).len(), 640 * 3);
/// assert_eq!(img.size(), 2048 * 480);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Image {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: FourCC,
}

impl Image {
    /// Allocates a zeroed, tightly packed image.
    pub fn new(width: u32, height: u32, format: FourCC) -> Result<Self, DeviceError> {
        Self::with_stride(width, height, format, format_row_stride(format, width))
    }

    /// Allocates a zeroed image with `stride` bytes between scanlines.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidStride`] when `stride` cannot hold one
    /// packed row and [`DeviceError::Allocation`] when the pixel memory
    /// cannot be reserved.
    pub fn with_stride(
        width: u32,
        height: u32,
        format: FourCC,
        stride: usize,
    ) -> Result<Self, DeviceError> {
        let min = format_row_stride(format, width);
        if stride < min {
            return Err(DeviceError::InvalidStride { stride, min });
        }
        let size = stride * height as usize;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(size)
            .map_err(|_| DeviceError::Allocation(size))?;
        pixels.resize(size, 0);
        Ok(Self {
            pixels,
            width,
            height,
            stride,
            format,
        })
    }

    /// Wraps pixel memory that was filled elsewhere.
    pub fn from_pixels(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: FourCC,
        stride: usize,
    ) -> Result<Self, DeviceError> {
        let min = format_row_stride(format, width);
        if stride < min {
            return Err(DeviceError::InvalidStride { stride, min });
        }
        let expected = stride * height as usize;
        if pixels.len() < expected {
            return Err(DeviceError::ShortFrame {
                len: pixels.len(),
                expected,
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            stride,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> FourCC {
        self.format
    }

    /// Distance in bytes between the start of two consecutive scanlines.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn size(&self) -> usize {
        self.stride * self.height as usize
    }

    /// Packed pixel bytes of scanline `row`, without trailing padding.
    pub fn row(&self, row: u32) -> &[u8] {
        let start = row as usize * self.stride;
        &self.pixels[start..start + format_row_stride(self.format, self.width)]
    }

    pub fn row_mut(&mut self, row: u32) -> &mut [u8] {
        let start = row as usize * self.stride;
        let len = format_row_stride(self.format, self.width);
        &mut self.pixels[start..start + len]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} {} stride:{}",
            self.width, self.height, self.format, self.stride
        )
    }
}
