// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Software MJPEG Backend
//!
//! This library provides a software JPEG encoder that plugs into the
//! EdgeFirst capture device framework next to the hardware encoders. Raw
//! frames are compressed on the CPU, yet the backend exposes the same
//! enqueue / poll / dequeue contract as a V4L2 memory-to-memory device so a
//! single event loop can drive both.
//!
//! ## Features
//!
//! - **Device Framework**: Generic [`device::Device`], buffer list and buffer
//!   containers parameterised by a [`device::DeviceHw`] backend.
//! - **JPEG Encoding**: Baseline JPEG compression using turbojpeg with a
//!   per-buffer, growable output buffer.
//! - **Completion Channel**: A non-blocking pipe carrying finished buffer
//!   indices, pollable alongside hardware device descriptors.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_mjpeg_sw::{
//!     device::Format,
//!     image::{Image, JPEG, RGB3},
//!     mjpeg_sw::device_mjpeg_sw_open,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dev = device_mjpeg_sw_open("JPEG", "mjpeg-sw")?;
//! dev.set_option("compression_quality", "90")?;
//! dev.open_buffer_list(true, Format::new(1920, 1080, JPEG, 4))?;
//!
//! let frame = Arc::new(Image::new(1920, 1080, RGB3)?);
//! if let Some(buf) = dev.buffer_list_mut().and_then(|list| list.buffer_mut(0)) {
//!     buf.attach_source(frame);
//! }
//! dev.enqueue(0, "example")?;
//!
//! let mut pfd = dev.pollfd(true)?;
//! unsafe { libc::poll(&mut pfd, 1, -1) };
//! let buf = dev.dequeue()?;
//! println!("encoded {} bytes", buf.data().len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux**: `pipe2` and `F_GETPIPE_SZ` (kernel 2.6.35+)
//!
//! ## Safety
//!
//! `unsafe` is limited to the libc pipe calls of the completion channel.

pub mod device;
pub mod error;
pub mod image;
pub mod mjpeg_sw;

pub use error::DeviceError;
