// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::image::FourCC;
use std::io;
use thiserror::Error;

/// Errors reported by the device framework and the software JPEG backend.
///
/// Every failure is surfaced to the immediate caller. Nothing in this crate
/// retries on its own, retry and backoff belong to the event loop driving
/// the device.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The backend only produces frames, it cannot consume them.
    #[error("{0}: only capture mode is supported")]
    UnsupportedDirection(String),

    /// An output or frame buffer of the given size could not be reserved.
    #[error("failed to allocate {0} bytes")]
    Allocation(usize),

    /// Enqueue was called on a buffer with no raw frame attached.
    #[error("buffer {0} has no source frame to encode")]
    MissingSource(usize),

    #[error("cannot create completion channel")]
    ChannelCreate(#[source] io::Error),

    #[error("cannot write to completion channel")]
    ChannelWrite(#[source] io::Error),

    #[error("cannot read from completion channel")]
    ChannelRead(#[source] io::Error),

    /// A read returned something other than one whole index message.
    #[error("received invalid result from read: {0} bytes")]
    ChannelProtocol(usize),

    #[error("received invalid index from read: {index} >= {nbufs}")]
    ChannelIndexRange { index: usize, nbufs: usize },

    /// A list needs more in-flight indices than the channel can hold.
    #[error("completion channel holds {capacity} indices, {nbufs} buffers requested")]
    ChannelCapacity { nbufs: usize, capacity: usize },

    /// The caller named a buffer that does not exist in the list.
    #[error("buffer index {index} out of range for {nbufs} buffers")]
    InvalidIndex { index: usize, nbufs: usize },

    #[error("invalid value {value:?} for option {key}")]
    InvalidOption { key: String, value: String },

    #[error("row stride {stride} is shorter than {min} bytes")]
    InvalidStride { stride: usize, min: usize },

    #[error("frame holds {len} bytes, expected {expected}")]
    ShortFrame { len: usize, expected: usize },

    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(FourCC),

    /// The buffer is already waiting to be dequeued.
    #[error("buffer {0} is already enqueued")]
    BufferBusy(usize),

    #[error("{0} is not open")]
    NotOpen(&'static str),

    #[error("jpeg compression failed")]
    Compress(#[from] turbojpeg::Error),
}
