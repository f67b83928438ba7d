// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use super::{Buffer, DeviceHw, Format};

/// Buffers of one queue direction together with their negotiated format.
pub struct BufferList<H: DeviceHw> {
    pub(crate) name: String,
    pub(crate) do_capture: bool,
    pub(crate) fmt: Format,
    pub(crate) bufs: Vec<Buffer<H>>,
    pub(crate) streaming: bool,
    pub(crate) hw: Option<H::ListState>,
}

impl<H: DeviceHw> BufferList<H> {
    pub(crate) fn new(name: String, do_capture: bool, fmt: Format) -> Self {
        Self {
            name,
            do_capture,
            fmt,
            bufs: Vec::new(),
            streaming: false,
            hw: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn do_capture(&self) -> bool {
        self.do_capture
    }

    pub fn format(&self) -> &Format {
        &self.fmt
    }

    pub fn nbufs(&self) -> usize {
        self.bufs.len()
    }

    pub fn buffer(&self, index: usize) -> Option<&Buffer<H>> {
        self.bufs.get(index)
    }

    pub fn buffer_mut(&mut self, index: usize) -> Option<&mut Buffer<H>> {
        self.bufs.get_mut(index)
    }

    pub fn buffers(&self) -> impl Iterator<Item = &Buffer<H>> {
        self.bufs.iter()
    }

    /// First buffer that is not waiting in the backend.
    pub fn free_buffer(&self) -> Option<usize> {
        self.bufs.iter().position(|buf| !buf.enqueued)
    }

    /// Number of buffers enqueued and not yet dequeued.
    pub fn count_enqueued(&self) -> usize {
        self.bufs.iter().filter(|buf| buf.enqueued).count()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn hw(&self) -> Option<&H::ListState> {
        self.hw.as_ref()
    }
}
