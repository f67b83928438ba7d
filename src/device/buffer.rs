// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use super::DeviceHw;
use crate::image::Image;
use std::{fmt, sync::Arc};

/// One capture slot of a [`BufferList`](super::BufferList).
///
/// The raw frame to process is attached by the upstream pipeline, which
/// keeps its own handle to it. The buffer only reads from the source.
pub struct Buffer<H: DeviceHw> {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) source: Option<Arc<Image>>,
    pub(crate) used: usize,
    pub(crate) enqueued: bool,
    pub(crate) hw: Option<H::BufferState>,
}

impl<H: DeviceHw> Buffer<H> {
    pub(crate) fn new(list_name: &str, index: usize) -> Self {
        Self {
            name: format!("{}:buf{}", list_name, index),
            index,
            source: None,
            used: 0,
            enqueued: false,
            hw: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable position of the buffer in its list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn attach_source(&mut self, source: Arc<Image>) {
        self.source = Some(source);
    }

    pub fn detach_source(&mut self) -> Option<Arc<Image>> {
        self.source.take()
    }

    pub fn source(&self) -> Option<&Arc<Image>> {
        self.source.as_ref()
    }

    /// Bytes produced by the last completed enqueue.
    pub fn used(&self) -> usize {
        self.used
    }

    /// True while the buffer waits in the backend for pickup.
    pub fn is_enqueued(&self) -> bool {
        self.enqueued
    }

    pub fn hw(&self) -> Option<&H::BufferState> {
        self.hw.as_ref()
    }

    /// Output bytes of the last completed enqueue.
    pub fn data(&self) -> &[u8] {
        match &self.hw {
            Some(state) => {
                let data = state.as_ref();
                &data[..self.used.min(data.len())]
            }
            None => &[],
        }
    }
}

impl<H: DeviceHw> fmt::Display for Buffer<H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} used:{}", self.name, self.used)?;
        if let Some(source) = &self.source {
            write!(f, " source:{}", source)?;
        }
        Ok(())
    }
}
