// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Hardware-independent device, buffer list and buffer containers.
//!
//! A [`Device`] owns one backend implementing [`DeviceHw`] and at most one
//! capture [`BufferList`]. The backend is chosen when the device is opened
//! and every queue operation is forwarded to it, so that software and
//! hardware backends share one polling contract.

mod buffer;
mod buffer_list;

pub use buffer::Buffer;
pub use buffer_list::BufferList;

use crate::{error::DeviceError, image::FourCC};
use tracing::{debug, info, warn};

/// Negotiated format of a buffer list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Format {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes, zero for compressed formats.
    pub bytesperline: usize,
    pub format: FourCC,
    /// Number of buffers requested for the list.
    pub nbufs: usize,
}

impl Format {
    pub fn new(width: u32, height: u32, format: FourCC, nbufs: usize) -> Self {
        Self {
            width,
            height,
            bytesperline: crate::image::format_row_stride(format, width),
            format,
            nbufs,
        }
    }
}

/// Capability set every capture backend provides.
///
/// The generic containers call into the backend at fixed points of their
/// lifecycle. Backend specific state lives in the associated types and is
/// stored next to the generic state of each buffer and buffer list.
pub trait DeviceHw: Sized {
    /// Per-buffer state, exposing the bytes produced for the buffer.
    type BufferState: AsRef<[u8]>;

    /// Per-buffer-list state.
    type ListState;

    fn device_open(&mut self, name: &str) -> Result<(), DeviceError>;

    fn device_close(&mut self);

    /// Returns `Ok(false)` for keys the backend does not recognise so that
    /// the caller can offer the option to another layer.
    fn device_set_option(&mut self, key: &str, value: &str) -> Result<bool, DeviceError>;

    fn buffer_open(&mut self, buf: &Buffer<Self>) -> Result<Self::BufferState, DeviceError>;

    fn buffer_close(&mut self, buf: &mut Buffer<Self>);

    fn buffer_enqueue(
        &mut self,
        list: &mut BufferList<Self>,
        index: usize,
        who: &str,
    ) -> Result<(), DeviceError>;

    /// Returns the index of the next completed buffer.
    fn buffer_list_dequeue(&mut self, list: &mut BufferList<Self>) -> Result<usize, DeviceError>;

    fn buffer_list_pollfd(
        &self,
        list: &BufferList<Self>,
        can_dequeue: bool,
    ) -> Result<libc::pollfd, DeviceError>;

    /// Prepares the list and returns the number of buffers to open.
    fn buffer_list_open(&mut self, list: &mut BufferList<Self>) -> Result<usize, DeviceError>;

    fn buffer_list_close(&mut self, list: &mut BufferList<Self>);

    fn buffer_list_set_stream(
        &mut self,
        list: &mut BufferList<Self>,
        on: bool,
    ) -> Result<(), DeviceError>;
}

/// A capture device driven by backend `H`.
pub struct Device<H: DeviceHw> {
    name: String,
    path: String,
    hw: H,
    capture: Option<BufferList<H>>,
    opened: bool,
}

impl<H: DeviceHw> Device<H> {
    pub fn open(name: &str, path: &str, mut hw: H) -> Result<Self, DeviceError> {
        hw.device_open(name)?;
        info!("{}: opened device {}", name, path);
        Ok(Self {
            name: name.to_owned(),
            path: path.to_owned(),
            hw,
            capture: None,
            opened: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// Forwards a configuration option to the backend.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<bool, DeviceError> {
        let handled = self.hw.device_set_option(key, value)?;
        if !handled {
            debug!("{}: option {}={} not handled", self.name, key, value);
        }
        Ok(handled)
    }

    /// Opens the buffer list and every buffer in it.
    ///
    /// On failure everything opened so far is closed again before the error
    /// is returned.
    pub fn open_buffer_list(
        &mut self,
        do_capture: bool,
        format: Format,
    ) -> Result<usize, DeviceError> {
        if !self.opened {
            return Err(DeviceError::NotOpen("device"));
        }
        self.close_buffer_list();

        let name = format!("{}:{}", self.name, if do_capture { "capture" } else { "output" });
        let mut list = BufferList::new(name, do_capture, format);

        let nbufs = match self.hw.buffer_list_open(&mut list) {
            Ok(n) => n,
            Err(e) => {
                self.hw.buffer_list_close(&mut list);
                return Err(e);
            }
        };

        for index in 0..nbufs {
            let mut buf = Buffer::new(&list.name, index);
            match self.hw.buffer_open(&buf) {
                Ok(state) => {
                    buf.hw = Some(state);
                    list.bufs.push(buf);
                }
                Err(e) => {
                    Self::release_list(&mut self.hw, &mut list);
                    return Err(e);
                }
            }
        }

        info!(
            "{}: opened {} buffers {}x{} {}",
            list.name, nbufs, format.width, format.height, format.format
        );
        self.capture = Some(list);
        Ok(nbufs)
    }

    pub fn buffer_list(&self) -> Option<&BufferList<H>> {
        self.capture.as_ref()
    }

    pub fn buffer_list_mut(&mut self) -> Option<&mut BufferList<H>> {
        self.capture.as_mut()
    }

    /// Hands buffer `index` to the backend.
    pub fn enqueue(&mut self, index: usize, who: &str) -> Result<(), DeviceError> {
        let list = self
            .capture
            .as_mut()
            .ok_or(DeviceError::NotOpen("buffer list"))?;
        let buf = list.bufs.get(index).ok_or(DeviceError::InvalidIndex {
            index,
            nbufs: list.bufs.len(),
        })?;
        if buf.enqueued {
            return Err(DeviceError::BufferBusy(index));
        }

        self.hw.buffer_enqueue(list, index, who)?;
        list.bufs[index].enqueued = true;
        Ok(())
    }

    /// Retrieves the next completed buffer.
    ///
    /// Never blocks, wait on [`Device::pollfd`] first.
    pub fn dequeue(&mut self) -> Result<&Buffer<H>, DeviceError> {
        let list = self
            .capture
            .as_mut()
            .ok_or(DeviceError::NotOpen("buffer list"))?;
        let index = self.hw.buffer_list_dequeue(list)?;
        let nbufs = list.bufs.len();
        let buf = list
            .bufs
            .get_mut(index)
            .ok_or(DeviceError::ChannelIndexRange { index, nbufs })?;
        buf.enqueued = false;
        debug!("{}: dequeued used:{}", buf.name, buf.used);
        Ok(buf)
    }

    pub fn pollfd(&self, can_dequeue: bool) -> Result<libc::pollfd, DeviceError> {
        let list = self
            .capture
            .as_ref()
            .ok_or(DeviceError::NotOpen("buffer list"))?;
        self.hw.buffer_list_pollfd(list, can_dequeue)
    }

    pub fn set_stream(&mut self, on: bool) -> Result<(), DeviceError> {
        let list = self
            .capture
            .as_mut()
            .ok_or(DeviceError::NotOpen("buffer list"))?;
        self.hw.buffer_list_set_stream(list, on)?;
        list.streaming = on;
        info!("{}: streaming {}", list.name, if on { "on" } else { "off" });
        Ok(())
    }

    /// Closes the buffer list and all of its buffers. Safe to repeat.
    pub fn close_buffer_list(&mut self) {
        if let Some(mut list) = self.capture.take() {
            if list.streaming {
                if let Err(e) = self.hw.buffer_list_set_stream(&mut list, false) {
                    warn!("{}: failed to stop stream: {}", list.name, e);
                }
            }
            Self::release_list(&mut self.hw, &mut list);
        }
    }

    fn release_list(hw: &mut H, list: &mut BufferList<H>) {
        for buf in list.bufs.iter_mut() {
            hw.buffer_close(buf);
            buf.hw = None;
        }
        list.bufs.clear();
        hw.buffer_list_close(list);
        debug!("{}: closed", list.name);
    }

    /// Closes the buffer list and the backend. Safe to repeat.
    pub fn close(&mut self) {
        self.close_buffer_list();
        if self.opened {
            self.hw.device_close();
            self.opened = false;
            info!("{}: closed device", self.name);
        }
    }
}

impl<H: DeviceHw> Drop for Device<H> {
    fn drop(&mut self) {
        self.close();
    }
}
