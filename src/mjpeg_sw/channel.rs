// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::error::DeviceError;
use std::{
    io,
    mem::size_of,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
};
use tracing::debug;

type Message = u32;
const MESSAGE_SIZE: usize = size_of::<Message>();

/// Bounded FIFO of buffer indices with a pollable read end.
///
/// Backed by a plain pipe. Every index is written as one 4-byte message,
/// which stays below `PIPE_BUF`, so writes are atomic and exact-size reads
/// never split a message. Packet mode is not used, it would cap the channel
/// at one message per pipe page.
///
/// Both ends are non-blocking: a full pipe makes [`push`] fail and an empty
/// one makes [`pop`] fail, neither ever waits. Readiness is observed
/// through [`pollfd`] by an external event loop.
///
/// [`push`]: CompletionChannel::push
/// [`pop`]: CompletionChannel::pop
/// [`pollfd`]: CompletionChannel::pollfd
#[derive(Debug)]
pub struct CompletionChannel {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
    nbufs: usize,
}

impl CompletionChannel {
    /// Creates the channel for indices in `0..nbufs`.
    pub fn new(nbufs: usize) -> Result<Self, DeviceError> {
        let mut fds: [libc::c_int; 2] = [-1; 2];
        let flags = libc::O_CLOEXEC | libc::O_NONBLOCK;
        if unsafe { libc::pipe2(fds.as_mut_ptr(), flags) } < 0 {
            return Err(DeviceError::ChannelCreate(io::Error::last_os_error()));
        }
        // SAFETY: pipe2 succeeded so both descriptors are open and owned here.
        let (read, write) = unsafe {
            (
                OwnedFd::from_raw_fd(fds[0]),
                OwnedFd::from_raw_fd(fds[1]),
            )
        };

        let channel = Self {
            read: Some(read),
            write: Some(write),
            nbufs,
        };
        debug!(
            "completion channel fds:{:?} capacity:{:?}",
            fds,
            channel.capacity()
        );
        Ok(channel)
    }

    /// Number of indices the channel holds before [`push`] fails.
    ///
    /// [`push`]: CompletionChannel::push
    pub fn capacity(&self) -> Option<usize> {
        let fd = self.read.as_ref()?.as_raw_fd();
        let size = unsafe { libc::fcntl(fd, libc::F_GETPIPE_SZ) };
        usize::try_from(size).ok().map(|bytes| bytes / MESSAGE_SIZE)
    }

    pub fn nbufs(&self) -> usize {
        self.nbufs
    }

    /// Read end of the pipe, if the channel is still open.
    pub fn read_fd(&self) -> Option<RawFd> {
        self.read.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Signals completion of buffer `index`.
    ///
    /// A full channel or a short write is reported as
    /// [`DeviceError::ChannelWrite`], the index is not delivered.
    pub fn push(&self, index: usize) -> Result<(), DeviceError> {
        let fd = self
            .write
            .as_ref()
            .ok_or(DeviceError::NotOpen("completion channel"))?;
        let msg = Message::try_from(index).map_err(|_| DeviceError::ChannelIndexRange {
            index,
            nbufs: self.nbufs,
        })?;
        let bytes = msg.to_ne_bytes();

        let n = unsafe {
            libc::write(
                fd.as_raw_fd(),
                bytes.as_ptr() as *const libc::c_void,
                MESSAGE_SIZE,
            )
        };
        if n < 0 {
            return Err(DeviceError::ChannelWrite(io::Error::last_os_error()));
        }
        if n as usize != MESSAGE_SIZE {
            return Err(DeviceError::ChannelWrite(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write of {} bytes", n),
            )));
        }
        Ok(())
    }

    /// Takes the oldest completed index off the channel.
    pub fn pop(&self) -> Result<usize, DeviceError> {
        let fd = self
            .read
            .as_ref()
            .ok_or(DeviceError::NotOpen("completion channel"))?;
        let mut bytes = [0u8; MESSAGE_SIZE];

        let n = unsafe {
            libc::read(
                fd.as_raw_fd(),
                bytes.as_mut_ptr() as *mut libc::c_void,
                MESSAGE_SIZE,
            )
        };
        if n < 0 {
            return Err(DeviceError::ChannelRead(io::Error::last_os_error()));
        }
        if n as usize != MESSAGE_SIZE {
            return Err(DeviceError::ChannelProtocol(n as usize));
        }

        let index = Message::from_ne_bytes(bytes) as usize;
        if index >= self.nbufs {
            return Err(DeviceError::ChannelIndexRange {
                index,
                nbufs: self.nbufs,
            });
        }
        Ok(index)
    }

    /// Readiness descriptor for the read end.
    ///
    /// Hang-up is always watched. Readability is only requested when the
    /// consumer is ready and `pending` buffers await pickup, otherwise a
    /// poll loop would wake up for messages it is not going to read.
    pub fn pollfd(&self, can_dequeue: bool, pending: usize) -> Result<libc::pollfd, DeviceError> {
        let fd = self
            .read_fd()
            .ok_or(DeviceError::NotOpen("completion channel"))?;
        let mut events = libc::POLLHUP;
        if can_dequeue && pending > 0 {
            events |= libc::POLLIN;
        }
        Ok(libc::pollfd {
            fd,
            events,
            revents: 0,
        })
    }

    /// Releases both descriptors. Safe to repeat.
    pub fn close(&mut self) {
        if let Some(fd) = self.write.take() {
            debug!("completion channel closed write fd:{}", fd.as_raw_fd());
        }
        if let Some(fd) = self.read.take() {
            debug!("completion channel closed read fd:{}", fd.as_raw_fd());
        }
    }
}

impl Drop for CompletionChannel {
    fn drop(&mut self) {
        self.close();
    }
}
