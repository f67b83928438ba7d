// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the software MJPEG encoder.
///
/// Drives the encoder with a synthetic test pattern through the same
/// enqueue / poll / dequeue loop a camera pipeline would use. Arguments can
/// be specified via command line or environment variables.
///
/// # Example
///
/// ```bash
/// # Via command line
/// edgefirst-mjpeg-sw --size 1280 720 --quality 90 --output /tmp/frames
///
/// # Via environment variables
/// export QUALITY=90
/// edgefirst-mjpeg-sw
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Frame resolution in pixels (width height)
    #[arg(
        long,
        env = "FRAME_SIZE",
        default_value = "1920 1080",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub size: Vec<u32>,

    /// Number of capture buffers
    #[arg(short, long, env = "BUFFERS", default_value = "4")]
    pub buffers: usize,

    /// JPEG compression quality (1-100)
    #[arg(short, long, env = "QUALITY", default_value = "80")]
    pub quality: i32,

    /// Number of frames to encode
    #[arg(short, long, env = "FRAMES", default_value = "30")]
    pub frames: usize,

    /// Directory to write encoded frames to
    #[arg(short, long, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Poll timeout in milliseconds
    #[arg(long, env = "POLL_TIMEOUT", default_value = "1000")]
    pub poll_timeout: i32,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}
