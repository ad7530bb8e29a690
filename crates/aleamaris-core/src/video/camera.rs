//! A live capture device, decoded through `ffmpeg`.
//!
//! Platform input format mirrors the teacher's `camera.rs`: `avfoundation`
//! on macOS, extended here to `v4l2` on Linux and `dshow` on Windows so
//! the same source works across the platforms this service actually
//! targets.

use std::io::BufReader;
use std::process::{Child, ChildStdout};

use super::ffmpeg::{self, Probe};
use super::{require_ffmpeg, source_unavailable, Frame, VideoSource};
use crate::error::Result;

const FALLBACK_WIDTH: u32 = 640;
const FALLBACK_HEIGHT: u32 = 480;

fn platform_input_args() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["-f", "avfoundation", "-framerate", "30"]
    } else if cfg!(target_os = "windows") {
        &["-f", "dshow"]
    } else {
        &["-f", "v4l2", "-framerate", "30"]
    }
}

fn device_name(index: u32) -> String {
    if cfg!(target_os = "macos") {
        index.to_string()
    } else if cfg!(target_os = "windows") {
        format!("video={index}")
    } else {
        format!("/dev/video{index}")
    }
}

/// A live camera feed, always non-seekable.
pub struct CameraVideoSource {
    device: String,
    width: u32,
    height: u32,
    stream: Option<(Child, BufReader<ChildStdout>)>,
}

impl CameraVideoSource {
    pub fn open(index: u32) -> Result<Self> {
        require_ffmpeg()?;
        let device = device_name(index);

        let (width, height) = ffmpeg::probe(&device)
            .map(|Probe { width, height, .. }| (width, height))
            .unwrap_or((FALLBACK_WIDTH, FALLBACK_HEIGHT));

        let mut source = Self {
            device,
            width,
            height,
            stream: None,
        };

        if !source.ensure_stream() {
            return Err(source_unavailable(format!(
                "could not open camera device {}",
                source.device
            )));
        }
        Ok(source)
    }

    fn ensure_stream(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match ffmpeg::spawn_raw_stream(platform_input_args(), &self.device) {
            Ok(mut child) => {
                let stdout = match child.stdout.take() {
                    Some(s) => s,
                    None => return false,
                };
                self.stream = Some((child, BufReader::new(stdout)));
                true
            }
            Err(_) => false,
        }
    }

    fn kill_stream(&mut self) {
        if let Some((mut child, _)) = self.stream.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl VideoSource for CameraVideoSource {
    fn read(&mut self) -> Option<Frame> {
        if !self.ensure_stream() {
            return None;
        }
        let (_, reader) = self.stream.as_mut()?;
        let bgr = ffmpeg::read_one_frame(reader, self.width, self.height)?;
        Some(Frame {
            width: self.width,
            height: self.height,
            bgr,
        })
    }

    fn rewind(&mut self) {}

    fn release(&mut self) {
        self.kill_stream();
    }

    fn seekable(&self) -> bool {
        false
    }
}

impl Drop for CameraVideoSource {
    fn drop(&mut self) {
        self.kill_stream();
    }
}
