//! A video file, decoded through `ffprobe`/`ffmpeg`.

use std::io::BufReader;
use std::process::{Child, ChildStdout};

use super::ffmpeg::{self, Probe};
use super::{require_ffmpeg, source_unavailable, Frame, SeekableVideoSource, VideoSource};
use crate::error::Result;

/// A video file opened for sequential or random-access reads.
///
/// `ffprobe` runs once at construction to learn dimensions and frame
/// count; sequential reads drive a long-lived `ffmpeg` child, random
/// reads (`read_at`) spawn a fresh one-shot `ffmpeg` per frame.
pub struct FileVideoSource {
    path: String,
    width: u32,
    height: u32,
    frame_count: i64,
    stream: Option<(Child, BufReader<ChildStdout>)>,
}

impl FileVideoSource {
    pub fn open(path: &str) -> Result<Self> {
        require_ffmpeg()?;
        let Probe {
            width,
            height,
            frame_count,
        } = ffmpeg::probe(path)
            .ok_or_else(|| source_unavailable(format!("ffprobe failed to open {path}")))?;

        if width == 0 || height == 0 {
            return Err(source_unavailable(format!(
                "ffprobe reported zero-sized stream for {path}"
            )));
        }

        Ok(Self {
            path: path.to_string(),
            width,
            height,
            frame_count,
            stream: None,
        })
    }

    fn ensure_stream(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match ffmpeg::spawn_raw_stream(&[], &self.path) {
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

impl VideoSource for FileVideoSource {
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

    fn rewind(&mut self) {
        self.kill_stream();
    }

    fn release(&mut self) {
        self.kill_stream();
    }

    fn seekable(&self) -> bool {
        self.frame_count > 0
    }
}

impl SeekableVideoSource for FileVideoSource {
    fn frame_count(&self) -> i64 {
        self.frame_count
    }

    fn read_at(&mut self, index: i64) -> Option<Frame> {
        let bgr = ffmpeg::read_frame_at(&self.path, index, self.width, self.height)?;
        Some(Frame {
            width: self.width,
            height: self.height,
            bgr,
        })
    }
}

impl Drop for FileVideoSource {
    fn drop(&mut self) {
        self.kill_stream();
    }
}
