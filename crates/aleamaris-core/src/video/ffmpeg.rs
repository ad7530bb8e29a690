//! Shared subprocess helpers for the `ffmpeg`/`ffprobe` backed video sources.

use std::io::Read;
use std::process::{Child, Command, Stdio};

/// Check if a command exists by running `which`.
pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Decoded width/height/frame-count of a video, via `ffprobe`.
pub struct Probe {
    pub width: u32,
    pub height: u32,
    /// `-1` if `ffprobe` could not report a frame count (e.g. some live
    /// streams or containers without an index).
    pub frame_count: i64,
}

/// Run `ffprobe` against `path` and parse width, height, and frame count
/// out of its CSV stream output.
pub fn probe(path: &str) -> Option<Probe> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=width,height,nb_read_frames",
            "-of",
            "csv=p=0",
            path,
        ])
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let line = text.lines().next()?;
    let mut fields = line.split(',');
    let width: u32 = fields.next()?.trim().parse().ok()?;
    let height: u32 = fields.next()?.trim().parse().ok()?;
    let frame_count: i64 = fields
        .next()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(-1);

    Some(Probe {
        width,
        height,
        frame_count,
    })
}

/// Spawn a long-lived `ffmpeg` process that writes an unbounded stream of
/// raw `bgr24` frames to stdout. `input_args` supplies everything before
/// `-i` (format/device selection for camera inputs; empty for files).
pub fn spawn_raw_stream(input_args: &[&str], input: &str) -> std::io::Result<Child> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(input_args)
        .args(["-i", input])
        .args(["-f", "rawvideo", "-pix_fmt", "bgr24", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    cmd.spawn()
}

/// Decode exactly one frame at `index` out of `path` via a one-shot
/// `ffmpeg` invocation with a frame-select filter.
pub fn read_frame_at(path: &str, index: i64, width: u32, height: u32) -> Option<Vec<u8>> {
    let select = format!("select=eq(n\\,{index})");
    let output = Command::new("ffmpeg")
        .args(["-i", path])
        .args(["-vf", &select])
        .args(["-vsync", "0", "-frames:v", "1"])
        .args(["-f", "rawvideo", "-pix_fmt", "bgr24", "-"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let expected = width as usize * height as usize * 3;
    if output.stdout.len() < expected {
        return None;
    }
    Some(output.stdout[..expected].to_vec())
}

/// Read exactly one `bgr24` frame's worth of bytes from a running
/// stream, or `None` on EOF/short read.
pub fn read_one_frame(stdout: &mut impl Read, width: u32, height: u32) -> Option<Vec<u8>> {
    let expected = width as usize * height as usize * 3;
    let mut buf = vec![0u8; expected];
    stdout.read_exact(&mut buf).ok()?;
    Some(buf)
}
