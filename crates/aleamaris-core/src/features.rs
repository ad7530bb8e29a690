//! Pixel-level feature extraction.
//!
//! Hand-rolled resize/grayscale/edge routines — no image-processing crate,
//! matching the teacher's preference for dependency-free numeric helpers
//! over a general-purpose library pulled in for one or two operations.

use crate::video::Frame;

/// A resized, single-channel frame, `size * size` bytes, row-major.
#[derive(Debug, Clone)]
pub struct GraySmall {
    pub size: u32,
    pub pixels: Vec<u8>,
}

/// BT.601 luma weights, fixed-point (matches OpenCV's default `BGR2GRAY`
/// coefficients: 0.299 R + 0.587 G + 0.114 B).
fn luma(b: u8, g: u8, r: u8) -> u8 {
    let y = 114u32 * b as u32 + 587u32 * g as u32 + 299u32 * r as u32;
    (y / 1000) as u8
}

fn to_gray(frame: &Frame) -> Vec<u8> {
    frame
        .bgr
        .chunks_exact(3)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Area-average downsample of a `width x height` grayscale buffer to
/// `size x size`, mirroring `cv2.resize(..., interpolation=cv2.INTER_AREA)`.
fn resize_area(gray: &[u8], width: u32, height: u32, size: u32) -> Vec<u8> {
    let (width, height, size) = (width as usize, height as usize, size as usize);
    let mut out = vec![0u8; size * size];
    for oy in 0..size {
        let y0 = oy * height / size;
        let y1 = ((oy + 1) * height / size).max(y0 + 1).min(height);
        for ox in 0..size {
            let x0 = ox * width / size;
            let x1 = ((ox + 1) * width / size).max(x0 + 1).min(width);

            let mut sum: u32 = 0;
            let mut count: u32 = 0;
            for y in y0..y1 {
                let row = &gray[y * width..y * width + width];
                for x in x0..x1 {
                    sum += row[x] as u32;
                    count += 1;
                }
            }
            out[oy * size + ox] = (sum / count.max(1)) as u8;
        }
    }
    out
}

/// Convert a raw `bgr24` frame to a downsized grayscale buffer.
pub fn to_gray_small(frame: &Frame, size: u32) -> GraySmall {
    let gray = to_gray(frame);
    let pixels = resize_area(&gray, frame.width, frame.height, size);
    GraySmall { size, pixels }
}

/// 3x3 Laplacian edge magnitude, clipped and halved to fit a byte.
/// Mirrors `cv2.Laplacian(..., ddepth=CV_16S, ksize=3)` followed by
/// `abs(lap) >> 1` clipped to `[0, 255]`.
pub fn laplacian_edges(gray: &GraySmall) -> Vec<u8> {
    let n = gray.size as usize;
    let p = &gray.pixels;
    let at = |x: isize, y: isize| -> i32 {
        let cx = x.clamp(0, n as isize - 1) as usize;
        let cy = y.clamp(0, n as isize - 1) as usize;
        p[cy * n + cx] as i32
    };

    let mut out = vec![0u8; n * n];
    for y in 0..n as isize {
        for x in 0..n as isize {
            let lap = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4 * at(x, y);
            let mag = (lap.unsigned_abs() >> 1).min(255);
            out[y as usize * n + x as usize] = mag as u8;
        }
    }
    out
}

/// Absolute per-pixel difference between two equally-sized buffers.
fn abs_diff(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x.abs_diff(y))
        .collect()
}

/// Build the per-frame feature vector: grayscale pixels, edge magnitudes,
/// and (when enabled and a previous frame exists) the frame-to-frame
/// difference. Concatenated, not hashed — whitening happens downstream.
pub fn make_features(gray: &GraySmall, prev: Option<&GraySmall>, use_diff: bool) -> Vec<u8> {
    let edges = laplacian_edges(gray);
    let mut out = Vec::with_capacity(gray.pixels.len() * 2 + gray.pixels.len());
    out.extend_from_slice(&gray.pixels);
    out.extend_from_slice(&edges);
    if use_diff {
        if let Some(prev) = prev {
            if prev.size == gray.size {
                out.extend_from_slice(&abs_diff(&gray.pixels, &prev.pixels));
            }
        }
    }
    out
}

/// Shannon entropy in bits per byte, for diagnostic reporting only —
/// never fed back into conditioning decisions.
pub fn shannon_entropy_per_byte(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let n = data.len() as f64;
    let mut h = 0.0;
    for &c in &counts {
        if c > 0 {
            let p = c as f64 / n;
            h -= p * p.log2();
        }
    }
    h
}
