//! Video-to-bytes conditioner (C3).
//!
//! Drains a [`VideoSource`] frame by frame, turns each frame into a
//! per-frame digest via keyed whitening, and accumulates digests until
//! `bytes_total` bytes have been produced. Two traversal strategies:
//!
//! - Seekable sources get a fresh Fisher–Yates permutation of frame
//!   indices per pass, so the order frames get whitened in cannot be
//!   predicted from the file alone.
//! - Non-seekable sources (cameras, or seek-incapable files) are read
//!   linearly; the source's `rewind()` starts a new pass when exhausted.
//!
//! Whitening key rotation reuses [`crate::drbg::hkdf_mix`] — the same
//! extract+expand construction the DRBG uses to rekey itself.

use blake2::digest::{KeyInit, Update};
use blake2::Blake2bMac;
use rand::Rng;

use crate::drbg::hkdf_mix;
use crate::error::{AleaMarisError, Result};
use crate::features::{make_features, to_gray_small, GraySmall};
use crate::video::{SeekableVideoSource, VideoSource};

type Blake2b256Mac = Blake2bMac<blake2::digest::consts::U32>;

/// Tunables for a conditioning run. Defaults match the reference
/// implementation's.
#[derive(Debug, Clone)]
pub struct GenConfig {
    pub bytes_total: usize,
    pub resize: u32,
    pub stride: usize,
    pub use_diff: bool,
    pub key_reseed_interval_frames: u32,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            bytes_total: 1024,
            resize: 64,
            stride: 1,
            use_diff: false,
            key_reseed_interval_frames: 512,
        }
    }
}

/// FIFO set of recently-seen digests, used only to flag repeats for
/// diagnostics — never to alter output.
struct RecentDigests {
    order: std::collections::VecDeque<[u8; 32]>,
    seen: std::collections::HashSet<[u8; 32]>,
    cap: usize,
}

impl RecentDigests {
    fn new(cap: usize) -> Self {
        Self {
            order: std::collections::VecDeque::new(),
            seen: std::collections::HashSet::new(),
            cap,
        }
    }

    /// Record `digest`, returning `true` if it was already present.
    fn add_and_check(&mut self, digest: [u8; 32]) -> bool {
        let repeat = self.seen.contains(&digest);
        if !repeat {
            self.seen.insert(digest);
            self.order.push_back(digest);
            if self.order.len() > self.cap {
                if let Some(old) = self.order.pop_front() {
                    self.seen.remove(&old);
                }
            }
        }
        repeat
    }
}

/// Draws a random byte source from a video/camera feed.
pub struct Conditioner {
    cfg: GenConfig,
    epoch_salt: [u8; 32],
    pass_counter: u32,
    global_counter: u32,
    key: [u8; 32],
    key_frames_since_reseed: u32,
    recent: RecentDigests,
    /// Count of digests flagged as repeats across this conditioner's
    /// lifetime. Populated but intentionally unread by the orchestrator
    /// or any HTTP handler — the `_recent` FIFO this counter is derived
    /// from exists in the reference implementation purely as a
    /// diagnostic, never acted upon there either.
    pub repeats_observed: u64,
}

fn random_32() -> [u8; 32] {
    let mut buf = [0u8; 32];
    rand::rng().fill(&mut buf);
    buf
}

/// Fisher–Yates permutation of `0..n` step `stride`.
fn permute_indices(n: i64, stride: usize) -> Vec<i64> {
    let mut idx: Vec<i64> = (0..n).step_by(stride.max(1)).collect();
    let mut rng = rand::rng();
    for i in (1..idx.len()).rev() {
        let r = rng.random_range(0..=i);
        idx.swap(i, r);
    }
    idx
}

fn blake2b_keyed(key: &[u8; 32], parts: &[&[u8]]) -> [u8; 32] {
    let mut mac = Blake2b256Mac::new_from_slice(key).expect("32-byte key is always valid");
    for part in parts {
        if !part.is_empty() {
            Update::update(&mut mac, part);
        }
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&blake2::digest::FixedOutput::finalize_fixed(mac));
    out
}

impl Conditioner {
    pub fn new(cfg: GenConfig) -> Self {
        Self {
            cfg,
            epoch_salt: random_32(),
            pass_counter: 0,
            global_counter: 0,
            key: random_32(),
            key_frames_since_reseed: 0,
            recent: RecentDigests::new(4096),
            repeats_observed: 0,
        }
    }

    fn rotate_key(&mut self, material: &[u8]) {
        let salt = random_32();
        let mut data = material.to_vec();
        data.extend_from_slice(&salt);
        data.extend_from_slice(&self.pass_counter.to_be_bytes());
        data.extend_from_slice(&self.global_counter.to_be_bytes());
        let derived = hkdf_mix(&self.key, &data, 32);
        self.key.copy_from_slice(&derived);
        self.key_frames_since_reseed = 0;
    }

    fn process_frame(
        &mut self,
        gray_small: &GraySmall,
        prev_small: Option<&GraySmall>,
        frame_idx: u32,
    ) -> [u8; 32] {
        let feats = make_features(gray_small, prev_small, self.cfg.use_diff);
        let mut header = self.epoch_salt.to_vec();
        header.extend_from_slice(&self.pass_counter.to_be_bytes());
        header.extend_from_slice(&self.global_counter.to_be_bytes());
        header.extend_from_slice(&frame_idx.to_be_bytes());

        let digest = blake2b_keyed(&self.key, &[&header, &feats]);

        if self.recent.add_and_check(digest) {
            self.repeats_observed += 1;
        }
        self.key_frames_since_reseed += 1;
        if self.key_frames_since_reseed >= self.cfg.key_reseed_interval_frames {
            self.rotate_key(&digest);
        }

        digest
    }

    fn append(produced: &mut Vec<u8>, want: usize, digest: &[u8; 32]) {
        let need = want - produced.len();
        if need >= digest.len() {
            produced.extend_from_slice(digest);
        } else {
            produced.extend_from_slice(&digest[..need]);
        }
    }

    /// Drain a non-seekable (or seek-incapable) `source` linearly until
    /// `cfg.bytes_total` bytes have been produced, rewinding on
    /// exhaustion.
    pub fn produce<S: VideoSource + ?Sized>(&mut self, source: &mut S) -> Result<Vec<u8>> {
        let want = self.cfg.bytes_total.max(1);
        let mut produced = Vec::with_capacity(want);
        let result = self.produce_linear(source, want, &mut produced);
        source.release();
        result.map(|()| produced)
    }

    /// Drain a seekable `source` via a fresh Fisher–Yates permutation of
    /// frame indices per pass, until `cfg.bytes_total` bytes have been
    /// produced. Falls back to [`Self::produce`] if the source can't
    /// report a positive frame count.
    pub fn produce_seekable<S: SeekableVideoSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<u8>> {
        let want = self.cfg.bytes_total.max(1);
        let mut produced = Vec::with_capacity(want);

        let total = source.frame_count();
        if total <= 0 {
            let result = self.produce_linear(source, want, &mut produced);
            source.release();
            return result.map(|()| produced);
        }

        self.produce_seekable_pass(source, total, want, &mut produced);
        source.release();
        Ok(produced)
    }

    fn produce_seekable_pass<S: SeekableVideoSource + ?Sized>(
        &mut self,
        source: &mut S,
        total: i64,
        want: usize,
        produced: &mut Vec<u8>,
    ) {
        let mut prev_small: Option<GraySmall> = None;
        let mut indices = permute_indices(total, self.cfg.stride);
        let mut p = 0usize;
        let mut frame_idx = 0u32;

        while produced.len() < want {
            if p >= indices.len() {
                self.pass_counter += 1;
                self.epoch_salt = random_32();
                indices = permute_indices(total, self.cfg.stride);
                p = 0;
                prev_small = None;
            }

            let i = indices[p];
            p += 1;
            let Some(frame) = source.read_at(i) else {
                continue;
            };

            let gray_small = to_gray_small(&frame, self.cfg.resize);
            let digest = self.process_frame(&gray_small, prev_small.as_ref(), frame_idx);
            Self::append(produced, want, &digest);

            prev_small = Some(gray_small);
            frame_idx += 1;
            self.global_counter += 1;
        }
    }

    /// Drain `source` linearly until `want` bytes have been produced.
    /// On a failed `read`, `rewind()` once and retry; a second
    /// consecutive failure means the source is permanently unreadable,
    /// signalled as `EntropyExhausted` rather than spinning forever.
    fn produce_linear<S: VideoSource + ?Sized>(
        &mut self,
        source: &mut S,
        want: usize,
        produced: &mut Vec<u8>,
    ) -> Result<()> {
        let mut prev_small: Option<GraySmall> = None;
        let mut frame_idx: u32 = 0;

        while produced.len() < want {
            let frame = match source.read() {
                Some(frame) => frame,
                None => {
                    source.rewind();
                    prev_small = None;
                    self.pass_counter += 1;
                    self.epoch_salt = random_32();
                    match source.read() {
                        Some(frame) => frame,
                        None => return Err(AleaMarisError::EntropyExhausted),
                    }
                }
            };

            if (frame_idx as usize % self.cfg.stride.max(1)) != 0 {
                frame_idx += 1;
                continue;
            }

            let gray_small = to_gray_small(&frame, self.cfg.resize);
            let digest = self.process_frame(&gray_small, prev_small.as_ref(), frame_idx);
            Self::append(produced, want, &digest);

            prev_small = Some(gray_small);
            frame_idx += 1;
            self.global_counter += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Frame;

    struct MockSource {
        frames: Vec<Frame>,
        pos: usize,
        rewinds: u32,
    }

    impl VideoSource for MockSource {
        fn read(&mut self) -> Option<Frame> {
            let frame = self.frames.get(self.pos).cloned()?;
            self.pos += 1;
            Some(frame)
        }

        fn rewind(&mut self) {
            self.pos = 0;
            self.rewinds += 1;
        }

        fn release(&mut self) {}
    }

    fn solid_frame(v: u8) -> Frame {
        Frame {
            width: 8,
            height: 8,
            bgr: vec![v; 8 * 8 * 3],
        }
    }

    #[test]
    fn produce_linear_reaches_exact_byte_count() {
        let mut source = MockSource {
            frames: vec![solid_frame(10), solid_frame(20), solid_frame(30)],
            pos: 0,
            rewinds: 0,
        };
        let mut cond = Conditioner::new(GenConfig {
            bytes_total: 100,
            resize: 4,
            ..Default::default()
        });
        let out = cond.produce(&mut source).unwrap();
        assert_eq!(out.len(), 100);
        assert!(source.rewinds >= 1);
    }

    #[test]
    fn produce_is_not_deterministic_across_runs_due_to_random_salts() {
        let frames = vec![solid_frame(1), solid_frame(2)];
        let mut a = MockSource {
            frames: frames.clone(),
            pos: 0,
            rewinds: 0,
        };
        let mut b = MockSource {
            frames,
            pos: 0,
            rewinds: 0,
        };
        let out_a = Conditioner::new(GenConfig {
            bytes_total: 64,
            resize: 4,
            ..Default::default()
        })
        .produce(&mut a)
        .unwrap();
        let out_b = Conditioner::new(GenConfig {
            bytes_total: 64,
            resize: 4,
            ..Default::default()
        })
        .produce(&mut b)
        .unwrap();
        assert_ne!(out_a, out_b);
    }

    #[test]
    fn key_rotates_after_configured_interval() {
        let mut source = MockSource {
            frames: vec![solid_frame(5); 4],
            pos: 0,
            rewinds: 0,
        };
        let mut cond = Conditioner::new(GenConfig {
            bytes_total: 32 * 6,
            resize: 4,
            key_reseed_interval_frames: 2,
            ..Default::default()
        });
        let key_before = cond.key;
        cond.produce(&mut source).unwrap();
        assert_ne!(key_before, cond.key);
    }

    #[test]
    fn permute_indices_is_a_permutation() {
        let idx = permute_indices(10, 1);
        let mut sorted = idx.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn permute_indices_respects_stride() {
        let idx = permute_indices(10, 2);
        assert_eq!(idx.len(), 5);
        let mut sorted = idx.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 2, 4, 6, 8]);
    }

    struct EmptySource;

    impl VideoSource for EmptySource {
        fn read(&mut self) -> Option<Frame> {
            None
        }

        fn rewind(&mut self) {}

        fn release(&mut self) {}
    }

    #[test]
    fn produce_signals_entropy_exhausted_when_rewind_retry_still_fails() {
        let mut source = EmptySource;
        let mut cond = Conditioner::new(GenConfig {
            bytes_total: 32,
            ..Default::default()
        });
        let err = cond.produce(&mut source).unwrap_err();
        assert_eq!(err, AleaMarisError::EntropyExhausted);
    }
}
