//! Integration tests for aleamaris-core.
//!
//! Exercises the conditioner against an in-memory fake video source (no
//! `ffmpeg` dependency), the byte queue, the DRBG, and a full
//! `Pipeline::boot` lifecycle with OS entropy as the only source.

use aleamaris_core::conditioning::{Conditioner, GenConfig};
use aleamaris_core::config::Config;
use aleamaris_core::orchestrator::Pipeline;
use aleamaris_core::queue::ByteQueue;
use aleamaris_core::video::{Frame, SeekableVideoSource, VideoSource};
use aleamaris_core::ChaChaDrbg;

/// Synthetic source that hands back deterministic, distinct frames.
/// Never seekable, so `Conditioner::produce` always drains it linearly.
struct FakeSource {
    frames: Vec<Frame>,
    pos: usize,
}

impl FakeSource {
    fn new(count: u8) -> Self {
        let frames = (0..count)
            .map(|i| Frame {
                width: 8,
                height: 8,
                bgr: vec![i; 8 * 8 * 3],
            })
            .collect();
        Self { frames, pos: 0 }
    }
}

impl VideoSource for FakeSource {
    fn read(&mut self) -> Option<Frame> {
        let frame = self.frames.get(self.pos).cloned();
        if frame.is_some() {
            self.pos += 1;
        }
        frame
    }

    fn rewind(&mut self) {
        self.pos = 0;
    }

    fn release(&mut self) {}
}

#[test]
fn conditioner_produces_exact_byte_count_from_fake_source() {
    let mut source = FakeSource::new(5);
    let mut conditioner = Conditioner::new(GenConfig {
        bytes_total: 300,
        ..GenConfig::default()
    });
    let produced = conditioner.produce(&mut source).unwrap();
    assert_eq!(produced.len(), 300);
}

#[test]
fn conditioner_output_is_not_constant_across_frames() {
    let mut source = FakeSource::new(10);
    let mut conditioner = Conditioner::new(GenConfig {
        bytes_total: 32 * 10,
        ..GenConfig::default()
    });
    let produced = conditioner.produce(&mut source).unwrap();
    let chunks: Vec<&[u8]> = produced.chunks(32).collect();
    let distinct = chunks
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len();
    assert!(distinct > 1, "every 32-byte digest chunk was identical");
}

#[test]
fn conditioner_rewinds_single_frame_source_to_keep_producing() {
    // A one-frame source can't satisfy a multi-frame request without
    // rewinding; confirm the linear path loops instead of stalling.
    let mut source = FakeSource::new(1);
    let mut conditioner = Conditioner::new(GenConfig {
        bytes_total: 96,
        ..GenConfig::default()
    });
    let produced = conditioner.produce(&mut source).unwrap();
    assert_eq!(produced.len(), 96);
}

/// Synthetic seekable source, identical frames so any output variation
/// traces back to the conditioner's permutation/header mixing rather
/// than frame content.
struct FakeSeekableSource {
    frame: Frame,
}

impl FakeSeekableSource {
    fn new() -> Self {
        Self {
            frame: Frame {
                width: 8,
                height: 8,
                bgr: vec![42u8; 8 * 8 * 3],
            },
        }
    }
}

impl VideoSource for FakeSeekableSource {
    fn read(&mut self) -> Option<Frame> {
        Some(self.frame.clone())
    }

    fn rewind(&mut self) {}

    fn release(&mut self) {}

    fn seekable(&self) -> bool {
        true
    }
}

impl SeekableVideoSource for FakeSeekableSource {
    fn frame_count(&self) -> i64 {
        4
    }

    fn read_at(&mut self, _index: i64) -> Option<Frame> {
        Some(self.frame.clone())
    }
}

#[test]
fn two_permutation_passes_over_a_seekable_source_differ() {
    // 4 frames per pass, 32-byte digests: request enough bytes to span
    // two full passes and confirm the second pass's digests aren't a
    // repeat of the first, since each pass gets a fresh epoch salt and
    // permutation.
    let mut source = FakeSeekableSource::new();
    let mut conditioner = Conditioner::new(GenConfig {
        bytes_total: 32 * 8,
        ..GenConfig::default()
    });
    let produced = conditioner.produce_seekable(&mut source).unwrap();
    let first_pass = &produced[..32 * 4];
    let second_pass = &produced[32 * 4..];
    assert_ne!(first_pass, second_pass, "second permutation pass repeated the first");
}

#[test]
fn queue_and_drbg_round_trip() {
    let mut queue = ByteQueue::new(64);
    let accepted = queue.offer(&[1u8; 100]);
    assert_eq!(accepted, 64);
    assert_eq!(queue.available(), 64);

    let seed = queue.poll(64);
    // DRBG requires >= 32 bytes of seed; the queue happily hands back
    // fewer if that's all it has, so pad with a second source here.
    let mut material = seed;
    material.extend_from_slice(&[9u8; 32]);
    let mut drbg = ChaChaDrbg::new(&material).unwrap();

    let first = drbg.generate(256);
    let second = drbg.generate(256);
    assert_eq!(first.len(), 256);
    assert_eq!(second.len(), 256);
    assert_ne!(first, second, "consecutive DRBG draws must not repeat");
}

#[tokio::test]
async fn pipeline_boots_on_urandom_and_serves_rng_bytes() {
    let cfg = Config {
        allow_urandom: true,
        boot_bytes: 256,
        reseed_interval_bytes: 1_000_000,
        ..Config::default()
    };
    let pipeline = Pipeline::boot(cfg).await.unwrap();

    let mut provider = pipeline.seed_provider();
    let bytes = {
        let rng_handle = pipeline.rng();
        let mut rng = rng_handle.lock().await;
        rng.random_bytes(512, &mut provider)
    };
    assert_eq!(bytes.len(), 512);

    let n = {
        let rng_handle = pipeline.rng();
        let mut rng = rng_handle.lock().await;
        rng.randint(0, 9, &mut provider).unwrap()
    };
    assert!((0..=9).contains(&n));

    pipeline.shutdown().await;
}
