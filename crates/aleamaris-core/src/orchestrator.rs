//! Boot, background filler/reseed tasks, and seed-provider plumbing
//! tying the conditioner, byte queue, and RNG together into one running
//! service.
//!
//! Each call into the Conditioner opens its own, short-lived
//! [`VideoSource`] and releases it when done — one producing session
//! per call, never shared across tasks, matching the ownership rule in
//! this crate's concurrency model. The byte queue is guarded by a plain
//! `std::sync::Mutex`: every operation on it is an in-memory `VecDeque`
//! splice, never held across an `.await`, so there's no benefit to an
//! async-aware lock. Conditioner runs themselves are CPU-bound and
//! shelled out to `ffmpeg`, so the background tasks dispatch them
//! through `tokio::task::spawn_blocking` to keep the executor free.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;

use crate::conditioning::{Conditioner, GenConfig};
use crate::config::Config;
use crate::error::{AleaMarisError, Result};
use crate::queue::ByteQueue;
use crate::rng::{AleaMarisRng, SeedProvider};
use crate::video::camera::CameraVideoSource;
use crate::video::file::FileVideoSource;
use crate::video::VideoSource;

fn os_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    getrandom::fill(&mut buf).expect("OS CSPRNG failed");
    buf
}

/// Run one Conditioner session against whichever video source `cfg`
/// names. Blocking — call from a worker thread when invoked off the
/// async executor.
fn produce_from_config(cfg: &Config, want: usize) -> Result<Vec<u8>> {
    let gen_cfg = GenConfig {
        bytes_total: want,
        ..GenConfig::default()
    };
    let mut conditioner = Conditioner::new(gen_cfg);

    if let Some(path) = cfg.video_path.as_deref() {
        let mut source = FileVideoSource::open(path)?;
        return if source.seekable() {
            conditioner.produce_seekable(&mut source)
        } else {
            conditioner.produce(&mut source)
        };
    }

    if cfg.use_cam {
        let mut source = CameraVideoSource::open(cfg.cam_index)?;
        return conditioner.produce(&mut source);
    }

    Err(AleaMarisError::SourceUnavailable(
        "no video path or camera configured".to_string(),
    ))
}

/// Attempt a Conditioner session synchronously, falling back to OS
/// entropy when allowed and the Conditioner failed or fell short. Used
/// by [`QueueBackedSeedProvider`], which must stay synchronous to
/// satisfy [`SeedProvider`].
fn synthesize_blocking(cfg: &Config, want: usize) -> Vec<u8> {
    match produce_from_config(cfg, want) {
        Ok(bytes) if bytes.len() >= want => bytes,
        Ok(mut bytes) if cfg.allow_urandom => {
            let short = want - bytes.len();
            bytes.extend(os_bytes(short));
            bytes
        }
        Ok(bytes) => bytes,
        Err(err) if cfg.allow_urandom => {
            eprintln!("conditioner session failed ({err}), falling back to OS entropy");
            os_bytes(want)
        }
        Err(err) => {
            eprintln!("conditioner session failed ({err}), no fallback configured");
            Vec::new()
        }
    }
}

/// Same fallback chain as [`synthesize_blocking`], but run off the
/// async executor via `spawn_blocking` — used by the filler task and
/// boot, which run on the Tokio runtime and must not stall it.
async fn synthesize(cfg: Config, want: usize) -> Vec<u8> {
    tokio::task::spawn_blocking(move || synthesize_blocking(&cfg, want))
        .await
        .unwrap_or_default()
}

/// State the seed provider, filler task, and reseed task all pull from.
#[derive(Debug)]
struct Shared {
    queue: StdMutex<ByteQueue>,
    config: Config,
}

/// Serves seed material per the orchestrator's seed-provider contract:
/// queue first, Conditioner next, OS bytes last (only when configured
/// to allow it).
pub struct QueueBackedSeedProvider {
    shared: Arc<Shared>,
}

impl SeedProvider for QueueBackedSeedProvider {
    fn provide(&mut self, n: usize) -> Vec<u8> {
        {
            let mut queue = self.shared.queue.lock().unwrap();
            if queue.available() >= n {
                return queue.poll(n);
            }
        }
        synthesize_blocking(&self.shared.config, n)
    }
}

/// Running entropy service: byte queue, buffered RNG, and the
/// background tasks that keep both topped up.
#[derive(Debug)]
pub struct Pipeline {
    shared: Arc<Shared>,
    rng: Arc<AsyncMutex<AleaMarisRng>>,
    cancel: Arc<AtomicBool>,
    notify: Arc<Notify>,
    filler: Option<JoinHandle<()>>,
    reseed: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Boot the pipeline: fill the queue to `config.boot_bytes`,
    /// construct the RNG from the queue/Conditioner/OS chain, and start
    /// the filler and reseed background tasks.
    pub async fn boot(config: Config) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: StdMutex::new(ByteQueue::new(config.raw_cap)),
            config: config.clone(),
        });

        let boot_bytes = synthesize(config.clone(), config.boot_bytes).await;
        if boot_bytes.is_empty() && !config.allow_urandom {
            return Err(AleaMarisError::NoEntropySource);
        }
        shared.queue.lock().unwrap().offer(&boot_bytes);

        let mut provider = QueueBackedSeedProvider {
            shared: shared.clone(),
        };
        let rng = AleaMarisRng::new(&mut provider, config.reseed_interval_bytes)?;
        let rng = Arc::new(AsyncMutex::new(rng));

        let cancel = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());

        let filler = tokio::spawn(filler_task(shared.clone(), cancel.clone(), notify.clone()));
        let reseed = tokio::spawn(reseed_task(
            shared.clone(),
            rng.clone(),
            cancel.clone(),
            notify.clone(),
        ));

        Ok(Self {
            shared,
            rng,
            cancel,
            notify,
            filler: Some(filler),
            reseed: Some(reseed),
        })
    }

    pub fn queue(&self) -> &StdMutex<ByteQueue> {
        &self.shared.queue
    }

    pub fn rng(&self) -> Arc<AsyncMutex<AleaMarisRng>> {
        self.rng.clone()
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn seed_provider(&self) -> QueueBackedSeedProvider {
        QueueBackedSeedProvider {
            shared: self.shared.clone(),
        }
    }

    /// Cancel both background tasks and wait for them to observe it.
    pub async fn shutdown(mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        if let Some(h) = self.filler.take() {
            let _ = h.await;
        }
        if let Some(h) = self.reseed.take() {
            let _ = h.await;
        }
    }
}

async fn filler_task(shared: Arc<Shared>, cancel: Arc<AtomicBool>, notify: Arc<Notify>) {
    let interval = std::time::Duration::from_millis(shared.config.fill_interval_ms);
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = notify.notified() => {}
        }
        if cancel.load(Ordering::SeqCst) {
            return;
        }

        let available = shared.queue.lock().unwrap().available();
        if available >= shared.config.raw_low_watermark {
            continue;
        }
        let want = (shared.config.raw_high_watermark - available).min(shared.config.fill_chunk);
        if want == 0 {
            continue;
        }

        let bytes = synthesize(shared.config.clone(), want).await;
        if !bytes.is_empty() {
            shared.queue.lock().unwrap().offer(&bytes);
        }
    }
}

async fn reseed_task(
    shared: Arc<Shared>,
    rng: Arc<AsyncMutex<AleaMarisRng>>,
    cancel: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    let period = std::time::Duration::from_secs(shared.config.reseed_period_secs);
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = notify.notified() => {}
        }
        if cancel.load(Ordering::SeqCst) {
            return;
        }

        let bytes = {
            let mut queue = shared.queue.lock().unwrap();
            let polled = queue.poll(shared.config.reseed_bytes);
            if polled.is_empty() && shared.config.allow_urandom {
                os_bytes(shared.config.reseed_bytes)
            } else {
                polled
            }
        };

        if !bytes.is_empty() {
            rng.lock().await.reseed(&bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_bytes_returns_requested_length() {
        assert_eq!(os_bytes(32).len(), 32);
    }

    #[test]
    fn produce_from_config_without_any_source_is_unavailable() {
        let cfg = Config::default();
        let err = produce_from_config(&cfg, 64).unwrap_err();
        assert!(matches!(err, AleaMarisError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn boot_without_source_and_without_urandom_fails() {
        let cfg = Config::default();
        let err = Pipeline::boot(cfg).await.unwrap_err();
        assert_eq!(err, AleaMarisError::NoEntropySource);
    }

    #[tokio::test]
    async fn boot_without_source_but_with_urandom_succeeds() {
        let cfg = Config {
            allow_urandom: true,
            boot_bytes: 128,
            ..Config::default()
        };
        let pipeline = Pipeline::boot(cfg).await.unwrap();
        assert!(pipeline.queue().lock().unwrap().available() > 0);
        pipeline.shutdown().await;
    }
}
