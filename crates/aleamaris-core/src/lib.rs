//! # aleamaris-core
//!
//! **Randomness distilled from what a camera actually sees.**
//!
//! `aleamaris-core` turns the pixel noise of a camera or video file into
//! cryptographically usable randomness: a keyed-whitening conditioner
//! turns frames into digests, digests feed a bounded byte queue, and a
//! ChaCha20 DRBG reseeded from that queue serves bulk bytes and unbiased
//! integers.
//!
//! ## Quick start
//!
//! ```no_run
//! use aleamaris_core::config::Config;
//! use aleamaris_core::orchestrator::Pipeline;
//!
//! # async fn run() -> aleamaris_core::error::Result<()> {
//! let pipeline = Pipeline::boot(Config::from_env()).await?;
//! let mut provider = pipeline.seed_provider();
//! let bytes = pipeline.rng().lock().await.random_bytes(256, &mut provider);
//! assert_eq!(bytes.len(), 256);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Video/camera → features → keyed-whitening conditioner → byte queue
//! → ChaCha20 DRBG → unbiased RNG sampler.
//!
//! The conditioner never runs unsupervised: every call opens its own
//! video handle and releases it before returning, so there is no
//! cross-task state beyond the byte queue and the RNG, both guarded by
//! locks the orchestrator owns.

pub mod conditioning;
pub mod config;
pub mod drbg;
pub mod error;
pub mod features;
pub mod orchestrator;
pub mod queue;
pub mod rng;
pub mod video;

pub use conditioning::{Conditioner, GenConfig};
pub use config::Config;
pub use drbg::ChaChaDrbg;
pub use error::{AleaMarisError, Result};
pub use orchestrator::Pipeline;
pub use queue::ByteQueue;
pub use rng::{AleaMarisRng, SeedProvider};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
