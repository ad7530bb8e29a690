//! Environment-driven configuration.
//!
//! Every knob has a default and is overridable via an `ALEAMARIS_*`
//! environment variable, read once at startup — the CLI crate layers
//! flag overrides on top of this before the orchestrator boots.

use std::env;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => v != "0" && !v.eq_ignore_ascii_case("false"),
        Err(_) => default,
    }
}

/// Full runtime configuration for the entropy pipeline and HTTP boundary.
#[derive(Debug, Clone)]
pub struct Config {
    pub raw_cap: usize,
    pub boot_bytes: usize,
    pub allow_urandom: bool,

    pub video_path: Option<String>,
    pub cam_index: u32,
    pub use_cam: bool,

    pub raw_low_watermark: usize,
    pub raw_high_watermark: usize,
    pub fill_interval_ms: u64,
    pub fill_chunk: usize,

    pub reseed_period_secs: u64,
    pub reseed_bytes: usize,
    pub reseed_interval_bytes: u64,

    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_cap: 100_000_000,
            boot_bytes: 4096,
            allow_urandom: false,
            video_path: None,
            cam_index: 0,
            use_cam: false,
            raw_low_watermark: 2000,
            raw_high_watermark: 5000,
            fill_interval_ms: 200,
            fill_chunk: 500,
            reseed_period_secs: 120,
            reseed_bytes: 64,
            reseed_interval_bytes: 1_000_000,
            api_key: None,
        }
    }
}

impl Config {
    /// Build configuration from `ALEAMARIS_*` environment variables,
    /// falling back to the documented defaults for anything unset or
    /// unparsable.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            raw_cap: env_or("ALEAMARIS_RAW_CAP", default.raw_cap),
            boot_bytes: env_or("ALEAMARIS_BOOT_BYTES", default.boot_bytes),
            allow_urandom: env_bool("ALEAMARIS_ALLOW_URANDOM", default.allow_urandom),
            video_path: env::var("ALEAMARIS_VIDEO").ok().filter(|s| !s.is_empty()),
            cam_index: env_or("ALEAMARIS_CAM", default.cam_index),
            use_cam: env_bool("ALEAMARIS_USE_CAM", default.use_cam),
            raw_low_watermark: env_or("ALEAMARIS_RAW_LOW_WM", default.raw_low_watermark),
            raw_high_watermark: env_or("ALEAMARIS_RAW_HIGH_WM", default.raw_high_watermark),
            fill_interval_ms: env_or("ALEAMARIS_FILL_INTERVAL_MS", default.fill_interval_ms),
            fill_chunk: env_or("ALEAMARIS_FILL_CHUNK", default.fill_chunk),
            reseed_period_secs: env_or("ALEAMARIS_RESEED_PERIOD", default.reseed_period_secs),
            reseed_bytes: env_or("ALEAMARIS_RESEED_BYTES", default.reseed_bytes),
            reseed_interval_bytes: env_or(
                "ALEAMARIS_RESEED_INTERVAL_BYTES",
                default.reseed_interval_bytes,
            ),
            api_key: env::var("ALEAMARIS_API_KEY").ok().filter(|s| !s.is_empty()),
        }
    }
}
