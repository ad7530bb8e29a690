//! CLI for AleaMaris — turns a camera or video file into an HTTP entropy service.

mod commands;

use clap::Parser;

/// Overrides layered on top of `ALEAMARIS_*` environment variables —
/// any flag left unset falls through to `Config::from_env()`.
#[derive(Parser)]
#[command(name = "aleamaris")]
#[command(about = "AleaMaris — randomness distilled from what a camera actually sees")]
#[command(version = aleamaris_core::VERSION)]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Path to a video file to condition (mutually exclusive with --cam)
    #[arg(long)]
    video: Option<String>,

    /// Camera index to condition from
    #[arg(long)]
    cam: Option<u32>,

    /// Permit OS entropy as a fallback when the video/camera source is
    /// unavailable or runs short
    #[arg(long)]
    allow_urandom: bool,

    /// Initial queue fill target in bytes
    #[arg(long)]
    boot_bytes: Option<usize>,

    /// Queue capacity ceiling in bytes
    #[arg(long)]
    raw_cap: Option<usize>,

    /// Required `X-API-Key` value for POST /trng/ingest
    #[arg(long)]
    api_key: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let mut config = aleamaris_core::config::Config::from_env();

    if let Some(video) = cli.video {
        config.video_path = Some(video);
    }
    if let Some(cam) = cli.cam {
        config.cam_index = cam;
        config.use_cam = true;
    }
    if cli.allow_urandom {
        config.allow_urandom = true;
    }
    if let Some(boot_bytes) = cli.boot_bytes {
        config.boot_bytes = boot_bytes;
    }
    if let Some(raw_cap) = cli.raw_cap {
        config.raw_cap = raw_cap;
    }
    if let Some(api_key) = cli.api_key {
        config.api_key = Some(api_key);
    }

    commands::server::run(&cli.host, cli.port, config);
}
