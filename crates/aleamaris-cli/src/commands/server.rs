use aleamaris_core::config::Config;
use aleamaris_core::orchestrator::Pipeline;

/// Boot the pipeline and serve it over HTTP until the process is killed.
pub fn run(host: &str, port: u16, config: Config) {
    let base = format!("http://{host}:{port}");

    println!("AleaMaris v{}", aleamaris_core::VERSION);
    println!("   {base}");
    if let Some(video) = &config.video_path {
        println!("   source: video file {video}");
    } else if config.use_cam {
        println!("   source: camera index {}", config.cam_index);
    } else if config.allow_urandom {
        println!("   source: none configured, falling back to OS entropy");
    } else {
        eprintln!("   warning: no video/camera source configured and ALEAMARIS_ALLOW_URANDOM is off");
    }
    println!();
    println!("   Endpoints:");
    println!("     POST /trng/ingest      Feed external entropy into the queue");
    println!("     GET  /trng/bytes       Raw queued bytes (count=1..4096)");
    println!("     GET  /trng/raw         Alias for /trng/bytes");
    println!("     GET  /trng/health      Queue availability");
    println!("     GET  /rng/bytes        DRBG bytes (count=1..1048576)");
    println!("     GET  /rng/ints         Unbiased integers in [min,max]");
    println!("     GET  /rng/u32.bin      Packed u32 stream");
    println!("     GET  /rng/u32.jsonl    Newline-delimited u32 stream");
    println!("     POST /rng/reseed       Force a DRBG reseed");
    println!("     GET  /rng/stats        Diagnostic counters");
    println!();
    println!("   Examples:");
    println!("     curl {base}/trng/health");
    println!("     curl {base}/rng/bytes?count=32 | xxd");
    println!("     curl '{base}/rng/ints?min=0&max=36&count=10'");
    println!();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let api_key = config.api_key.clone();
        match Pipeline::boot(config).await {
            Ok(pipeline) => aleamaris_server::run_server(pipeline, host, port, api_key).await,
            Err(err) => {
                eprintln!("fatal: {err}");
                std::process::exit(1);
            }
        }
    });
}
