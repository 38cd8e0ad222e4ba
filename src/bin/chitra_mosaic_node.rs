//! chitra-mosaic-node daemon
//!
//! Runs the live mosaicking pipeline against a simulated bench: a scripted
//! stage raster over a synthetic specimen texture. Useful for development
//! and demos without stage or camera hardware.
//!
//! # Usage
//!
//! ```bash
//! # With defaults
//! cargo run --bin chitra-mosaic-node
//!
//! # With a config file and output override
//! cargo run --bin chitra-mosaic-node -- --config mosaic.toml --output /tmp/mosaic.png
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;

use chitra_mosaic::io::SimBenchConfig;
use chitra_mosaic::{MosaicConfig, MosaicPipeline, SimBench, new_shared_mosaic};

#[derive(Parser)]
#[command(version, about)]
struct NodeCli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the composite export path
    #[arg(short, long)]
    output: Option<String>,

    /// Spacing of the simulated scan path in stage units
    #[arg(long, default_value_t = 120.0)]
    sim_step: f32,

    /// Rows of the simulated serpentine scan
    #[arg(long, default_value_t = 5)]
    sim_rows: u32,

    /// Simulation texture seed
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let cli = NodeCli::parse();

    let mut config = match &cli.config {
        Some(path) => match MosaicConfig::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::error!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => MosaicConfig::default(),
    };
    if let Some(output) = cli.output {
        config.export.map_path = output;
    }

    // The trigger distance must sit below the simulated step spacing or no
    // waypoint after the first would ever capture.
    config.sampler.capture_distance = cli.sim_step * 0.8;
    config.sampler.poll_interval_ms = config.sampler.poll_interval_ms.min(50);

    log::info!("chitra-mosaic-node starting...");
    log::info!("  export path: {}", config.export.map_path);
    log::info!("  trigger distance: {}", config.sampler.capture_distance);
    log::info!("  queue bound: {:?}", config.queue.capacity);

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    // Simulated bench
    let bench = SimBench::new(SimBenchConfig {
        seed: cli.seed,
        ..SimBenchConfig::default()
    });
    let path = bench.raster_path(cli.sim_step, cli.sim_rows);
    log::info!("  simulated scan: {} waypoints", path.len());
    let (stage, camera) = bench.links(path);

    let shared = new_shared_mosaic();
    let pipeline = MosaicPipeline::spawn(
        config,
        Box::new(stage),
        Box::new(camera),
        shared.clone(),
        running.clone(),
    );

    // Report progress until shutdown.
    let mut last_placed = 0u64;
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_secs(1));
        let snapshot = match shared.read() {
            Ok(guard) => guard.clone(),
            Err(_) => break,
        };
        if snapshot.status.frames_placed != last_placed {
            last_placed = snapshot.status.frames_placed;
            let (h, w) = snapshot.status.canvas_size;
            log::info!(
                "mosaic: {} placed, {} dropped, canvas {}x{} at ({}, {})",
                snapshot.status.frames_placed,
                snapshot.status.frames_dropped,
                w,
                h,
                snapshot.corner.x,
                snapshot.corner.y
            );
        }
    }

    pipeline.join();
    log::info!("chitra-mosaic-node shutdown complete");
}
