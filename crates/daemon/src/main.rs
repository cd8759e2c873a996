// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! printerd: print service daemon shell around the lifecycle engine.
//!
//! The bus binding and the udev bridge attach here; the engine itself only
//! sees posted events and method invocations.

use clap::Parser;
use pd_engine::{DeviceScanner, Engine, EngineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "printerd", about = "Print service daemon", version)]
struct Args {
    /// Directory holding scheme-named device backends
    #[arg(long, default_value = "/usr/lib/cups/backend")]
    backend_dir: PathBuf,

    /// Content-arranging filter run ahead of the backend
    #[arg(long, default_value = "/usr/lib/cups/filter/pstops")]
    arranger: PathBuf,

    /// Spool directory (defaults to the system temp dir)
    #[arg(long)]
    spool_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (engine, runtime) = Engine::new(EngineConfig {
        backend_dir: args.backend_dir,
        arranger: args.arranger,
        spool_dir: args.spool_dir,
    });

    // The udev bridge feeds USB uevents through this sender; it replays
    // already-present devices on startup.
    let (uevent_tx, uevent_rx) = tokio::sync::mpsc::channel(64);
    let scanner = DeviceScanner::new(engine.events());
    tokio::spawn(scanner.run(uevent_rx));

    let control_loop = tokio::spawn(runtime.run());
    tracing::info!("printerd engine running");

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to wait for shutdown signal");
    }
    tracing::info!("shutting down");
    drop(uevent_tx);
    control_loop.abort();
}
