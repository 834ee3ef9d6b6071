// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `ripple-host` binary: resolve prefs, bind the socket, serve until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ripple_app_core::config::ConfigService;
use ripple_config_fs::FsConfigStore;
use ripple_demos::DemoApp;
use ripple_host::{serve, HostPrefs, Hub, HOST_PREFS_KEY};
use tokio::net::UnixListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ripple card app host")]
struct Args {
    /// Unix socket to listen on (overrides saved prefs)
    #[arg(long)]
    socket: Option<PathBuf>,
    /// App to serve: theme-switch or image-augmentation (overrides saved prefs)
    #[arg(long)]
    app: Option<DemoApp>,
}

fn load_prefs() -> HostPrefs {
    // Config is best-effort; a broken config dir still lets the host start.
    match FsConfigStore::new().map(ConfigService::new) {
        Ok(config) => config.load_or_init(HOST_PREFS_KEY).unwrap_or_else(|err| {
            warn!(?err, "could not load host prefs; using defaults");
            HostPrefs::default()
        }),
        Err(err) => {
            warn!(?err, "no config dir; using default host prefs");
            HostPrefs::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut prefs = load_prefs();
    if let Some(socket) = args.socket {
        prefs.socket_path = socket.display().to_string();
    }
    if let Some(app) = args.app {
        prefs.app = app;
    }

    // Remove stale socket if present
    let _ = std::fs::remove_file(&prefs.socket_path);
    let listener = UnixListener::bind(&prefs.socket_path)?;
    let hub = Arc::new(Hub::new(prefs.app.factory()));
    info!(app = hub.app_name(), socket = %prefs.socket_path, "ripple host listening");

    tokio::select! {
        res = serve(listener, hub) => res?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    let _ = std::fs::remove_file(&prefs.socket_path);
    Ok(())
}
