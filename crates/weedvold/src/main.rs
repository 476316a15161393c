//! weedvold - SeaweedFS volume plugin daemon.
//!
//! Serves the Docker volume plugin protocol on a Unix socket.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::UnixListener;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use weedvol::{DriverConfig, VolumeDriver};

mod api;

const DEFAULT_SOCKET: &str = "/run/docker/plugins/seaweedfs.sock";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory for mountpoints and state
    #[arg(long, env = "WEEDVOL_ROOT", default_value = "/mnt")]
    root: PathBuf,

    /// Plugin socket to listen on
    #[arg(long, env = "WEEDVOL_SOCKET", default_value = DEFAULT_SOCKET)]
    socket: PathBuf,

    /// SeaweedFS binary used to mount volumes
    #[arg(long, env = "WEEDVOL_MOUNT_BINARY", default_value = "weed")]
    mount_binary: PathBuf,

    /// Enable debug logging
    #[arg(
        long,
        env = "DEBUG",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();

    let config = DriverConfig::default()
        .with_root(&args.root)
        .with_mount_binary(&args.mount_binary);
    config
        .paths
        .create_dirs()
        .wrap_err_with(|| format!("failed to prepare {}", args.root.display()))?;

    let driver = Arc::new(VolumeDriver::open(config)?);

    let listener = bind(&args.socket).await?;
    tracing::info!(socket = %args.socket.display(), "weedvold listening");

    axum::serve(listener, api::app(driver))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = tokio::fs::remove_file(&args.socket).await {
        tracing::debug!(error = %e, "Socket already gone");
    }
    Ok(())
}

/// Bind the plugin socket, replacing a stale one.
async fn bind(socket: &Path) -> Result<UnixListener> {
    if let Some(parent) = socket.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::remove_file(socket).await {
        Ok(()) => tracing::debug!(socket = %socket.display(), "Removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    UnixListener::bind(socket).wrap_err_with(|| format!("failed to bind {}", socket.display()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["weedvold"]).unwrap();
        assert_eq!(args.socket, PathBuf::from(DEFAULT_SOCKET));
        assert_eq!(args.mount_binary, PathBuf::from("weed"));
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "weedvold",
            "--root",
            "/srv/weedvol",
            "--socket",
            "/tmp/weedvol.sock",
            "--debug",
        ])
        .unwrap();
        assert_eq!(args.root, PathBuf::from("/srv/weedvol"));
        assert_eq!(args.socket, PathBuf::from("/tmp/weedvol.sock"));
        assert!(args.debug);
    }

    #[test]
    #[allow(unsafe_code)]
    fn debug_toggle_from_environment() {
        // SAFETY: no other test in this binary sets DEBUG or asserts on its effect.
        unsafe { std::env::set_var("DEBUG", "1") };
        assert!(Args::try_parse_from(["weedvold"]).unwrap().debug);

        unsafe { std::env::set_var("DEBUG", "0") };
        assert!(!Args::try_parse_from(["weedvold"]).unwrap().debug);

        unsafe { std::env::set_var("DEBUG", "") };
        assert!(!Args::try_parse_from(["weedvold"]).unwrap().debug);

        unsafe { std::env::remove_var("DEBUG") };
    }

    #[tokio::test]
    async fn bind_replaces_stale_socket() {
        let temp = tempfile::tempdir().unwrap();
        let socket = temp.path().join("run/plugins/weedvol.sock");

        let first = bind(&socket).await.unwrap();
        drop(first);
        assert!(socket.exists());

        let _second = bind(&socket).await.unwrap();
        assert!(socket.exists());
    }
}
