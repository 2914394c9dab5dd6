//! Display Organizer session client binary.
//!
//! Takes a scanned QR payload on the command line, joins the referenced
//! session, and drives it: polls the session state while connected, streams
//! captures while calibrating, and ends the session on completion, fault, or
//! Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use organizer_client::application::{drive_session, ConnectionLifecycle, Stage};
use organizer_client::infrastructure::api::{HttpSessionApi, Transport};
use organizer_client::infrastructure::capture::MockCaptureSource;
use organizer_client::infrastructure::storage::{config_file_path, load_config, save_config};

/// Pairs this device with a Display Organizer session and streams captures
/// into it until the session settles.
#[derive(Debug, Parser)]
#[command(name = "organizer-client", version)]
struct Cli {
    /// Raw payload of the scanned QR code: the session prefix followed by the
    /// session UUID.
    #[arg(value_name = "QR_PAYLOAD")]
    qr_payload: String,

    /// Override the bridge base URL from the config file.
    #[arg(long, env = "ORGANIZER_BASE_URL")]
    base_url: Option<String>,

    /// Override the bearer credential from the config file.
    #[arg(long, env = "ORGANIZER_AUTH_TOKEN")]
    auth_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = load_config().context("loading configuration")?;
    // First run: persist the defaults so there is a file to put the token in.
    if let Ok(path) = config_file_path() {
        if !path.exists() {
            if let Err(e) = save_config(&config) {
                warn!("could not write default config to {}: {e}", path.display());
            }
        }
    }
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if let Some(token) = cli.auth_token {
        config.api.auth_token = token;
    }
    if config.api.auth_token.is_empty() {
        anyhow::bail!(
            "no bearer credential configured; set [api].auth_token in the config file \
             or pass --auth-token / ORGANIZER_AUTH_TOKEN"
        );
    }

    info!("session client starting against {}", config.api.base_url);

    let transport = Transport::new(
        &config.api.base_url,
        &config.api.auth_token,
        Duration::from_secs(config.api.request_timeout_secs),
    )
    .context("building HTTP transport")?;
    let lifecycle = Arc::new(ConnectionLifecycle::with_qr_prefix(
        HttpSessionApi::new(transport),
        config.session.qr_prefix.clone(),
    ));

    if !lifecycle.handle_scan(&cli.qr_payload).await {
        anyhow::bail!("the given payload is not a Display Organizer session reference");
    }

    // Ctrl-C plays the role of the app leaving the foreground: the session is
    // ended best-effort and the machine resets to idle, which stops the driver.
    {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                lifecycle.handle_visibility(false).await;
            }
        });
    }

    // The camera is presentation-side hardware; the binary stands in a canned
    // frame source so the full submission path still runs end to end.
    let source = MockCaptureSource::sample_camera();
    let final_stage = drive_session(
        Arc::clone(&lifecycle),
        &source,
        Duration::from_millis(config.session.poll_interval_ms),
        Duration::from_millis(config.session.capture_interval_ms),
    )
    .await;

    if final_stage == Stage::Faulted {
        if let Some(fault) = lifecycle.session().await.last_fault {
            warn!("session faulted: {}", fault.message);
        }
        lifecycle.end().await;
        anyhow::bail!("session ended with a fault");
    }

    lifecycle.end().await;
    info!("session client stopped in stage {final_stage}");
    Ok(())
}
