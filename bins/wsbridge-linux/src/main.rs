mod host;
mod storage;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsbridge_client::{ConnectionSupervisor, SupervisorOptions};
use wsbridge_core::{ConfigHandlers, EndpointConfig};
use wsbridge_protocol::{codec::decode_action_options, VARIABLE_FEEDBACK};

use crate::host::{interpolate, LoggingHost};
use crate::storage::FileConfigStorage;

/// Bridge a WebSocket endpoint to host variables.
///
/// Every line read from stdin is sent as a command.
#[derive(Debug, Parser)]
#[command(name = "wsbridge", version, about)]
struct Args {
    /// Instance document holding `config`, `feedbacks` and `label`.
    #[arg(short, long, default_value = "wsbridge.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,wsbridge_client=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let storage = FileConfigStorage::new(&args.config);

    let config: EndpointConfig = ConfigHandlers::load_upgraded(&storage)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let label = storage.load_label()?;
    let feedbacks = storage.load_feedbacks()?;

    tracing::info!("wsbridge starting as '{}'", label);

    let (host, store) = LoggingHost::new(&label);
    let (handle, supervisor) = ConnectionSupervisor::new(host, SupervisorOptions::default()).spawn();

    for feedback in feedbacks {
        if feedback.feedback_type != VARIABLE_FEEDBACK {
            tracing::warn!("Skipping unknown feedback type '{}'", feedback.feedback_type);
            continue;
        }
        handle
            .subscribe(
                feedback.id.as_str(),
                &feedback.options.variable,
                &feedback.options.subpath,
            )
            .await?;
    }
    handle.configure(config).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    let options = decode_action_options(serde_json::json!({ "data": line }))?;
                    let command = match store.read() {
                        Ok(store) => interpolate(&options.data, &label, &store),
                        Err(_) => options.data,
                    };
                    let handle = handle.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle.send_command(&command).await {
                            tracing::error!("Command failed: {}", e);
                        }
                    });
                }
                None => {
                    tracing::info!("stdin closed, shutting down...");
                    break;
                }
            },
        }
    }

    handle.destroy().await?;
    drop(handle);
    supervisor.await?;

    tracing::info!("wsbridge stopped");
    Ok(())
}
