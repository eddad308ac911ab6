//! Drive one compute through a full session lifecycle.
//!
//! Run with: cargo run -p compute-cli -- <policy-path> <transport-url> [camera...]
//!
//! The inference server is taken from `INFERENCE_SERVER_URL`
//! (default http://localhost:8001).

use std::time::Duration;

use anyhow::{Context, bail};
use remote_compute_core::{ManagerConfig, OperationOutcome, SessionConfig};
use remote_compute_manager::ComputeManager;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STATUS_POLLS: usize = 5;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

fn print_outcome<T: Serialize>(step: &str, outcome: &OperationOutcome<T>) {
    match serde_json::to_string_pretty(outcome) {
        Ok(json) => println!("{step}: {json}"),
        Err(e) => tracing::error!("Failed to serialize {step} outcome: {e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(policy_path), Some(transport_url)) = (args.next(), args.next()) else {
        bail!("usage: compute-cli <policy-path> <transport-url> [camera...]");
    };
    let mut cameras: Vec<String> = args.collect();
    if cameras.is_empty() {
        cameras.push("front".to_string());
    }

    let config = ManagerConfig::from_env().context("reading configuration")?;
    let manager = ComputeManager::from_config(&config).context("building manager")?;

    let health = manager.check_server_health().await;
    print_outcome("health", &OperationOutcome::from(health));

    let compute = manager.create_compute(None, None, None).await?;
    let session = SessionConfig::new(
        format!("{}-session", compute.id),
        policy_path,
        cameras,
        transport_url,
    );

    let created = manager.create_session(&compute.id, session).await;
    let ready = created.is_ok();
    print_outcome("create_session", &OperationOutcome::from(created));

    if ready {
        let started = manager.start_session(&compute.id).await;
        print_outcome("start_session", &OperationOutcome::from(started));

        for _ in 0..STATUS_POLLS {
            tokio::select! {
                () = tokio::time::sleep(POLL_INTERVAL) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, tearing down");
                    break;
                }
            }
            let status = manager.get_session_status(&compute.id).await;
            print_outcome("session_status", &OperationOutcome::from(status));
        }

        let stopped = manager.stop_session(&compute.id).await;
        print_outcome("stop_session", &OperationOutcome::from(stopped));
    }

    let report = manager.destroy().await;
    print_outcome("destroy", &OperationOutcome::ok(report));

    Ok(())
}
