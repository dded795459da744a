//! coalesce CLI — operator interface to the debounce engine.

use coalesce_rs::config::{Config, EngineConfig};
use coalesce_rs::engine::{Consumer, Engine};
use coalesce_rs::forward::DashboardForwarder;
use coalesce_rs::ingest::{self, Disposition, InboundMessage, WebhookEnvelope};
use coalesce_rs::telemetry::{TelemetryConfig, init_telemetry};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "coalesce", about = "Debounce bursts of inbound chat messages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed newline-delimited webhook bodies through the engine
    Replay {
        /// File to read (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Company id for lines that do not carry a `company_id` field
        #[arg(long, default_value = "")]
        company_id: String,
        /// Print settled bursts to stdout instead of posting to the dashboard
        #[arg(long)]
        print: bool,
        /// Override the debounce gap in milliseconds
        #[arg(long)]
        gap_ms: Option<u64>,
    },
    /// Show the configuration loaded from the environment
    Config,
}

/// One replayed line: a webhook body plus the company it was addressed to.
#[derive(Deserialize)]
struct ReplayRecord {
    #[serde(default)]
    company_id: Option<String>,
    #[serde(flatten)]
    envelope: WebhookEnvelope,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            input,
            company_id,
            print,
            gap_ms,
        } => cmd_replay(input, company_id, print, gap_ms).await,
        Command::Config => cmd_config(),
    }
}

async fn cmd_replay(
    input: Option<PathBuf>,
    company_id: String,
    print: bool,
    gap_ms: Option<u64>,
) -> anyhow::Result<()> {
    // Printing needs no dashboard, so the full config is only required
    // when forwarding.
    let config = if print { None } else { Some(Config::from_env()?) };

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.as_ref().and_then(|c| c.otel_endpoint.clone()),
        service_name: "coalesce".to_string(),
        default_filter: config
            .as_ref()
            .map(|c| c.log_level.clone())
            .unwrap_or_else(|| "info".to_string()),
    })?;

    let mut engine_config = config.as_ref().map(|c| c.engine).unwrap_or_default();
    if let Some(ms) = gap_ms {
        engine_config = EngineConfig::new(Duration::from_millis(ms));
    }
    let engine = Engine::new(engine_config)?;

    let forwarder = match &config {
        Some(config) => Some(DashboardForwarder::new(&config.dashboard_url)?),
        None => None,
    };

    let ctrl = engine.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrl.shutdown();
    });

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let (mut accepted, mut ignored, mut rejected) = (0usize, 0usize, 0usize);
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let record: ReplayRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed line: {e}");
                rejected += 1;
                continue;
            }
        };
        let company = record.company_id.unwrap_or_else(|| company_id.clone());

        match ingest::route(record.envelope, &company) {
            Ok(Disposition::Accepted(message)) => {
                let consumer = match &forwarder {
                    Some(forwarder) => forwarder.consumer_for(&message),
                    None => printer(&message),
                };
                if engine.submit(&message.key, &message.text, consumer) {
                    accepted += 1;
                } else {
                    rejected += 1;
                }
            }
            Ok(Disposition::Ignored(reason)) => {
                info!(reason, "ignored webhook");
                ignored += 1;
            }
            Err(e) => {
                warn!("rejected webhook: {e}");
                rejected += 1;
            }
        }
    }

    info!(accepted, ignored, rejected, "input exhausted, waiting for bursts to settle");
    engine.drain().await;
    info!(keys = engine.len(), "all bursts settled");
    Ok(())
}

/// Consumer writing each settled burst as one JSON line.
fn printer(message: &InboundMessage) -> Arc<dyn Consumer> {
    let from = message.from.clone();
    let company_id = message.company_id.clone();
    Arc::new(move |payload: String, key: String| {
        let line = serde_json::json!({
            "key": key,
            "from": from,
            "companyId": company_id,
            "message": payload,
        });
        async move {
            println!("{line}");
            Ok::<(), anyhow::Error>(())
        }
    })
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let url = config.dashboard_url.expose_secret();
    let origin = url.split('?').next().unwrap_or(url);

    println!("Dashboard:  {origin}");
    println!("Gap:        {}ms", config.engine.gap.as_millis());
    println!(
        "OTLP:       {}",
        config.otel_endpoint.as_deref().unwrap_or("-")
    );
    println!("Log Level:  {}", config.log_level);
    Ok(())
}
