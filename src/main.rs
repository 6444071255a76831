use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sidecar_monitor::baseline::store::BaselineStore;
use sidecar_monitor::client::TelemetryClient;
use sidecar_monitor::config::{Config, ConfigOverrides};
use sidecar_monitor::drift::detector::DriftDetector;
use sidecar_monitor::drift::DriftScore;
use sidecar_monitor::output::render_json;
use sidecar_monitor::output::table::{render_baseline_table, render_drift_table};
use sidecar_monitor::scoring::Label;
use sidecar_monitor::server::run_server;
use sidecar_monitor::telemetry::Observation;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "sidecar-monitor",
    about = "Drift, classification quality and host metrics for a deployed model"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, env = "BASELINE_PATH")]
    baseline: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve /track and /metrics.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Push one observation to a running sidecar.
    Push {
        #[arg(long)]
        features: String,
        #[arg(long)]
        prediction: u8,
        #[arg(long)]
        actual: Option<u8>,
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Score a batch of values against the baseline drift column.
    Drift {
        #[arg(long)]
        values: String,
    },
    /// Summarise the baseline table.
    Baseline,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Serialize)]
struct DriftReport {
    column: String,
    live_values: usize,
    drift_score: DriftScore,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let (host, port, endpoint) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port, None),
        Commands::Push { endpoint, .. } => (None, None, endpoint.clone()),
        _ => (None, None, None),
    };
    config.apply_overrides(ConfigOverrides {
        baseline_path: cli.baseline.clone(),
        host,
        port,
        endpoint,
    });

    match &cli.command {
        Commands::Serve { .. } => {
            let bind = format!("{}:{}", config.server.host, config.server.port);
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, addr).await?;
        }
        Commands::Push {
            features,
            prediction,
            actual,
            ..
        } => {
            let observation = Observation {
                features: parse_number_list(features)?,
                prediction: parse_label(*prediction)?,
                actual: actual.map(parse_label).transpose()?,
            };
            let client = TelemetryClient::new(config.client.endpoint.clone(), config.client_timeout())?;
            client.push(&observation).await?;
            info!("observation tracked by {}", client.endpoint());
        }
        Commands::Drift { values } => {
            let live = parse_number_list(values)?;
            let store = BaselineStore::load(&config.resolved_baseline_path())?;
            let column = config.drift_column();
            let detector = DriftDetector::new(&store, column.clone(), config.drift.column_index)?;
            let report = DriftReport {
                column: column.to_string(),
                live_values: live.len(),
                drift_score: detector.score(&live),
            };
            match cli.output {
                OutputFormat::Table => println!(
                    "{}",
                    render_drift_table(&report.column, report.live_values, report.drift_score)
                ),
                OutputFormat::Json => println!("{}", render_json(&report)?),
            }
        }
        Commands::Baseline => {
            let store = BaselineStore::load(&config.resolved_baseline_path())?;
            let summary = store.distribution().summarize();
            match cli.output {
                OutputFormat::Table => println!("{}", render_baseline_table(&summary)),
                OutputFormat::Json => println!("{}", render_json(&summary)?),
            }
        }
        Commands::Config { init, show } => {
            if *init {
                Config::write_template(&config_path)?;
                println!("Wrote config template to {}", config_path.display());
            }
            if *show || !*init {
                println!("{}", render_json(&config)?);
            }
        }
    }

    Ok(())
}

fn parse_number_list(raw: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for piece in raw.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(
            trimmed
                .parse::<f64>()
                .with_context(|| format!("not a number: {trimmed:?}"))?,
        );
    }
    Ok(out)
}

fn parse_label(raw: u8) -> Result<Label> {
    Label::try_from(raw).map_err(|e| anyhow!(e))
}
