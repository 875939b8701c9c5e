//! Equity research command line
//!
//! ```bash
//! # One-off analysis, configuration from .env / environment
//! stock-research analyze AAPL
//! stock-research analyze AAPL --json --log-format json
//!
//! # HTTP endpoint
//! stock-research serve --addr 0.0.0.0:8080
//! ```

mod http;

use anyhow::Context;
use clap::{Parser, Subcommand};
use research_stock::{ResearchConfig, ResearchPipeline, normalize_symbol};
use research_utils::{LogFormat, init_tracing};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stock-research", version)]
#[command(about = "Research a stock and produce a BUY/SELL/HOLD recommendation", long_about = None)]
struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline for one ticker symbol
    Analyze {
        /// Ticker symbol, e.g. AAPL
        symbol: Option<String>,

        /// Print the whole run as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the recommendation endpoint over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Analyze { symbol, json } => {
            // Rejected before configuration is loaded or any connection is made
            let symbol = match normalize_symbol(symbol.as_deref().unwrap_or_default()) {
                Ok(symbol) => symbol,
                Err(e) => {
                    eprintln!("error: {e}");
                    eprintln!("usage: stock-research analyze <SYMBOL>");
                    return Ok(ExitCode::FAILURE);
                }
            };
            analyze(&symbol, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { addr } => {
            serve(addr).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn build_pipeline() -> anyhow::Result<ResearchPipeline> {
    let config = ResearchConfig::from_env().context("failed to load configuration")?;
    ResearchPipeline::from_config(&config)
        .await
        .context("failed to set up the research pipeline")
}

async fn analyze(symbol: &str, json: bool) -> anyhow::Result<()> {
    let pipeline = build_pipeline().await?;
    let run = pipeline
        .execute(symbol)
        .await
        .with_context(|| format!("analysis of {symbol} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!(
            "{}: {} (score {:.0})\n",
            run.record.symbol, run.record.recommendation, run.record.score
        );
        println!("{}", run.record.report);
    }

    if !run.persisted {
        eprintln!("warning: the recommendation could not be saved");
    }
    Ok(())
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let pipeline = Arc::new(build_pipeline().await?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "listening");
    axum::serve(listener, http::router(pipeline))
        .await
        .context("server error")
}
