//! sw-proxy-cli entry point.
//!
//! One-shot commands over the same worker and store the MCP server uses.
//! Worker state lives only as long as the process, so each command runs
//! its step directly against the durable cache store.

mod args;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use swproxy_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("swproxy_core=info,swproxy_client=info,sw_proxy_cli=info"),
        _ => EnvFilter::new("swproxy_core=debug,swproxy_client=debug,sw_proxy_cli=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let config = AppConfig::load_from(cli.config.as_deref())?;
    let proxy = commands::build_proxy(&config).await?;

    let output = match cli.command {
        Commands::Install => commands::install(&proxy).await?,
        Commands::Activate => commands::activate(&proxy).await?,
        Commands::Fetch(args) => commands::fetch(&proxy, args).await?,
        Commands::Caches => commands::caches(&proxy).await?,
    };
    println!("{output}");

    Ok(())
}
