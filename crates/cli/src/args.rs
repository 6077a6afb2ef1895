//! CLI argument definitions using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// sw-proxy-cli - drive the caching proxy from the shell
///
/// Each invocation runs one lifecycle step against the durable cache store.
#[derive(Parser, Debug)]
#[command(name = "sw-proxy-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SW_PROXY_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Precache the current generation
    Install,

    /// Delete every cache generation except the current one
    Activate,

    /// Fetch a URL or origin-relative path through the proxy
    Fetch(FetchArgs),

    /// List cache generations and their entries
    Caches,
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path such as /index.html
    pub url: String,

    /// Treat the request as a page navigation (network-first)
    #[arg(long)]
    pub navigate: bool,

    /// Request header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Print the response body instead of a summary
    #[arg(long)]
    pub body: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got {raw}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
