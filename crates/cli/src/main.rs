use std::io::Read;
use std::path::PathBuf;
use std::{fs, process};

use anyhow::{Context, Result};
use clap::Parser;
use oraclet_engine::{Adapter, load_config_file};
use tracing::Level;

/// Off-chain external adapter: validates a request document, fans out to
/// the configured data providers, and prints the encoded wire result.
#[derive(Parser)]
#[command(name = "oraclet", version, about)]
struct Cli {
    /// Path to the adapter configuration (YAML or JSON).
    #[arg(short, long, default_value = "oraclet.yaml")]
    config: PathBuf,

    /// Path to the request JSON document, or '-' for stdin.
    #[arg(short, long, default_value = "-")]
    request: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config_file(&cli.config)?;
    let raw = read_request(&cli.request)?;
    let adapter = Adapter::with_http_transport(config)?;

    match adapter.handle(&raw).await {
        Ok(result) => {
            println!("{}", result.to_wire());
            Ok(())
        }
        Err(error) => {
            // The message travels back to the on-chain requester unmodified.
            eprintln!("{error}");
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .try_init();
}

fn read_request(source: &str) -> Result<serde_json::Value> {
    let content = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("read request from stdin")?;
        buffer
    } else {
        fs::read_to_string(source).with_context(|| format!("Failed to read request file: {source}"))?
    };
    serde_json::from_str(&content).context("request document is not valid JSON")
}
