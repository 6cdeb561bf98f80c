use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod cache;
mod config;
mod metrics;
mod server;
mod store;

use config::Config;
use server::HttpServer;

#[derive(Parser)]
#[command(name = "omniserve")]
#[command(about = "A general-purpose HTTP file and JSON server written in Rust")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[arg(short, long, default_value = "config.json")]
    config: String,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = Config::load(&args.config).unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        info!("Using default configuration");
        Config::default()
    });

    let server = HttpServer::new(Arc::new(config))?;
    server.run().await?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "omniserve=debug"
    } else {
        "omniserve=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}
