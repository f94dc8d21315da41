//! CLI application for scanning and keeping shopping receipts.

mod commands;
mod remote;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, receipts, scan, Context};

/// Last Price - scan receipts, fix them up, and keep them around
#[derive(Parser)]
#[command(name = "lastprice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding saved receipts
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a receipt image (or its text) into structured data
    Scan(scan::ScanArgs),

    /// Browse and manage saved receipts
    Receipts(receipts::ReceiptsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Scan(args) => {
            let ctx = Context::load(config_path, cli.data_dir)?;
            scan::run(args, &ctx).await
        }
        Commands::Receipts(args) => {
            let ctx = Context::load(config_path, cli.data_dir)?;
            receipts::run(args, &ctx).await
        }
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
