//! Simply Online CLI - Database migrations and manual backfills.
//!
//! # Usage
//!
//! ```bash
//! # Run order sync database migrations
//! so-cli migrate
//!
//! # Import a customer's historical orders without going through HTTP
//! so-cli backfill -e customer@example.com --before 2024-01-01
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `backfill` - Run a historical backfill for one email

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "so-cli")]
#[command(author, version, about = "Simply Online order sync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Import historical orders for one customer
    Backfill {
        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// Cutover date; only orders before it are imported
        #[arg(short, long)]
        before: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Backfill { email, before } => {
            commands::backfill::run(&email, before.as_deref()).await?;
        }
    }
    Ok(())
}
