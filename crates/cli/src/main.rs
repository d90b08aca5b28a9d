//! Shop CLI - migrations, catalog import/export and the catalog scraper.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! shop-cli migrate
//!
//! # Load the catalog (categories first, products reference them by name)
//! shop-cli import categories categories.csv
//! shop-cli import products products_scraped_fixed.csv --dry-run
//!
//! # Dump the catalog
//! shop-cli export products -o products.csv
//!
//! # Scrape sample products (falls back to generated samples)
//! shop-cli scrape --limit 10 --output products_scraped_fixed.csv --media-dir media
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `import` - Import a category or product CSV
//! - `export` - Export categories or products as CSV
//! - `scrape` - Scrape a retail listing page into an importable CSV

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Import a CSV file into the catalog
    Import {
        /// What the file contains
        #[arg(value_enum)]
        entity: Entity,

        /// CSV file to import
        file: PathBuf,

        /// Validate and report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Directory product image paths are checked against
        #[arg(long, env = "SHOP_MEDIA_ROOT", default_value = "media")]
        media_root: PathBuf,
    },
    /// Export part of the catalog as CSV
    Export {
        /// What to export
        #[arg(value_enum)]
        entity: Entity,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape product listings into an importable CSV
    Scrape {
        /// Search results page to scrape
        #[arg(long, default_value = commands::scrape::DEFAULT_URL)]
        url: String,

        /// Maximum number of listings to process
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// CSV file to write
        #[arg(long, default_value = "products_scraped_fixed.csv")]
        output: PathBuf,

        /// Media directory; images go to `<media-dir>/products/`
        #[arg(long, default_value = "media")]
        media_dir: PathBuf,
    },
}

/// Catalog entity handled by `import` and `export`.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Entity {
    Categories,
    Products,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop_cli=info,shop_admin=info".into()),
        )
        .init();

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
        Commands::Import {
            entity,
            file,
            dry_run,
            media_root,
        } => {
            let committed =
                commands::transfer::import(entity, &file, &media_root, dry_run).await?;
            if !committed && !dry_run {
                return Err("import rolled back because of row errors".into());
            }
        }
        Commands::Export { entity, output } => {
            commands::transfer::export(entity, output.as_deref()).await?;
        }
        Commands::Scrape {
            url,
            limit,
            output,
            media_dir,
        } => {
            let options = commands::scrape::ScrapeOptions {
                url,
                limit,
                output,
                media_dir,
            };
            commands::scrape::run(&options).await?;
        }
    }
    Ok(())
}
