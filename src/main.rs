use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use pulserag::cli::handle_ask;
use pulserag::cli::handle_competitor;
use pulserag::cli::handle_config_command;
use pulserag::cli::handle_ingest;
use pulserag::cli::handle_keywords;
use pulserag::cli::Cli;
use pulserag::cli::Commands;
use pulserag::cli::CompetitorArgs;
use pulserag::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };

    // Initialize logging; the guard flushes the log file on exit
    let _guard = if cli.verbose {
        pulserag::logging::init_logging_with_level("debug")?
    } else {
        pulserag::logging::init_logging_with_config(Some(&config))?
    };
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Ask {
            product,
            question,
            direct,
            json,
            show_context,
        } => {
            handle_ask(&config, &product, &question, direct, json, show_context)
                .await
                .context("ask failed")?;
        }
        Commands::Ingest { product } => {
            handle_ingest(&config, &product)
                .await
                .with_context(|| format!("ingestion for {} failed", product.name))?;
        }
        Commands::Keywords { product } => {
            handle_keywords(&config, &product).await?;
        }
        Commands::Competitor {
            brand,
            category,
            rating,
            reviews,
            price,
            snippet,
            limit,
            json,
        } => {
            let args = CompetitorArgs {
                brand,
                category,
                rating,
                reviews,
                price,
                snippet,
                limit,
                json,
            };
            handle_competitor(&config, args)
                .await
                .context("competitor analysis failed")?;
        }
        Commands::Config => handle_config_command(&config),
    }

    Ok(())
}
