//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::models::BrandInfo;
use crate::models::Product;

#[derive(Parser)]
#[command(name = "pulserag")]
#[command(about = "PulseRAG CLI: answer product questions from community discussion")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: config.toml plus PULSERAG__* environment)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Product identity shared by the product-scoped commands
#[derive(Args, Debug, Clone)]
pub struct ProductArgs {
    /// Exact product name, as tagged on indexed posts
    #[arg(short, long)]
    pub name: String,
    /// Product category (e.g. "earbuds")
    #[arg(long, default_value = "")]
    pub category: String,
    /// Short product description
    #[arg(short, long, default_value = "")]
    pub description: String,
}

impl ProductArgs {
    /// Product record for a product the caller says has been ingested
    pub fn ready_product(&self) -> Product {
        self.pending_product().mark_ready()
    }

    pub fn pending_product(&self) -> Product {
        Product::new(&self.name, &self.category, &self.description)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question about an ingested product
    Ask {
        #[command(flatten)]
        product: ProductArgs,
        /// The question to answer
        question: String,
        /// Baseline retrieval: no query transformation, MMR or fusion
        #[arg(long)]
        direct: bool,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
        /// Also print the assembled context
        #[arg(long)]
        show_context: bool,
    },
    /// Fetch, embed and index discussion about a product
    Ingest {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Show the expanded keyword set used to filter posts
    Keywords {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Profile a competing brand from its discussion
    Competitor {
        /// Brand name
        #[arg(short, long)]
        brand: String,
        /// Product category searched alongside the brand
        #[arg(long)]
        category: String,
        /// Marketplace rating
        #[arg(long)]
        rating: Option<f32>,
        /// Marketplace review count
        #[arg(long)]
        reviews: Option<u32>,
        /// Listed price
        #[arg(long)]
        price: Option<String>,
        /// Listing snippet
        #[arg(long)]
        snippet: Option<String>,
        /// Posts to fetch for the brand
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration with secrets masked
    Config,
}

/// Build a [`BrandInfo`] from the competitor command's arguments
pub fn brand_info(
    brand: &str,
    rating: Option<f32>,
    reviews: Option<u32>,
    price: Option<String>,
    snippet: Option<String>,
) -> BrandInfo {
    BrandInfo {
        brand: brand.to_string(),
        rating,
        reviews,
        price,
        snippet,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "pulserag",
            "-v",
            "ask",
            "--name",
            "Acme Buds",
            "--category",
            "earbuds",
            "How's the battery life?",
            "--direct",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.config.is_none());

        let Commands::Ask {
            product,
            question,
            direct,
            json,
            ..
        } = cli.command
        else {
            panic!("expected ask");
        };
        assert_eq!(product.name, "Acme Buds");
        assert_eq!(product.category, "earbuds");
        assert_eq!(question, "How's the battery life?");
        assert!(direct);
        assert!(!json);
        assert!(product.ready_product().is_ready());
        assert!(!product.pending_product().is_ready());
    }

    #[test]
    fn test_parse_competitor_defaults() {
        let cli = Cli::try_parse_from([
            "pulserag",
            "-c",
            "custom.toml",
            "competitor",
            "--brand",
            "Zed",
            "--category",
            "earbuds",
            "--rating",
            "4.2",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));

        let Commands::Competitor { limit, rating, price, .. } = cli.command else {
            panic!("expected competitor");
        };
        assert_eq!(limit, 50);
        assert_eq!(rating, Some(4.2));
        assert!(price.is_none());
    }
}
