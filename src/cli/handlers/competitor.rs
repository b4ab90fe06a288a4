//! Competitor analysis handlers

use std::sync::Arc;

use crate::cli::commands::brand_info;
use crate::cli::handlers::ingest::build_ingest_service;
use crate::cli::output::print_competitor_profile;
use crate::cli::output::print_info;
use crate::cli::output::print_warning;
use crate::competitor::CompetitorAnalyzer;
use crate::competitor::CompetitorProfile;
use crate::embeddings::EmbeddingService;
use crate::llm::LlmService;
use crate::AppConfig;
use crate::Result;

/// Arguments of the `competitor` command
pub struct CompetitorArgs {
    pub brand: String,
    pub category: String,
    pub rating: Option<f32>,
    pub reviews: Option<u32>,
    pub price: Option<String>,
    pub snippet: Option<String>,
    pub limit: usize,
    pub json: bool,
}

pub async fn handle_competitor(config: &AppConfig, args: CompetitorArgs) -> Result<()> {
    let query = format!("{} {}", args.brand, args.category);
    if !args.json {
        print_info(&format!("🔍 Collecting posts for \"{query}\"..."));
    }

    let collector = build_ingest_service(config)?;
    let posts = collector.collect_posts(&query, args.limit, &args.brand).await?;
    if posts.is_empty() {
        if args.json {
            println!("{}", profile_json(None)?);
        } else {
            print_warning(&format!("No posts found for {}", args.brand));
        }
        return Ok(());
    }

    let analyzer = CompetitorAnalyzer::new(
        Arc::new(LlmService::new(config)?),
        EmbeddingService::new(config)?,
    );
    let brand = brand_info(&args.brand, args.rating, args.reviews, args.price, args.snippet);
    let profile = analyzer.analyze(&brand, &posts).await?;

    if args.json {
        println!("{}", profile_json(profile.as_ref())?);
        return Ok(());
    }
    match profile {
        Some(profile) => print_competitor_profile(&profile),
        None => print_warning("The model did not return a usable profile"),
    }
    Ok(())
}

/// `--json` output: the profile, or `null` when there is none
fn profile_json(profile: Option<&CompetitorProfile>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&profile)?)
}
