//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `pulserag` CLI

use std::collections::BTreeSet;

use crate::competitor::CompetitorProfile;
use crate::ingest::IngestReport;
use crate::rag::RagAnswer;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// This prevents panics when truncating strings with multi-byte UTF-8 characters (emojis, etc.)
///
/// # Arguments
/// * `s` - The string to truncate
/// * `max_chars` - Maximum number of characters (not bytes)
///
/// # Returns
/// Truncated string with "..." suffix if truncated, otherwise the original string
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print a RAG answer with its query plan and sources
pub fn print_rag_answer(answer: &RagAnswer, show_context: bool) {
    if let Some(plan) = &answer.plan {
        println!("🧭 Standalone query: {}", plan.standalone_query);
        for (idx, sub_query) in plan.sub_queries.iter().enumerate() {
            println!("   {}. {}", idx + 1, sub_query);
        }
        println!();
    }

    println!("💬 Answer:\n{}\n", answer.answer);

    println!("📚 Sources ({} chunks):", answer.sources.len());
    for source in &answer.sources {
        let score = source
            .score
            .map(|s| format!(" [{s:.4}]"))
            .unwrap_or_default();
        println!(
            "  {}. {}{} - {} (r/{})",
            source.rank,
            truncate_str(&source.title, 80),
            score,
            source.url.as_deref().unwrap_or("unknown"),
            source.subreddit
        );
    }

    if show_context {
        println!("\n📄 Context:\n{}", answer.context);
    }
}

/// Print counts from an ingestion pass
pub fn print_ingest_report(product_name: &str, report: &IngestReport) {
    println!("📥 Ingestion report for {product_name}:");
    println!("  Fetched: {}", report.fetched);
    println!("  Duplicates: {}", report.duplicates);
    println!("  Filtered out by keywords: {}", report.filtered_out);
    println!("  Embedding failures: {}", report.embed_failures);
    println!("  Upserted: {}", report.upserted);
}

pub fn print_keywords(product_name: &str, keywords: &BTreeSet<String>) {
    println!("🔑 {} keywords for {product_name}:", keywords.len());
    for keyword in keywords {
        println!("  - {keyword}");
    }
}

/// Print a competitor profile
pub fn print_competitor_profile(profile: &CompetitorProfile) {
    println!("🏷️  {}", profile.name);
    if !profile.description.is_empty() {
        println!("{}", profile.description);
    }

    println!("\n👍 Good points:");
    for point in &profile.good_points {
        println!("  - {point}");
    }
    println!("\n👎 Bad points:");
    for point in &profile.bad_points {
        println!("  - {point}");
    }
}

/// Print configuration; callers pass an already masked copy
pub fn print_config(config: &AppConfig) {
    println!("📋 PulseRAG Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!();

    println!("🔢 Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!("  Max input bytes: {}", config.embeddings.max_input_bytes);
    println!("  API key: {}", display_secret(config.embeddings.api_key.as_deref()));
    println!(
        "  Retry: {} attempts, {}ms base, {}ms cap",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
    );
    println!();

    println!("🤖 LLM:");
    println!("  Provider: {}", config.llm.provider);
    println!("  Endpoint: {}", config.llm.endpoint);
    println!("  Model: {}", config.llm_model());
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!("  API key: {}", display_secret(config.llm.api_key.as_deref()));
    println!();

    println!("🗄️  Vector store:");
    println!("  URL: {}", config.vector_store.url);
    println!("  Collection: {}", config.collection());
    println!("  Filter field: {}", config.vector_store.filter_field);
    println!("  API key: {}", display_secret(config.vector_store.api_key.as_deref()));
    println!();

    let r = &config.retrieval;
    println!("🔍 Retrieval:");
    println!("  Sub-queries: {}", r.sub_query_count);
    println!("  Candidates per sub-query: {}", r.candidates_per_subquery);
    println!("  MMR: keep {} (lambda {})", r.mmr_keep, r.mmr_lambda);
    println!("  RRF: k = {}, top {}", r.rrf_k, r.fused_top);
    println!("  Direct top: {}", r.direct_top);
    println!("  Embedding concurrency: {}", r.embed_concurrency);
    println!();

    println!("🌐 Reddit:");
    println!("  Client id: {}", display_secret(config.reddit.client_id.as_deref()));
    println!("  Client secret: {}", display_secret(config.reddit.client_secret.as_deref()));
    println!("  User agent: {}", config.reddit.user_agent);
    println!("  Search limit: {}", config.reddit.search_limit);
    println!("  Comments per post: {}", config.reddit.comments_per_post);
}

fn display_secret(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}
