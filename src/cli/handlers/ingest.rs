//! Ingestion handlers

use std::sync::Arc;

use crate::cli::commands::ProductArgs;
use crate::cli::output::print_info;
use crate::cli::output::print_ingest_report;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::embeddings::EmbeddingService;
use crate::ingest::IngestService;
use crate::ingest::RedditSource;
use crate::llm::LlmService;
use crate::vector_store::QdrantStore;
use crate::AppConfig;
use crate::Result;

/// Wire the ingestion service against Reddit, the configured providers and
/// Qdrant
pub fn build_ingest_service(config: &AppConfig) -> Result<IngestService> {
    let source = Arc::new(RedditSource::new(&config.reddit)?);
    let llm = Arc::new(LlmService::new(config)?.without_system_instruction());
    let embeddings = EmbeddingService::new(config)?;
    let store = Arc::new(QdrantStore::new(&config.vector_store)?);
    Ok(IngestService::new(config, source, llm, embeddings, store))
}

pub async fn handle_ingest(config: &AppConfig, product: &ProductArgs) -> Result<()> {
    let service = build_ingest_service(config)?;
    let product = product.pending_product();

    print_info(&format!("📥 Ingesting discussion for {}...", product.name));
    let report = service.ingest_product(&product).await?;
    print_ingest_report(&product.name, &report);

    if report.upserted == 0 {
        print_warning("Nothing was indexed; questions about this product will have no context");
    } else {
        print_success(&format!(
            "{} posts indexed into {}",
            report.upserted,
            config.collection()
        ));
    }
    Ok(())
}
