//! RAG (Retrieval-Augmented Generation) module
//!
//! This module answers product questions from forum discussion:
//! - Query transformation (standalone query, sub-queries, hypothetical answers)
//! - Filtered vector retrieval with embedding backfill
//! - Per-sub-query MMR diversification
//! - Reciprocal rank fusion across sub-queries
//! - Context assembly and grounded answer generation
//!
//! # Examples
//!
//! ```rust,no_run
//! use pulserag::config::AppConfig;
//! use pulserag::models::Product;
//! use pulserag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(&config)?;
//!
//!     let product = Product::new("Acme Buds", "earbuds", "Wireless earbuds").mark_ready();
//!     let response = service.answer(&product, "How's the battery life?").await?;
//!     println!("Answer: {}", response.answer);
//!     println!("Sources: {} chunks", response.sources.len());
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod fusion;
pub mod keywords;
pub mod mmr;
pub mod pipeline;
pub mod prompts;
pub mod query_transform;
pub mod retriever;
pub mod similarity;

pub use context::ChunkSource;
pub use context::ContextAssembler;
pub use fusion::reciprocal_rank_fusion;
pub use fusion::FusedCandidate;
pub use keywords::expand_keywords;
pub use mmr::select_diverse;
pub use pipeline::RagAnswer;
pub use pipeline::RagService;
pub use pipeline::RetrievedContext;
pub use retriever::Retriever;
pub use similarity::cosine_similarity;
