//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - ask: Question answering over ingested discussion
//! - ingest: Fetching and indexing posts for a product
//! - keywords: Keyword expansion preview
//! - competitor: Competitor profiling
//! - info: Information display (config)

pub mod ask;
pub mod competitor;
pub mod info;
pub mod ingest;
pub mod keywords;

// Re-export all public handlers
pub use ask::*;
pub use competitor::*;
pub use info::*;
pub use ingest::*;
pub use keywords::*;
