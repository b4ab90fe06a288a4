//! PulseRAG: product question answering over community discussion
//!
//! Posts about a product are fetched, embedded and indexed into a vector
//! store ([`ingest`]). Questions are answered by a multi-query retrieval
//! pipeline with per-sub-query MMR and reciprocal rank fusion ([`rag`]).

pub mod cli;
pub mod competitor;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod vector_store;


pub use config::AppConfig;
pub use errors::*;
