use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::PulseRagError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            backtrace: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// One of `gemini`, `openai`, `ollama`
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Inputs longer than this are cut at a char boundary before sending
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

pub(crate) fn default_dimension() -> usize {
    768
}

pub(crate) fn default_max_input_bytes() -> usize {
    30_000
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_gemini_endpoint(),
            api_key: None,
            model: default_embedding_model(),
            dimension: default_dimension(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

pub(crate) fn default_max_attempts() -> u32 {
    3
}

pub(crate) fn default_base_delay_ms() -> u64 {
    1000
}

pub(crate) fn default_max_delay_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub(crate) fn default_system_instruction() -> String {
    "You are a market research expert who specializes in consumer electronics. \
     You analyze Reddit posts and comments about a product to explain how real \
     users feel about it. Be concrete, balanced and concise."
        .to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_gemini_endpoint(),
            api_key: None,
            model: default_llm_model(),
            system_instruction: default_system_instruction(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Payload field holding the exact product name
    #[serde(default = "default_filter_field")]
    pub filter_field: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "reddit-posts".to_string()
}

pub(crate) fn default_filter_field() -> String {
    "name".to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
            filter_field: default_filter_field(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Knobs for the query-time pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_candidates_per_subquery")]
    pub candidates_per_subquery: usize,
    #[serde(default = "default_mmr_keep")]
    pub mmr_keep: usize,
    #[serde(default = "default_fused_top")]
    pub fused_top: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,
    #[serde(default = "default_sub_query_count")]
    pub sub_query_count: usize,
    /// Upper bound on concurrent backfill embedding calls per bucket
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
    /// Result size for the untransformed baseline query
    #[serde(default = "default_direct_top")]
    pub direct_top: usize,
}

pub(crate) fn default_candidates_per_subquery() -> usize {
    30
}

pub(crate) fn default_mmr_keep() -> usize {
    20
}

pub(crate) fn default_fused_top() -> usize {
    20
}

pub(crate) fn default_rrf_k() -> f64 {
    60.0
}

pub(crate) fn default_mmr_lambda() -> f32 {
    0.7
}

pub(crate) fn default_sub_query_count() -> usize {
    3
}

pub(crate) fn default_embed_concurrency() -> usize {
    8
}

fn default_direct_top() -> usize {
    20
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidates_per_subquery: default_candidates_per_subquery(),
            mmr_keep: default_mmr_keep(),
            fused_top: default_fused_top(),
            rrf_k: default_rrf_k(),
            mmr_lambda: default_mmr_lambda(),
            sub_query_count: default_sub_query_count(),
            embed_concurrency: default_embed_concurrency(),
            direct_top: default_direct_top(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_comments_per_post")]
    pub comments_per_post: usize,
    /// Byte cap applied after preprocessing, before embedding
    #[serde(default = "default_preprocess_max_bytes")]
    pub preprocess_max_bytes: usize,
}

fn default_user_agent() -> String {
    "pulserag/0.1".to_string()
}

fn default_search_limit() -> usize {
    25
}

fn default_comments_per_post() -> usize {
    3
}

fn default_preprocess_max_bytes() -> usize {
    35_000
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            user_agent: default_user_agent(),
            search_limit: default_search_limit(),
            comments_per_post: default_comments_per_post(),
            preprocess_max_bytes: default_preprocess_max_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` (if present) with `PULSERAG__<SECTION>__<KEY>`
    /// environment overrides on top
    pub fn load() -> crate::Result<Self> {
        Self::load_from("config.toml")
    }

    /// Same as [`AppConfig::load`] with an explicit file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("PULSERAG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let r = &self.retrieval;
        if !(0.0..=1.0).contains(&r.mmr_lambda) {
            return Err(PulseRagError::Config(format!(
                "retrieval.mmr_lambda must be within [0, 1], got {}",
                r.mmr_lambda
            )));
        }
        if r.rrf_k <= 0.0 || !r.rrf_k.is_finite() {
            return Err(PulseRagError::Config(format!(
                "retrieval.rrf_k must be positive, got {}",
                r.rrf_k
            )));
        }
        for (name, value) in [
            ("retrieval.candidates_per_subquery", r.candidates_per_subquery),
            ("retrieval.mmr_keep", r.mmr_keep),
            ("retrieval.fused_top", r.fused_top),
            ("retrieval.sub_query_count", r.sub_query_count),
            ("retrieval.embed_concurrency", r.embed_concurrency),
            ("embeddings.dimension", self.embeddings.dimension),
            ("embeddings.max_input_bytes", self.embeddings.max_input_bytes),
        ] {
            if value == 0 {
                return Err(PulseRagError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(PulseRagError::Config(
                "retry.max_attempts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Get vector store collection name
    pub fn collection(&self) -> &str {
        &self.vector_store.collection
    }

    /// Copy of the configuration with every secret replaced by `***`
    pub fn masked(&self) -> Self {
        fn mask(value: &Option<String>) -> Option<String> {
            value.as_ref().map(|_| "***".to_string())
        }

        let mut masked = self.clone();
        masked.embeddings.api_key = mask(&self.embeddings.api_key);
        masked.llm.api_key = mask(&self.llm.api_key);
        masked.vector_store.api_key = mask(&self.vector_store.api_key);
        masked.reddit.client_id = mask(&self.reddit.client_id);
        masked.reddit.client_secret = mask(&self.reddit.client_secret);
        masked
    }
}
