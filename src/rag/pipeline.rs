//! Complete RAG pipeline: Transform -> Retrieve -> Diversify -> Fuse -> Generate

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use futures::future::try_join_all;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use super::context::ChunkSource;
use super::fusion::reciprocal_rank_fusion;
use super::fusion::FusedCandidate;
use super::mmr::select_diverse;
use super::prompts::build_answer_prompt;
use super::query_transform;
use super::ContextAssembler;
use super::Retriever;
use crate::config::AppConfig;
use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingService;
use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::llm::TextGenerator;
use crate::models::Bucket;
use crate::models::Product;
use crate::models::QueryPlan;
use crate::vector_store::QdrantStore;

/// Complete RAG service
pub struct RagService {
    llm: Arc<dyn TextGenerator>,
    retriever: Retriever,
    context_assembler: ContextAssembler,
    settings: RetrievalConfig,
}

impl RagService {
    /// Create a new RAG service against the configured providers and Qdrant
    ///
    /// # Errors
    /// - Unknown embedding or LLM provider names
    /// - HTTP client construction failures
    pub fn new(config: &AppConfig) -> Result<Self> {
        let embeddings = EmbeddingService::new(config)?;
        let store = Arc::new(QdrantStore::new(&config.vector_store)?);
        let retriever = Retriever::from_config(config, store, embeddings);
        let llm = Arc::new(LlmService::new(config)?);

        Ok(Self::from_services(llm, retriever, config.retrieval.clone()))
    }

    /// Create from existing services
    #[must_use]
    pub fn from_services(
        llm: Arc<dyn TextGenerator>,
        retriever: Retriever,
        settings: RetrievalConfig,
    ) -> Self {
        Self {
            llm,
            retriever,
            context_assembler: ContextAssembler::default(),
            settings,
        }
    }

    fn ensure_ready(product: &Product) -> Result<()> {
        if product.is_ready() {
            Ok(())
        } else {
            Err(PulseRagError::ProductNotReady(product.name.clone()))
        }
    }

    /// Answer `question` about `product` with the full multi-query pipeline
    ///
    /// # Errors
    /// - [`PulseRagError::ProductNotReady`] while the product is still pending
    /// - Any text generation failure during query transformation or answering
    /// - Embedding failures for hypothetical answers, and client-class
    ///   failures while backfilling candidate embeddings
    pub async fn answer(&self, product: &Product, question: &str) -> Result<RagAnswer> {
        info!("Processing RAG query for {}: {}", product.name, question);

        let retrieved = self.retrieve_context(product, question).await?;

        debug!("Generating answer from {} chunks", retrieved.chunks.len());
        let prompt = build_answer_prompt(
            &product.name,
            &product.description,
            &retrieved.context,
            question,
        );
        let answer = self.llm.generate(&prompt).await?;

        info!("RAG query completed for {}", product.name);
        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            context: retrieved.context,
            sources: retrieved.sources,
            plan: Some(retrieved.plan),
            generated_at: Utc::now(),
        })
    }

    /// Baseline: embed the raw question, retrieve once, answer. No query
    /// transformation, diversification or fusion.
    pub async fn answer_direct(&self, product: &Product, question: &str) -> Result<RagAnswer> {
        Self::ensure_ready(product)?;
        info!("Processing direct query for {}: {}", product.name, question);

        let embedding = self.retriever.embeddings().generate(question).await?;
        let hits = self
            .retriever
            .retrieve(&embedding, &product.name, self.settings.direct_top)
            .await?;
        let scores: Vec<f64> = hits
            .iter()
            .map(|c| f64::from(c.score.unwrap_or_default()))
            .collect();
        let (context, sources) = self
            .context_assembler
            .assemble_with_sources(&hits, Some(scores.as_slice()));

        let prompt = build_answer_prompt(&product.name, &product.description, &context, question);
        let answer = self.llm.generate(&prompt).await?;

        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            context,
            sources,
            plan: None,
            generated_at: Utc::now(),
        })
    }

    /// Everything up to (but not including) answer generation
    pub async fn retrieve_context(
        &self,
        product: &Product,
        question: &str,
    ) -> Result<RetrievedContext> {
        Self::ensure_ready(product)?;

        // Step 1: query transformation
        let plan = query_transform::plan(
            self.llm.as_ref(),
            question,
            &product.name,
            self.settings.sub_query_count,
        )
        .await?;

        // Step 2: one bucket per hypothetical answer
        let buckets = self.build_buckets(&plan, &product.name).await?;

        // Step 3: diversify each bucket independently
        let mut diversified = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let keep = self.settings.mmr_keep.min(bucket.candidates.len());
            let selected = select_diverse(
                &bucket.candidates,
                &bucket.embedding,
                keep,
                self.settings.mmr_lambda,
            )?;
            debug!(
                "MMR kept {}/{} for sub-query {:?}",
                selected.len(),
                bucket.candidates.len(),
                bucket.sub_query
            );
            diversified.push(selected);
        }

        // Step 4: fuse and cap
        let mut chunks = reciprocal_rank_fusion(&diversified, self.settings.rrf_k)?;
        chunks.truncate(self.settings.fused_top);
        info!(
            "Fused {} lists into {} context chunks",
            diversified.len(),
            chunks.len()
        );

        let candidates: Vec<_> = chunks.iter().map(|f| f.candidate.clone()).collect();
        let scores: Vec<f64> = chunks.iter().map(|f| f.score).collect();
        let (context, sources) = self
            .context_assembler
            .assemble_with_sources(&candidates, Some(scores.as_slice()));

        Ok(RetrievedContext {
            plan,
            chunks,
            context,
            sources,
        })
    }

    async fn build_buckets(&self, plan: &QueryPlan, product_name: &str) -> Result<Vec<Bucket>> {
        let embeddings = self.retriever.embeddings();
        let hypothetical_embeddings = try_join_all(
            plan.hypothetical_answers
                .iter()
                .map(|answer| embeddings.generate(answer)),
        )
        .await?;

        let limit = self.settings.candidates_per_subquery;
        let candidate_lists = try_join_all(
            hypothetical_embeddings
                .iter()
                .map(|embedding| self.retriever.retrieve(embedding, product_name, limit)),
        )
        .await?;

        Ok(plan
            .sub_queries
            .iter()
            .zip(&plan.hypothetical_answers)
            .zip(hypothetical_embeddings)
            .zip(candidate_lists)
            .map(|(((sub_query, answer), embedding), candidates)| Bucket {
                sub_query: sub_query.clone(),
                hypothetical_answer: answer.clone(),
                embedding,
                candidates,
            })
            .collect())
    }

    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    #[must_use]
    pub const fn settings(&self) -> &RetrievalConfig {
        &self.settings
    }
}

/// Pipeline output before answer generation
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub plan: QueryPlan,
    pub chunks: Vec<FusedCandidate>,
    pub context: String,
    pub sources: Vec<ChunkSource>,
}

/// Generated answer with the context it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub question: String,
    pub answer: String,
    pub context: String,
    pub sources: Vec<ChunkSource>,
    /// Absent for direct (baseline) answers
    pub plan: Option<QueryPlan>,
    pub generated_at: DateTime<Utc>,
}

impl RagAnswer {
    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Question: {}\n\n", self.question));
        if let Some(plan) = &self.plan {
            output.push_str(&format!("Standalone query: {}\n", plan.standalone_query));
            for (idx, sub_query) in plan.sub_queries.iter().enumerate() {
                output.push_str(&format!("  Sub-query {}: {}\n", idx + 1, sub_query));
            }
            output.push('\n');
        }
        output.push_str(&format!("Answer:\n{}\n\n", self.answer));
        output.push_str(&format!("Sources ({} chunks):\n", self.sources.len()));

        for source in self.sources.iter().take(5) {
            output.push_str(&format!(
                "  {}. {} ({})\n",
                source.rank,
                source.title,
                source.url.as_deref().unwrap_or("unknown")
            ));
        }

        output
    }
}
