use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use pulserag::config::RetrievalConfig;
use pulserag::embeddings::EmbeddingBackend;
use pulserag::embeddings::EmbeddingService;
use pulserag::embeddings::RetryPolicy;
use pulserag::llm::TextGenerator;
use pulserag::models::IndexedPost;
use pulserag::models::PointId;
use pulserag::models::PostPayload;
use pulserag::models::Product;
use pulserag::rag::RagService;
use pulserag::rag::Retriever;
use pulserag::vector_store::FieldMatch;
use pulserag::vector_store::SearchHit;
use pulserag::vector_store::SearchRequest;
use pulserag::vector_store::VectorStore;
use pulserag::PulseRagError;
use pulserag::Result;

const DIMENSION: usize = 4;
const QUESTION: &str = "How's the battery life?";
const FINAL_ANSWER: &str = "Around six hours per charge (https://www.reddit.com/r/earbuds/3).";

const Q1: [f32; 4] = [1.0, 0.0, 0.0, 0.0];
const Q2: [f32; 4] = [0.0, 1.0, 0.0, 0.0];
const Q3: [f32; 4] = [0.0, 0.0, 1.0, 0.0];
const FALLBACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Fixed replies per prompt kind; keeps every prompt it sees
struct ScriptedLlm {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let reply = if prompt.starts_with("Product: Acme Buds") {
            FINAL_ANSWER
        } else if prompt.starts_with("You are given a user question") {
            "acme buds battery life"
        } else if prompt.starts_with("Take the standalone query") {
            "1. Battery hours per charge\n2. Charging case capacity\n3. Battery degradation over time"
        } else if prompt.contains("Sub-query: \"Battery hours per charge\"") {
            "answer one"
        } else if prompt.contains("Sub-query: \"Charging case capacity\"") {
            "answer two"
        } else if prompt.contains("Sub-query: \"Battery degradation over time\"") {
            "answer three"
        } else {
            return Err(PulseRagError::Llm(format!("unexpected prompt: {prompt}")));
        };
        Ok(reply.to_string())
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }
}

/// One axis per hypothetical answer; the raw question lands on the first
struct AxisBackend;

#[async_trait]
impl EmbeddingBackend for AxisBackend {
    async fn embed_raw(&self, text: &str) -> Result<Vec<f32>> {
        let vector = match text {
            "answer one" | QUESTION => Q1,
            "answer two" => Q2,
            "answer three" => Q3,
            _ => FALLBACK,
        };
        Ok(vector.to_vec())
    }
}

/// Returns a fixed hit list per query vector, in the listed order
struct FixtureStore {
    hits: Vec<(Vec<f32>, Vec<SearchHit>)>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FixtureStore {
    fn new(hits: Vec<(Vec<f32>, Vec<SearchHit>)>) -> Self {
        Self {
            hits,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for FixtureStore {
    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .hits
            .iter()
            .find(|(vector, _)| *vector == request.vector)
            .map(|(_, hits)| hits.iter().take(request.limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(&self, _points: Vec<IndexedPost>) -> Result<()> {
        Ok(())
    }
}

fn hit(id: u64, label: &str, vector: Option<[f32; 4]>) -> SearchHit {
    SearchHit {
        id: PointId::Num(id),
        score: 0.5,
        payload: PostPayload {
            name: "Acme Buds".to_string(),
            title: format!("{label} title"),
            selftext: format!("{label} body"),
            url: format!("https://www.reddit.com/r/earbuds/{id}"),
            subreddit: "earbuds".to_string(),
            ..Default::default()
        },
        vector: vector.map(|v| v.to_vec()),
    }
}

// Post vectors, relevance to each axis in comments
fn x() -> SearchHit {
    hit(1, "X", Some([4.0, 0.0, 3.0, 0.0])) // q1 0.8
}
fn y() -> SearchHit {
    hit(2, "Y", Some([3.0, 0.0, 4.0, 0.0])) // q1 0.6, q3 0.8, sim(X) 0.96
}
fn z() -> SearchHit {
    hit(3, "Z", Some([3.0, 4.0, 0.0, 0.0])) // q1 0.6, q2 0.8, sim(X) 0.48
}
fn w() -> SearchHit {
    hit(4, "W", Some([0.0, 3.0, 0.0, 4.0])) // q2 0.6
}
fn v() -> SearchHit {
    // No stored vector: backfilled from its text
    hit(5, "V", None)
}

fn product() -> Product {
    Product::new("Acme Buds", "earbuds", "Wireless earbuds with a charging case").mark_ready()
}

fn service(
    store: Arc<FixtureStore>,
    llm: Arc<ScriptedLlm>,
    settings: RetrievalConfig,
) -> RagService {
    let embeddings = EmbeddingService::with_backend(
        Arc::new(AxisBackend),
        DIMENSION,
        30_000,
        RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
        },
    );
    let retriever = Retriever::new(store, embeddings, "name", 4);
    RagService::from_services(llm, retriever, settings)
}

fn golden_store(third_bucket: Vec<SearchHit>) -> Arc<FixtureStore> {
    Arc::new(FixtureStore::new(vec![
        (Q1.to_vec(), vec![x(), y(), z()]),
        (Q2.to_vec(), vec![w(), z()]),
        (Q3.to_vec(), third_bucket),
    ]))
}

fn keys(service_output: &pulserag::rag::RetrievedContext) -> Vec<String> {
    service_output.chunks.iter().map(|c| c.key.clone()).collect()
}

#[tokio::test]
async fn test_golden_fused_order() -> Result<()> {
    let store = golden_store(vec![y(), v()]);
    let llm = Arc::new(ScriptedLlm::new());
    let rag = service(store.clone(), llm.clone(), RetrievalConfig::default());

    let retrieved = rag.retrieve_context(&product(), QUESTION).await?;

    assert_eq!(retrieved.plan.standalone_query, "acme buds battery life");
    assert_eq!(
        retrieved.plan.hypothetical_answers,
        vec!["answer one", "answer two", "answer three"]
    );

    // MMR turns bucket one into [X, Z, Y]; buckets two and three become
    // [Z, W] and [Y, V]. Z and Y collect two contributions each.
    assert_eq!(keys(&retrieved), vec!["3", "2", "1", "4", "5"]);

    let scores: Vec<f64> = retrieved.chunks.iter().map(|c| c.score).collect();
    assert!((scores[0] - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
    assert!((scores[1] - (1.0 / 63.0 + 1.0 / 61.0)).abs() < 1e-12);
    assert!((scores[2] - 1.0 / 61.0).abs() < 1e-12);
    assert_eq!(scores[3], scores[4]);

    // Every search is filtered on the exact product name
    let requests = store.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(
            request.filter,
            Some(FieldMatch {
                key: "name".to_string(),
                value: "Acme Buds".to_string(),
            })
        );
        assert_eq!(request.limit, 30);
    }

    assert!(retrieved
        .context
        .starts_with("Chunk 1:\nTitle: Z title\nBody: Z body\nTop comments:\nSource: https://www.reddit.com/r/earbuds/3\n\n"));
    assert!(retrieved.context.contains("Chunk 5:\nTitle: V title"));
    Ok(())
}

#[tokio::test]
async fn test_answer_uses_fused_context() -> Result<()> {
    let store = golden_store(vec![y(), v()]);
    let llm = Arc::new(ScriptedLlm::new());
    let settings = RetrievalConfig {
        fused_top: 4,
        ..RetrievalConfig::default()
    };
    let rag = service(store, llm.clone(), settings);

    let answer = rag.answer(&product(), QUESTION).await?;

    assert_eq!(answer.answer, FINAL_ANSWER);
    assert_eq!(answer.question, QUESTION);
    let titles: Vec<&str> = answer.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Z title", "Y title", "X title", "W title"]);
    assert_eq!(answer.sources[0].rank, 1);
    assert_eq!(
        answer.sources[0].url.as_deref(),
        Some("https://www.reddit.com/r/earbuds/3")
    );
    assert_eq!(answer.plan.as_ref().map(|p| p.sub_queries.len()), Some(3));

    // 1 standalone + 1 decomposition + 3 hypothetical answers + 1 final
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 6);
    let final_prompt = prompts.last().unwrap();
    assert!(final_prompt.starts_with(
        "Product: Acme Buds\nProduct description: Wireless earbuds with a charging case\n\n"
    ));
    assert!(final_prompt.contains(&format!("User question: {QUESTION}")));
    assert!(!final_prompt.contains("V title"));
    Ok(())
}

#[tokio::test]
async fn test_empty_bucket_shortens_fused_list() -> Result<()> {
    let store = golden_store(Vec::new());
    let llm = Arc::new(ScriptedLlm::new());
    let rag = service(store, llm, RetrievalConfig::default());

    let retrieved = rag.retrieve_context(&product(), QUESTION).await?;

    // Lists [X, Z, Y] and [Z, W] only
    assert_eq!(keys(&retrieved), vec!["3", "1", "4", "2"]);
    Ok(())
}

#[tokio::test]
async fn test_direct_answer_keeps_store_order() -> Result<()> {
    let store = golden_store(vec![y(), v()]);
    let llm = Arc::new(ScriptedLlm::new());
    let rag = service(store, llm.clone(), RetrievalConfig::default());

    let answer = rag.answer_direct(&product(), QUESTION).await?;

    assert!(answer.plan.is_none());
    let titles: Vec<&str> = answer.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["X title", "Y title", "Z title"]);
    assert_eq!(answer.sources[0].score, Some(0.5));
    assert_eq!(llm.prompts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_pending_product_is_rejected() {
    let store = golden_store(Vec::new());
    let llm = Arc::new(ScriptedLlm::new());
    let rag = service(store.clone(), llm.clone(), RetrievalConfig::default());
    let pending = Product::new("Acme Buds", "earbuds", "");

    let err = rag.answer(&pending, QUESTION).await.unwrap_err();
    assert!(matches!(err, PulseRagError::ProductNotReady(ref name) if name == "Acme Buds"));

    let err = rag.answer_direct(&pending, QUESTION).await.unwrap_err();
    assert!(matches!(err, PulseRagError::ProductNotReady(_)));

    assert!(llm.prompts().is_empty());
    assert!(store.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_answer_serializes_for_json_output() -> Result<()> {
    let rag = service(
        golden_store(vec![y(), v()]),
        Arc::new(ScriptedLlm::new()),
        RetrievalConfig::default(),
    );
    let answer = rag.answer(&product(), QUESTION).await?;

    let json: HashMap<String, serde_json::Value> =
        serde_json::from_str(&serde_json::to_string(&answer)?)?;
    assert_eq!(json["answer"], FINAL_ANSWER);
    assert_eq!(json["sources"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["plan"]["standalone_query"], "acme buds battery life");
    Ok(())
}
