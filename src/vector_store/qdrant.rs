//! Qdrant gRPC client

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors::VectorsOptions;
use qdrant_client::qdrant::Condition;
use qdrant_client::qdrant::CreateCollectionBuilder;
use qdrant_client::qdrant::Distance;
use qdrant_client::qdrant::Filter;
use qdrant_client::qdrant::ListValue;
use qdrant_client::qdrant::PointStruct;
use qdrant_client::qdrant::ScoredPoint;
use qdrant_client::qdrant::SearchPointsBuilder;
use qdrant_client::qdrant::Struct;
use qdrant_client::qdrant::UpsertPointsBuilder;
use qdrant_client::qdrant::Value as QdrantValue;
use qdrant_client::qdrant::VectorParamsBuilder;
use qdrant_client::qdrant::Vectors;
use qdrant_client::Qdrant;
use qdrant_client::QdrantError;
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::info;

use super::SearchHit;
use super::SearchRequest;
use super::VectorStore;
use crate::config::VectorStoreConfig;
use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::models::IndexedPost;
use crate::models::PointId;
use crate::models::PostPayload;

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

fn store_error(action: &str, err: &QdrantError) -> PulseRagError {
    PulseRagError::VectorStore(format!("{action}: {err}"))
}

impl QdrantStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty());
        let client = Qdrant::from_url(&config.url)
            .api_key(api_key)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| store_error("Failed to create Qdrant client", &e))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| store_error("Failed to check collection", &e))?;
        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} (dimension {}, cosine)",
            self.collection, dimension
        );
        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.as_str())
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| store_error("Failed to create collection", &e))?;
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let mut search = SearchPointsBuilder::new(
            self.collection.as_str(),
            request.vector,
            request.limit as u64,
        )
        .with_payload(true)
        .with_vectors(request.with_vector);
        if let Some(filter) = request.filter {
            search = search.filter(Filter::must([Condition::matches(filter.key, filter.value)]));
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| store_error("Failed to search points", &e))?;

        debug!("Qdrant returned {} hits", response.result.len());
        Ok(response.result.into_iter().map(scored_point_to_hit).collect())
    }

    async fn upsert(&self, points: Vec<IndexedPost>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let points = points
            .into_iter()
            .map(indexed_post_to_point)
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points).wait(true))
            .await
            .map_err(|e| store_error("Failed to upsert points", &e))?;
        info!("Upserted {} points into {}", count, self.collection);
        Ok(())
    }
}

fn indexed_post_to_point(post: IndexedPost) -> Result<PointStruct> {
    let payload = match serde_json::to_value(&post.payload)? {
        JsonValue::Object(fields) => fields
            .into_iter()
            .map(|(key, value)| (key, json_to_qdrant_value(value)))
            .collect::<HashMap<String, QdrantValue>>(),
        _ => HashMap::new(),
    };

    let point = match post.id {
        PointId::Num(n) => PointStruct::new(n, post.vector, payload),
        PointId::Str(s) => PointStruct::new(s, post.vector, payload),
    };
    Ok(point)
}

fn scored_point_to_hit(point: ScoredPoint) -> SearchHit {
    let payload: serde_json::Map<String, JsonValue> = point
        .payload
        .into_iter()
        .map(|(key, value)| (key, qdrant_to_json_value(value)))
        .collect();
    let payload = serde_json::from_value::<PostPayload>(JsonValue::Object(payload))
        .unwrap_or_default();

    SearchHit {
        id: convert_point_id(point.id),
        score: point.score,
        payload,
        vector: point.vectors.and_then(dense_vector),
    }
}

fn convert_point_id(id: Option<qdrant_client::qdrant::PointId>) -> PointId {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(n)) => PointId::Num(n),
        Some(PointIdOptions::Uuid(u)) => PointId::Str(u),
        None => PointId::Str(String::new()),
    }
}

/// The unnamed dense vector; named or sparse vectors are treated as absent
fn dense_vector(vectors: Vectors) -> Option<Vec<f32>> {
    match vectors.vectors_options {
        Some(VectorsOptions::Vector(vector)) if vector.indices.is_none() => {
            Some(vector.data).filter(|v| !v.is_empty())
        }
        _ => None,
    }
}

fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    let kind = match json {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(b) => Kind::BoolValue(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => Kind::StringValue(s),
        JsonValue::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant_value).collect(),
        }),
        JsonValue::Object(fields) => Kind::StructValue(Struct {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key, json_to_qdrant_value(value)))
                .collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

fn qdrant_to_json_value(value: QdrantValue) -> JsonValue {
    match value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(b),
        Some(Kind::IntegerValue(i)) => JsonValue::from(i),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f)
            .map_or(JsonValue::Null, JsonValue::Number),
        Some(Kind::StringValue(s)) => JsonValue::String(s),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(qdrant_to_json_value).collect())
        }
        Some(Kind::StructValue(object)) => JsonValue::Object(
            object
                .fields
                .into_iter()
                .map(|(key, value)| (key, qdrant_to_json_value(value)))
                .collect(),
        ),
    }
}
