use super::{
    DefaultOperator, DocumentStore, StoreError, StoreHit, StoreHits, StoreQuery, StoreResult,
};
use crate::config::StoreConfig;
use crate::models::Document;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Elasticsearch-backed document store over the REST API
#[derive(Clone)]
pub struct ElasticStore {
    client: Client,
    base_url: String,
    index: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: usize,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Document,
    #[serde(rename = "_explanation", default)]
    explanation: Option<Value>,
}

impl ElasticStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                StoreError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.elastic_url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            timeout: config.timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.index, path)
    }

    async fn run_search(&self, body: &Value) -> StoreResult<Option<SearchResponse>> {
        let response = self
            .client
            .post(self.url("_search"))
            .json(body)
            .send()
            .await?;

        // A missing index simply holds no documents yet
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = error_for_status(response).await?;
        Ok(Some(response.json().await?))
    }
}

async fn error_for_status(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST {
        return Err(StoreError::InvalidQuery(body));
    }
    Err(StoreError::Backend(format!("status {}: {}", status.as_u16(), body)))
}

/// Search body: bool/must of an ids filter and a query_string match
pub(crate) fn search_body(query: &StoreQuery, timeout: Duration) -> Value {
    let ids: Vec<&str> = query.ids.iter().map(String::as_str).collect();
    let operator = match query.default_operator {
        DefaultOperator::And => "AND",
        DefaultOperator::Or => "OR",
    };
    let text_clause = if query.has_text() {
        json!({
            "query_string": {
                "query": query.text,
                "analyze_wildcard": query.analyze_wildcard,
                "default_operator": operator,
            }
        })
    } else {
        json!({ "match_all": {} })
    };

    json!({
        "query": {
            "bool": {
                "must": [
                    { "ids": { "values": ids } },
                    text_clause,
                ]
            }
        },
        "track_scores": true,
        "explain": query.explain,
        "from": query.offset,
        "size": query.limit,
        "timeout": format!("{}ms", timeout.as_millis()),
    })
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let body = json!({
            "query": { "ids": { "values": [id] } },
            "size": 0,
        });
        let found = self
            .run_search(&body)
            .await?
            .map_or(false, |response| response.hits.total.value > 0);
        debug!(document_id = id, found, "Existence check");
        Ok(found)
    }

    async fn upsert(&self, document: &Document) -> StoreResult<()> {
        let response = self
            .client
            .put(self.url(&format!("_doc/{}", document.id)))
            .query(&[("refresh", "wait_for")])
            .json(document)
            .send()
            .await?;
        error_for_status(response).await?;
        debug!(document_id = %document.id, "Document indexed");
        Ok(())
    }

    async fn search(&self, query: &StoreQuery) -> StoreResult<StoreHits> {
        let body = search_body(query, self.timeout);
        let Some(response) = self.run_search(&body).await? else {
            return Ok(StoreHits::default());
        };

        let hits = response
            .hits
            .hits
            .into_iter()
            .map(|hit| StoreHit {
                id: hit.id,
                document: hit.source,
                score: hit.score.unwrap_or_default(),
                explanation: hit.explanation,
            })
            .collect();

        Ok(StoreHits {
            total: response.hits.total.value,
            hits,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        let response = self.client.get(&self.base_url).send().await?;
        error_for_status(response).await?;
        Ok(())
    }
}
