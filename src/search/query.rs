//! Search request validation and store query construction

use crate::store::{DefaultOperator, StoreQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// Client search request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    /// Query-string text; blank lists every indexed track
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub q: String,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: usize,

    #[serde(default)]
    #[validate(range(max = 100000))]
    pub offset: usize,
}

fn default_limit() -> usize {
    10
}

impl SearchRequest {
    pub fn new(q: impl Into<String>, limit: usize, offset: usize) -> Self {
        Self {
            q: q.into(),
            limit,
            offset,
        }
    }
}

/// Turns a session's indexed ids and a request into a store query
pub struct SearchQueryBuilder;

impl SearchQueryBuilder {
    /// `None` when `ids` is empty: nothing can match, so the store is not asked
    pub fn build(ids: BTreeSet<String>, request: &SearchRequest) -> Option<StoreQuery> {
        if ids.is_empty() {
            return None;
        }

        Some(StoreQuery {
            ids,
            text: request.q.trim().to_string(),
            analyze_wildcard: true,
            default_operator: DefaultOperator::And,
            limit: request.limit,
            offset: request.offset,
            explain: true,
        })
    }
}
