//! Full-text search over the tracks a session has indexed.

mod query;
mod service;

pub use query::{SearchQueryBuilder, SearchRequest};
pub use service::{SearchResults, SearchService};
