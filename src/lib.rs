//! Lyric-aware search over a music streaming library.
//!
//! A session holds a catalog credential. Opening the progress stream starts an
//! indexing run that fetches the session's saved tracks, resolves lyrics through
//! a chain of sources and writes one document per track to the document store.
//! Searches are scoped to the tracks the session has indexed.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod indexing;
pub mod lyrics;
pub mod metrics;
pub mod models;
pub mod search;
pub mod session;
pub mod store;

pub use error::{AppError, Result};
