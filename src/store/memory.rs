use super::{DefaultOperator, DocumentStore, StoreHit, StoreHits, StoreQuery, StoreResult};
use crate::models::Document;
use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;

/// In-memory document store (for development and testing)
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<DashMap<String, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.get(id).map(|entry| entry.clone())
    }
}

/// A single query term, lowercased, optionally a wildcard pattern
enum Term {
    Word(String),
    Pattern(Regex),
}

impl Term {
    fn parse(raw: &str, analyze_wildcard: bool) -> Option<Self> {
        let word = raw
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '*' && c != '?')
            .to_lowercase();
        if word.is_empty() {
            return None;
        }
        if analyze_wildcard && word.contains(['*', '?']) {
            let pattern = regex::escape(&word)
                .replace(r"\*", ".*")
                .replace(r"\?", ".");
            return Regex::new(&format!("^{}$", pattern)).ok().map(Term::Pattern);
        }
        Some(Term::Word(word))
    }

    fn count_in(&self, words: &[String]) -> usize {
        words
            .iter()
            .filter(|w| match self {
                Term::Word(term) => *w == term,
                Term::Pattern(re) => re.is_match(w),
            })
            .count()
    }
}

fn words_of(document: &Document) -> Vec<String> {
    let mut text = format!("{} {}", document.title, document.artists.join(" "));
    if let Some(album) = &document.album {
        text.push(' ');
        text.push_str(album);
    }
    text.push(' ');
    text.push_str(&document.lyrics);

    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn score(document: &Document, terms: &[Term], operator: DefaultOperator) -> Option<f32> {
    if terms.is_empty() {
        return Some(1.0);
    }
    let words = words_of(document);
    let counts: Vec<usize> = terms.iter().map(|t| t.count_in(&words)).collect();
    let matched = match operator {
        DefaultOperator::And => counts.iter().all(|&c| c > 0),
        DefaultOperator::Or => counts.iter().any(|&c| c > 0),
    };
    matched.then(|| counts.iter().sum::<usize>() as f32)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.documents.contains_key(id))
    }

    async fn upsert(&self, document: &Document) -> StoreResult<()> {
        self.documents.insert(document.id.clone(), document.clone());
        tracing::debug!(document_id = %document.id, "Document stored");
        Ok(())
    }

    async fn search(&self, query: &StoreQuery) -> StoreResult<StoreHits> {
        let terms: Vec<Term> = query
            .text
            .split_whitespace()
            .filter_map(|raw| Term::parse(raw, query.analyze_wildcard))
            .collect();

        let mut matches: Vec<(f32, Document)> = query
            .ids
            .iter()
            .filter_map(|id| self.documents.get(id).map(|entry| entry.clone()))
            .filter_map(|doc| score(&doc, &terms, query.default_operator).map(|s| (s, doc)))
            .collect();

        // Highest score first, ties broken by id for stable paging
        matches.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        let total = matches.len();
        let hits = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(score, document)| StoreHit {
                id: document.id.clone(),
                explanation: query.explain.then(|| {
                    serde_json::json!({
                        "value": score,
                        "description": "sum of matched term occurrences",
                    })
                }),
                document,
                score,
            })
            .collect();

        Ok(StoreHits { total, hits })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use std::collections::BTreeSet;

    fn doc(id: &str, title: &str, lyrics: &str) -> Document {
        Document::from_track(
            &Track::new(id, title, vec!["Band".into()]),
            lyrics.to_string(),
            None,
        )
    }

    fn query(ids: &[&str], text: &str) -> StoreQuery {
        StoreQuery {
            ids: ids.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            text: text.to_string(),
            analyze_wildcard: true,
            default_operator: DefaultOperator::And,
            limit: 10,
            offset: 0,
            explain: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_immediately_visible() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.exists("1").await.unwrap());
        store.upsert(&doc("1", "Song", "hello")).await.unwrap();
        assert!(store.exists("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_ids() {
        let store = InMemoryDocumentStore::new();
        store.upsert(&doc("1", "One", "shared words")).await.unwrap();
        store.upsert(&doc("2", "Two", "shared words")).await.unwrap();

        let hits = store.search(&query(&["2"], "shared")).await.unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].id, "2");
    }

    #[tokio::test]
    async fn test_and_operator_requires_every_term() {
        let store = InMemoryDocumentStore::new();
        store.upsert(&doc("1", "A", "red blue")).await.unwrap();
        store.upsert(&doc("2", "B", "red green")).await.unwrap();

        let hits = store.search(&query(&["1", "2"], "red blue")).await.unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].id, "1");
    }

    #[tokio::test]
    async fn test_wildcards_expand() {
        let store = InMemoryDocumentStore::new();
        store.upsert(&doc("1", "A", "dancing queen")).await.unwrap();

        let hits = store.search(&query(&["1"], "danc*")).await.unwrap();
        assert_eq!(hits.total, 1);
        let hits = store.search(&query(&["1"], "qu?en")).await.unwrap();
        assert_eq!(hits.total, 1);
    }

    #[tokio::test]
    async fn test_blank_text_matches_all_ids_with_paging() {
        let store = InMemoryDocumentStore::new();
        for id in ["1", "2", "3"] {
            store.upsert(&doc(id, "T", "")).await.unwrap();
        }

        let mut q = query(&["1", "2", "3"], "  ");
        q.limit = 2;
        q.offset = 1;
        let hits = store.search(&q).await.unwrap();
        assert_eq!(hits.total, 3);
        let ids: Vec<_> = hits.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }
}
