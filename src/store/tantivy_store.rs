//! Embedded tantivy index as a document store

use super::{
    DefaultOperator, DocumentStore, StoreError, StoreHit, StoreHits, StoreQuery, StoreResult,
};
use crate::models::Document;
use async_trait::async_trait;
use std::path::Path;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, RegexQuery, TermQuery, TermSetQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

impl From<tantivy::TantivyError> for StoreError {
    fn from(err: tantivy::TantivyError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for StoreError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        StoreError::InvalidQuery(err.to_string())
    }
}

#[derive(Clone, Copy)]
struct TrackFields {
    id: Field,
    title: Field,
    artists: Field,
    album: Field,
    lyrics: Field,
    /// Whole document as JSON, returned on hits
    source: Field,
}

impl TrackFields {
    fn from_schema(schema: &Schema) -> StoreResult<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            title: schema.get_field("title")?,
            artists: schema.get_field("artists")?,
            album: schema.get_field("album")?,
            lyrics: schema.get_field("lyrics")?,
            source: schema.get_field("source")?,
        })
    }

    fn text(&self) -> Vec<Field> {
        vec![self.title, self.artists, self.album, self.lyrics]
    }
}

/// Build the track document schema
pub fn build_track_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // ID - stored, indexed as a single term
    schema_builder.add_text_field("id", STRING | STORED);

    schema_builder.add_text_field("title", TEXT);
    schema_builder.add_text_field("artists", TEXT);
    schema_builder.add_text_field("album", TEXT);
    schema_builder.add_text_field("lyrics", TEXT);

    schema_builder.add_text_field("source", STORED);

    schema_builder.build()
}

/// Tantivy-backed document store; every upsert commits and reloads the reader
pub struct TantivyStore {
    index: Index,
    fields: TrackFields,
    writer: RwLock<IndexWriter>,
    reader: IndexReader,
}

impl TantivyStore {
    /// Open the index at `path`, creating it if needed
    pub fn open(path: &Path, writer_heap_size: usize) -> StoreResult<Self> {
        std::fs::create_dir_all(path)?;

        let index = if path.join("meta.json").exists() {
            Index::open_in_dir(path)?
        } else {
            Index::create_in_dir(path, build_track_schema())?
        };
        Self::from_index(index, writer_heap_size)
    }

    fn from_index(index: Index, writer_heap_size: usize) -> StoreResult<Self> {
        let fields = TrackFields::from_schema(&index.schema())?;
        let writer: IndexWriter = index.writer_with_num_threads(1, writer_heap_size)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            fields,
            writer: RwLock::new(writer),
            reader,
        })
    }

    fn to_tantivy_doc(&self, document: &Document) -> StoreResult<TantivyDocument> {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.id, &document.id);
        doc.add_text(self.fields.title, &document.title);
        for artist in &document.artists {
            doc.add_text(self.fields.artists, artist);
        }
        if let Some(album) = &document.album {
            doc.add_text(self.fields.album, album);
        }
        doc.add_text(self.fields.lyrics, &document.lyrics);
        doc.add_text(self.fields.source, serde_json::to_string(document)?);
        Ok(doc)
    }

    fn from_tantivy_doc(&self, doc: &TantivyDocument) -> StoreResult<Document> {
        let source = doc
            .get_first(self.fields.source)
            .and_then(|v| v.as_str())
            .ok_or_else(|| StoreError::Serialization("hit has no stored source".to_string()))?;
        Ok(serde_json::from_str(source)?)
    }

    fn wildcard_query(&self, term: &str) -> StoreResult<Box<dyn Query>> {
        let pattern = regex::escape(term)
            .replace(r"\*", ".*")
            .replace(r"\?", ".");
        let per_field = self
            .fields
            .text()
            .into_iter()
            .map(|field| {
                RegexQuery::from_pattern(&pattern, field)
                    .map(|q| (Occur::Should, Box::new(q) as Box<dyn Query>))
            })
            .collect::<tantivy::Result<Vec<_>>>()?;
        Ok(Box::new(BooleanQuery::new(per_field)))
    }

    fn text_query(&self, query: &StoreQuery) -> StoreResult<Option<Box<dyn Query>>> {
        let mut plain = Vec::new();
        let mut parts: Vec<Box<dyn Query>> = Vec::new();

        for raw in query.text.split_whitespace() {
            if query.analyze_wildcard && raw.contains(['*', '?']) {
                let term = raw
                    .trim_matches(|c: char| !c.is_alphanumeric() && c != '*' && c != '?')
                    .to_lowercase();
                if !term.is_empty() {
                    parts.push(self.wildcard_query(&term)?);
                }
            } else {
                plain.push(raw);
            }
        }

        if !plain.is_empty() {
            let mut parser = QueryParser::for_index(&self.index, self.fields.text());
            if query.default_operator == DefaultOperator::And {
                parser.set_conjunction_by_default();
            }
            parts.push(parser.parse_query(&plain.join(" "))?);
        }

        if parts.is_empty() {
            return Ok(None);
        }
        let occur = match query.default_operator {
            DefaultOperator::And => Occur::Must,
            DefaultOperator::Or => Occur::Should,
        };
        Ok(Some(Box::new(BooleanQuery::new(
            parts.into_iter().map(|q| (occur, q)).collect(),
        ))))
    }

    fn build_query(&self, query: &StoreQuery) -> StoreResult<BooleanQuery> {
        let id_terms = query
            .ids
            .iter()
            .map(|id| Term::from_field_text(self.fields.id, id));
        let id_query: Box<dyn Query> = Box::new(TermSetQuery::new(id_terms));
        let mut clauses = vec![(Occur::Must, id_query)];

        if let Some(text) = self.text_query(query)? {
            clauses.push((Occur::Must, text));
        }
        Ok(BooleanQuery::new(clauses))
    }
}

#[async_trait]
impl DocumentStore for TantivyStore {
    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.fields.id, id),
            IndexRecordOption::Basic,
        );
        Ok(searcher.search(&query, &Count)? > 0)
    }

    async fn upsert(&self, document: &Document) -> StoreResult<()> {
        let tantivy_doc = self.to_tantivy_doc(document)?;

        let mut writer = self.writer.write().await;
        writer.delete_term(Term::from_field_text(self.fields.id, &document.id));
        writer.add_document(tantivy_doc)?;
        writer.commit()?;
        self.reader.reload()?;

        tracing::debug!(document_id = %document.id, "Document committed");
        Ok(())
    }

    async fn search(&self, query: &StoreQuery) -> StoreResult<StoreHits> {
        if query.ids.is_empty() {
            return Ok(StoreHits::default());
        }

        let tantivy_query = self.build_query(query)?;
        let searcher = self.reader.searcher();
        let total = searcher.search(&tantivy_query, &Count)?;

        // TopDocs rejects a zero limit
        if query.limit == 0 {
            return Ok(StoreHits {
                total,
                hits: Vec::new(),
            });
        }

        let top_docs = searcher.search(
            &tantivy_query,
            &TopDocs::with_limit(query.limit).and_offset(query.offset),
        )?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved: TantivyDocument = searcher.doc(doc_address)?;
            let document = self.from_tantivy_doc(&retrieved)?;
            let explanation = if query.explain {
                let explained = tantivy_query.explain(&searcher, doc_address)?;
                serde_json::from_str(&explained.to_pretty_json()).ok()
            } else {
                None
            };
            hits.push(StoreHit {
                id: document.id.clone(),
                document,
                score,
                explanation,
            });
        }

        Ok(StoreHits { total, hits })
    }

    async fn ping(&self) -> StoreResult<()> {
        let _ = self.reader.searcher().num_docs();
        Ok(())
    }
}
