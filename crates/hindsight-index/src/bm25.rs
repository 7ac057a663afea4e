use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::document::{IndexedDocument, Metadata};
use crate::error::{Error, Result};
use crate::tokenize::{bound_query_terms, tokenize};
use crate::traits::DocumentIndex;

/// BM25 scoring parameters plus the query-term cap
#[derive(Debug, Clone)]
pub struct Bm25Config {
    pub k1: f64,
    pub b: f64,
    pub max_query_terms: usize,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            max_query_terms: 128,
        }
    }
}

impl Bm25Config {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(Error::Config(format!("k1 must be finite and >= 0: {}", self.k1)));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(Error::Config(format!("b must be within [0, 1]: {}", self.b)));
        }
        Ok(())
    }
}

/// A retrieval request against an index
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    pub filter: Metadata,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            filter: Metadata::new(),
            limit,
        }
    }

    pub fn with_filter(mut self, key: &str, value: impl Into<crate::document::MetaValue>) -> Self {
        self.filter.insert(key.to_string(), value.into());
        self
    }
}

/// A ranked hit
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: IndexedDocument,
    pub score: f64,
}

#[derive(Default)]
struct IndexState {
    /// doc id -> (document, token length)
    docs: HashMap<String, (IndexedDocument, u32)>,
    /// term -> doc id -> term frequency
    postings: HashMap<String, HashMap<String, u32>>,
    total_tokens: u64,
}

impl IndexState {
    fn remove_doc(&mut self, id: &str) {
        if let Some((old, length)) = self.docs.remove(id) {
            for term in tokenize(&old.text) {
                let mut emptied = false;
                if let Some(posting) = self.postings.get_mut(&term) {
                    posting.remove(id);
                    emptied = posting.is_empty();
                }
                if emptied {
                    self.postings.remove(&term);
                }
            }
            self.total_tokens = self.total_tokens.saturating_sub(length as u64);
        }
    }

    fn insert_doc(&mut self, doc: IndexedDocument) {
        let tokens = tokenize(&doc.text);
        let length = tokens.len() as u32;
        for term in tokens {
            *self
                .postings
                .entry(term)
                .or_default()
                .entry(doc.id.clone())
                .or_insert(0) += 1;
        }
        self.total_tokens += length as u64;
        self.docs.insert(doc.id.clone(), (doc, length));
    }
}

/// In-memory inverted index with BM25 ranking. `upsert` replaces any prior
/// document with the same id; posting lists, document length, and the
/// corpus total are updated under one write lock so readers always see a
/// consistent snapshot.
pub struct LexicalIndex {
    config: Bm25Config,
    state: RwLock<IndexState>,
}

impl LexicalIndex {
    pub fn new(config: Bm25Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: RwLock::new(IndexState::default()),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: Bm25Config::default(),
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn document_count(&self) -> usize {
        self.state.map_read(|state| state.docs.len())
    }

    fn score_query(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let tokens = tokenize(&query.text);
        if tokens.is_empty() || query.limit == 0 {
            return Vec::new();
        }
        let terms = bound_query_terms(&tokens, self.config.max_query_terms);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut query_tf: BTreeMap<&str, u32> = BTreeMap::new();
        for term in &terms {
            let count = tokens.iter().filter(|t| *t == term).count() as u32;
            query_tf.insert(term.as_str(), count.max(1));
        }

        self.state.map_read(|state| {
            let doc_count = state.docs.len();
            if doc_count == 0 {
                return Vec::new();
            }
            let avgdl = state.total_tokens as f64 / doc_count as f64;

            let mut scores: HashMap<&str, f64> = HashMap::new();
            for (term, qtf) in &query_tf {
                let posting = match state.postings.get(*term) {
                    Some(p) => p,
                    None => continue,
                };
                let df = posting.len() as f64;
                let idf =
                    (1.0 + (doc_count as f64 - df + 0.5) / (df + 0.5)).ln();

                for (doc_id, tf) in posting {
                    let (_, length) = &state.docs[doc_id];
                    let tf = *tf as f64;
                    let denom = tf
                        + self.config.k1
                            * (1.0 - self.config.b + self.config.b * (*length as f64) / avgdl);
                    let contribution =
                        (*qtf as f64) * idf * (tf * (self.config.k1 + 1.0) / denom);
                    *scores.entry(doc_id.as_str()).or_insert(0.0) += contribution;
                }
            }

            let mut results: Vec<SearchResult> = scores
                .into_iter()
                .filter_map(|(doc_id, score)| {
                    let (doc, _) = state.docs.get(doc_id)?;
                    if !doc.matches_filter(&query.filter) {
                        return None;
                    }
                    Some(SearchResult {
                        document: doc.clone(),
                        score,
                    })
                })
                .collect();

            results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.document.id.cmp(&b.document.id))
            });
            results.truncate(query.limit);
            results
        })
    }
}

impl DocumentIndex for LexicalIndex {
    fn upsert(&self, doc: IndexedDocument) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| Error::Query("index lock poisoned".to_string()))?;
        state.remove_doc(&doc.id.clone());
        state.insert_doc(doc);
        Ok(())
    }

    fn upsert_many(&self, docs: Vec<IndexedDocument>) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| Error::Query("index lock poisoned".to_string()))?;
        for doc in docs {
            state.remove_doc(&doc.id.clone());
            state.insert_doc(doc);
        }
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        Ok(self.score_query(query))
    }
}

/// Read-lock helper that treats poisoning as an empty read
trait MapRead<T> {
    fn map_read<R>(&self, f: impl FnOnce(&T) -> R) -> R;
}

impl MapRead<IndexState> for RwLock<IndexState> {
    fn map_read<R>(&self, f: impl FnOnce(&IndexState) -> R) -> R {
        match self.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            source_event_id: id.trim_end_matches(":base").to_string(),
            text: text.to_string(),
            metadata: Metadata::new(),
        }
    }

    fn doc_with_meta(id: &str, text: &str, pairs: &[(&str, crate::document::MetaValue)]) -> IndexedDocument {
        let mut d = doc(id, text);
        for (key, value) in pairs {
            d.metadata.insert(key.to_string(), value.clone());
        }
        d
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = LexicalIndex::with_defaults();
        let results = index.search(&SearchQuery::new("anything at all", 5)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_term_query_returns_empty() {
        let index = LexicalIndex::with_defaults();
        index.upsert(doc("a:base", "pytest tests")).unwrap();
        assert!(index.search(&SearchQuery::new("", 5)).unwrap().is_empty());
        assert!(index.search(&SearchQuery::new("! @ #", 5)).unwrap().is_empty());
    }

    #[test]
    fn test_ranking_prefers_matching_terms() {
        let index = LexicalIndex::with_defaults();
        index
            .upsert(doc("a:base", "pytest tests\nCommand failed"))
            .unwrap();
        index
            .upsert(doc(
                "b:base",
                "pytest tests -k failing_case --maxfail=1",
            ))
            .unwrap();
        index.upsert(doc("c:base", "cargo build --release")).unwrap();

        let results = index
            .search(&SearchQuery::new("pytest failing_case", 3))
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].document.id, "b:base");
    }

    #[test]
    fn test_upsert_replaces_previous_document() {
        let index = LexicalIndex::with_defaults();
        index.upsert(doc("a:base", "alpha beta")).unwrap();
        index.upsert(doc("a:base", "gamma delta")).unwrap();

        assert_eq!(index.document_count(), 1);
        assert!(index
            .search(&SearchQuery::new("alpha", 5))
            .unwrap()
            .is_empty());
        let results = index.search(&SearchQuery::new("gamma", 5)).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_filter_restricts_results() {
        let index = LexicalIndex::with_defaults();
        index
            .upsert(doc_with_meta(
                "a:base",
                "pytest tests",
                &[("isError", true.into())],
            ))
            .unwrap();
        index
            .upsert(doc_with_meta(
                "b:base",
                "pytest tests again",
                &[("isError", false.into())],
            ))
            .unwrap();
        index.upsert(doc("c:base", "pytest bare")).unwrap();

        let query = SearchQuery::new("pytest", 10).with_filter("isError", false);
        let results = index.search(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "b:base");
    }

    #[test]
    fn test_limit_respected_and_order_deterministic() {
        let index = LexicalIndex::with_defaults();
        for i in 0..10 {
            index
                .upsert(doc(&format!("doc{}:base", i), "same text here"))
                .unwrap();
        }
        let results = index.search(&SearchQuery::new("same text", 4)).unwrap();
        assert_eq!(results.len(), 4);
        // Equal scores fall back to id order
        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["doc0:base", "doc1:base", "doc2:base", "doc3:base"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Bm25Config {
            k1: f64::NAN,
            ..Default::default()
        };
        assert!(LexicalIndex::new(config).is_err());
    }
}
