use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bm25::{SearchQuery, SearchResult};
use crate::document::IndexedDocument;
use crate::error::{Error, Result};
use crate::traits::DocumentIndex;

/// Reciprocal-rank-fusion parameters
#[derive(Debug, Clone)]
pub struct CompositeConfig {
    pub rrf_k: f64,
    pub primary_weight: f64,
    pub secondary_weight: f64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            primary_weight: 1.25,
            secondary_weight: 1.0,
        }
    }
}

impl CompositeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("reciprocalRankFusionK", self.rrf_k),
            ("primaryWeight", self.primary_weight),
            ("secondaryWeight", self.secondary_weight),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "{} must be finite and positive: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Minimum fanout requested from each backend before fusion
const MIN_FANOUT: usize = 20;

struct FusedEntry {
    document: IndexedDocument,
    fused: f64,
    primary_rank: Option<usize>,
    secondary_rank: Option<usize>,
}

/// Fuses a primary index with an optional secondary backend by
/// reciprocal-rank fusion. Upserts fan out to both backends; searches fan
/// out with `max(limit, 20)` and merge ranked lists.
pub struct CompositeIndex {
    primary: Arc<dyn DocumentIndex>,
    secondary: Option<Arc<dyn DocumentIndex>>,
    config: CompositeConfig,
}

impl CompositeIndex {
    pub fn new(
        primary: Arc<dyn DocumentIndex>,
        secondary: Option<Arc<dyn DocumentIndex>>,
        config: CompositeConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            primary,
            secondary,
            config,
        })
    }

    fn fuse(
        &self,
        primary_results: Vec<SearchResult>,
        secondary_results: Vec<SearchResult>,
        limit: usize,
    ) -> Vec<SearchResult> {
        let mut entries: HashMap<String, FusedEntry> = HashMap::new();

        for (rank, result) in primary_results.into_iter().enumerate() {
            let contribution = self.config.primary_weight / (self.config.rrf_k + rank as f64 + 1.0);
            let entry = entries
                .entry(result.document.id.clone())
                .or_insert_with(|| FusedEntry {
                    document: result.document,
                    fused: 0.0,
                    primary_rank: None,
                    secondary_rank: None,
                });
            entry.fused += contribution;
            entry.primary_rank = Some(rank);
        }

        for (rank, result) in secondary_results.into_iter().enumerate() {
            let contribution =
                self.config.secondary_weight / (self.config.rrf_k + rank as f64 + 1.0);
            let entry = entries
                .entry(result.document.id.clone())
                .or_insert_with(|| FusedEntry {
                    document: result.document,
                    fused: 0.0,
                    primary_rank: None,
                    secondary_rank: None,
                });
            entry.fused += contribution;
            entry.secondary_rank = Some(rank);
        }

        let mut fused: Vec<FusedEntry> = entries.into_values().collect();
        fused.sort_by(|a, b| {
            b.fused
                .partial_cmp(&a.fused)
                .unwrap_or(Ordering::Equal)
                .then_with(|| rank_cmp(a.primary_rank, b.primary_rank))
                .then_with(|| rank_cmp(a.secondary_rank, b.secondary_rank))
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        fused.truncate(limit);

        fused
            .into_iter()
            .map(|entry| SearchResult {
                document: entry.document,
                score: entry.fused,
            })
            .collect()
    }
}

/// Present ranks beat absent ones; among present, lower rank wins
fn rank_cmp(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl DocumentIndex for CompositeIndex {
    fn upsert(&self, doc: IndexedDocument) -> Result<()> {
        self.primary.upsert(doc.clone())?;
        if let Some(secondary) = &self.secondary {
            secondary.upsert(doc)?;
        }
        Ok(())
    }

    fn upsert_many(&self, docs: Vec<IndexedDocument>) -> Result<()> {
        self.primary.upsert_many(docs.clone())?;
        if let Some(secondary) = &self.secondary {
            secondary.upsert_many(docs)?;
        }
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let fanout = query.limit.max(MIN_FANOUT);
        let mut fanout_query = query.clone();
        fanout_query.limit = fanout;

        let primary_results = self.primary.search(&fanout_query)?;
        let secondary_results = match &self.secondary {
            Some(secondary) => secondary.search(&fanout_query)?,
            None => Vec::new(),
        };

        Ok(self.fuse(primary_results, secondary_results, query.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bm25::LexicalIndex;
    use crate::document::Metadata;

    fn doc(id: &str, text: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            source_event_id: id.to_string(),
            text: text.to_string(),
            metadata: Metadata::new(),
        }
    }

    /// Fixed-order backend standing in for an external ANN index
    struct FixedIndex {
        results: Vec<IndexedDocument>,
    }

    impl DocumentIndex for FixedIndex {
        fn upsert(&self, _doc: IndexedDocument) -> Result<()> {
            Ok(())
        }

        fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
            Ok(self
                .results
                .iter()
                .take(query.limit)
                .enumerate()
                .map(|(rank, document)| SearchResult {
                    document: document.clone(),
                    score: 1.0 / (rank as f64 + 1.0),
                })
                .collect())
        }
    }

    #[test]
    fn test_primary_only_matches_primary_search() {
        let primary = Arc::new(LexicalIndex::with_defaults());
        primary.upsert(doc("a:base", "pytest tests failing")).unwrap();
        primary.upsert(doc("b:base", "cargo build release")).unwrap();
        primary.upsert(doc("c:base", "pytest tests")).unwrap();

        let composite =
            CompositeIndex::new(primary.clone(), None, CompositeConfig::default()).unwrap();

        let query = SearchQuery::new("pytest tests", 5);
        let direct: Vec<String> = primary
            .search(&query)
            .unwrap()
            .into_iter()
            .map(|r| r.document.id)
            .collect();
        let fused: Vec<String> = composite
            .search(&query)
            .unwrap()
            .into_iter()
            .map(|r| r.document.id)
            .collect();
        assert_eq!(direct, fused);
    }

    #[test]
    fn test_fusion_rewards_agreement() {
        let primary = Arc::new(LexicalIndex::with_defaults());
        primary.upsert(doc("shared", "pytest tests shared")).unwrap();
        primary.upsert(doc("only-primary", "pytest tests alpha")).unwrap();

        let secondary = Arc::new(FixedIndex {
            results: vec![doc("shared", ""), doc("only-secondary", "")],
        });

        let composite =
            CompositeIndex::new(primary, Some(secondary), CompositeConfig::default()).unwrap();
        let results = composite.search(&SearchQuery::new("pytest tests", 3)).unwrap();

        assert_eq!(results[0].document.id, "shared");
        assert!(results.len() >= 2);
    }

    #[test]
    fn test_tie_break_prefers_primary_rank() {
        // Two docs that only appear in one source each, same rank, same
        // weight: primary presence wins.
        let config = CompositeConfig {
            primary_weight: 1.0,
            ..Default::default()
        };
        let primary = Arc::new(FixedIndex {
            results: vec![doc("from-primary", "")],
        });
        let secondary = Arc::new(FixedIndex {
            results: vec![doc("from-secondary", "")],
        });
        let composite = CompositeIndex::new(primary, Some(secondary), config).unwrap();

        let results = composite.search(&SearchQuery::new("anything", 2)).unwrap();
        assert_eq!(results[0].document.id, "from-primary");
        assert_eq!(results[1].document.id, "from-secondary");
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let config = CompositeConfig {
            primary_weight: 0.0,
            ..Default::default()
        };
        let primary: Arc<dyn DocumentIndex> = Arc::new(LexicalIndex::with_defaults());
        assert!(CompositeIndex::new(primary, None, config).is_err());
    }

    #[test]
    fn test_zero_limit_returns_empty() {
        let primary: Arc<dyn DocumentIndex> = Arc::new(LexicalIndex::with_defaults());
        let composite = CompositeIndex::new(primary, None, CompositeConfig::default()).unwrap();
        assert!(composite
            .search(&SearchQuery::new("pytest", 0))
            .unwrap()
            .is_empty());
    }
}
