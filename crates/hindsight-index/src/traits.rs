use crate::bm25::{SearchQuery, SearchResult};
use crate::document::IndexedDocument;
use crate::error::Result;

/// Seam between the composite index and its retrieval backends. The primary
/// is always the in-process lexical index; a secondary backend (for example
/// an external ANN service) is opaque behind this trait.
pub trait DocumentIndex: Send + Sync {
    fn upsert(&self, doc: IndexedDocument) -> Result<()>;

    fn upsert_many(&self, docs: Vec<IndexedDocument>) -> Result<()> {
        for doc in docs {
            self.upsert(doc)?;
        }
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>>;
}
