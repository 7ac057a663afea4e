mod bm25;
mod composite;
mod document;
mod error;
mod tokenize;
mod traits;

pub use bm25::{Bm25Config, LexicalIndex, SearchQuery, SearchResult};
pub use composite::{CompositeConfig, CompositeIndex};
pub use document::{
    parse_swebench_session, DocumentBuilder, IndexedDocument, MetaValue, Metadata,
    SwebenchSession,
};
pub use error::{Error, Result};
pub use tokenize::{bound_query_terms, tokenize};
pub use traits::DocumentIndex;
