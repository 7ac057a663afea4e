// Internal modules (not exposed to external crates)
pub(crate) mod config;
pub(crate) mod facade;
pub(crate) mod learning;
pub(crate) mod storage;

mod error;

pub use error::{Error, Result};

// Storage surface
pub use storage::{export_session, BundleMeta, BundleReceipt, BundleStore, EventFilter, TraceStore};

// Learning loop and harness sink
pub use facade::{HarnessSink, SinkOptions};
pub use learning::{BootstrapOutcome, LearningLoop, Reranker, SuggestQuery};

// Configuration
pub use config::{resolve_workspace_path, CompositeSettings, Config, IndexSettings};
