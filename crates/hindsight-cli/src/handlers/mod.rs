mod eval;
mod export;
mod holdout;
mod ingest;
mod sessions;
mod suggest;

pub use eval::handle_eval;
pub use export::handle_export_bundle;
pub use holdout::handle_holdout;
pub use ingest::handle_ingest;
pub use sessions::handle_sessions;
pub use suggest::handle_suggest;

/// Process exit codes fixed by contract
pub const EXIT_OK: i32 = 0;
pub const EXIT_GATE_FAILED: i32 = 2;
pub const EXIT_FAMILY_OVERLAP: i32 = 3;
