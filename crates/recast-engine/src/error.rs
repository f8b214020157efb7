//! Engine error taxonomy.

use std::path::PathBuf;

use crate::codec::CodecError;

/// Per-exchange errors surfaced by the rewriting engine.
///
/// Configuration problems are fatal at construction time and reported there;
/// everything below is scoped to the one exchange that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no API rule matches {url}; check the rules under {}", api_rules_dir.display())]
    NoBinding { url: String, api_rules_dir: PathBuf },

    #[error("unknown schema '{schema}' requested for {url}")]
    UnknownSchema { schema: String, url: String },

    #[error("fixture {path} is not valid JSON: {reason}")]
    InvalidFixture { path: String, reason: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
