use std::path::PathBuf;
use thiserror::Error;

mod config;
mod disc;
mod engine;
mod orchestrator;
mod progress;
pub mod symbols;
mod version;

pub use config::{ConfigError, PatchConfiguration, PatchRequest};
pub use disc::DiscHeader;
pub use engine::{EngineError, PatchEngine, PatchJob};
pub use orchestrator::{patch_image, patch_iso, Orchestrator};
pub use progress::{EngineProgress, ProgressCollector, ProgressEvent, ProgressSink};
pub use symbols::{resolve, Symbol, SymbolTable, UnknownSymbol};
pub use version::{UnknownVersion, Version};

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unrecognized game version: {0}")]
    UnknownVersion(String),
    #[error("invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },
    #[error("patch engine failed: {0}")]
    EngineFailure(#[source] EngineError),
    #[error("IO error: {0}")]
    IoFailure(#[from] std::io::Error),
    /// Only produced by [`patch_iso`], when the request itself does not parse.
    #[error("invalid patch request: {0}")]
    InvalidRequest(#[from] ConfigError),
}

impl From<UnknownVersion> for PatchError {
    fn from(err: UnknownVersion) -> Self {
        PatchError::UnknownVersion(err.0)
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
