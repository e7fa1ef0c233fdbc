use std::io;
use std::path::Path;
use thiserror::Error;

use crate::config::PatchConfiguration;
use crate::disc::DiscHeader;
use crate::progress::EngineProgress;
use crate::symbols::SymbolTable;

/// Failures reported by a patch engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The image is malformed, of an unsupported format, or does not fit.
    #[error("image container error: {0}")]
    Container(String),
    #[error("unsupported configuration: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything an engine needs for one run.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct PatchJob<'a> {
    pub symbols: SymbolTable,
    pub configuration: &'a PatchConfiguration,
    pub input: &'a Path,
    /// Where the engine writes the patched image. This is a staging file
    /// beside the caller's destination; it is moved into place only after
    /// the engine returns `Ok`.
    pub output: &'a Path,
}

/// The component that does the container and code-injection work.
///
/// `patch` is called at most once per orchestrated run and is never retried.
pub trait PatchEngine {
    /// Works out which build `input` holds and returns its version tag.
    fn detect_version(&self, input: &Path) -> Result<String, EngineError> {
        Ok(DiscHeader::read_from(input)?.version_tag())
    }

    fn patch(
        &self,
        job: PatchJob<'_>,
        progress: &mut dyn EngineProgress,
    ) -> Result<(), EngineError>;
}

impl<E: PatchEngine + ?Sized> PatchEngine for &E {
    fn detect_version(&self, input: &Path) -> Result<String, EngineError> {
        (**self).detect_version(input)
    }

    fn patch(
        &self,
        job: PatchJob<'_>,
        progress: &mut dyn EngineProgress,
    ) -> Result<(), EngineError> {
        (**self).patch(job, progress)
    }
}
