use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::config::{PatchConfiguration, PatchRequest};
use crate::engine::{EngineError, PatchEngine, PatchJob};
use crate::progress::{ProgressRelay, ProgressSink};
use crate::symbols::{self, SymbolTable};
use crate::{PatchError, Result};

/// Runs patch jobs against a [`PatchEngine`].
///
/// Holds no per-run state, so one orchestrator can serve several runs at
/// once as long as they write to different output paths.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator<E> {
    engine: E,
}

fn invalid_path(path: &Path, reason: impl Into<String>) -> PatchError {
    PatchError::InvalidPath {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn check_input(input: &Path) -> Result<()> {
    let meta = fs::metadata(input).map_err(|e| invalid_path(input, e.to_string()))?;
    if !meta.is_file() {
        return Err(invalid_path(input, "input is not a file"));
    }
    File::open(input).map_err(|e| invalid_path(input, format!("input is not readable: {e}")))?;
    Ok(())
}

fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn check_output(input: &Path, output: &Path) -> Result<()> {
    if output.file_name().is_none() {
        return Err(invalid_path(output, "output has no file name"));
    }
    if output.is_dir() {
        return Err(invalid_path(output, "output is a directory"));
    }

    let dir = output_dir(output);
    let meta = fs::metadata(dir)
        .map_err(|e| invalid_path(output, format!("output directory unusable: {e}")))?;
    if !meta.is_dir() {
        return Err(invalid_path(output, "output parent is not a directory"));
    }
    if meta.permissions().readonly() {
        return Err(invalid_path(output, "output directory is read-only"));
    }

    // Only reachable when the output already exists.
    if let (Ok(a), Ok(b)) = (fs::canonicalize(input), fs::canonicalize(output)) {
        if a == b {
            return Err(invalid_path(output, "output would overwrite the input image"));
        }
    }
    Ok(())
}

/// Creates the file the engine writes into. It lives beside `output` so the
/// final rename stays on one filesystem, and it is deleted when dropped.
fn stage_output(output: &Path) -> Result<TempPath> {
    let prefix = format!(
        ".{}.",
        output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".partial")
        .tempfile_in(output_dir(output))
        .map(|file| file.into_temp_path())
        .map_err(|e| invalid_path(output, format!("output directory is not writable: {e}")))
}

fn discard_staged(staged: TempPath) {
    let path = staged.to_path_buf();
    if let Err(err) = staged.close() {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(staging = %path.display(), error = %err, "could not remove staged output");
        }
    }
}

impl<E: PatchEngine> Orchestrator<E> {
    pub fn new(engine: E) -> Self {
        Orchestrator { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Patches the image at `input` and writes the result to `output`.
    ///
    /// `version` selects the build's address table; when `None` the build is
    /// detected from `input`. Unknown versions and unusable paths are
    /// reported before anything is written. The engine is invoked once and
    /// never retried. On success `output` holds the complete image and the
    /// last event `sink` saw is at 1.0; on failure `output` is left as it
    /// was and `sink` hears nothing further. `input` is never modified.
    pub fn patch_image<S>(
        &self,
        input: &Path,
        output: &Path,
        configuration: &PatchConfiguration,
        sink: &mut S,
        version: Option<&str>,
    ) -> Result<()>
    where
        S: ProgressSink + ?Sized,
    {
        let requested = version.map(symbols::resolve).transpose()?;

        check_input(input)?;
        check_output(input, output)?;

        let symbols = match requested {
            Some(symbols) => symbols,
            None => self.detect(input)?,
        };

        info!(
            version = %symbols.version(),
            input = %input.display(),
            output = %output.display(),
            options = configuration.as_map().len(),
            "starting patch run"
        );

        let staged = stage_output(output)?;
        debug!(staging = %staged.display(), "staging output");

        let mut relay = ProgressRelay::new(sink);
        let job = PatchJob {
            symbols,
            configuration,
            input,
            output: &*staged,
        };

        match self.engine.patch(job, &mut relay) {
            Ok(()) => {
                if let Err(err) = staged.persist(output) {
                    warn!(error = %err.error, "could not move staged output into place");
                    discard_staged(err.path);
                    return Err(PatchError::IoFailure(err.error));
                }
                relay.finish();
                info!(output = %output.display(), "patch run complete");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "patch run failed, discarding staged output");
                discard_staged(staged);
                Err(match err {
                    EngineError::Io(e) => PatchError::IoFailure(e),
                    other => PatchError::EngineFailure(other),
                })
            }
        }
    }

    /// Runs a request parsed from JSON.
    pub fn patch_request<S>(&self, request: &PatchRequest, sink: &mut S) -> Result<()>
    where
        S: ProgressSink + ?Sized,
    {
        self.patch_image(
            &request.input_iso,
            &request.output_iso,
            &request.configuration,
            sink,
            request.version.as_deref(),
        )
    }

    fn detect(&self, input: &Path) -> Result<SymbolTable> {
        let tag = self.engine.detect_version(input).map_err(|err| match err {
            EngineError::Io(e) => PatchError::IoFailure(e),
            other => PatchError::UnknownVersion(format!(
                "could not detect the build in {}: {}",
                input.display(),
                other
            )),
        })?;
        debug!(version = %tag, input = %input.display(), "detected version");
        Ok(symbols::resolve(&tag)?)
    }
}

/// Patches `input` into `output` using `engine`.
///
/// Shorthand for [`Orchestrator::patch_image`] on a one-off orchestrator.
pub fn patch_image<E, S>(
    engine: &E,
    input: &Path,
    output: &Path,
    configuration: &PatchConfiguration,
    sink: &mut S,
    version: Option<&str>,
) -> Result<()>
where
    E: PatchEngine + ?Sized,
    S: ProgressSink + ?Sized,
{
    Orchestrator::new(engine).patch_image(input, output, configuration, sink, version)
}

/// Parses a JSON run description (see [`PatchRequest`]) and executes it.
pub fn patch_iso<E, S>(config_json: &str, engine: &E, sink: &mut S) -> Result<()>
where
    E: PatchEngine + ?Sized,
    S: ProgressSink + ?Sized,
{
    let request = PatchRequest::from_json(config_json)?;
    Orchestrator::new(engine).patch_request(&request, sink)
}
