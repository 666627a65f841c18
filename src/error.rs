use std::path::PathBuf;

use thiserror::Error;

/// Domain conditions raised by the pipeline stages.
///
/// Stage code returns `anyhow::Result`; these variants travel inside the
/// `anyhow::Error` chain so callers can recover them with `downcast_ref`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source file not found: {0:?}")]
    SourceNotFound(PathBuf),

    #[error("Source file {0:?} contains no rows")]
    EmptySource(PathBuf),

    #[error("No data loaded; call load() first")]
    NotLoaded,

    #[error("Unknown cleaning strategy '{0}' (expected auto, drop or fill)")]
    UnknownStrategy(String),

    #[error("{0} must run before this operation")]
    MissingPrerequisite(&'static str),

    #[error("Column '{0}' not found")]
    MissingColumn(String),
}
