use crate::{SolverError, Stage};
use sfm_io::{CodecError, ExportError, SnapshotError};
use std::error::Error;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or writing a checkpoint directory.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read snapshot from {path}: {source}")]
    ReadSnapshot { path: PathBuf, source: SnapshotError },
    #[error("failed to write snapshot to {path}: {source}")]
    WriteSnapshot { path: PathBuf, source: SnapshotError },
    #[error("auxiliary state {path}: {source}")]
    AuxState { path: PathBuf, source: CodecError },
    #[error("i/o error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("output path {0} is not a directory")]
    InvalidOutputPath(PathBuf),
    #[error("input path {0} is not a directory")]
    InvalidInputPath(PathBuf),
    #[error("invalid output format {0:?}, expected \"bin\" or \"txt\"")]
    UnsupportedFormat(String),
    #[error("can't continue without image pairs")]
    NoImagePairs,
    #[error("failed to load observations: {0}")]
    Observations(#[source] Box<dyn Error + Send + Sync>),
    #[error("failed to read input reconstruction: {0}")]
    Input(#[source] SnapshotError),
    #[error("{stage} failed: {source}")]
    Stage { stage: Stage, source: SolverError },
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to read settings {path}: {source}")]
    SettingsIo { path: PathBuf, source: io::Error },
}
