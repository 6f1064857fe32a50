use sfm_core::GraphError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while encoding or decoding the auxiliary state artifact.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("auxiliary state ends inside the {0} section")]
    Truncated(&'static str),
    #[error("invalid byte {value} for boolean field {field}")]
    InvalidFlag { field: &'static str, value: u8 },
    #[error("unknown two-view configuration {0}")]
    UnknownConfig(i32),
    #[error("invalid image pair: {0}")]
    InvalidPair(#[from] GraphError),
    #[error("length prefix {0} cannot be addressed on this platform")]
    LengthOverflow(u64),
    #[error("unsupported auxiliary state version {0}")]
    UnsupportedVersion(u32),
    #[error("versioned auxiliary state has no frame section")]
    MissingFrameSection,
}

/// Failures while reading or writing a sparse snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("i/o error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("no {0} file in text or binary encoding")]
    MissingFile(PathBuf),
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{path}: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("unsupported output format {0:?}, expected \"bin\" or \"txt\"")]
    UnsupportedFormat(String),
}

/// Failures of a reconstruction export call.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported output format {0:?}, expected \"bin\" or \"txt\"")]
    UnsupportedFormat(String),
    #[error("failed to read image list {path}: {source}")]
    ImageList { path: PathBuf, source: io::Error },
    #[error("failed to write component {component}: {source}")]
    Component {
        component: i32,
        source: SnapshotError,
    },
}
