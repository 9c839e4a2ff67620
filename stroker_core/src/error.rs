use std::path::PathBuf;

use thiserror::Error;

use crate::axis::AxisId;
use crate::pattern::FillMode;

/// Failures while reading or decoding a script file.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("script contains no actions")]
    Empty,
    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ScriptError>,
    },
}

impl ScriptError {
    pub(crate) fn in_file(self, path: PathBuf) -> Self {
        match self {
            e @ (ScriptError::Io { .. } | ScriptError::InFile { .. }) => e,
            other => ScriptError::InFile {
                path,
                source: Box::new(other),
            },
        }
    }
}

/// Rejected configuration mutations. The previous value is always kept.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{axis}: range min ({min}) must be below max ({max})")]
    RangeInverted { axis: AxisId, min: i16, max: i16 },
    #[error("{axis}: fill mode {mode} is not available on this axis")]
    FillModeNotAllowed { axis: AxisId, mode: FillMode },
    #[error("{0}: axis has no position offset")]
    OffsetNotSupported(AxisId),
    #[error("unknown axis '{0}'")]
    UnknownAxis(String),
    #[error("unknown fill mode '{0}'")]
    UnknownFillMode(String),
}

#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("no transport attached")]
    NoTransport,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("transport timeout")]
    Timeout,
    #[error("tick thread: {0}")]
    Thread(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
