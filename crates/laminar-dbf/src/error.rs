//! DBF error types.
//!
//! Provides [`DbfError`] for the structural (fatal) tier of failures,
//! plus a convenience [`DbfResult`] alias. Per-cell decode problems never
//! surface here; they degrade to null inside the decoder.
//!
//! Every error carries a stable `LDB-51xx` code so it can be grepped in
//! logs and in source (see [`codes`]).

use std::fmt;

use thiserror::Error;

/// Result alias for DBF operations.
pub type DbfResult<T> = Result<T, DbfError>;

/// Structured error code constants (`LDB-51xx`: DBF connector / I/O).
pub mod codes {
    /// The 32-byte file header is missing, truncated, or inconsistent.
    pub const MALFORMED_HEADER: &str = "LDB-5101";
    /// The field-descriptor table is truncated or does not terminate.
    pub const MALFORMED_SCHEMA: &str = "LDB-5102";
    /// A record slot could not be read.
    pub const RECORD_READ_FAILED: &str = "LDB-5103";
    /// The file could not be opened.
    pub const OPEN_FAILED: &str = "LDB-5104";
    /// Invalid reader configuration value.
    pub const INVALID_CONFIG: &str = "LDB-5110";
    /// Invalid argument passed to a reader operation.
    pub const INVALID_ARGUMENT: &str = "LDB-5111";
    /// Arrow batch assembly failed.
    pub const ARROW: &str = "LDB-7101";
}

/// The stage of a read that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the underlying file.
    Open,
    /// Reading the fixed 32-byte file header.
    Header,
    /// Reading the field-descriptor table.
    Schema,
    /// Reading the record slot with the given zero-based index.
    Record(u32),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Header => f.write_str("header"),
            Self::Schema => f.write_str("schema"),
            Self::Record(index) => write!(f, "record {index}"),
        }
    }
}

/// Errors that abort opening or scanning a DBF file.
#[derive(Debug, Error)]
pub enum DbfError {
    /// An I/O operation (seek or read) failed, including short reads.
    Io {
        /// Where the read failed.
        stage: Stage,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The bytes read do not form a valid DBF structure.
    Format {
        /// Where the structural problem was detected.
        stage: Stage,
        /// What was wrong.
        message: String,
    },

    /// A configuration value is invalid.
    InvalidConfig {
        /// The configuration key.
        key: String,
        /// What was wrong with the value.
        message: String,
    },

    /// An argument passed to a reader operation is invalid.
    InvalidArgument(String),

    /// An Arrow error propagated from batch assembly.
    Arrow(#[from] arrow_schema::ArrowError),
}

impl fmt::Display for DbfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        match self {
            Self::Io { stage, source } => {
                write!(f, "[{code}] I/O error reading {stage}: {source}")
            }
            Self::Format { stage, message } => {
                write!(f, "[{code}] malformed {stage}: {message}")
            }
            Self::InvalidConfig { key, message } => {
                write!(f, "[{code}] invalid config key '{key}': {message}")
            }
            Self::InvalidArgument(msg) => write!(f, "[{code}] invalid argument: {msg}"),
            Self::Arrow(e) => write!(f, "[{code}] arrow error: {e}"),
        }
    }
}

impl DbfError {
    /// Creates an I/O error for the given stage.
    #[must_use]
    pub fn io(stage: Stage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// Creates a format error for the given stage.
    #[must_use]
    pub fn format(stage: Stage, message: impl Into<String>) -> Self {
        Self::Format {
            stage,
            message: message.into(),
        }
    }

    /// Returns the stable `LDB-NNNN` code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io {
                stage: Stage::Open, ..
            } => codes::OPEN_FAILED,
            Self::Io { stage, .. } | Self::Format { stage, .. } => match stage {
                Stage::Open | Stage::Header => codes::MALFORMED_HEADER,
                Stage::Schema => codes::MALFORMED_SCHEMA,
                Stage::Record(_) => codes::RECORD_READ_FAILED,
            },
            Self::InvalidConfig { .. } => codes::INVALID_CONFIG,
            Self::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            Self::Arrow(_) => codes::ARROW,
        }
    }

    /// Returns the failing stage, if this error is tied to one.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Io { stage, .. } | Self::Format { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<DbfError> for arrow_schema::ArrowError {
    fn from(err: DbfError) -> Self {
        let code = err.code();
        match err {
            DbfError::Arrow(inner) => inner,
            DbfError::Io { stage, source } => arrow_schema::ArrowError::IoError(
                format!("[{code}] I/O error reading {stage}: {source}"),
                source,
            ),
            other => arrow_schema::ArrowError::ExternalError(Box::new(other)),
        }
    }
}
