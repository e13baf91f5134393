//! Table errors
//!
//! The XML reader and path engine report plain `String` errors; they are
//! wrapped here at the table boundary.

use thiserror::Error;

/// Boxed error returned by session implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Table is empty, use get()")]
    EmptyTable,

    #[error("Invalid key spec for table '{table}': {reason}")]
    InvalidKeySpec { table: String, reason: String },

    #[error("Item {index} has no value for key path '{path}'")]
    MissingKey { index: usize, path: String },

    #[error("Table structure mismatch: {0}")]
    Structural(String),

    #[error("Position {index} out of range for table of {len} items")]
    Index { index: isize, len: usize },

    #[error("Slice step cannot be zero")]
    SliceStep,

    #[error("Operation not supported on container table '{0}'")]
    ContainerTable(String),

    #[error("Path expression error in '{expr}': {message}")]
    Path { expr: String, message: String },

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("Session error on {hostname}: {source}")]
    Session {
        hostname: String,
        #[source]
        source: BoxError,
    },

    #[error("Table not defined: {0}")]
    UnknownTable(String),

    #[error("View not defined: {0}")]
    UnknownView(String),

    #[error("Table '{0}' has no session or file to fetch from")]
    NoSource(String),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub(crate) fn path(expr: &str, message: impl Into<String>) -> Self {
        TableError::Path {
            expr: expr.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
