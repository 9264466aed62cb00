#[cfg(test)]
mod tests;

use std::{io, path::PathBuf};
use thiserror::Error;
use types::Value;

/// Zero-based page number used throughout the storage stack.
///
/// Spec-faithful to the legacy `int pageNum`, kept as a plain `i32`
/// rather than a newtype wrapping `u64`, since negative values are a
/// load-bearing part of the contract (`pageNum < 0` is how an invalid
/// page is expressed at the API boundary, not a type-level rejection).
pub type PageNum = i32;

/// Fully-qualified identifier for a record within a table: `{page, slot}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rid {
    pub page: PageNum,
    pub slot: i32,
}

impl Rid {
    pub fn new(page: PageNum, slot: i32) -> Self {
        Self { page, slot }
    }
}

/// Positional row representation backed by `types::Value`, used wherever
/// a decoded record is handed to the predicate evaluator.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row(values)
    }
}

/// Canonical error type shared across the storage, buffer, and record
/// manager layers.
///
/// Each variant corresponds to one or more of the legacy return codes;
/// the variant carries a message instead of a bare integer because
/// idiomatic Rust surfaces failures through `Result`, not an
/// out-of-band code.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("storage: {0}")]
    Storage(String),
    #[error("buffer: {0}")]
    Buffer(String),
    #[error("record manager: {0}")]
    RecordMgr(String),
    #[error("catalog: {0}")]
    Catalog(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration shared by the storage stack.
///
/// # Example
/// ```
/// use common::Config;
///
/// let config = Config::builder().buffer_pool_pages(50).build();
/// assert_eq!(config.page_size, 4096);
/// ```
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where table files live.
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Fixed-size page allocation in bytes.
    #[builder(default = 4096)]
    pub page_size: usize,
    /// Number of frames a table's buffer pool keeps resident
    /// (`createTable`/`openTable` both fix this at 100).
    #[builder(default = 100)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            page_size: 4096,
            buffer_pool_pages: 100,
        }
    }
}
