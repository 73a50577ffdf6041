pub mod csv;

use anyhow::Result;

use crate::checker::Status;

pub use self::csv::CsvSink;

/// One availability check outcome, written once and never changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub url: String,
    pub name: String,
    pub tld: String,
    pub status: Status,
}

impl ResultRow {
    /// The checked domain, `name.tld`
    pub fn domain(&self) -> String {
        format!("{}.{}", self.name, self.tld)
    }
}

/// Append-only destination for result rows.
///
/// Implementations serialize concurrent writers and flush after every row.
pub trait ResultSink: Send + Sync {
    fn write(&self, row: &ResultRow) -> Result<()>;

    /// Flushes and releases the underlying handle
    fn close(&self) -> Result<()>;
}
