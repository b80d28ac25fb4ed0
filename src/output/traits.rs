//! Record sink trait and output errors
//!
//! Accepted records leave the pipeline through a [`RecordSink`]. Delivery is
//! per record: one sink failure never hides the others, and never stops the
//! crawl.

use crate::models::ArticleRecord;
use thiserror::Error;

/// Errors that can occur while delivering records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record rejected by sink: {0}")]
    Rejected(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Downstream consumer of accepted records
///
/// Any `FnMut(&ArticleRecord) -> OutputResult<()>` closure is a sink, which
/// is the easiest way to hand records to summarization or sync glue.
pub trait RecordSink {
    /// Delivers a batch in order
    ///
    /// # Returns
    ///
    /// One result per record, in the same order as `records`
    fn deliver(&mut self, records: &[ArticleRecord]) -> Vec<OutputResult<()>>;

    /// Flushes buffered output at the end of a run
    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

impl<F> RecordSink for F
where
    F: FnMut(&ArticleRecord) -> OutputResult<()>,
{
    fn deliver(&mut self, records: &[ArticleRecord]) -> Vec<OutputResult<()>> {
        records.iter().map(|record| self(record)).collect()
    }
}
