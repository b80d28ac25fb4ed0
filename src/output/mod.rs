//! Output module for delivering records and reporting runs
//!
//! This module handles:
//! - The [`RecordSink`] interface accepted records are delivered through
//! - Built-in sinks: in-memory and JSON lines
//! - End-of-run statistics

mod jsonl;
mod memory;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use stats::{print_summary, CrawlSummary};
pub use traits::{OutputError, OutputResult, RecordSink};
