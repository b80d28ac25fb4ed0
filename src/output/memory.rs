use crate::models::ArticleRecord;
use crate::output::{OutputResult, RecordSink};

/// Collects delivered records in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<ArticleRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ArticleRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ArticleRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for MemorySink {
    fn deliver(&mut self, records: &[ArticleRecord]) -> Vec<OutputResult<()>> {
        self.records.extend_from_slice(records);
        records.iter().map(|_| Ok(())).collect()
    }
}
