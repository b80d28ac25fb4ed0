use crate::models::ArticleRecord;
use crate::output::{OutputError, OutputResult, RecordSink};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes each record as one JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Records written successfully so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    fn write_record(&mut self, record: &ArticleRecord) -> OutputResult<()> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}

impl JsonLinesSink<File> {
    /// Creates (or truncates) `path` and writes records to it
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    /// Writes the records and flushes, so delivered lines are on disk
    /// before the crawl moves on
    fn deliver(&mut self, records: &[ArticleRecord]) -> Vec<OutputResult<()>> {
        let results: Vec<OutputResult<()>> = records
            .iter()
            .map(|record| self.write_record(record))
            .collect();

        match self.writer.flush() {
            Ok(()) => results,
            Err(e) => results
                .into_iter()
                .map(|result| result.and(Err(OutputError::Write(e.to_string()))))
                .collect(),
        }
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
