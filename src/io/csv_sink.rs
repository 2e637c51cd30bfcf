//! Snapshot sinks backed by CSV output
//!
//! Provides two implementations of [`SnapshotSink`]:
//! - `CsvFileSink` writes asynchronously to a file, replacing it atomically
//! - `WriterSink` writes synchronously to any `Write` (stdout, buffers)
//!
//! # Design
//!
//! The file sink uses:
//! - csv-async for streaming CSV serialization
//! - tokio-util compat to drive csv-async over a `tokio::fs::File`
//! - write-to-temporary then rename, so readers never observe a half-written file

use crate::core::traits::SnapshotSink;
use crate::io::csv_format::{write_transactions_csv, SnapshotTable};
use crate::types::TerminalError;
use async_trait::async_trait;
use csv_async::AsyncWriterBuilder;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::compat::TokioAsyncWriteCompatExt;

/// Default export file name, next to the working directory
pub const DEFAULT_SNAPSHOT_FILE: &str = "movimientos_tarjeta.csv";

/// CSV file sink
///
/// Every export writes the full table to `<path>.tmp` and renames it over
/// `<path>`.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    /// Create a sink writing to the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_temp(&self, temp_path: &Path, table: &SnapshotTable) -> Result<(), TerminalError> {
        let file = tokio::fs::File::create(temp_path).await?;

        let mut writer = AsyncWriterBuilder::new()
            .has_headers(false)
            .create_writer(file.compat_write());

        writer.write_record(table.header()).await?;
        for row in &table.rows {
            writer.write_record(row.fields()).await?;
        }
        writer.flush().await?;

        Ok(())
    }
}

impl Default for CsvFileSink {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_FILE)
    }
}

#[async_trait]
impl SnapshotSink for CsvFileSink {
    async fn write_table(&self, table: &SnapshotTable) -> Result<(), TerminalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = self.write_temp(&temp_path, table).await {
            // Leftover temp file is harmless, the next tick truncates it
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Sink writing CSV to an arbitrary writer
///
/// Each export is appended to the writer as a complete table. Used for
/// stdout output and for inspecting exports in tests.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    label: String,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap a writer, `label` names it in log lines
    pub fn new(writer: W, label: &str) -> Self {
        Self {
            writer: Mutex::new(writer),
            label: label.to_string(),
        }
    }

    /// Recover the wrapped writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), "<stdout>")
    }
}

#[async_trait]
impl<W: Write + Send + 'static> SnapshotSink for WriterSink<W> {
    async fn write_table(&self, table: &SnapshotTable) -> Result<(), TerminalError> {
        let mut writer = self.writer.lock();
        write_transactions_csv(table, &mut *writer)
    }

    fn destination(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Transaction, TransactionKind};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn sample_table(count: u64) -> SnapshotTable {
        let transactions: Vec<Transaction> = (1..=count)
            .map(|i| Transaction {
                sequence: i,
                kind: TransactionKind::Recharge,
                amount: Decimal::ONE,
                balance_after: Decimal::from(i),
            })
            .collect();
        SnapshotTable::from_transactions(&transactions)
    }

    #[tokio::test]
    async fn test_file_sink_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let sink = CsvFileSink::new(dir.path().join("movimientos.csv"));

        sink.write_table(&sample_table(2)).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "Tipo,Monto,Saldo Restante\nRecarga,1,1\nRecarga,1,2\n");
    }

    #[tokio::test]
    async fn test_file_sink_replaces_prior_output() {
        let dir = TempDir::new().unwrap();
        let sink = CsvFileSink::new(dir.path().join("movimientos.csv"));

        sink.write_table(&sample_table(3)).await.unwrap();
        sink.write_table(&sample_table(1)).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!sink.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_sink_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let sink = CsvFileSink::new(dir.path().join("exports").join("daily").join("m.csv"));

        sink.write_table(&sample_table(1)).await.unwrap();

        assert!(sink.path().exists());
    }

    #[tokio::test]
    async fn test_file_sink_reports_io_failure() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail
        let target = dir.path().join("locked.csv");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();
        let sink = CsvFileSink::new(&target);

        let result = sink.write_table(&sample_table(1)).await;

        assert!(matches!(result, Err(TerminalError::IoError { .. })));
    }

    #[tokio::test]
    async fn test_writer_sink_appends_full_tables() {
        let sink = WriterSink::new(Vec::new(), "buffer");

        sink.write_table(&sample_table(1)).await.unwrap();
        sink.write_table(&sample_table(1)).await.unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "Tipo,Monto,Saldo Restante\nRecarga,1,1\nTipo,Monto,Saldo Restante\nRecarga,1,1\n"
        );
    }

    #[test]
    fn test_default_destination() {
        assert_eq!(CsvFileSink::default().destination(), "movimientos_tarjeta.csv");
    }
}
