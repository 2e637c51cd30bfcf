//! Periodic ledger export
//!
//! The `Snapshotter` copies the whole ledger on a fixed interval and hands
//! it to a [`SnapshotSink`]. Every tick re-exports the full ledger, so a
//! failed tick needs no recovery: it is logged and the next tick starts from
//! a fresh snapshot.
//!
//! # Lifecycle
//!
//! ```text
//! Snapshotter::spawn ──► timer loop (first tick after one interval)
//!        │
//!        ▼
//! SnapshotterHandle::stop ──► cancel loop ──► final tick
//! ```

use crate::core::ledger::Ledger;
use crate::core::traits::SnapshotSink;
use crate::io::csv_format::{SnapshotTable, SNAPSHOT_TABLE_NAME};
use crate::types::TerminalError;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Default interval between exports
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(120);

/// Outcome of a successful tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Name of the exported table
    pub table: &'static str,
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Where they were written
    pub destination: String,
}

/// Periodic exporter of the shared ledger
#[derive(Clone)]
pub struct Snapshotter {
    ledger: Arc<Ledger>,
    sink: Arc<dyn SnapshotSink>,
    interval: Duration,
}

impl Snapshotter {
    /// Create a snapshotter
    ///
    /// # Arguments
    ///
    /// * `ledger` - The ledger to export
    /// * `sink` - Durable tabular storage to export to
    /// * `interval` - Time between exports
    pub fn new(ledger: Arc<Ledger>, sink: Arc<dyn SnapshotSink>, interval: Duration) -> Self {
        Self {
            ledger,
            sink,
            interval,
        }
    }

    /// Export the full ledger once
    ///
    /// # Returns
    ///
    /// * `Ok(SnapshotReport)` - Rows written and their destination
    /// * `Err(TerminalError)` - The sink failed; nothing needs undoing
    pub async fn tick(&self) -> Result<SnapshotReport, TerminalError> {
        let transactions = self.ledger.snapshot_all();
        let table = SnapshotTable::from_transactions(&transactions);

        self.sink.write_table(&table).await?;

        let report = SnapshotReport {
            table: table.name,
            rows: table.len(),
            destination: self.sink.destination(),
        };
        info!(
            table = report.table,
            rows = report.rows,
            destination = %report.destination,
            at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
            "Ledger snapshot saved"
        );
        Ok(report)
    }

    /// Tick and log a failure instead of returning it
    async fn tick_logged(&self) {
        if let Err(e) = self.tick().await {
            error!(
                table = SNAPSHOT_TABLE_NAME,
                destination = %self.sink.destination(),
                error = %e,
                "Ledger snapshot failed, retrying on next interval"
            );
        }
    }

    /// Run the timer loop until `shutdown` is cancelled
    ///
    /// The first export happens one full interval after the call.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick_logged().await,
            }
        }
    }

    /// Start the timer loop on the current runtime
    pub fn spawn(self) -> SnapshotterHandle {
        let shutdown = CancellationToken::new();
        let final_tick = self.clone();
        let join = tokio::spawn(self.run(shutdown.clone()));

        SnapshotterHandle {
            shutdown,
            join,
            final_tick,
        }
    }
}

/// Handle to a running snapshotter
pub struct SnapshotterHandle {
    shutdown: CancellationToken,
    join: JoinHandle<()>,
    final_tick: Snapshotter,
}

impl SnapshotterHandle {
    /// Stop the timer loop and export one last time
    pub async fn stop(self) -> Result<SnapshotReport, TerminalError> {
        self.shutdown.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "Snapshot task panicked");
        }
        self.final_tick.tick().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_sink::WriterSink;
    use crate::types::{TransactionKind, TransactionRecord};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink recording every table it receives
    #[derive(Default)]
    struct RecordingSink {
        tables: Mutex<Vec<SnapshotTable>>,
        fail_first: AtomicUsize,
    }

    impl RecordingSink {
        fn failing(times: usize) -> Self {
            Self {
                tables: Mutex::new(Vec::new()),
                fail_first: AtomicUsize::new(times),
            }
        }

        fn tables(&self) -> Vec<SnapshotTable> {
            self.tables.lock().clone()
        }
    }

    #[async_trait]
    impl SnapshotSink for RecordingSink {
        async fn write_table(&self, table: &SnapshotTable) -> Result<(), TerminalError> {
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err(TerminalError::IoError {
                    message: "file locked".to_string(),
                });
            }
            self.tables.lock().push(table.clone());
            Ok(())
        }

        fn destination(&self) -> String {
            "memory".to_string()
        }
    }

    fn ledger_with(count: i64) -> Arc<Ledger> {
        let ledger = Arc::new(Ledger::new());
        for i in 1..=count {
            ledger.append(TransactionRecord {
                kind: TransactionKind::Recharge,
                amount: Decimal::ONE,
                balance_after: Decimal::from(i),
            });
        }
        ledger
    }

    #[tokio::test]
    async fn test_tick_exports_header_and_all_rows() {
        let ledger = ledger_with(3);
        let sink = Arc::new(WriterSink::new(Vec::new(), "buffer"));
        let snapshotter = Snapshotter::new(ledger, sink.clone(), DEFAULT_SNAPSHOT_INTERVAL);

        let report = snapshotter.tick().await.unwrap();
        drop(snapshotter);

        assert_eq!(report.rows, 3);
        assert_eq!(report.destination, "buffer");
        assert_eq!(report.table, "Movimientos");

        let sink = Arc::try_unwrap(sink).ok().expect("sink still shared");
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Tipo,Monto,Saldo Restante");
        assert_eq!(lines[3], "Recarga,1,3");
    }

    #[tokio::test]
    async fn test_failed_tick_is_retried_with_full_snapshot() {
        let ledger = ledger_with(2);
        let sink = Arc::new(RecordingSink::failing(1));
        let snapshotter =
            Snapshotter::new(Arc::clone(&ledger), sink.clone(), DEFAULT_SNAPSHOT_INTERVAL);

        assert!(snapshotter.tick().await.is_err());

        ledger.append(TransactionRecord {
            kind: TransactionKind::Consumption,
            amount: Decimal::ONE,
            balance_after: Decimal::ONE,
        });
        let report = snapshotter.tick().await.unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(sink.tables().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_each_interval() {
        let ledger = ledger_with(1);
        let sink = Arc::new(RecordingSink::default());
        let handle =
            Snapshotter::new(ledger, sink.clone(), Duration::from_secs(120)).spawn();

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert!(sink.tables().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.tables().len(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.tables().len(), 2);

        handle.stop().await.unwrap();
        assert_eq!(sink.tables().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_does_not_stop_the_loop() {
        let ledger = ledger_with(1);
        let sink = Arc::new(RecordingSink::failing(1));
        let handle = Snapshotter::new(ledger, sink.clone(), Duration::from_secs(10)).spawn();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(sink.tables().is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.tables().len(), 1);

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_first_interval_still_exports() {
        let ledger = ledger_with(2);
        let sink = Arc::new(RecordingSink::default());
        let handle = Snapshotter::new(ledger, sink.clone(), DEFAULT_SNAPSHOT_INTERVAL).spawn();

        let report = handle.stop().await.unwrap();

        assert_eq!(report.rows, 2);
        assert_eq!(sink.tables().len(), 1);
    }
}
