//! Orchestration of one margin account: sampling ticks, the volatility
//! check, record ingestion, order reports and first-seen notifications.

mod change_notifier;
mod error;
mod ingest;
mod order_report;
mod snapshot_writer;
mod volatility_monitor;

#[cfg(test)]
mod testing;

pub use change_notifier::ChangeEventNotifier;
pub use error::MonitorError;
pub use ingest::RecordIngestor;
pub use order_report::{OrderReport, OrderReporter};
pub use snapshot_writer::SnapshotWriter;
pub use volatility_monitor::{VolatilityMonitor, VolatilityOutcome};
