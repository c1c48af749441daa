use account_source::SourceError;
use margin_core::DataError;
use snapshot_store::StoreError;
use thiserror::Error;

/// Failure of one monitor invocation. Notification delivery never ends up
/// here; it is logged and swallowed by the notification service.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl MonitorError {
    /// Source and store failures are upstream; the caller did nothing wrong.
    pub fn is_upstream(&self) -> bool {
        matches!(self, MonitorError::Source(_) | MonitorError::Store(_))
    }
}
