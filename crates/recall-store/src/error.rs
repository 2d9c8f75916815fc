//! Error types for the Recall store.

use recall_types::Partition;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Required connection credentials missing or malformed. Fatal at
    /// initialization.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `set_user` with an unknown or inactive username. Recoverable: the
    /// caller should create the user first. Mode state is left untouched.
    #[error("User not found or inactive: {0}")]
    UserNotFound(String),

    /// A mode string outside the closed set. Recoverable: retry with a valid
    /// value.
    #[error("{0}")]
    InvalidMode(String),

    /// Write or read in user mode without a resolved user id.
    #[error("User mode requires a resolved user; call set_user first")]
    ModeRequiresUser,

    /// A hybrid fan-out committed to some partitions and failed on others.
    /// There is no compensating transaction; the partitions have diverged and
    /// need operator reconciliation.
    #[error("Partial write: committed to {written:?}, failed on {}", format_failures(.failed))]
    PartialWrite {
        written: Vec<Partition>,
        failed: Vec<(Partition, String)>,
    },

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    /// A row came back with an unexpected column shape.
    #[error("Row decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_failures(failed: &[(Partition, String)]) -> String {
    failed
        .iter()
        .map(|(p, msg)| format!("{} ({})", p, msg))
        .collect::<Vec<_>>()
        .join(", ")
}
