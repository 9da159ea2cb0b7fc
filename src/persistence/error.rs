//! Store error types.

use thiserror::Error;

/// Errors a [`Store`](super::Store) backend can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with this key already exists
    #[error("Row {id} already exists in {table}")]
    DuplicateKey { table: String, id: String },

    /// The backend could not be reached or refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be interpreted
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: String, reason: String },
}
