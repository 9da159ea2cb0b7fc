//! Saving and loading records, with optional detection of concurrent
//! state changes.
//!
//! Records are stored as rows: JSON objects holding every serialized field
//! of the record, keyed by table and primary key. A [`Store`] executes the
//! row operations; [`save`] and [`load`] translate between records and rows
//! and enforce the model's concurrency guard.

mod error;
mod guard;
mod memory;

pub use error::StoreError;
pub use guard::{load, save, Snapshot};
pub use memory::MemoryStore;

use crate::field::RecordId;
use serde_json::{Map, Value};

/// One stored record: column name to value.
pub type Row = Map<String, Value>;

/// Row storage backend.
pub trait Store: Send + Sync {
    /// The row stored under `id`, if any.
    fn fetch(&self, table: &str, id: RecordId) -> Result<Option<Row>, StoreError>;

    /// Write `values` into the row under `id` if every column of
    /// `predicate` currently holds the given value. Returns the number of
    /// rows written, 0 or 1.
    ///
    /// Checking the predicate and writing must happen atomically.
    fn update(
        &self,
        table: &str,
        id: RecordId,
        predicate: &Row,
        values: &Row,
    ) -> Result<usize, StoreError>;

    /// Store a new row.
    fn insert(&self, table: &str, id: RecordId, values: Row) -> Result<(), StoreError>;

    fn exists(&self, table: &str, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.fetch(table, id)?.is_some())
    }
}
