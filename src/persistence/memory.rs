//! In-memory store.

use super::{Row, Store, StoreError};
use crate::field::RecordId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A [`Store`] keeping rows in process memory.
///
/// Conditional updates check and write under one lock, so concurrent
/// saves of the same row are serialized.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, HashMap<RecordId, Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Overwrite columns of a stored row without any check, as another
    /// writer would.
    pub fn overwrite(&self, table: &str, id: RecordId, values: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(&id))
            .ok_or_else(|| StoreError::Corrupt {
                table: table.to_string(),
                reason: format!("no row {id} to overwrite"),
            })?;
        row.extend(values);
        Ok(())
    }
}

impl Store for MemoryStore {
    fn fetch(&self, table: &str, id: RecordId) -> Result<Option<Row>, StoreError> {
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn update(
        &self,
        table: &str,
        id: RecordId,
        predicate: &Row,
        values: &Row,
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        let Some(row) = tables.get_mut(table).and_then(|rows| rows.get_mut(&id)) else {
            return Ok(0);
        };
        let matches = predicate
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected));
        if !matches {
            return Ok(0);
        }
        for (column, value) in values {
            row.insert(column.clone(), value.clone());
        }
        Ok(1)
    }

    fn insert(&self, table: &str, id: RecordId, values: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        rows.insert(id, values);
        Ok(())
    }
}
