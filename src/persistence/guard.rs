//! Record save/load and the concurrent-transition guard.

use super::{Row, Store};
use crate::core::StateValue;
use crate::error::FsmError;
use crate::field::{Record, RecordId, RecordState};
use crate::model::Model;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// State values of a record as last loaded or saved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    values: BTreeMap<String, StateValue>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn capture(state: &RecordState) -> Self {
        Self {
            values: state
                .values()
                .map(|(field, value)| (field.to_string(), value.clone()))
                .collect(),
            taken_at: Utc::now(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&StateValue> {
        self.values.get(field)
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

/// Save `record`, inserting it when it has no primary key yet.
///
/// For models with a concurrency guard, an update only applies when every
/// state column still holds the value the record was loaded with. When the
/// row exists but no longer matches, the save fails with
/// [`FsmError::ConcurrentTransition`] and nothing is written. After a
/// successful save the record's snapshot is refreshed, so later saves
/// compare against the newly written values.
pub fn save<T, S>(model: &Model<T>, store: &S, record: &mut T) -> Result<RecordId, FsmError>
where
    T: Record + Serialize,
    S: Store + ?Sized,
{
    model.ensure_concrete()?;
    let row = to_row(&*record)?;

    let id = match record.record_state().id() {
        Some(id) => {
            let predicate = if model.concurrency_guarded() {
                guard_predicate(model, record.record_state())?
            } else {
                Row::new()
            };

            let updated = store.update(model.table(), id, &predicate, &row)?;
            if updated == 0 {
                if !predicate.is_empty() && store.exists(model.table(), id)? {
                    return Err(FsmError::ConcurrentTransition {
                        model: model.name().to_string(),
                        id,
                    });
                }
                store.insert(model.table(), id, row)?;
            }
            id
        }
        None => {
            let id = Uuid::new_v4();
            store.insert(model.table(), id, row)?;
            record.record_state_mut().set_id(id);
            id
        }
    };

    let state = record.record_state_mut();
    let snapshot = Snapshot::capture(state);
    state.set_snapshot(snapshot);
    debug!(model = model.name(), %id, "record saved");
    Ok(id)
}

/// Load the record stored under `id`.
///
/// Only declared state fields are kept as states; those missing from the
/// row start at their default. The record's role follows its loaded states.
pub fn load<T, S>(model: &Model<T>, store: &S, id: RecordId) -> Result<T, FsmError>
where
    T: Record + DeserializeOwned,
    S: Store + ?Sized,
{
    model.ensure_concrete()?;
    let row = store
        .fetch(model.table(), id)?
        .ok_or_else(|| FsmError::NotFound {
            model: model.name().to_string(),
            id,
        })?;

    let mut record: T = serde_json::from_value(Value::Object(row))?;
    let fields = model.fields();
    let state = record.record_state_mut();
    state.set_id(id);
    state.retain_fields(|name| fields.iter().any(|field| field.name() == name));
    for field in fields {
        if !state.contains(field.name()) {
            field.set_state(state, field.default_state().clone());
        }
        model.apply_role(&field, state);
    }
    let snapshot = Snapshot::capture(state);
    state.set_snapshot(snapshot);

    debug!(model = model.name(), %id, "record loaded");
    Ok(record)
}

fn to_row<T: Serialize>(record: &T) -> Result<Row, FsmError> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        _ => Err(FsmError::Serialization(serde::ser::Error::custom(
            "records must serialize to an object",
        ))),
    }
}

/// Expected stored value of every state column, from the snapshot.
fn guard_predicate<T>(model: &Model<T>, state: &RecordState) -> Result<Row, FsmError> {
    let mut predicate = Row::new();
    let Some(snapshot) = state.snapshot() else {
        return Ok(predicate);
    };
    for field in model.fields() {
        if let Some(value) = snapshot.get(field.name()) {
            predicate.insert(field.name().to_string(), serde_json::to_value(value)?);
        }
    }
    Ok(predicate)
}
