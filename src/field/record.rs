//! Per-instance state storage embedded in records.

use crate::core::StateValue;
use crate::persistence::Snapshot;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Primary key of a persisted record.
pub type RecordId = Uuid;

/// A record type whose fields carry states.
///
/// The record embeds a [`RecordState`]; models read and write states
/// through it. Persisted records additionally implement serde's traits and
/// usually `#[serde(flatten)]` the embedded state so each state field
/// becomes its own column.
///
/// # Example
///
/// ```rust
/// use statefield::field::{Record, RecordState};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct BlogPost {
///     #[serde(flatten)]
///     fsm: RecordState,
///     text: String,
/// }
///
/// impl Record for BlogPost {
///     fn record_state(&self) -> &RecordState {
///         &self.fsm
///     }
///
///     fn record_state_mut(&mut self) -> &mut RecordState {
///         &mut self.fsm
///     }
/// }
/// ```
pub trait Record: 'static {
    fn record_state(&self) -> &RecordState;
    fn record_state_mut(&mut self) -> &mut RecordState;
}

/// Field states of one record instance.
///
/// Besides the field values this carries the record's current role, the
/// fields whose protection is lifted on this instance, the primary key once
/// saved and the snapshot used to detect concurrent changes. Only the field
/// values are serialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordState {
    values: BTreeMap<String, StateValue>,
    role: Option<String>,
    unprotected: BTreeSet<String>,
    id: Option<RecordId>,
    snapshot: Option<Snapshot>,
}

impl RecordState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `field`.
    pub fn get(&self, field: &str) -> Option<&StateValue> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// The role the record currently plays, if its states declare one.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Primary key, once the record was saved or loaded.
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_unprotected(&self, field: &str) -> bool {
        self.unprotected.contains(field)
    }

    pub(crate) fn set(&mut self, field: &str, value: StateValue) {
        self.values.insert(field.to_string(), value);
    }

    /// Drop values of fields `keep` rejects.
    pub(crate) fn retain_fields(&mut self, keep: impl Fn(&str) -> bool) {
        self.values.retain(|field, _| keep(field));
    }

    pub(crate) fn set_role(&mut self, role: Option<String>) {
        self.role = role;
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
    }

    /// Lift protection on `field`; returns false when it was already lifted.
    pub(crate) fn lift_protection(&mut self, field: &str) -> bool {
        self.unprotected.insert(field.to_string())
    }

    pub(crate) fn restore_protection(&mut self, field: &str) {
        self.unprotected.remove(field);
    }
}

impl Serialize for RecordState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RecordState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Flattened records hand over every column they do not claim;
        // only scalar columns can hold states.
        let columns = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let values = columns
            .into_iter()
            .filter_map(|(name, value)| {
                serde_json::from_value::<StateValue>(value)
                    .ok()
                    .map(|state| (name, state))
            })
            .collect();
        Ok(Self {
            values,
            ..Self::default()
        })
    }
}
