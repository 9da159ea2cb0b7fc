//! Call arguments and transition return values.

use super::state::StateValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Arguments of one transition call.
///
/// Bodies and computed-target resolvers both see the same arguments, so a
/// resolver can decide the next state from what the caller passed.
///
/// # Example
///
/// ```rust
/// use statefield::core::Args;
///
/// let args = Args::new().arg(3)?.kwarg("allowed", true)?;
///
/// assert_eq!(args.get::<bool>("allowed"), Some(true));
/// assert_eq!(args.positional::<i64>(0), Some(3));
/// assert_eq!(args.get::<bool>("missing"), None);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg<V: Serialize>(mut self, value: V) -> Result<Self, serde_json::Error> {
        self.positional.push(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Add a named argument.
    pub fn kwarg<V: Serialize>(
        mut self,
        name: impl Into<String>,
        value: V,
    ) -> Result<Self, serde_json::Error> {
        self.named.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Named argument decoded as `V`, if present and of that shape.
    pub fn get<V: DeserializeOwned>(&self, name: &str) -> Option<V> {
        self.named
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Positional argument decoded as `V`, if present and of that shape.
    pub fn positional<V: DeserializeOwned>(&self, index: usize) -> Option<V> {
        self.positional
            .get(index)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Conversion of a transition body's return value into a next state.
///
/// Only consulted when a rule's target is a return-value target. Types
/// that never name a state keep the default `None`.
pub trait TransitionOutput {
    fn result_state(&self) -> Option<StateValue> {
        None
    }
}

impl TransitionOutput for () {}

impl TransitionOutput for bool {}

impl TransitionOutput for StateValue {
    fn result_state(&self) -> Option<StateValue> {
        Some(self.clone())
    }
}

impl TransitionOutput for String {
    fn result_state(&self) -> Option<StateValue> {
        Some(StateValue::from(self.as_str()))
    }
}

impl TransitionOutput for &str {
    fn result_state(&self) -> Option<StateValue> {
        Some(StateValue::from(*self))
    }
}

impl TransitionOutput for i64 {
    fn result_state(&self) -> Option<StateValue> {
        Some(StateValue::Integer(*self))
    }
}

impl<O: TransitionOutput> TransitionOutput for Option<O> {
    fn result_state(&self) -> Option<StateValue> {
        self.as_ref().and_then(TransitionOutput::result_state)
    }
}
