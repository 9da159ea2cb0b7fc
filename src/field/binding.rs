//! Field bindings: one per declared state field.

use super::record::RecordState;
use crate::core::StateValue;
use crate::model::Model;
use crate::transition::TransitionMethod;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Transition methods collected for one concrete model.
pub type MethodSet<T> = Arc<[Arc<TransitionMethod<T>>]>;

/// A declared state value with its human-readable label and optional role.
#[derive(Clone, Debug, PartialEq)]
pub struct StateChoice {
    pub value: StateValue,
    pub label: String,
    pub role: Option<String>,
}

/// Definition of a state-carrying field.
///
/// Bindings are created at definition time and shared by every model that
/// inherits the field. The transition methods acting on the field are
/// collected lazily, once per concrete model.
pub struct FieldBinding<T> {
    name: String,
    default: StateValue,
    protected: bool,
    choices: Vec<StateChoice>,
    methods: RwLock<HashMap<Uuid, MethodSet<T>>>,
}

impl<T> FieldBinding<T> {
    pub(crate) fn new(
        name: String,
        default: StateValue,
        protected: bool,
        choices: Vec<StateChoice>,
    ) -> Self {
        Self {
            name,
            default,
            protected,
            choices,
            methods: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_state(&self) -> &StateValue {
        &self.default
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn choices(&self) -> &[StateChoice] {
        &self.choices
    }

    /// Display label of `state`; the raw value when no choice declares one.
    pub fn label_for(&self, state: &StateValue) -> String {
        self.choices
            .iter()
            .find(|choice| &choice.value == state)
            .map(|choice| choice.label.clone())
            .unwrap_or_else(|| state.to_string())
    }

    /// Role the record plays while this field holds `state`.
    pub fn role_for(&self, state: &StateValue) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| &choice.value == state)
            .and_then(|choice| choice.role.as_deref())
    }

    pub fn declares_roles(&self) -> bool {
        self.choices.iter().any(|choice| choice.role.is_some())
    }

    /// Current value, bypassing protection.
    pub fn current_state<'a>(&self, state: &'a RecordState) -> Option<&'a StateValue> {
        state.get(&self.name)
    }

    /// Write a value, bypassing protection.
    pub fn set_state(&self, state: &mut RecordState, value: StateValue) {
        state.set(&self.name, value);
    }
}

impl<T: 'static> FieldBinding<T> {
    /// Transition methods of `concrete` acting on this field.
    ///
    /// The model and its parents are walked on first use and the result is
    /// cached under the concrete model's identity, so siblings sharing a
    /// parent never share a method set, even when they share a name.
    pub fn collect_transition_methods(&self, concrete: &Model<T>) -> MethodSet<T> {
        if let Some(methods) = self.methods.read().get(&concrete.id()) {
            return Arc::clone(methods);
        }

        let mut cache = self.methods.write();
        let methods = cache
            .entry(concrete.id())
            .or_insert_with(|| {
                let collected: Vec<_> = concrete
                    .visible_methods()
                    .into_iter()
                    .filter(|method| method.transitions_field(&self.name))
                    .collect();
                trace!(
                    field = %self.name,
                    model = concrete.name(),
                    methods = collected.len(),
                    "collected transition methods"
                );
                collected.into()
            });
        Arc::clone(methods)
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("protected", &self.protected)
            .field("choices", &self.choices)
            .finish_non_exhaustive()
    }
}
