//! Models: declared record types and their transition side table.
//!
//! A model is the definition-time description of a record type: its state
//! fields, transition methods, parents (abstract models and mixins) and
//! observers. Concrete models are the ones records are instances of; the
//! executor, the introspection queries and persistence all run against a
//! concrete model.

mod executor;
mod introspect;
mod signal;

pub use introspect::TransitionInfo;
pub use signal::{Observer, SignalTarget, TransitionSignal};
pub(crate) use signal::Signals;

use crate::core::{ObjectRef, StateValue};
use crate::error::FsmError;
use crate::field::{FieldBinding, Record, RecordState};
use crate::persistence::Snapshot;
use crate::transition::TransitionMethod;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// How a model takes part in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Records are instances of this model
    Concrete,
    /// Contributes fields and methods to the models extending it
    Abstract,
    /// Contributes methods only, referencing fields by name
    Mixin,
}

/// A declared record type.
///
/// Build models with [`ModelBuilder`](crate::builder::ModelBuilder).
pub struct Model<T> {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) kind: ModelKind,
    pub(crate) parents: Vec<Arc<Model<T>>>,
    pub(crate) fields: Vec<Arc<FieldBinding<T>>>,
    pub(crate) methods: Vec<Arc<TransitionMethod<T>>>,
    pub(crate) roles: Vec<String>,
    pub(crate) concurrency_guard: bool,
    pub(crate) signals: Signals<T>,
}

impl<T> Model<T> {
    /// Identity assigned when the model was built.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table the persistence layer stores records under.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn parents(&self) -> &[Arc<Model<T>>] {
        &self.parents
    }

    /// This model followed by its ancestors, depth first, each once.
    pub fn lineage(&self) -> Vec<&Model<T>> {
        fn walk<'a, T>(
            model: &'a Model<T>,
            seen: &mut HashSet<&'a str>,
            out: &mut Vec<&'a Model<T>>,
        ) {
            if !seen.insert(model.name.as_str()) {
                return;
            }
            out.push(model);
            for parent in &model.parents {
                walk(parent, seen, out);
            }
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        walk(self, &mut seen, &mut out);
        out
    }

    /// Transition methods visible on this model; a method redefined by a
    /// model shadows the same-named method of its ancestors.
    pub fn visible_methods(&self) -> Vec<Arc<TransitionMethod<T>>> {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for model in self.lineage() {
            for method in &model.methods {
                if seen.insert(method.name().to_string()) {
                    methods.push(Arc::clone(method));
                }
            }
        }
        methods
    }

    pub fn method(&self, name: &str) -> Option<Arc<TransitionMethod<T>>> {
        self.lineage()
            .into_iter()
            .flat_map(|model| model.methods.iter())
            .find(|method| method.name() == name)
            .cloned()
    }

    /// State fields declared on this model or inherited.
    pub fn fields(&self) -> Vec<Arc<FieldBinding<T>>> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for model in self.lineage() {
            for field in &model.fields {
                if seen.insert(field.name().to_string()) {
                    fields.push(Arc::clone(field));
                }
            }
        }
        fields
    }

    pub fn field(&self, name: &str) -> Option<Arc<FieldBinding<T>>> {
        self.lineage()
            .into_iter()
            .flat_map(|model| model.fields.iter())
            .find(|field| field.name() == name)
            .cloned()
    }

    /// Roles declared on this model or its ancestors.
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = Vec::new();
        for model in self.lineage() {
            for role in &model.roles {
                if !roles.contains(&role.as_str()) {
                    roles.push(role);
                }
            }
        }
        roles
    }

    /// Whether saves check that state columns are unchanged since load.
    pub fn concurrency_guarded(&self) -> bool {
        self.lineage().iter().any(|model| model.concurrency_guard)
    }

    pub(crate) fn ensure_concrete(&self) -> Result<(), FsmError> {
        match self.kind {
            ModelKind::Concrete => Ok(()),
            ModelKind::Abstract | ModelKind::Mixin => Err(FsmError::NotConcrete {
                model: self.name.clone(),
            }),
        }
    }

    pub(crate) fn require_field(&self, name: &str) -> Result<Arc<FieldBinding<T>>, FsmError> {
        self.field(name).ok_or_else(|| FsmError::UnknownField {
            model: self.name.clone(),
            field: name.to_string(),
        })
    }

    pub(crate) fn require_method(&self, name: &str) -> Result<Arc<TransitionMethod<T>>, FsmError> {
        self.method(name).ok_or_else(|| FsmError::NotATransition {
            model: self.name.clone(),
            method: name.to_string(),
        })
    }

    /// Register an observer called before every transition body runs.
    pub fn on_pre_transition<F>(&self, observer: F)
    where
        F: Fn(&TransitionSignal<'_, T>) + Send + Sync + 'static,
    {
        self.signals.connect_pre(Arc::new(observer));
    }

    /// Register an observer called after a transition settled a state.
    pub fn on_post_transition<F>(&self, observer: F)
    where
        F: Fn(&TransitionSignal<'_, T>) + Send + Sync + 'static,
    {
        self.signals.connect_post(Arc::new(observer));
    }

    /// Fresh per-instance state: every field at its default, the role of
    /// the default states, and a snapshot of those values.
    pub fn initial_state(&self) -> RecordState {
        let mut state = RecordState::new();
        for field in self.fields() {
            field.set_state(&mut state, field.default_state().clone());
            self.apply_role(&field, &mut state);
        }
        state.set_snapshot(Snapshot::capture(&state));
        state
    }

    /// Like [`initial_state`](Self::initial_state), with some fields
    /// starting somewhere other than their default.
    pub fn initial_state_with<I, K, V>(&self, overrides: I) -> Result<RecordState, FsmError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<StateValue>,
    {
        let mut state = self.initial_state();
        for (name, value) in overrides {
            let field = self.require_field(name.as_ref())?;
            field.set_state(&mut state, value.into());
            self.apply_role(&field, &mut state);
        }
        state.set_snapshot(Snapshot::capture(&state));
        Ok(state)
    }

    /// Re-tag the record's role from `field`'s current state. States
    /// without a declared role leave the role unchanged.
    pub(crate) fn apply_role(&self, field: &FieldBinding<T>, state: &mut RecordState) {
        let role = field
            .current_state(state)
            .and_then(|value| field.role_for(value))
            .map(str::to_string);
        if role.is_some() {
            state.set_role(role);
        }
    }
}

impl<T: Record> Model<T> {
    /// Current value of `field` on `record`; the field's default when the
    /// record holds none.
    pub fn state(&self, record: &T, field: &str) -> Result<StateValue, FsmError> {
        let binding = self.require_field(field)?;
        Ok(self.current(&binding, record))
    }

    pub(crate) fn current(&self, binding: &FieldBinding<T>, record: &T) -> StateValue {
        binding
            .current_state(record.record_state())
            .unwrap_or_else(|| binding.default_state())
            .clone()
    }

    /// Assign a state directly, outside any transition.
    ///
    /// Protected fields refuse assignment once the record holds a value,
    /// unless protection was lifted with
    /// [`with_unprotected`](Self::with_unprotected).
    pub fn set_state(
        &self,
        record: &mut T,
        field: &str,
        value: impl Into<StateValue>,
    ) -> Result<(), FsmError> {
        let binding = self.require_field(field)?;
        let state = record.record_state_mut();
        if binding.is_protected()
            && state.contains(binding.name())
            && !state.is_unprotected(binding.name())
        {
            return Err(FsmError::ProtectedField {
                field: binding.name().to_string(),
            });
        }
        binding.set_state(state, value.into());
        self.apply_role(&binding, state);
        Ok(())
    }

    /// Run `op` with protection lifted for exactly `field` on exactly this
    /// record. Protection is restored when `op` returns or panics.
    pub fn with_unprotected<R, F>(&self, record: &mut T, field: &str, op: F) -> Result<R, FsmError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let binding = self.require_field(field)?;
        let lifted = record.record_state_mut().lift_protection(binding.name());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(&mut *record)));

        if lifted {
            record.record_state_mut().restore_protection(binding.name());
        }
        match outcome {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Scope used for object-level permission checks.
    pub fn object_ref(&self, record: &T) -> ObjectRef {
        ObjectRef {
            model: self.name.clone(),
            id: record.record_state().id(),
        }
    }
}

impl<T> fmt::Debug for Model<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parents", &self.parents.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("fields", &self.fields)
            .field(
                "methods",
                &self.methods.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
