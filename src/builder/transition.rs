//! Builder for declaring transitions.

use crate::builder::error::BuildError;
use crate::core::{Condition, Permission, Principal, StateValue};
use crate::transition::{Resolver, Source, Target, TransitionRule};
use serde::Serialize;
use serde_json::Value;

/// Fluent declaration of one transition of one field.
///
/// Without sources the transition fires from any state; without a target
/// it leaves the state unchanged.
pub struct TransitionBuilder<T> {
    field: String,
    sources: Vec<Source>,
    target: Target<T>,
    on_error: Option<StateValue>,
    conditions: Vec<Condition<T>>,
    permission: Option<Permission<T>>,
    custom: Vec<(String, Value)>,
    invalid: Vec<String>,
}

impl<T> TransitionBuilder<T> {
    /// Start declaring a transition of `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            sources: Vec::new(),
            target: Target::Unchanged,
            on_error: None,
            conditions: Vec::new(),
            permission: None,
            custom: Vec::new(),
            invalid: Vec::new(),
        }
    }

    /// Add a source state. `"*"` means any state and `"+"` any state
    /// except the target.
    pub fn source(mut self, state: impl Into<StateValue>) -> Self {
        self.sources.push(Source::parse(state));
        self
    }

    /// Add several source states.
    pub fn sources<I, V>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<StateValue>,
    {
        self.sources.extend(states.into_iter().map(Source::parse));
        self
    }

    /// Fire from any state.
    pub fn from_any(mut self) -> Self {
        self.sources.push(Source::Any);
        self
    }

    /// Fire from any state except the target.
    pub fn from_any_except_target(mut self) -> Self {
        self.sources.push(Source::AnyExceptTarget);
        self
    }

    /// Move to `state` after the body succeeded.
    pub fn target(mut self, state: impl Into<StateValue>) -> Self {
        self.target = Target::Fixed(state.into());
        self
    }

    /// Let `resolver` pick the next state after the body ran.
    pub fn target_computed(mut self, resolver: Resolver<T>) -> Self {
        self.target = Target::Computed(resolver);
        self
    }

    /// Take the next state from the body's return value, which must be one
    /// of `states`.
    pub fn target_return_value<I, V>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<StateValue>,
    {
        self.target = Target::ReturnValue(states.into_iter().map(Into::into).collect());
        self
    }

    /// State to fall back to when the body fails.
    pub fn on_error(mut self, state: impl Into<StateValue>) -> Self {
        self.on_error = Some(state.into());
        self
    }

    /// Add a condition.
    pub fn condition(mut self, condition: Condition<T>) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a condition using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Condition::new(predicate));
        self
    }

    /// Require a named permission.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(Permission::named(permission));
        self
    }

    /// Require a permission decided by a closure.
    pub fn permission_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&T, &dyn Principal) -> bool + Send + Sync + 'static,
    {
        self.permission = Some(Permission::check(check));
        self
    }

    /// Attach metadata for introspection.
    pub fn custom<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => self.custom.push((key, value)),
            Err(error) => self
                .invalid
                .push(format!("custom property '{key}' does not serialize: {error}")),
        }
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Validate and split into the rule and the sources it registers under.
    pub(crate) fn build(self, method: &str) -> Result<(String, Vec<Source>, TransitionRule<T>), BuildError> {
        if let Some(reason) = self.invalid.into_iter().next() {
            return Err(BuildError::InvalidRule {
                method: method.to_string(),
                reason,
            });
        }
        if matches!(&self.target, Target::ReturnValue(states) if states.is_empty()) {
            return Err(BuildError::InvalidRule {
                method: method.to_string(),
                reason: "a return-value target needs at least one allowed state".into(),
            });
        }

        let mut sources = self.sources;
        if sources.is_empty() {
            sources.push(Source::Any);
        }

        let rule = TransitionRule {
            target: self.target,
            on_error: self.on_error,
            conditions: self.conditions,
            permission: self.permission,
            custom: self.custom.into_iter().collect(),
        };
        Ok((self.field, sources, rule))
    }
}
