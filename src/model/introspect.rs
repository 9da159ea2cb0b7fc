//! Transition introspection queries.

use super::Model;
use crate::core::{Principal, StateValue};
use crate::error::FsmError;
use crate::field::Record;
use crate::transition::{Source, Target, TransitionMethod, TransitionRule};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One declared or currently available transition of a field.
pub struct TransitionInfo<T> {
    method: Arc<TransitionMethod<T>>,
    field: String,
    source: Source,
    rule: TransitionRule<T>,
}

impl<T> TransitionInfo<T> {
    /// Name of the transition method.
    pub fn name(&self) -> &str {
        self.method.name()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Source key the rule is registered under.
    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn target(&self) -> &Target<T> {
        &self.rule.target
    }

    pub fn on_error(&self) -> Option<&StateValue> {
        self.rule.on_error.as_ref()
    }

    /// Free-form metadata attached to the rule.
    pub fn custom(&self) -> &BTreeMap<String, Value> {
        &self.rule.custom
    }

    pub fn rule(&self) -> &TransitionRule<T> {
        &self.rule
    }

    pub fn method(&self) -> &Arc<TransitionMethod<T>> {
        &self.method
    }
}

impl<T> fmt::Debug for TransitionInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionInfo")
            .field("name", &self.name())
            .field("field", &self.field)
            .field("source", &self.source)
            .field("rule", &self.rule)
            .finish()
    }
}

impl<T: Record> Model<T> {
    /// Transitions of `field` that can fire from the record's current state
    /// with all conditions holding. Permissions are not consulted.
    ///
    /// Yields lazily, one item per transition method; the method's rule for
    /// the current state is the one reported.
    pub fn available_transitions<'a>(
        &'a self,
        record: &'a T,
        field: &str,
    ) -> Result<impl Iterator<Item = TransitionInfo<T>> + 'a, FsmError> {
        let binding = self.require_field(field)?;
        let methods = binding.collect_transition_methods(self);
        let current = self.current(&binding, record);
        let field = binding.name().to_string();

        Ok((0..methods.len()).filter_map(move |index| {
            let method = &methods[index];
            let (source, rule) = method.registry(&field)?.resolve_rule(&current)?;
            if !rule.conditions.iter().all(|condition| condition.check(record)) {
                return None;
            }
            Some(TransitionInfo {
                method: Arc::clone(method),
                field: field.clone(),
                source: source.clone(),
                rule: rule.clone(),
            })
        }))
    }

    /// Available transitions whose permission `principal` holds.
    pub fn available_transitions_for<'a>(
        &'a self,
        record: &'a T,
        field: &str,
        principal: &'a dyn Principal,
    ) -> Result<impl Iterator<Item = TransitionInfo<T>> + 'a, FsmError> {
        let scope = self.object_ref(record);
        Ok(self
            .available_transitions(record, field)?
            .filter(move |info| {
                info.rule
                    .permission
                    .as_ref()
                    .is_none_or(|permission| permission.grants(record, &scope, principal))
            }))
    }

    /// Every declared transition of `field` regardless of state, one item
    /// per source key, in method then source order.
    pub fn all_transitions(&self, field: &str) -> Result<Vec<TransitionInfo<T>>, FsmError> {
        let binding = self.require_field(field)?;
        let methods = binding.collect_transition_methods(self);

        let mut transitions = Vec::new();
        for method in methods.iter() {
            let Some(registry) = method.registry(binding.name()) else {
                continue;
            };
            for (source, rule) in registry.rules() {
                transitions.push(TransitionInfo {
                    method: Arc::clone(method),
                    field: binding.name().to_string(),
                    source: source.clone(),
                    rule: rule.clone(),
                });
            }
        }
        Ok(transitions)
    }

    /// Whether `method` may run on `record` now: every field it
    /// transitions has an applicable rule whose conditions hold.
    pub fn can_proceed(&self, record: &T, method: &str) -> Result<bool, FsmError> {
        let method = self.require_method(method)?;
        for registry in method.registries() {
            let field = self.require_field(registry.field())?;
            if !registry.conditions_met(record, &self.current(&field, record)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether `principal` holds the permission of every rule `method`
    /// would apply to `record` now.
    pub fn has_transition_perm(
        &self,
        record: &T,
        method: &str,
        principal: &dyn Principal,
    ) -> Result<bool, FsmError> {
        let method = self.require_method(method)?;
        let scope = self.object_ref(record);
        for registry in method.registries() {
            let field = self.require_field(registry.field())?;
            let current = self.current(&field, record);
            if !registry.conditions_met(record, &current)
                || !registry.permission_granted(record, &scope, &current, principal)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
