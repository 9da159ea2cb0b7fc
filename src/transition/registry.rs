//! Per-method transition registries.

use super::rule::{Source, TransitionRule};
use crate::builder::BuildError;
use crate::core::{all_hold, ObjectRef, Principal, StateValue};
use std::collections::BTreeMap;

/// Rules of one method for one field, keyed by source.
///
/// At most one rule exists per source key. The wildcard markers are keys
/// like any literal state, so they may coexist with literal sources.
pub struct TransitionRegistry<T> {
    field: String,
    rules: BTreeMap<Source, TransitionRule<T>>,
}

impl<T> TransitionRegistry<T> {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rules: BTreeMap::new(),
        }
    }

    /// Name of the field this registry transitions.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Register `rule` under `source`.
    ///
    /// Fails when a rule for the same source key already exists.
    pub fn add_transition(
        &mut self,
        method: &str,
        source: Source,
        rule: TransitionRule<T>,
    ) -> Result<(), BuildError> {
        if self.rules.contains_key(&source) {
            return Err(BuildError::DuplicateTransition {
                method: method.to_string(),
                field: self.field.clone(),
                from: source.to_string(),
            });
        }
        self.rules.insert(source, rule);
        Ok(())
    }

    /// Find the rule applicable to `current`, with the source it matched.
    ///
    /// Precedence: exact literal, then any state, then any state except
    /// the rule's own target.
    pub fn resolve_rule(&self, current: &StateValue) -> Option<(&Source, &TransitionRule<T>)> {
        let exact = Source::State(current.clone());
        if let Some(found) = self.rules.get_key_value(&exact) {
            return Some(found);
        }
        if let Some(found) = self.rules.get_key_value(&Source::Any) {
            return Some(found);
        }
        self.rules
            .get_key_value(&Source::AnyExceptTarget)
            .filter(|(_, rule)| !rule.excludes(current))
    }

    pub fn has_transition(&self, current: &StateValue) -> bool {
        self.resolve_rule(current).is_some()
    }

    /// True when a rule applies and all its conditions hold for `record`.
    pub fn conditions_met(&self, record: &T, current: &StateValue) -> bool {
        self.resolve_rule(current)
            .is_some_and(|(_, rule)| all_hold(&rule.conditions, record))
    }

    /// True when the applicable rule declares no permission or `principal`
    /// holds it.
    pub fn permission_granted(
        &self,
        record: &T,
        scope: &ObjectRef,
        current: &StateValue,
        principal: &dyn Principal,
    ) -> bool {
        match self.resolve_rule(current) {
            Some((_, rule)) => rule
                .permission
                .as_ref()
                .is_none_or(|permission| permission.grants(record, scope, principal)),
            None => false,
        }
    }

    /// All registered rules in source order.
    pub fn rules(&self) -> impl Iterator<Item = (&Source, &TransitionRule<T>)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A named transition method: one registry per field it transitions.
///
/// A method declared against several fields runs its body once and
/// transitions each field independently.
pub struct TransitionMethod<T> {
    name: String,
    registries: Vec<TransitionRegistry<T>>,
}

impl<T> TransitionMethod<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a rule for `field`, reusing that field's registry when the
    /// method already has one.
    pub fn add_transition(
        &mut self,
        field: &str,
        source: Source,
        rule: TransitionRule<T>,
    ) -> Result<(), BuildError> {
        let index = match self.registries.iter().position(|r| r.field() == field) {
            Some(index) => index,
            None => {
                self.registries.push(TransitionRegistry::new(field));
                self.registries.len() - 1
            }
        };
        let name = self.name.clone();
        self.registries[index].add_transition(&name, source, rule)
    }

    pub fn registries(&self) -> &[TransitionRegistry<T>] {
        &self.registries
    }

    /// The registry for `field`, if this method transitions it.
    pub fn registry(&self, field: &str) -> Option<&TransitionRegistry<T>> {
        self.registries.iter().find(|r| r.field() == field)
    }

    pub fn transitions_field(&self, field: &str) -> bool {
        self.registry(field).is_some()
    }
}
