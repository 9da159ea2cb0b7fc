//! Running transition methods.

use super::signal::{SignalTarget, TransitionSignal};
use super::Model;
use crate::core::{all_hold, Args, StateValue, TransitionOutput};
use crate::error::{FsmError, TransitionError};
use crate::field::{FieldBinding, Record};
use crate::transition::{Target, TransitionRule};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One field the method is about to transition.
struct Attempt<'m, T> {
    field: Arc<FieldBinding<T>>,
    rule: &'m TransitionRule<T>,
    source: StateValue,
}

impl<T: Record> Model<T> {
    /// Run transition method `method` on `record` with `body` as its body.
    ///
    /// See [`invoke_with`](Self::invoke_with).
    pub fn invoke<R, E, F>(&self, record: &mut T, method: &str, body: F) -> Result<R, TransitionError<E>>
    where
        R: TransitionOutput,
        E: fmt::Display,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        self.invoke_with(record, method, Args::new(), |record, _| body(record))
    }

    /// Run transition method `method` on `record`, passing `args` to the body
    /// and to computed targets.
    ///
    /// Every field the method transitions must have an applicable rule whose
    /// conditions hold, otherwise nothing runs and the call fails with
    /// [`FsmError::TransitionNotAllowed`]. The body runs once. On success
    /// each field moves to its rule's target; when the body fails, fields
    /// with an `on_error` state move there and the body's error is returned.
    pub fn invoke_with<R, E, F>(
        &self,
        record: &mut T,
        method: &str,
        args: Args,
        body: F,
    ) -> Result<R, TransitionError<E>>
    where
        R: TransitionOutput,
        E: fmt::Display,
        F: FnOnce(&mut T, &Args) -> Result<R, E>,
    {
        self.ensure_concrete()?;
        let method = self.require_method(method)?;

        let mut attempts = Vec::with_capacity(method.registries().len());
        for registry in method.registries() {
            let field = self.require_field(registry.field())?;
            let source = self.current(&field, record);

            let rule = registry
                .resolve_rule(&source)
                .map(|(_, rule)| rule)
                .filter(|rule| all_hold(&rule.conditions, &*record))
                .ok_or_else(|| FsmError::TransitionNotAllowed {
                    model: self.name.clone(),
                    method: method.name().to_string(),
                    field: field.name().to_string(),
                    state: source.to_string(),
                    record: record.record_state().id(),
                })?;

            attempts.push(Attempt { field, rule, source });
        }

        for attempt in &attempts {
            self.signals.send_pre(&TransitionSignal {
                model: &self.name,
                record: &*record,
                method: method.name(),
                field: attempt.field.name(),
                source: &attempt.source,
                target: announced(&attempt.rule.target),
                exception: None,
                at: Utc::now(),
            });
        }

        match body(record, &args) {
            Ok(output) => {
                let mut next_states = Vec::with_capacity(attempts.len());
                for attempt in &attempts {
                    next_states.push(next_state(
                        method.name(),
                        &attempt.rule.target,
                        &*record,
                        &args,
                        &output,
                    )?);
                }

                for (attempt, next) in attempts.iter().zip(next_states) {
                    let target = match next {
                        Some(next) => {
                            self.write(record, &attempt.field, method.name(), &attempt.source, &next);
                            SignalTarget::State(next)
                        }
                        None => SignalTarget::Unchanged,
                    };
                    self.signals.send_post(&TransitionSignal {
                        model: &self.name,
                        record: &*record,
                        method: method.name(),
                        field: attempt.field.name(),
                        source: &attempt.source,
                        target,
                        exception: None,
                        at: Utc::now(),
                    });
                }
                Ok(output)
            }
            Err(error) => {
                let message = error.to_string();
                for attempt in &attempts {
                    let Some(fallback) = &attempt.rule.on_error else {
                        continue;
                    };
                    self.write(record, &attempt.field, method.name(), &attempt.source, fallback);
                    self.signals.send_post(&TransitionSignal {
                        model: &self.name,
                        record: &*record,
                        method: method.name(),
                        field: attempt.field.name(),
                        source: &attempt.source,
                        target: SignalTarget::State(fallback.clone()),
                        exception: Some(&message),
                        at: Utc::now(),
                    });
                }
                Err(TransitionError::Body(error))
            }
        }
    }

    fn write(
        &self,
        record: &mut T,
        field: &FieldBinding<T>,
        method: &str,
        from: &StateValue,
        to: &StateValue,
    ) {
        let state = record.record_state_mut();
        field.set_state(state, to.clone());
        self.apply_role(field, state);
        debug!(
            model = %self.name,
            method,
            field = field.name(),
            %from,
            %to,
            "state changed"
        );
    }
}

fn announced<T>(target: &Target<T>) -> SignalTarget {
    match target {
        Target::Fixed(state) => SignalTarget::State(state.clone()),
        Target::Unchanged => SignalTarget::Unchanged,
        Target::Computed(resolver) => {
            SignalTarget::Computed(resolver.allowed_states().map(<[StateValue]>::to_vec))
        }
        Target::ReturnValue(states) => SignalTarget::ReturnValue(states.clone()),
    }
}

/// State a field moves to after a successful body; `None` keeps it.
fn next_state<T, R: TransitionOutput>(
    method: &str,
    target: &Target<T>,
    record: &T,
    args: &Args,
    output: &R,
) -> Result<Option<StateValue>, FsmError> {
    match target {
        Target::Fixed(state) => Ok(Some(state.clone())),
        Target::Unchanged => Ok(None),
        Target::Computed(resolver) => {
            let value = resolver.resolve(record, args);
            match resolver.allowed_states() {
                Some(allowed) if !allowed.contains(&value) => Err(FsmError::InvalidResultState {
                    method: method.to_string(),
                    value: Some(value),
                    allowed: allowed.to_vec(),
                }),
                _ => Ok(Some(value)),
            }
        }
        Target::ReturnValue(allowed) => match output.result_state() {
            Some(value) if allowed.contains(&value) => Ok(Some(value)),
            value => Err(FsmError::InvalidResultState {
                method: method.to_string(),
                value,
                allowed: allowed.clone(),
            }),
        },
    }
}
