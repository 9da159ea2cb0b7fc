//! Transition rules: one allowed state change.

use crate::core::{Args, Condition, Permission, StateValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Source pattern a rule is registered under.
///
/// An explicit list of source states is registered as one rule per state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    /// Exactly this state
    State(StateValue),
    /// Any state (`"*"`)
    Any,
    /// Any state except the rule's own target (`"+"`)
    AnyExceptTarget,
}

impl Source {
    /// Parse the declaration shorthand: `"*"` and `"+"` are wildcards,
    /// anything else is a literal state.
    pub fn parse(value: impl Into<StateValue>) -> Self {
        match value.into() {
            StateValue::Text(text) if text == "*" => Self::Any,
            StateValue::Text(text) if text == "+" => Self::AnyExceptTarget,
            state => Self::State(state),
        }
    }

    pub fn state(&self) -> Option<&StateValue> {
        match self {
            Self::State(state) => Some(state),
            Self::Any | Self::AnyExceptTarget => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::State(_))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(state) => write!(f, "{state}"),
            Self::Any => f.write_str("*"),
            Self::AnyExceptTarget => f.write_str("+"),
        }
    }
}

/// Function computing the next state from the record and call arguments.
pub type ResolveFn<T> = Arc<dyn Fn(&T, &Args) -> StateValue + Send + Sync>;

/// Caller-computed target with an optional closed set of allowed results.
pub struct Resolver<T> {
    func: ResolveFn<T>,
    allowed: Option<Vec<StateValue>>,
}

impl<T> Resolver<T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&T, &Args) -> StateValue + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            allowed: None,
        }
    }

    /// Restrict the resolver's results to `states`.
    pub fn allowed<I, V>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<StateValue>,
    {
        self.allowed = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn resolve(&self, record: &T, args: &Args) -> StateValue {
        (self.func)(record, args)
    }

    pub fn allowed_states(&self) -> Option<&[StateValue]> {
        self.allowed.as_deref()
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            allowed: self.allowed.clone(),
        }
    }
}

/// What a successful transition does to the field.
pub enum Target<T> {
    /// Move to this state
    Fixed(StateValue),
    /// Validate the source only; the state does not change
    Unchanged,
    /// Ask a resolver after the body ran
    Computed(Resolver<T>),
    /// Use the body's return value, which must be one of these states
    ReturnValue(Vec<StateValue>),
}

impl<T> Target<T> {
    pub fn fixed(&self) -> Option<&StateValue> {
        match self {
            Self::Fixed(state) => Some(state),
            _ => None,
        }
    }

    /// Every state this target can produce, when that set is known.
    pub fn possible_states(&self) -> Vec<StateValue> {
        match self {
            Self::Fixed(state) => vec![state.clone()],
            Self::Unchanged => Vec::new(),
            Self::Computed(resolver) => resolver.allowed_states().unwrap_or_default().to_vec(),
            Self::ReturnValue(states) => states.clone(),
        }
    }
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(state) => Self::Fixed(state.clone()),
            Self::Unchanged => Self::Unchanged,
            Self::Computed(resolver) => Self::Computed(resolver.clone()),
            Self::ReturnValue(states) => Self::ReturnValue(states.clone()),
        }
    }
}

impl<T> fmt::Debug for Target<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(state) => f.debug_tuple("Fixed").field(state).finish(),
            Self::Unchanged => f.write_str("Unchanged"),
            Self::Computed(resolver) => f
                .debug_struct("Computed")
                .field("allowed", &resolver.allowed)
                .finish_non_exhaustive(),
            Self::ReturnValue(states) => f.debug_tuple("ReturnValue").field(states).finish(),
        }
    }
}

/// Immutable description of one allowed state change.
pub struct TransitionRule<T> {
    pub target: Target<T>,
    pub on_error: Option<StateValue>,
    pub conditions: Vec<Condition<T>>,
    pub permission: Option<Permission<T>>,
    pub custom: BTreeMap<String, Value>,
}

impl<T> TransitionRule<T> {
    pub fn new(target: Target<T>) -> Self {
        Self {
            target,
            on_error: None,
            conditions: Vec::new(),
            permission: None,
            custom: BTreeMap::new(),
        }
    }

    /// Whether an "any state except target" rule may fire from `current`.
    ///
    /// Only the rule's own fixed target is compared.
    pub fn excludes(&self, current: &StateValue) -> bool {
        self.target.fixed() == Some(current)
    }
}

impl<T> Clone for TransitionRule<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            on_error: self.on_error.clone(),
            conditions: self.conditions.clone(),
            permission: self.permission.clone(),
            custom: self.custom.clone(),
        }
    }
}

impl<T> fmt::Debug for TransitionRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRule")
            .field("target", &self.target)
            .field("on_error", &self.on_error)
            .field("conditions", &self.conditions.len())
            .field("permission", &self.permission)
            .field("custom", &self.custom)
            .finish()
    }
}
