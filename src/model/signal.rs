//! Pre/post transition notifications.

use crate::core::StateValue;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Target a notification reports for the attempted transition.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalTarget {
    /// A concrete state
    State(StateValue),
    /// The rule keeps the state as is
    Unchanged,
    /// Decided after the body ran, by a resolver with these allowed states
    Computed(Option<Vec<StateValue>>),
    /// Decided by the body's return value, among these states
    ReturnValue(Vec<StateValue>),
}

impl SignalTarget {
    pub fn state(&self) -> Option<&StateValue> {
        match self {
            Self::State(state) => Some(state),
            _ => None,
        }
    }
}

/// Everything an observer learns about one transition of one field.
#[derive(Debug)]
pub struct TransitionSignal<'a, T> {
    /// Concrete model of the record
    pub model: &'a str,
    pub record: &'a T,
    pub method: &'a str,
    pub field: &'a str,
    pub source: &'a StateValue,
    pub target: SignalTarget,
    /// Display form of the body's error, when the body failed
    pub exception: Option<&'a str>,
    pub at: DateTime<Utc>,
}

/// Observer callback.
pub type Observer<T> = Arc<dyn Fn(&TransitionSignal<'_, T>) + Send + Sync>;

pub(crate) struct Signals<T> {
    pre: RwLock<Vec<Observer<T>>>,
    post: RwLock<Vec<Observer<T>>>,
}

impl<T> Signals<T> {
    pub(crate) fn new() -> Self {
        Self {
            pre: RwLock::new(Vec::new()),
            post: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn connect_pre(&self, observer: Observer<T>) {
        self.pre.write().push(observer);
    }

    pub(crate) fn connect_post(&self, observer: Observer<T>) {
        self.post.write().push(observer);
    }

    pub(crate) fn send_pre(&self, signal: &TransitionSignal<'_, T>) {
        // Observers run outside the lock so they may connect further ones.
        let observers = self.pre.read().clone();
        for observer in observers {
            observer(signal);
        }
    }

    pub(crate) fn send_post(&self, signal: &TransitionSignal<'_, T>) {
        let observers = self.post.read().clone();
        for observer in observers {
            observer(signal);
        }
    }
}
