//! Runtime errors raised by models, the executor and persistence.

use crate::core::StateValue;
use crate::field::RecordId;
use crate::persistence::StoreError;
use std::fmt;
use thiserror::Error;

/// Errors the library raises at call or save time.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("Can't switch from state '{state}' using method '{method}' on {model}.{field}")]
    TransitionNotAllowed {
        model: String,
        method: String,
        field: String,
        state: String,
        record: Option<RecordId>,
    },

    #[error("{method} produced state {value:?}, expected one of {allowed:?}")]
    InvalidResultState {
        method: String,
        value: Option<StateValue>,
        allowed: Vec<StateValue>,
    },

    #[error("Direct {field} modification is not allowed")]
    ProtectedField { field: String },

    #[error("{model} {id} was changed concurrently; reload it and retry")]
    ConcurrentTransition { model: String, id: RecordId },

    #[error("{model}.{method} is not a transition method")]
    NotATransition { model: String, method: String },

    #[error("{model} has no state field '{field}'")]
    UnknownField { model: String, field: String },

    #[error("{model} is not a concrete model")]
    NotConcrete { model: String },

    #[error("{model} {id} does not exist")]
    NotFound { model: String, id: RecordId },

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a failed transition call.
///
/// Either the library refused or aborted the transition, or the
/// transition's own body failed with `E`.
#[derive(Debug)]
pub enum TransitionError<E> {
    Fsm(FsmError),
    Body(E),
}

impl<E> TransitionError<E> {
    /// The body's error, if the body failed.
    pub fn body(&self) -> Option<&E> {
        match self {
            Self::Body(error) => Some(error),
            Self::Fsm(_) => None,
        }
    }

    pub fn fsm(&self) -> Option<&FsmError> {
        match self {
            Self::Fsm(error) => Some(error),
            Self::Body(_) => None,
        }
    }

    pub fn is_not_allowed(&self) -> bool {
        matches!(self, Self::Fsm(FsmError::TransitionNotAllowed { .. }))
    }
}

impl<E> From<FsmError> for TransitionError<E> {
    fn from(error: FsmError) -> Self {
        Self::Fsm(error)
    }
}

impl<E: fmt::Display> fmt::Display for TransitionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fsm(error) => write!(f, "{error}"),
            Self::Body(error) => write!(f, "Transition body failed: {error}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TransitionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fsm(error) => Some(error),
            Self::Body(error) => Some(error),
        }
    }
}
