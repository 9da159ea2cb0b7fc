//! Build errors for models, fields and transitions.

use thiserror::Error;

/// Errors raised once, at definition time, never at call time.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Duplicate transition for {from} state in {method} on field '{field}'")]
    DuplicateTransition {
        method: String,
        field: String,
        from: String,
    },

    #[error("State {state} of field '{field}' names unknown role '{role}'")]
    UnknownRole {
        field: String,
        state: String,
        role: String,
    },

    #[error("{model}.{method} transitions field '{field}', which {model} does not declare")]
    UnknownField {
        model: String,
        method: String,
        field: String,
    },

    #[error("Field '{field}' has no default state. Call .default(state)")]
    MissingDefault { field: String },

    #[error("Field '{field}' is declared twice on {model}")]
    DuplicateField { model: String, field: String },

    #[error("Mixin {model} cannot declare state fields")]
    MixinWithFields { model: String },

    #[error("Transition {method} is invalid: {reason}")]
    InvalidRule { method: String, reason: String },

    #[error("{} build errors: {}", .0.len(), join(.0))]
    Multiple(Vec<BuildError>),
}

impl BuildError {
    /// Collapse accumulated errors: one error stays itself.
    pub(crate) fn from_many(mut errors: Vec<BuildError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Self::Multiple(errors)
        }
    }

    /// Every individual error, flattening `Multiple`.
    pub fn errors(&self) -> Vec<&BuildError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(BuildError::errors).collect(),
            other => vec![other],
        }
    }
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
