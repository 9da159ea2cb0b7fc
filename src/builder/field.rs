//! Builder for declaring state fields.

use crate::builder::error::BuildError;
use crate::core::StateValue;
use crate::field::{FieldBinding, StateChoice};

/// Fluent declaration of a state field.
#[derive(Clone, Debug)]
pub struct FieldBuilder {
    name: String,
    default: Option<StateValue>,
    protected: bool,
    choices: Vec<StateChoice>,
}

impl FieldBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            protected: false,
            choices: Vec::new(),
        }
    }

    /// State new records start in (required).
    pub fn default(mut self, state: impl Into<StateValue>) -> Self {
        self.default = Some(state.into());
        self
    }

    /// Refuse direct assignment once the field holds a value.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Declare a state with its display label.
    pub fn choice(mut self, state: impl Into<StateValue>, label: impl Into<String>) -> Self {
        self.choices.push(StateChoice {
            value: state.into(),
            label: label.into(),
            role: None,
        });
        self
    }

    /// Declare a state whose records play `role` while in it.
    pub fn choice_with_role(
        mut self,
        state: impl Into<StateValue>,
        label: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        self.choices.push(StateChoice {
            value: state.into(),
            label: label.into(),
            role: Some(role.into()),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn choices(&self) -> &[StateChoice] {
        &self.choices
    }

    pub(crate) fn build<T>(self) -> Result<FieldBinding<T>, BuildError> {
        let default = self.default.ok_or_else(|| BuildError::MissingDefault {
            field: self.name.clone(),
        })?;
        Ok(FieldBinding::new(
            self.name,
            default,
            self.protected,
            self.choices,
        ))
    }
}
