//! State values carried by record fields.
//!
//! A field's state is an opaque comparable value. Integer and text values
//! are supported directly; typed enums implement [`State`] and convert into
//! a text value by name.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

/// The value a state field holds on one record instance.
///
/// Equality is the only operation the engine relies on. Ordering and
/// hashing are derived so values can key maps and sets.
///
/// # Example
///
/// ```rust
/// use statefield::core::StateValue;
///
/// let published = StateValue::from("published");
/// let step = StateValue::from(3);
///
/// assert_eq!(published.to_string(), "published");
/// assert_eq!(step.as_integer(), Some(3));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Integer-coded state (an integer column)
    Integer(i64),
    /// Text state (a character column)
    Text(String),
}

impl StateValue {
    /// The text form, if this is a text state.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Integer(_) => None,
        }
    }

    /// The integer form, if this is an integer state.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for StateValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl PartialEq<&str> for StateValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl PartialEq<str> for StateValue {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<i64> for StateValue {
    fn eq(&self, other: &i64) -> bool {
        self.as_integer() == Some(*other)
    }
}

/// Trait for typed state enums.
///
/// Implementors are stored on records as [`StateValue::Text`] holding
/// [`State::name`]. All methods are pure.
///
/// # Example
///
/// ```rust
/// use statefield::core::{State, StateValue};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum OrderState {
///     Draft,
///     PendingVendor,
///     Fulfilled,
/// }
///
/// impl State for OrderState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Draft => "DRAFT",
///             Self::PendingVendor => "PENDING_VENDOR",
///             Self::Fulfilled => "FULFILLED",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Fulfilled)
///     }
/// }
///
/// assert_eq!(OrderState::Draft.to_value(), StateValue::from("DRAFT"));
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name as stored in the field.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }

    /// The stored form of this state.
    fn to_value(&self) -> StateValue {
        StateValue::Text(self.name().to_string())
    }
}
