//! Macros for declaring typed state enums.

/// Generate a `State` implementation for a simple enum, together with its
/// conversion into the stored [`StateValue`](crate::core::StateValue).
///
/// Variants are stored under their own names unless given an explicit
/// stored value with `= "value"`.
///
/// # Example
///
/// ```
/// use statefield::core::{State, StateValue};
/// use statefield::state_enum;
///
/// state_enum! {
///     pub enum PostState {
///         New = "new",
///         Published = "published",
///         Removed = "removed",
///         Failed = "failed",
///     }
///     final: [Removed, Failed]
///     error: [Failed]
/// }
///
/// assert_eq!(StateValue::from(PostState::Published), "published");
/// assert!(PostState::Failed.is_error());
/// ```
#[macro_export]
macro_rules! state_enum {
    (@stored $variant:ident $stored:literal) => {
        $stored
    };
    (@stored $variant:ident) => {
        stringify!($variant)
    };

    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $stored:literal)?
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $(#[serde(rename = $stored)])?
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@stored $variant $($stored)?)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }

        impl From<$name> for $crate::core::StateValue {
            fn from(state: $name) -> Self {
                $crate::core::State::to_value(&state)
            }
        }

        impl From<&$name> for $crate::core::StateValue {
            fn from(state: &$name) -> Self {
                $crate::core::State::to_value(state)
            }
        }
    };
}
