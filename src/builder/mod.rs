//! Builder API for declaring models, fields and transitions.
//!
//! Models are declared with fluent builders; problems found while building
//! are reported together as a [`BuildError`].

pub mod error;
pub mod field;
pub mod macros;
pub mod model;
pub mod transition;

pub use error::BuildError;
pub use field::FieldBuilder;
pub use model::ModelBuilder;
pub use transition::TransitionBuilder;
