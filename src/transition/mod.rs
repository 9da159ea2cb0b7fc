//! Transition metadata: rules, registries and transition methods.
//!
//! Registries are built once at definition time and never change after
//! their model is built.

mod registry;
mod rule;

pub use registry::{TransitionMethod, TransitionRegistry};
pub use rule::{ResolveFn, Resolver, Source, Target, TransitionRule};
