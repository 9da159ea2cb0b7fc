//! Core value types shared by the registry and the executor.
//!
//! This module contains the pure building blocks:
//! - State values and the `State` trait for typed enums
//! - Condition predicates over records
//! - Call arguments and return-value conversion
//! - Permissions and the `Principal` authorization view

mod args;
mod condition;
mod permission;
mod state;

pub use args::{Args, TransitionOutput};
pub use condition::{all_hold, Condition};
pub use permission::{ObjectRef, Permission, PermissionSet, Principal};
pub use state::{State, StateValue};
