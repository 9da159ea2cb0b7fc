//! Statefield: declarative state machines for persisted record fields
//!
//! A record type declares one or more state fields. Named transition
//! methods move those fields between states, guarded by source states,
//! conditions and permissions. Transitions are declared once, when a model
//! is built; definition problems are reported together through
//! Stillwater's `Validation`.
//!
//! # Core Concepts
//!
//! - **Model**: a declared record type with its state fields, transition
//!   methods and parents (abstract models and mixins)
//! - **Transition method**: a named operation whose body runs only when
//!   every field it transitions allows it
//! - **Introspection**: which transitions are available now, and to whom
//! - **Persistence**: saving and loading records, optionally refusing saves
//!   that would overwrite a concurrent state change
//!
//! # Example
//!
//! ```rust
//! use statefield::builder::{FieldBuilder, ModelBuilder, TransitionBuilder};
//! use statefield::field::{Record, RecordState};
//! use statefield::FsmError;
//!
//! struct BlogPost {
//!     fsm: RecordState,
//!     publish_count: u32,
//! }
//!
//! impl Record for BlogPost {
//!     fn record_state(&self) -> &RecordState {
//!         &self.fsm
//!     }
//!
//!     fn record_state_mut(&mut self) -> &mut RecordState {
//!         &mut self.fsm
//!     }
//! }
//!
//! let model = ModelBuilder::<BlogPost>::new("BlogPost")
//!     .field(FieldBuilder::new("state").default("new").protected())
//!     .transition(
//!         "publish",
//!         TransitionBuilder::new("state").source("new").target("published"),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let mut post = BlogPost {
//!     fsm: model.initial_state(),
//!     publish_count: 0,
//! };
//!
//! model
//!     .invoke(&mut post, "publish", |post| {
//!         post.publish_count += 1;
//!         Ok::<_, String>(())
//!     })
//!     .unwrap();
//! assert_eq!(model.state(&post, "state").unwrap(), "published");
//!
//! let again = model.invoke(&mut post, "publish", |_| Ok::<_, String>(()));
//! assert!(again.unwrap_err().is_not_allowed());
//! assert_eq!(post.publish_count, 1);
//!
//! assert!(matches!(
//!     model.set_state(&mut post, "state", "new"),
//!     Err(FsmError::ProtectedField { .. })
//! ));
//! ```

pub mod builder;
pub mod core;
pub mod error;
pub mod field;
pub mod graph;
pub mod model;
pub mod persistence;
pub mod transition;

// Re-export commonly used types
pub use builder::{BuildError, FieldBuilder, ModelBuilder, TransitionBuilder};
pub use crate::core::{Args, Condition, Permission, PermissionSet, Principal, State, StateValue};
pub use error::{FsmError, TransitionError};
pub use field::{Record, RecordId, RecordState, Roles};
pub use model::{Model, ModelKind, SignalTarget, TransitionInfo, TransitionSignal};
pub use persistence::{MemoryStore, Store};
