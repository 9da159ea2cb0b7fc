//! State fields: definitions, per-instance storage and role dispatch.

mod binding;
mod record;
mod role;

pub use binding::{FieldBinding, MethodSet, StateChoice};
pub use record::{Record, RecordId, RecordState};
pub use role::Roles;
