//! Permissions gating who may invoke an available transition.
//!
//! Permission checks are orthogonal to state legality: a transition can be
//! available from the current state and still be refused for a principal.

use crate::field::RecordId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// The record a scoped permission applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Model name of the record
    pub model: String,
    /// Primary key; `None` for a record that was never saved
    pub id: Option<RecordId>,
}

/// The authorization view of a caller.
///
/// Implementations consult whatever backend holds permission grants. A
/// `scope` of `None` asks for a global grant; `Some` asks for a grant on
/// that record only.
pub trait Principal {
    fn has_permission(&self, permission: &str, scope: Option<&ObjectRef>) -> bool;
}

/// Permission declared on a transition rule.
pub enum Permission<T> {
    /// A permission string looked up through the principal
    Named(String),
    /// A predicate over the record and the principal
    Check(Arc<dyn Fn(&T, &dyn Principal) -> bool + Send + Sync>),
}

impl<T> Permission<T> {
    pub fn named(permission: impl Into<String>) -> Self {
        Self::Named(permission.into())
    }

    pub fn check<F>(predicate: F) -> Self
    where
        F: Fn(&T, &dyn Principal) -> bool + Send + Sync + 'static,
    {
        Self::Check(Arc::new(predicate))
    }

    /// Whether `principal` may invoke the transition on `record`.
    ///
    /// Named permissions are granted either globally or on the record
    /// itself.
    pub fn grants(&self, record: &T, scope: &ObjectRef, principal: &dyn Principal) -> bool {
        match self {
            Self::Check(predicate) => predicate(record, principal),
            Self::Named(permission) => {
                principal.has_permission(permission, None)
                    || principal.has_permission(permission, Some(scope))
            }
        }
    }
}

impl<T> Clone for Permission<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(permission) => Self::Named(permission.clone()),
            Self::Check(predicate) => Self::Check(Arc::clone(predicate)),
        }
    }
}

impl<T> fmt::Debug for Permission<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(permission) => f.debug_tuple("Named").field(permission).finish(),
            Self::Check(_) => f.write_str("Check(..)"),
        }
    }
}

/// In-memory set of grants, usable as a [`Principal`].
///
/// Holds global permission strings and permissions scoped to single
/// records.
///
/// # Example
///
/// ```rust
/// use statefield::core::{ObjectRef, PermissionSet, Principal};
///
/// let editor = PermissionSet::new("editor").grant("blog.can_publish_post");
///
/// assert!(editor.has_permission("blog.can_publish_post", None));
/// assert!(!editor.has_permission("blog.can_remove_post", None));
/// ```
#[derive(Clone, Debug, Default)]
pub struct PermissionSet {
    name: String,
    global: HashSet<String>,
    scoped: HashSet<(String, ObjectRef)>,
}

impl PermissionSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Grant a permission globally.
    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.global.insert(permission.into());
        self
    }

    /// Grant a permission on one record only.
    pub fn grant_on(mut self, permission: impl Into<String>, object: ObjectRef) -> Self {
        self.scoped.insert((permission.into(), object));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Principal for PermissionSet {
    fn has_permission(&self, permission: &str, scope: Option<&ObjectRef>) -> bool {
        match scope {
            None => self.global.contains(permission),
            Some(object) => self
                .scoped
                .contains(&(permission.to_string(), object.clone())),
        }
    }
}
