//! Condition predicates gating transitions.
//!
//! Conditions are pure boolean functions over a record instance. A
//! transition is only available when every one of its conditions holds.

use std::fmt;
use std::sync::Arc;

/// Pure predicate over a record that must hold for a transition to run.
///
/// Conditions are evaluated before a transition's body. They are cheap to
/// clone; the predicate is shared.
///
/// # Example
///
/// ```rust
/// use statefield::core::Condition;
///
/// struct Article {
///     word_count: usize,
/// }
///
/// let long_enough = Condition::new(|a: &Article| a.word_count >= 100);
///
/// assert!(long_enough.check(&Article { word_count: 250 }));
/// assert!(!long_enough.check(&Article { word_count: 20 }));
/// ```
pub struct Condition<T> {
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    label: Option<String>,
}

impl<T> Condition<T> {
    /// Create a condition from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Arc::new(predicate),
            label: None,
        }
    }

    /// Create a condition with a label used in diagnostics.
    pub fn named<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Arc::new(predicate),
            label: Some(label.into()),
        }
    }

    /// Check whether the condition holds for this record.
    pub fn check(&self, record: &T) -> bool {
        (self.predicate)(record)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// True when every condition holds. An empty list is trivially true.
pub fn all_hold<T>(conditions: &[Condition<T>], record: &T) -> bool {
    conditions.iter().all(|condition| condition.check(record))
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            label: self.label.clone(),
        }
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Post {
        draft: bool,
        words: usize,
    }

    #[test]
    fn condition_checks_record() {
        let not_draft = Condition::new(|p: &Post| !p.draft);

        assert!(not_draft.check(&Post {
            draft: false,
            words: 0
        }));
        assert!(!not_draft.check(&Post {
            draft: true,
            words: 0
        }));
    }

    #[test]
    fn all_hold_requires_every_condition() {
        let conditions = vec![
            Condition::new(|p: &Post| !p.draft),
            Condition::named("has words", |p: &Post| p.words > 0),
        ];

        assert!(all_hold(
            &conditions,
            &Post {
                draft: false,
                words: 3
            }
        ));
        assert!(!all_hold(
            &conditions,
            &Post {
                draft: false,
                words: 0
            }
        ));
    }

    #[test]
    fn empty_condition_list_holds() {
        let conditions: Vec<Condition<Post>> = Vec::new();
        assert!(all_hold(
            &conditions,
            &Post {
                draft: true,
                words: 0
            }
        ));
    }

    #[test]
    fn cloned_condition_shares_predicate() {
        let condition = Condition::named("long", |p: &Post| p.words > 10);
        let cloned = condition.clone();

        let post = Post {
            draft: false,
            words: 11,
        };
        assert_eq!(condition.check(&post), cloned.check(&post));
        assert_eq!(cloned.label(), Some("long"));
    }
}
