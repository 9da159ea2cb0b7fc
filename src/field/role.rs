//! Role dispatch: behavior selected by the record's current role.

use super::record::Record;
use std::collections::HashMap;

/// One implementation of a capability per role.
///
/// A record's role follows its state (see [`StateChoice`](super::StateChoice)).
/// `Roles` picks the implementation for the role a record currently plays.
///
/// # Example
///
/// ```rust
/// use statefield::field::{Record, RecordState, Roles};
///
/// trait Movement {
///     fn travel(&self) -> &'static str;
/// }
///
/// struct Crawl;
/// impl Movement for Crawl {
///     fn travel(&self) -> &'static str { "crawl" }
/// }
///
/// struct Fly;
/// impl Movement for Fly {
///     fn travel(&self) -> &'static str { "fly" }
/// }
///
/// let roles: Roles<dyn Movement> = Roles::<dyn Movement>::new()
///     .with("Caterpillar", Box::new(Crawl))
///     .with("Butterfly", Box::new(Fly));
///
/// assert_eq!(roles.get("Butterfly").map(|m| m.travel()), Some("fly"));
/// assert!(roles.get("Moth").is_none());
/// ```
pub struct Roles<B: ?Sized> {
    implementations: HashMap<String, Box<B>>,
}

impl<B: ?Sized> Roles<B> {
    pub fn new() -> Self {
        Self {
            implementations: HashMap::new(),
        }
    }

    pub fn with(mut self, role: impl Into<String>, implementation: Box<B>) -> Self {
        self.implementations.insert(role.into(), implementation);
        self
    }

    pub fn get(&self, role: &str) -> Option<&B> {
        self.implementations.get(role).map(Box::as_ref)
    }

    /// Implementation for the role `record` currently plays.
    pub fn select<R: Record>(&self, record: &R) -> Option<&B> {
        record
            .record_state()
            .role()
            .and_then(|role| self.get(role))
    }
}

impl<B: ?Sized> Default for Roles<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::RecordState;

    trait Greeting {
        fn greet(&self) -> String;
    }

    struct Formal;
    impl Greeting for Formal {
        fn greet(&self) -> String {
            "Good day".into()
        }
    }

    struct Casual;
    impl Greeting for Casual {
        fn greet(&self) -> String {
            "Hey".into()
        }
    }

    struct Person {
        fsm: RecordState,
    }

    impl Record for Person {
        fn record_state(&self) -> &RecordState {
            &self.fsm
        }

        fn record_state_mut(&mut self) -> &mut RecordState {
            &mut self.fsm
        }
    }

    #[test]
    fn select_follows_record_role() {
        let roles: Roles<dyn Greeting> = Roles::<dyn Greeting>::new()
            .with("formal", Box::new(Formal))
            .with("casual", Box::new(Casual));

        let mut person = Person {
            fsm: RecordState::new(),
        };
        assert!(roles.select(&person).is_none());

        person.fsm.set_role(Some("casual".into()));
        assert_eq!(roles.select(&person).map(|g| g.greet()), Some("Hey".into()));
    }
}
