//! Badge ledger: the per-run record of earned badges, failed badges with
//! their messages, and the one-way invalidation flip.

use std::rc::Rc;

pub mod messages;

/// Mutable per-run ledger.
///
/// Earned badges keep insertion order and never duplicate. Failure messages
/// are first-write-wins and never removed. A badge is never both earned and
/// failed: earning a failed badge is a no-op, and failing an earned badge
/// records no message (the run is still invalidated by the caller).
#[derive(Debug, Default)]
pub struct Ledger {
    badges: Vec<Rc<str>>,
    errors: Vec<(Rc<str>, String)>,
    invalidated: bool,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub fn earn(&mut self, badge: &str) {
        if self.earned(badge) || self.failed(badge) {
            return;
        }
        self.badges.push(badge.into());
    }

    /// Records `message` for `badge` unless a message is already present or
    /// the badge was earned. Returns whether the message was recorded.
    pub fn fail(&mut self, badge: &str, message: &str) -> bool {
        if self.failed(badge) || self.earned(badge) {
            return false;
        }
        self.errors.push((badge.into(), message.to_string()));
        true
    }

    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn earned(&self, badge: &str) -> bool {
        self.badges.iter().any(|b| b.as_ref() == badge)
    }

    pub fn failed(&self, badge: &str) -> bool {
        self.errors.iter().any(|(b, _)| b.as_ref() == badge)
    }

    pub fn has_all(&self, badges: &[String]) -> bool {
        badges.iter().all(|b| self.earned(b))
    }

    pub fn badges(&self) -> Vec<String> {
        self.badges.iter().map(|b| b.to_string()).collect()
    }

    pub fn errors(&self) -> &[(Rc<str>, String)] {
        &self.errors
    }
}
