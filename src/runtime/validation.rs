//! The validation run orchestrator and its query surface.

use log::debug;

use crate::{
    badge::messages::MessageBook,
    runtime::{
        chain_cache::ChainCache,
        internal::Shared,
        report::{Report, find_nested_message},
        ring::Ring,
        scheduler::{Pending, Resolver},
        value::Value,
    },
    store::path::Path,
};

/// The settled state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Some chain is still suspended.
    Pending,
    /// Every chain settled; the flag is the run's validity.
    Settled(bool),
    /// The run was rejected: a body errored, a pending value was rejected,
    /// a contract was violated, or the run was disposed.
    Faulted(String),
}

/// One validation run.
///
/// Construction invokes the build function synchronously with a seed ring,
/// then drains the cooperative scheduler. Chains containing pending values
/// keep the run unsettled until their resolvers fire (each resolution
/// re-enters the drain loop); the run settles at the fixed point where
/// nothing is queued and nothing is in flight.
///
/// `ok()` is optimistic: it may read `Some(true)` while work is pending and
/// flip once that work settles. Await settlement (`settled`, `outcome`,
/// `on_settle`) before trusting a final verdict.
pub struct Validation {
    shared: Shared,
}

impl Validation {
    pub fn new(build: impl FnOnce(&Ring)) -> Validation {
        Validation::construct(MessageBook::new(), ChainCache::new(), build)
    }

    /// `new` with this run's own failure-message book.
    pub fn with_messages(messages: MessageBook, build: impl FnOnce(&Ring)) -> Validation {
        Validation::construct(messages, ChainCache::new(), build)
    }

    /// Continuous validation: carries the previous run's closed chain
    /// records into a new run (chains left open are dropped), inherits its
    /// message book, and disposes the previous run.
    pub fn continue_from(previous: Validation, build: impl FnOnce(&Ring)) -> Validation {
        let messages = previous.shared.internal.borrow().messages.clone();
        Validation::continue_from_with_messages(previous, messages, build)
    }

    /// `continue_from` with a replacement message book.
    pub fn continue_from_with_messages(
        previous: Validation,
        messages: MessageBook,
        build: impl FnOnce(&Ring),
    ) -> Validation {
        let (chains, opened, closed) = {
            let mut internal = previous.shared.internal.borrow_mut();
            (
                std::mem::take(&mut internal.chains),
                std::mem::take(&mut internal.opened),
                std::mem::take(&mut internal.closed),
            )
        };
        let chains = chains.into_transplant(&opened, &closed);
        previous.dispose(None);
        Validation::construct(messages, chains, build)
    }

    fn construct(
        messages: MessageBook,
        chains: ChainCache,
        build: impl FnOnce(&Ring),
    ) -> Validation {
        let shared = Shared::new(messages, chains);
        let seed = Ring::seed(&shared);
        build(&seed);
        shared.pump();
        Validation { shared }
    }

    // ---- query surface ------------------------------------------------------

    /// Current validity: `Some(true)`/`Some(false)` while running or after
    /// settlement, `None` once the run faulted (not evaluable).
    pub fn ok(&self) -> Option<bool> {
        self.shared.ok()
    }

    /// Earned badges, in the order they were earned.
    pub fn badges(&self) -> Vec<String> {
        self.shared.internal.borrow().ledger.badges()
    }

    /// Failed badges with their messages, in failure order.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.shared
            .internal
            .borrow()
            .ledger
            .errors()
            .iter()
            .map(|(badge, message)| (badge.to_string(), message.clone()))
            .collect()
    }

    pub fn failed_badges(&self) -> Vec<String> {
        self.shared
            .internal
            .borrow()
            .ledger
            .errors()
            .iter()
            .map(|(badge, _)| badge.to_string())
            .collect()
    }

    /// True when every listed badge has been earned.
    pub fn has(&self, badges: &[&str]) -> bool {
        let owned: Vec<String> = badges.iter().map(|b| b.to_string()).collect();
        self.shared.internal.borrow().ledger.has_all(&owned)
    }

    /// Failure messages of badges matching any of the globs (all failures
    /// when no glob is given), deduplicated, in failure order.
    pub fn messages(&self, globs: &[&str]) -> Vec<String> {
        use crate::badge::messages::Glob;
        let globs: Vec<Glob> = globs.iter().map(|g| Glob::parse(g)).collect();
        let internal = self.shared.internal.borrow();
        let mut out: Vec<String> = Vec::new();
        for (badge, message) in internal.ledger.errors() {
            let matched = globs.is_empty() || globs.iter().any(|g| g.matches(badge));
            if matched && !out.contains(message) {
                out.push(message.clone());
            }
        }
        out
    }

    /// First failure message matching the globs.
    pub fn message(&self, globs: &[&str]) -> Option<String> {
        self.messages(globs).into_iter().next()
    }

    /// On a valid run, `Ok(())`. Otherwise the first non-empty failure
    /// message, searching this run's errors and then any nested report
    /// reachable through `$`; else `default`, else the empty string.
    pub fn raise(&self, default: &str) -> Result<(), String> {
        if self.ok() == Some(true) {
            return Ok(());
        }
        let own = self
            .errors()
            .into_iter()
            .map(|(_, message)| message)
            .find(|message| !message.is_empty());
        let message = own
            .or_else(|| find_nested_message(&self.store_root()))
            .unwrap_or_else(|| default.to_string());
        Err(message)
    }

    /// The completion state. `Pending` until the fixed point is reached.
    pub fn outcome(&self) -> RunOutcome {
        match &self.shared.internal.borrow().outcome {
            None => RunOutcome::Pending,
            Some(Ok(valid)) => RunOutcome::Settled(*valid),
            Some(Err(reason)) => RunOutcome::Faulted(reason.clone()),
        }
    }

    pub fn settled(&self) -> bool {
        self.shared.done()
    }

    /// Runs `f` when the run settles, immediately if it already has.
    pub fn on_settle(&self, f: impl FnOnce(&Result<bool, String>) + 'static) {
        self.shared.on_settle(Box::new(f));
    }

    /// Forces the run to settle as rejected, with `message` or "disposed".
    /// Idempotent; afterwards every ring operation is a no-op.
    pub fn dispose(&self, message: Option<&str>) {
        if self.shared.done() {
            return;
        }
        debug!("validation disposed");
        self.shared.fail_run(message.unwrap_or("disposed"));
    }

    // ---- store access -------------------------------------------------------

    /// Reads the side store at `path`.
    pub fn stored(&self, path: impl Into<Path>) -> Value {
        self.shared.internal.borrow().store.read(&path.into())
    }

    /// Snapshot of the whole side store.
    pub fn store_root(&self) -> Value {
        self.shared.internal.borrow().store.root()
    }

    /// Snapshot of this run as a nestable report.
    pub fn report(&self) -> Report {
        self.shared.report()
    }

    /// A `Pending`/`Resolver` pair for feeding an asynchronous input into
    /// this run's chains.
    pub fn deferred(&self) -> (Pending, Resolver) {
        self.shared.deferred()
    }
}
