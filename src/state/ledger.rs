use crate::state::AddressState;
use crate::MinimaError;
use std::collections::HashMap;

/// Tracks the lifecycle state of every address touched in the current run
///
/// Addresses not present in the ledger are `Unseen`. Each move is checked
/// against [`AddressState::can_transition_to`]; an illegal move is an
/// internal invariant violation.
#[derive(Debug, Default)]
pub struct StateLedger {
    states: HashMap<String, AddressState>,
}

impl StateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `address`
    pub fn state(&self, address: &str) -> AddressState {
        self.states
            .get(address)
            .copied()
            .unwrap_or(AddressState::Unseen)
    }

    /// Registers work resumed from a previous run as `Pending`
    ///
    /// Addresses the ledger already knows are left untouched.
    pub fn observe_pending(&mut self, address: &str) {
        self.states
            .entry(address.to_string())
            .or_insert(AddressState::Pending);
    }

    /// Returns every address left mid-pipeline by an interrupted run to
    /// `Pending`
    ///
    /// Such addresses are still pending in the frontier and will be fetched
    /// again. Returns the number of addresses reset.
    pub fn requeue_unfinished(&mut self) -> usize {
        let mut reset = 0;
        for state in self.states.values_mut() {
            if *state == AddressState::Fetched || state.is_outcome() {
                *state = AddressState::Pending;
                reset += 1;
            }
        }
        reset
    }

    /// Moves `address` to `next`, rejecting illegal transitions
    pub fn advance(&mut self, address: &str, next: AddressState) -> Result<(), MinimaError> {
        let current = self.state(address);
        if !current.can_transition_to(next) {
            return Err(MinimaError::InvalidTransition {
                address: address.to_string(),
                from: current,
                to: next,
            });
        }

        tracing::trace!("{}: {} -> {}", address, current, next);
        self.states.insert(address.to_string(), next);
        Ok(())
    }

    /// Number of addresses currently in `state`
    pub fn count(&self, state: AddressState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_address_is_unseen() {
        let ledger = StateLedger::new();
        assert_eq!(ledger.state("https://example.com/"), AddressState::Unseen);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut ledger = StateLedger::new();
        let addr = "https://example.com/";

        ledger.advance(addr, AddressState::Pending).unwrap();
        ledger.advance(addr, AddressState::Fetched).unwrap();
        ledger.advance(addr, AddressState::Accepted).unwrap();
        ledger.advance(addr, AddressState::Processed).unwrap();

        assert_eq!(ledger.state(addr), AddressState::Processed);
        assert_eq!(ledger.count(AddressState::Processed), 1);
    }

    #[test]
    fn test_illegal_transition_is_reported() {
        let mut ledger = StateLedger::new();
        let addr = "https://example.com/";

        let err = ledger.advance(addr, AddressState::Accepted).unwrap_err();
        assert!(matches!(
            err,
            MinimaError::InvalidTransition {
                from: AddressState::Unseen,
                to: AddressState::Accepted,
                ..
            }
        ));
        assert_eq!(ledger.state(addr), AddressState::Unseen);
    }

    #[test]
    fn test_observe_pending_keeps_known_state() {
        let mut ledger = StateLedger::new();
        ledger.observe_pending("a");
        assert_eq!(ledger.state("a"), AddressState::Pending);

        ledger.advance("a", AddressState::Fetched).unwrap();
        ledger.observe_pending("a");
        assert_eq!(ledger.state("a"), AddressState::Fetched);
    }

    #[test]
    fn test_requeue_unfinished_resets_interrupted_work() {
        let mut ledger = StateLedger::new();
        ledger.observe_pending("fetched");
        ledger.advance("fetched", AddressState::Fetched).unwrap();
        ledger.observe_pending("done");
        ledger.advance("done", AddressState::FetchFailed).unwrap();
        ledger.advance("done", AddressState::Processed).unwrap();
        ledger.observe_pending("waiting");

        assert_eq!(ledger.requeue_unfinished(), 1);
        assert_eq!(ledger.state("fetched"), AddressState::Pending);
        assert_eq!(ledger.state("done"), AddressState::Processed);
        assert_eq!(ledger.state("waiting"), AddressState::Pending);

        // the address can go through the pipeline again
        ledger.advance("fetched", AddressState::Fetched).unwrap();
    }
}
