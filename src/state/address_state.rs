/// Address lifecycle states for one crawl run
///
/// Every address moves through
/// `Unseen -> Pending -> Fetched -> {Accepted | RejectedByLanguage} -> Processed`,
/// or `Pending -> FetchFailed -> Processed` when retrieval fails.
use std::fmt;

/// Represents where an address is in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressState {
    // ===== Active States =====
    /// Address has never been offered to the frontier
    Unseen,

    /// Address is waiting in the frontier
    Pending,

    /// Body was retrieved and awaits analysis
    Fetched,

    // ===== Outcome States =====
    /// Record was exported (and links possibly expanded)
    Accepted,

    /// Detected language is outside the accepted set
    RejectedByLanguage,

    /// Retrieval failed after retries or on a terminal status
    FetchFailed,

    // ===== Terminal State =====
    /// Address is recorded as processed in the frontier
    Processed,
}

impl AddressState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if the address still needs work
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Unseen | Self::Pending | Self::Fetched)
    }

    /// Returns true if this is an outcome awaiting `Processed`
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::RejectedByLanguage | Self::FetchFailed
        )
    }

    /// Checks whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: AddressState) -> bool {
        use AddressState::*;

        matches!(
            (self, next),
            (Unseen, Pending)
                | (Pending, Fetched)
                | (Pending, FetchFailed)
                | (Fetched, Accepted)
                | (Fetched, RejectedByLanguage)
                | (Accepted, Processed)
                | (RejectedByLanguage, Processed)
                | (FetchFailed, Processed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Accepted => "accepted",
            Self::RejectedByLanguage => "rejected_by_language",
            Self::FetchFailed => "fetch_failed",
            Self::Processed => "processed",
        }
    }
}

impl fmt::Display for AddressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AddressState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Unseen.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Fetched));
        assert!(Fetched.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(Processed));
    }

    #[test]
    fn test_rejection_and_failure_paths() {
        assert!(Fetched.can_transition_to(RejectedByLanguage));
        assert!(RejectedByLanguage.can_transition_to(Processed));
        assert!(Pending.can_transition_to(FetchFailed));
        assert!(FetchFailed.can_transition_to(Processed));
    }

    #[test]
    fn test_processed_never_returns_to_pending() {
        assert!(!Processed.can_transition_to(Pending));
        assert!(!Processed.can_transition_to(Fetched));
        assert!(Processed.is_terminal());
    }

    #[test]
    fn test_skipping_steps_is_illegal() {
        assert!(!Unseen.can_transition_to(Fetched));
        assert!(!Pending.can_transition_to(Accepted));
        assert!(!Fetched.can_transition_to(Processed));
    }

    #[test]
    fn test_classification() {
        assert!(Pending.is_active());
        assert!(!Accepted.is_active());
        assert!(FetchFailed.is_outcome());
        assert!(!Processed.is_outcome());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", RejectedByLanguage), "rejected_by_language");
        assert_eq!(format!("{}", Processed), "processed");
    }
}
