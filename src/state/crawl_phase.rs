//! Lifecycle phases of a crawl run
//!
//! A run stays in `Running` while batch cycles execute, moves to
//! `Terminating` once the frontier is exhausted and ends in `Finished` after
//! the terminal checkpoint has been written.

use std::fmt;

/// Represents the current phase of the batch scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Batch cycles are being dispatched
    Running,

    /// The frontier is exhausted; the terminal checkpoint is pending
    Terminating,

    /// The terminal checkpoint has been written
    Finished,
}

impl CrawlPhase {
    /// Returns true if no further work happens in this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true if the scheduler may start another cycle
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if moving from this phase to `next` is allowed
    ///
    /// `Running -> Running` is the per-cycle self loop.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Running)
                | (Self::Running, Self::Terminating)
                | (Self::Terminating, Self::Finished)
        )
    }

    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Terminating => "terminating",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!CrawlPhase::Running.is_terminal());
        assert!(!CrawlPhase::Terminating.is_terminal());
        assert!(CrawlPhase::Finished.is_terminal());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Running));
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Terminating));
        assert!(CrawlPhase::Terminating.can_transition_to(CrawlPhase::Finished));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Finished));
        assert!(!CrawlPhase::Terminating.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Finished.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Finished.can_transition_to(CrawlPhase::Terminating));
        assert!(!CrawlPhase::Finished.can_transition_to(CrawlPhase::Finished));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlPhase::Running), "running");
        assert_eq!(format!("{}", CrawlPhase::Terminating), "terminating");
        assert_eq!(CrawlPhase::Finished.to_string(), "finished");
    }
}
