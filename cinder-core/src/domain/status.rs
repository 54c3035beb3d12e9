//! Project status state machine

use serde::{Deserialize, Serialize};

/// Current status of a project
///
/// A single current-value field, not a log. Legal transitions:
/// `Pending -> Running`, `Running -> {Success, Failed}`, and either
/// terminal state back to `Running` when a new run starts. Everything
/// else is rejected with [`InvalidTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl ProjectStatus {
    /// Returns true when `next` is a legal transition from `self`
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Success)
                | (Running, Failed)
                | (Success, Running)
                | (Failed, Running)
        )
    }

    /// Performs a checked transition to `next`
    pub fn transition_to(self, next: ProjectStatus) -> Result<ProjectStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }

    /// Returns true for the terminal run outcomes
    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Success | ProjectStatus::Failed)
    }
}

/// Rejected status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ProjectStatus,
    pub to: ProjectStatus,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid status transition: {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

#[cfg(test)]
mod tests {
    use super::*;
    use ProjectStatus::*;

    #[test]
    fn test_legal_transitions() {
        assert_eq!(Pending.transition_to(Running), Ok(Running));
        assert_eq!(Running.transition_to(Success), Ok(Success));
        assert_eq!(Running.transition_to(Failed), Ok(Failed));
        assert_eq!(Success.transition_to(Running), Ok(Running));
        assert_eq!(Failed.transition_to(Running), Ok(Running));
    }

    #[test]
    fn test_illegal_transitions() {
        let all = [Pending, Running, Success, Failed];
        for from in all {
            for to in all {
                if from.can_transition_to(to) {
                    continue;
                }
                let err = from.transition_to(to).unwrap_err();
                assert_eq!(err, InvalidTransition { from, to });
            }
        }

        // Spot checks on the pairs a sloppy rewrite is most likely to allow
        assert!(Pending.transition_to(Success).is_err());
        assert!(Pending.transition_to(Failed).is_err());
        assert!(Success.transition_to(Failed).is_err());
        assert!(Running.transition_to(Running).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(Success.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Running.is_terminal());
    }
}
