/// Analysis job state definitions
///
/// A job moves `pending -> processing -> {completed, failed}`. The two
/// terminal states never transition further.
use std::fmt;

/// Represents the current state of an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Job row exists, background work has not reported yet
    Pending,

    /// Background task is fetching data
    Processing,

    /// All steps finished and results are final
    Completed,

    /// A step failed; `error_message` explains why
    Failed,
}

impl JobStatus {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Checks whether `self -> next` is a legal transition
    ///
    /// Terminal states accept nothing. `processing` may not fall back to
    /// `pending`. Re-reporting the same non-terminal state is allowed so
    /// progress can advance within `processing`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            Self::Completed | Self::Failed => false,
            Self::Pending => true,
            Self::Processing => next != Self::Pending,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Processing,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for next in JobStatus::all_states() {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_forward_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));

        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_db_string_roundtrip() {
        for state in JobStatus::all_states() {
            let s = state.to_db_string();
            assert_eq!(JobStatus::from_db_string(s), Some(state));
        }
        assert_eq!(JobStatus::from_db_string("queued"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(JobStatus::Processing.to_string(), "processing");
    }
}
