//! Tree health status reported by the external status endpoint.

use serde::{Deserialize, Serialize};

/// State of the shared integration branch.
///
/// `Open` and `Throttled` are both go states; anything else blocks pool
/// acquisition and submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeStatus {
    Open,
    Throttled,
    Closed,
}

impl TreeStatus {
    /// Map the raw `general_state` value from the status endpoint.
    ///
    /// Anything unrecognized is treated as closed: only an affirmative
    /// open/throttled signal allows the queue to mutate the tree.
    pub fn from_state(state: &str) -> Self {
        match state {
            "open" => TreeStatus::Open,
            "throttled" => TreeStatus::Throttled,
            _ => TreeStatus::Closed,
        }
    }

    /// Whether the queue may mutate the tree in this state.
    pub fn is_go(self) -> bool {
        matches!(self, TreeStatus::Open | TreeStatus::Throttled)
    }
}

impl std::fmt::Display for TreeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TreeStatus::Open => "open",
            TreeStatus::Throttled => "throttled",
            TreeStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_states() {
        assert_eq!(TreeStatus::from_state("open"), TreeStatus::Open);
        assert_eq!(TreeStatus::from_state("throttled"), TreeStatus::Throttled);
        assert_eq!(TreeStatus::from_state("closed"), TreeStatus::Closed);
    }

    #[test]
    fn test_unknown_states_are_closed() {
        assert_eq!(TreeStatus::from_state("maintenance"), TreeStatus::Closed);
        assert_eq!(TreeStatus::from_state(""), TreeStatus::Closed);
        assert_eq!(TreeStatus::from_state("OPEN"), TreeStatus::Closed);
    }

    #[test]
    fn test_go_states() {
        assert!(TreeStatus::Open.is_go());
        assert!(TreeStatus::Throttled.is_go());
        assert!(!TreeStatus::Closed.is_go());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&TreeStatus::Throttled).unwrap();
        assert_eq!(json, "\"throttled\"");
        let back: TreeStatus = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(back, TreeStatus::Open);
    }
}
