//! Lifecycle states of the bridge

use serde::Serialize;
use std::fmt;

/// Bridge lifecycle state.
///
/// ```text
/// Stopped ──activate──→ Starting ──connected──→ Running
///    ↑                     │                       │
///    └──── startup failed ─┘        stop / done / fatal
///    │                                             ↓
///    └──────────────── teardown ─────────────── Stopping
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BridgeState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl BridgeState {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: BridgeState) -> bool {
        use BridgeState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Stopping)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Stopping, Stopped)
        )
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != BridgeState::Stopped
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use BridgeState::*;
        assert!(Stopped.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Running));
        assert!(Running.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
    }

    #[test]
    fn test_startup_failure_goes_straight_to_stopped() {
        assert!(BridgeState::Starting.can_transition_to(BridgeState::Stopped));
    }

    #[test]
    fn test_illegal_transitions() {
        use BridgeState::*;
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Running.can_transition_to(Stopped));
        assert!(!Stopping.can_transition_to(Running));
        assert!(!Running.can_transition_to(Starting));
    }

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(BridgeState::default(), BridgeState::Stopped);
        assert!(!BridgeState::Stopped.is_active());
        assert!(BridgeState::Stopping.is_active());
    }
}
