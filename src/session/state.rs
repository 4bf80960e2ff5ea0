//! Session state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing started yet
    #[default]
    Idle,
    /// Stream lookup and playhead restore in flight
    Resolving,
    /// Stream loaded on the surface, no time progress yet
    Ready,
    Playing,
    Paused,
    /// Looking up the next/previous item
    Navigating,
    /// Finished normally (end of content, stop, or no adjacent item)
    Ended,
    /// Stream could not be resolved
    Failed,
}

impl SessionState {
    /// Whether the machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Idle, Resolving) => true,
            (Resolving, Ready) => true,
            // Track or content change restarts resolution
            (Resolving | Ready | Playing | Paused, Resolving) => true,
            (Ready, Playing) => true,
            (Playing, Paused) | (Paused, Playing) => true,
            (Ready | Playing | Paused, Navigating) => true,
            (Navigating, Resolving) | (Navigating, Ended) => true,
            // Explicit stop
            (Resolving | Ready | Playing | Paused, Ended) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Ended and Failed are final
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ended | SessionState::Failed)
    }

    /// Surface has a stream loaded
    pub fn has_stream(self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Playing | SessionState::Paused
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Resolving => write!(f, "Resolving..."),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Playing => write!(f, "▶ Playing"),
            SessionState::Paused => write!(f, "⏸ Paused"),
            SessionState::Navigating => write!(f, "Navigating..."),
            SessionState::Ended => write!(f, "⏹ Ended"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        let path = [Idle, Resolving, Ready, Playing, Paused, Playing, Navigating, Resolving];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{:?} -> {:?} should be allowed",
                pair[0],
                pair[1]
            );
        }
        assert!(Navigating.can_transition_to(Ended));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Idle.can_transition_to(Playing));
        assert!(!Resolving.can_transition_to(Playing));
        assert!(!Ended.can_transition_to(Resolving));
        assert!(!Failed.can_transition_to(Resolving));
        assert!(!Idle.can_transition_to(Navigating));
        assert!(!Ready.can_transition_to(Paused));
    }

    #[test]
    fn test_any_live_state_can_fail() {
        for state in [Idle, Resolving, Ready, Playing, Paused, Navigating] {
            assert!(state.can_transition_to(Failed));
        }
        assert!(!Ended.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }
}
