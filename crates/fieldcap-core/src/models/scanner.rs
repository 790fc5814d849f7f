use serde::{Deserialize, Serialize};

/// Lifecycle state of a barcode scanning session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerState {
    Idle,
    PermissionPending,
    Initializing,
    Running,
    Detected,
    Error,
    Stopped,
}

impl ScannerState {
    /// Allowed lifecycle edges. `Stopped` is reachable from every state through
    /// an explicit stop; `Stopped -> Idle` begins a fresh session. `Idle` and
    /// `Error` lead straight to `Initializing` only on platforms without an
    /// explicit permission flow.
    pub fn can_transition_to(self, next: ScannerState) -> bool {
        use ScannerState::*;
        if next == Stopped {
            return true;
        }
        matches!(
            (self, next),
            (Idle, PermissionPending)
                | (Idle, Initializing)
                | (PermissionPending, Initializing)
                | (PermissionPending, Error)
                | (Initializing, Running)
                | (Initializing, Error)
                | (Running, Detected)
                | (Error, PermissionPending)
                | (Error, Initializing)
                | (Stopped, Idle)
        )
    }
}

/// Cosmetic indicator around the scan surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualStatus {
    Steady,
    Success,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_requires_initializing() {
        assert!(!ScannerState::Idle.can_transition_to(ScannerState::Running));
        assert!(!ScannerState::PermissionPending.can_transition_to(ScannerState::Running));
        assert!(ScannerState::Initializing.can_transition_to(ScannerState::Running));
    }

    #[test]
    fn test_error_exits() {
        assert!(ScannerState::Error.can_transition_to(ScannerState::PermissionPending));
        assert!(ScannerState::Error.can_transition_to(ScannerState::Stopped));
        assert!(!ScannerState::Error.can_transition_to(ScannerState::Running));
        assert!(!ScannerState::Error.can_transition_to(ScannerState::Detected));
    }

    #[test]
    fn test_stop_reachable_from_everywhere() {
        for state in [
            ScannerState::Idle,
            ScannerState::PermissionPending,
            ScannerState::Initializing,
            ScannerState::Running,
            ScannerState::Detected,
            ScannerState::Error,
            ScannerState::Stopped,
        ] {
            assert!(state.can_transition_to(ScannerState::Stopped));
        }
    }

    #[test]
    fn test_detected_only_from_running() {
        assert!(ScannerState::Running.can_transition_to(ScannerState::Detected));
        assert!(!ScannerState::Initializing.can_transition_to(ScannerState::Detected));
        assert!(!ScannerState::Detected.can_transition_to(ScannerState::Detected));
    }
}
