//! Core type definitions for fokus

use std::fmt;

use serde::Serialize;

use crate::url::Host;

// =============================================================================
// Decision
// =============================================================================

/// Outcome of evaluating the policy against a host at an instant.
///
/// Derived on every evaluation; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// No blocking applies
    Allowed,
    /// Blocking is enabled and a pattern matches the host
    Blocked,
    /// The global exemption window is open
    Exempt,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
            Self::Exempt => "exempt",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Overlay State
// =============================================================================

/// What the overlay layer is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayState {
    #[default]
    NoOverlay,
    ShowingOverlay,
    ShowingCountdown,
}

impl From<Decision> for OverlayState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allowed => Self::NoOverlay,
            Decision::Blocked => Self::ShowingOverlay,
            Decision::Exempt => Self::ShowingCountdown,
        }
    }
}

// =============================================================================
// Action Outcomes
// =============================================================================

/// Result of adding or removing a block-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HostOutcome {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
    /// The host was empty; nothing was stored.
    Invalid,
}

impl HostOutcome {
    /// Whether the block list was modified.
    pub fn changed(self) -> bool {
        matches!(self, Self::Added | Self::Removed)
    }

    /// User-facing notification text.
    pub fn message(self, host: &Host) -> String {
        match self {
            Self::Added => format!("{host} added to blocked hosts."),
            Self::AlreadyPresent => format!("{host} is already in the blocked hosts list."),
            Self::Removed => format!("{host} removed from blocked hosts."),
            Self::NotPresent => format!("{host} is not in the blocked hosts list."),
            Self::Invalid => "This page has no host to block.".to_string(),
        }
    }
}

/// Notification text after the enable flag changed.
pub fn toggle_message(enabled: bool) -> String {
    format!("Blocking is now {}.", if enabled { "enabled" } else { "disabled" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_state_from_decision() {
        assert_eq!(OverlayState::from(Decision::Allowed), OverlayState::NoOverlay);
        assert_eq!(OverlayState::from(Decision::Blocked), OverlayState::ShowingOverlay);
        assert_eq!(OverlayState::from(Decision::Exempt), OverlayState::ShowingCountdown);
    }

    #[test]
    fn test_outcome_messages() {
        let host = Host::parse("example.com");
        assert_eq!(HostOutcome::Added.message(&host), "example.com added to blocked hosts.");
        assert_eq!(
            HostOutcome::NotPresent.message(&host),
            "example.com is not in the blocked hosts list."
        );
        assert!(HostOutcome::Removed.changed());
        assert!(!HostOutcome::AlreadyPresent.changed());
        assert_eq!(toggle_message(true), "Blocking is now enabled.");
    }
}
