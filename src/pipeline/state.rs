//! The forward-only state machine of one invocation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one pipeline invocation.
///
/// States only move forward. A fatal error jumps straight to
/// [`CleanedUp`](PipelineState::CleanedUp) without passing through the
/// states in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// A request was parsed from the trigger event.
    Received,
    /// A signature refresh was attempted (whatever its outcome).
    DefinitionsRefreshed,
    /// The object is on local disk.
    Downloaded,
    /// The scanner produced a verdict.
    Classified,
    /// The original object carries the verdict tag.
    Tagged,
    /// The object was moved or deliberately left in place.
    Routed,
    /// The notification step ran.
    Notified,
    /// The local artifact is gone. Terminal.
    CleanedUp,
}

impl PipelineState {
    const ORDER: [PipelineState; 8] = [
        Self::Received,
        Self::DefinitionsRefreshed,
        Self::Downloaded,
        Self::Classified,
        Self::Tagged,
        Self::Routed,
        Self::Notified,
        Self::CleanedUp,
    ];

    /// Returns the state that follows this one, or `None` when terminal.
    pub fn next(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    /// Returns the name of the stage whose success leads into this state.
    pub fn stage_name(self) -> &'static str {
        match self {
            Self::Received => "parse",
            Self::DefinitionsRefreshed => "refresh",
            Self::Downloaded => "download",
            Self::Classified => "classify",
            Self::Tagged => "tag",
            Self::Routed => "route",
            Self::Notified => "notify",
            Self::CleanedUp => "cleanup",
        }
    }

    /// Returns `true` for the terminal state.
    pub fn is_terminal(self) -> bool {
        self == Self::CleanedUp
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::DefinitionsRefreshed => "definitions_refreshed",
            Self::Downloaded => "downloaded",
            Self::Classified => "classified",
            Self::Tagged => "tagged",
            Self::Routed => "routed",
            Self::Notified => "notified",
            Self::CleanedUp => "cleaned_up",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current state of an invocation and logs each transition.
#[derive(Debug)]
pub(crate) struct StateTracker {
    current: PipelineState,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: PipelineState::Received,
        }
    }

    pub(crate) fn current(&self) -> PipelineState {
        self.current
    }

    /// Moves to the next state in order.
    pub(crate) fn advance(&mut self) -> PipelineState {
        if let Some(next) = self.current.next() {
            tracing::debug!(from = %self.current, to = %next, "Pipeline state transition");
            self.current = next;
        }
        self.current
    }

    /// Jumps to the terminal state.
    pub(crate) fn finish(&mut self) {
        if !self.current.is_terminal() {
            tracing::debug!(
                from = %self.current,
                to = %PipelineState::CleanedUp,
                "Pipeline state transition"
            );
            self.current = PipelineState::CleanedUp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_linear() {
        let mut state = PipelineState::Received;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            assert!(next > state);
            visited.push(next);
            state = next;
        }
        assert_eq!(visited.len(), 8);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineState::Tagged.stage_name(), "tag");
        assert_eq!(PipelineState::Routed.next().map(PipelineState::stage_name), Some("notify"));
        assert_eq!(PipelineState::DefinitionsRefreshed.to_string(), "definitions_refreshed");
    }

    #[test]
    fn test_tracker_jumps_to_terminal() {
        let mut tracker = StateTracker::new();
        assert_eq!(tracker.advance(), PipelineState::DefinitionsRefreshed);
        assert_eq!(tracker.advance(), PipelineState::Downloaded);
        tracker.finish();
        assert_eq!(tracker.current(), PipelineState::CleanedUp);
        assert_eq!(tracker.advance(), PipelineState::CleanedUp);
    }
}
