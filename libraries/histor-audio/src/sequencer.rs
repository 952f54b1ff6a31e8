//! Station-change sequencing
//!
//! Switching network stations cannot happen instantly: the decoder has to
//! unwind the previous stream first. A short local beep bridges the gap.
//!
//! ```text
//! Idle ──change-station──▶ BeepArmed ──beep ended──▶ Switching ──connect issued──▶ Idle
//!                            ▲    │
//!                            └────┘ change-station (target overwritten)
//! ```

use histor_core::Volume;

/// Station to connect to once the beep finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationTarget {
    /// Stream URL
    pub url: String,
    /// Volume to restore before connecting
    pub volume: Volume,
    /// Sequence number of the change-station request, echoed by the deferred reply
    pub seq: u32,
}

/// Sequencer state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SequencerState {
    /// No station change in progress
    #[default]
    Idle,
    /// Beep playing, waiting for it to end
    BeepArmed(StationTarget),
    /// Beep ended, connect in progress
    Switching(StationTarget),
}

/// Beep-then-switch state machine, owned by the control loop
#[derive(Debug, Default)]
pub struct StationSequencer {
    state: SequencerState,
}

impl StationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Whether a station switch is waiting on the beep
    pub fn is_armed(&self) -> bool {
        matches!(self.state, SequencerState::BeepArmed(_))
    }

    /// Record a new target, last write wins
    ///
    /// Returns the target that was superseded, if any.
    pub fn arm(&mut self, target: StationTarget) -> Option<StationTarget> {
        match std::mem::replace(&mut self.state, SequencerState::BeepArmed(target)) {
            SequencerState::Idle => None,
            SequencerState::BeepArmed(previous) | SequencerState::Switching(previous) => {
                Some(previous)
            }
        }
    }

    /// Beep has ended: move to `Switching` and hand out the target
    ///
    /// Returns `None` when nothing is armed.
    pub fn begin_switch(&mut self) -> Option<StationTarget> {
        match &self.state {
            SequencerState::BeepArmed(target) => {
                let target = target.clone();
                self.state = SequencerState::Switching(target.clone());
                Some(target)
            }
            _ => None,
        }
    }

    /// Connect issued, back to `Idle`
    pub fn finish(&mut self) {
        if matches!(self.state, SequencerState::Switching(_)) {
            self.state = SequencerState::Idle;
        }
    }
}
