//! Run-state notification
//!
//! Other subsystems (status LEDs, UI indicators) learn that the decoder started
//! or stopped producing audio through a listener injected when the audio task
//! is built. Notifications are edge-triggered.

/// Hook invoked on every run-state edge
///
/// Runs on the decode thread: must return quickly, must not block and must
/// not issue commands through the audio client.
pub trait RunStateListener: Send {
    /// `true` when audio started, `false` when it stopped
    fn run_state_changed(&self, running: bool);
}

impl<F> RunStateListener for F
where
    F: Fn(bool) + Send,
{
    fn run_state_changed(&self, running: bool) {
        self(running);
    }
}

/// Listener that ignores every edge
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl RunStateListener for NoopListener {
    fn run_state_changed(&self, _running: bool) {}
}

/// Edge detector over the decoder's run-state
pub struct RunStateTracker {
    running: bool,
    listener: Box<dyn RunStateListener>,
}

impl RunStateTracker {
    /// Start in the idle state
    pub fn new(listener: Box<dyn RunStateListener>) -> Self {
        Self {
            running: false,
            listener,
        }
    }

    /// Last observed state
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record the current state, notifying on a change
    ///
    /// Returns the edge that fired, if any.
    pub fn observe(&mut self, running: bool) -> Option<bool> {
        if running == self.running {
            return None;
        }
        self.running = running;
        self.listener.run_state_changed(running);
        Some(running)
    }
}

impl Default for RunStateTracker {
    fn default() -> Self {
        Self::new(Box::new(NoopListener))
    }
}

impl std::fmt::Debug for RunStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStateTracker")
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}
