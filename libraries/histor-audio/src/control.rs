//! Decode-thread control loop
//!
//! The loop owns the decoder outright. Each iteration it:
//! 1. waits briefly for one command and executes it, replying on the response queue
//! 2. pumps the decoder one step
//! 3. checks the run-state: completes a pending station switch once the beep has
//!    ended, idles when there is nothing to play, and notifies run-state edges
//!
//! The command wait is bounded so decoding keeps progressing with no
//! controller activity.

use crate::channel::{EnvelopeReceiver, EnvelopeSender};
use crate::config::AudioTaskConfig;
use crate::notifier::{RunStateListener, RunStateTracker};
use crate::protocol::{CommandKind, Envelope};
use crate::sequencer::{SequencerState, StationSequencer, StationTarget};
use histor_core::{FileStore, StreamDecoder, Volume};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep going
    Continue,
    /// Controller is gone, the loop should exit
    Shutdown,
}

/// Control loop running on the decode thread
pub struct ControlLoop<D: StreamDecoder> {
    decoder: D,
    commands: EnvelopeReceiver,
    responses: EnvelopeSender,
    sequencer: StationSequencer,
    run_state: RunStateTracker,
    command_poll: Duration,
    idle_delay: Duration,
    beep_volume: u8,
}

impl<D: StreamDecoder> ControlLoop<D> {
    /// Take ownership of the decoder and the decode-side queue ends
    pub fn new(
        mut decoder: D,
        commands: EnvelopeReceiver,
        responses: EnvelopeSender,
        listener: Box<dyn RunStateListener>,
        config: &AudioTaskConfig,
    ) -> Self {
        decoder.set_connection_timeout(config.connect_timeout(), config.connect_timeout_tls());

        Self {
            decoder,
            commands,
            responses,
            sequencer: StationSequencer::new(),
            run_state: RunStateTracker::new(listener),
            command_poll: config.command_poll(),
            idle_delay: config.idle_delay(),
            beep_volume: config.beep_volume.min(Volume::MAX),
        }
    }

    /// Run until the controller drops its end of the command queue
    pub fn run(mut self) {
        info!(
            "Audio control loop running on thread {:?}",
            thread::current().name()
        );

        while self.step() == StepOutcome::Continue {}

        if let SequencerState::BeepArmed(target) | SequencerState::Switching(target) =
            self.sequencer.state()
        {
            warn!(
                "Shutting down with station change to {} still pending",
                target.url
            );
        }
        self.decoder.stop();
        info!("Audio control loop stopped");
    }

    /// One iteration: service at most one command, pump, evaluate run-state
    pub fn step(&mut self) -> StepOutcome {
        match self.commands.recv_timeout(self.command_poll) {
            Ok(Some(request)) => self.handle(&request),
            Ok(None) => {}
            Err(_) => return StepOutcome::Shutdown,
        }

        self.decoder.pump();
        self.evaluate_run_state();

        StepOutcome::Continue
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn sequencer(&self) -> &StationSequencer {
        &self.sequencer
    }

    /// Run-state as of the last iteration
    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    fn handle(&mut self, request: &Envelope) {
        let kind = match request.kind() {
            Ok(kind) => kind,
            Err(err) => {
                // Version mismatch between controller and decode thread
                warn!("Ignoring request #{}: {}", request.seq, err);
                return;
            }
        };

        debug!(
            "Command {} (#{}) value={} text={:?}",
            kind, request.seq, request.value, request.text
        );

        let ret = self.execute(kind, request);
        self.reply(request.respond(ret));
    }

    fn execute(&mut self, kind: CommandKind, request: &Envelope) -> u32 {
        match kind {
            CommandKind::IsRunning => u32::from(self.decoder.is_running()),
            CommandKind::PauseResume => u32::from(self.decoder.pause_resume()),
            CommandKind::SetFilePos => u32::from(self.decoder.set_file_pos(request.value)),
            CommandKind::ElapsedTime => self.decoder.elapsed_time(),
            CommandKind::SetVolume => {
                let level = Volume::clamped(request.value).get();
                self.decoder.set_volume(level);
                u32::from(level)
            }
            CommandKind::GetVolume => u32::from(self.decoder.volume()),
            CommandKind::ConnectToHost => match text_of(kind, request) {
                Some(url) => u32::from(self.decoder.connect_to_host(url)),
                None => 0,
            },
            CommandKind::ConnectToSd => match text_of(kind, request) {
                Some(path) => u32::from(self.decoder.connect_to_file(FileStore::Sd, path)),
                None => 0,
            },
            CommandKind::ConnectToFlash => match text_of(kind, request) {
                Some(path) => u32::from(self.decoder.connect_to_file(FileStore::Internal, path)),
                None => 0,
            },
            CommandKind::StopSong => self.decoder.stop(),
            CommandKind::PrepareBeep => self.prepare_beep(kind, request),
            CommandKind::ChangeStation => self.arm_station_change(kind, request),
        }
    }

    /// Stop the station and load the beep, parked at its first byte
    fn prepare_beep(&mut self, kind: CommandKind, request: &Envelope) -> u32 {
        let Some(path) = text_of(kind, request) else {
            return 0;
        };

        self.decoder.stop();
        let loaded = self.decoder.connect_to_file(FileStore::Internal, path);
        if loaded {
            // Hold the clip until change-station starts it
            self.decoder.pause_resume();
            self.decoder.set_file_pos(0);
        } else {
            warn!("Beep clip {} could not be loaded", path);
        }
        u32::from(loaded)
    }

    /// Record the new target and start the beep; the switch happens once it ends
    fn arm_station_change(&mut self, kind: CommandKind, request: &Envelope) -> u32 {
        let Some(url) = text_of(kind, request) else {
            return 0;
        };

        let target = StationTarget {
            url: url.to_string(),
            volume: Volume::clamped(request.value),
            seq: request.seq,
        };
        let superseded = self.sequencer.arm(target);
        if let Some(previous) = &superseded {
            info!(
                "Station change to {} superseded by {}",
                previous.url, url
            );
        }

        self.decoder.set_volume(self.beep_volume);
        if superseded.is_some() && self.decoder.is_running() {
            // Re-arm while the beep is audible; toggling now would pause it
            1
        } else {
            // Starts a parked beep, or pauses a live station so the switch runs
            u32::from(self.decoder.pause_resume())
        }
    }

    fn evaluate_run_state(&mut self) {
        let running = self.decoder.is_running();

        if !running {
            if let Some(target) = self.sequencer.begin_switch() {
                self.complete_station_switch(&target);
            } else if self.idle_delay.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(self.idle_delay);
            }
        }

        if let Some(edge) = self.run_state.observe(running) {
            debug!("Run-state changed: running={}", edge);
        }
    }

    /// Beep finished: connect to the pending station and send the deferred reply
    fn complete_station_switch(&mut self, target: &StationTarget) {
        self.decoder.stop();
        self.decoder.set_volume(target.volume.get());
        let connected = self.decoder.connect_to_host(&target.url);
        self.decoder.pump();
        self.sequencer.finish();

        if connected {
            info!("Switched station to {} at volume {}", target.url, target.volume);
        } else {
            warn!("Station switch to {} failed to connect", target.url);
        }

        self.reply(Envelope::station_switched(target.seq, u32::from(connected)));
    }

    fn reply(&self, response: Envelope) {
        // Controller is blocked on this reply; a lost reply is not retried
        if let Err(err) = self.responses.send(response) {
            error!("Failed to deliver response: {}", err);
        }
    }
}

fn text_of(kind: CommandKind, request: &Envelope) -> Option<&str> {
    let text = request.text.as_deref().filter(|text| !text.is_empty());
    if text.is_none() {
        warn!("{} (#{}) sent without text", kind, request.seq);
    }
    text
}
