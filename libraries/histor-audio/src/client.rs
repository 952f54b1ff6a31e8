//! Controller-side client
//!
//! One method per command. Every call is a blocking round trip: build a fresh
//! envelope, queue it, wait for the reply. Only one round trip is ever in
//! flight; concurrent callers wait their turn on an internal lock, so replies
//! always pair up with the request that caused them.

use crate::channel::{EnvelopeReceiver, EnvelopeSender};
use crate::config::ClientConfig;
use crate::error::{AudioTaskError, Result};
use crate::protocol::{CommandKind, Envelope, ReplyKind};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use histor_core::Volume;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Cancels round trips that are waiting on the decode thread
///
/// Cloneable; cancelling any clone cancels them all. Once cancelled, the
/// client refuses every further call with [`AudioTaskError::Cancelled`].
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    cancelled: AtomicBool,
    // Never sends: dropping it disconnects `signal`, which wakes every waiter
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Cancel the round trip in progress and every later one
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Tracks the deferred completion of the latest change-station request
#[derive(Debug, Default)]
struct StationWatch {
    awaiting: Option<u32>,
    outcome: Option<Envelope>,
}

impl StationWatch {
    fn arm(&mut self, seq: u32) {
        self.awaiting = Some(seq);
        self.outcome = None;
    }

    /// Keep a completion that arrived while another round trip was waiting
    fn stash(&mut self, reply: Envelope) {
        if self.awaiting == Some(reply.seq) {
            self.outcome = Some(reply);
        } else {
            debug!("Dropping completion for superseded station change #{}", reply.seq);
        }
    }
}

struct ReplyState {
    responses: EnvelopeReceiver,
    station: StationWatch,
}

/// Handle the controller uses to drive the decode thread
pub struct AudioClient {
    commands: EnvelopeSender,
    replies: Mutex<ReplyState>,
    next_seq: AtomicU32,
    response_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl AudioClient {
    /// Wrap the controller-side queue ends
    pub fn new(commands: EnvelopeSender, responses: EnvelopeReceiver, config: &ClientConfig) -> Self {
        Self {
            commands,
            replies: Mutex::new(ReplyState {
                responses,
                station: StationWatch::default(),
            }),
            next_seq: AtomicU32::new(1),
            response_timeout: config.response_timeout(),
            cancel: CancelToken::new(),
        }
    }

    /// Token that cancels this client's round trips
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the decoder is producing audio
    pub fn is_running(&self) -> Result<bool> {
        self.call_flag(self.request(CommandKind::IsRunning))
    }

    /// Toggle pause
    pub fn pause_resume(&self) -> Result<bool> {
        self.call_flag(self.request(CommandKind::PauseResume))
    }

    /// Seek to a byte offset in the current clip
    pub fn set_file_pos(&self, offset: u32) -> Result<bool> {
        self.call_flag(self.request(CommandKind::SetFilePos).with_value(offset))
    }

    /// Elapsed seconds of the current clip
    pub fn elapsed_time(&self) -> Result<u32> {
        Ok(self.round_trip(self.request(CommandKind::ElapsedTime))?.ret)
    }

    /// Set volume (0..=21); returns the level applied
    pub fn set_volume(&self, level: u8) -> Result<u8> {
        let reply = self.round_trip(self.request(CommandKind::SetVolume).with_value(u32::from(level)))?;
        Ok(Volume::clamped(reply.ret).get())
    }

    pub fn volume(&self) -> Result<u8> {
        let reply = self.round_trip(self.request(CommandKind::GetVolume))?;
        Ok(Volume::clamped(reply.ret).get())
    }

    /// Connect to a network stream
    pub fn connect_to_host(&self, url: &str) -> Result<bool> {
        self.call_flag(self.request(CommandKind::ConnectToHost).with_text(url))
    }

    /// Play a clip from the SD card
    pub fn connect_to_sd(&self, path: &str) -> Result<bool> {
        self.call_flag(self.request(CommandKind::ConnectToSd).with_text(path))
    }

    /// Play a clip from internal flash
    pub fn connect_to_flash(&self, path: &str) -> Result<bool> {
        self.call_flag(self.request(CommandKind::ConnectToFlash).with_text(path))
    }

    /// Stop playback; returns the position it stopped at
    pub fn stop_song(&self) -> Result<u32> {
        Ok(self.round_trip(self.request(CommandKind::StopSong))?.ret)
    }

    /// Stop the station and load the beep clip from internal flash
    ///
    /// The beep is held at its start until [`change_station`](Self::change_station).
    pub fn stop_station_prepare_beep(&self, beep_path: &str) -> Result<bool> {
        self.call_flag(self.request(CommandKind::PrepareBeep).with_text(beep_path))
    }

    /// Play the beep, then switch to `url` at `volume` once it ends
    ///
    /// Returns as soon as the beep has started. The outcome of the switch
    /// itself comes from [`wait_station_switch`](Self::wait_station_switch).
    pub fn change_station(&self, url: &str, volume: u8) -> Result<bool> {
        self.call_flag(
            self.request(CommandKind::ChangeStation)
                .with_text(url)
                .with_value(u32::from(volume)),
        )
    }

    /// Wait for the latest station change to connect
    ///
    /// Returns whether the new station connected.
    pub fn wait_station_switch(&self, timeout: Duration) -> Result<bool> {
        let mut state = self.lock_replies();
        let Some(seq) = state.station.awaiting else {
            return Err(AudioTaskError::NoStationChange);
        };

        if let Some(done) = state.station.outcome.take() {
            state.station.awaiting = None;
            return Ok(done.ret_flag());
        }

        let deadline = Instant::now() + timeout;
        loop {
            let reply = self.await_reply(&state.responses, Some(deadline))?;
            if reply.reply == ReplyKind::Deferred && reply.seq == seq {
                state.station.awaiting = None;
                return Ok(reply.ret_flag());
            }
            debug!("Discarding reply #{} while waiting for station switch", reply.seq);
        }
    }

    /// Send `request` and wait for its reply
    ///
    /// Replies to earlier abandoned requests are discarded. A reply with the
    /// right sequence number but a different command is logged and returned.
    pub fn round_trip(&self, request: Envelope) -> Result<Envelope> {
        let mut state = self.lock_replies();
        if self.cancel.is_cancelled() {
            return Err(AudioTaskError::Cancelled);
        }

        let deadline = self.response_timeout.map(|timeout| Instant::now() + timeout);
        let (cmd, seq) = (request.cmd, request.seq);
        let changes_station = request.kind().ok() == Some(CommandKind::ChangeStation);

        match deadline {
            Some(deadline) => self
                .commands
                .send_timeout(request, deadline.saturating_duration_since(Instant::now()))?,
            None => self.commands.send(request)?,
        }

        // Only a request that actually went out has a completion to wait for
        if changes_station {
            state.station.arm(seq);
        }

        loop {
            let reply = self.await_reply(&state.responses, deadline)?;

            if reply.reply == ReplyKind::Deferred {
                state.station.stash(reply);
                continue;
            }

            if reply.seq != seq {
                debug!("Discarding stale reply #{} (waiting for #{})", reply.seq, seq);
                continue;
            }

            if reply.cmd != cmd {
                let mismatch = AudioTaskError::ProtocolMismatch {
                    expected: cmd,
                    actual: reply.cmd,
                };
                error!("{}", mismatch);
            }

            return Ok(reply);
        }
    }

    fn await_reply(&self, responses: &EnvelopeReceiver, deadline: Option<Instant>) -> Result<Envelope> {
        let timeout = match deadline {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => never(),
        };

        select! {
            recv(responses.inner()) -> reply => reply.map_err(|_| AudioTaskError::Disconnected),
            recv(self.cancel.signal()) -> _ => {
                warn!("Round trip cancelled");
                Err(AudioTaskError::Cancelled)
            }
            recv(timeout) -> _ => Err(AudioTaskError::Timeout),
        }
    }

    fn call_flag(&self, request: Envelope) -> Result<bool> {
        Ok(self.round_trip(request)?.ret_flag())
    }

    fn request(&self, kind: CommandKind) -> Envelope {
        Envelope::request(kind, self.next_seq.fetch_add(1, Ordering::Relaxed))
    }

    fn lock_replies(&self) -> MutexGuard<'_, ReplyState> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AudioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClient")
            .field("next_seq", &self.next_seq.load(Ordering::Relaxed))
            .field("response_timeout", &self.response_timeout)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::envelope_channel;
    use std::thread;

    /// Client wired to bare queue ends, with the decode side driven by hand
    fn detached_client(config: ClientConfig) -> (AudioClient, EnvelopeReceiver, EnvelopeSender) {
        let (command_tx, command_rx) = envelope_channel(10).unwrap();
        let (response_tx, response_rx) = envelope_channel(10).unwrap();
        (AudioClient::new(command_tx, response_rx, &config), command_rx, response_tx)
    }

    #[test]
    fn times_out_when_decode_thread_is_silent() {
        let (client, _commands, _responses) = detached_client(ClientConfig {
            response_timeout_ms: Some(20),
        });
        assert!(matches!(client.is_running(), Err(AudioTaskError::Timeout)));
    }

    #[test]
    fn cancel_unblocks_waiting_caller() {
        let (client, _commands, _responses) = detached_client(ClientConfig::default());
        let token = client.cancel_token();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        assert!(matches!(client.volume(), Err(AudioTaskError::Cancelled)));
        canceller.join().unwrap();

        // Cancelled for good
        assert!(matches!(client.volume(), Err(AudioTaskError::Cancelled)));
    }

    #[test]
    fn stale_reply_after_timeout_is_discarded() {
        let (client, commands, responses) = detached_client(ClientConfig {
            response_timeout_ms: Some(50),
        });

        // First request gets no answer in time
        assert!(matches!(client.volume(), Err(AudioTaskError::Timeout)));
        let abandoned = commands.try_recv().unwrap().unwrap();

        let decode_side = thread::spawn(move || {
            let request = commands.recv().unwrap();
            // Late reply to the abandoned request arrives first
            responses.send(abandoned.respond(3)).unwrap();
            responses.send(request.respond(17)).unwrap();
        });

        assert_eq!(client.volume().unwrap(), 17);
        decode_side.join().unwrap();
    }

    #[test]
    fn mismatched_reply_is_returned_anyway() {
        let (client, commands, responses) = detached_client(ClientConfig::default());

        let decode_side = thread::spawn(move || {
            let request = commands.recv().unwrap();
            let mut reply = request.respond(1);
            reply.cmd = CommandKind::GetVolume.tag();
            responses.send(reply).unwrap();
        });

        assert!(client.pause_resume().unwrap());
        decode_side.join().unwrap();
    }

    #[test]
    fn completion_arriving_mid_round_trip_is_kept() {
        let (client, commands, responses) = detached_client(ClientConfig::default());

        let decode_side = thread::spawn(move || {
            let change = commands.recv().unwrap();
            responses.send(change.respond(1)).unwrap();

            let query = commands.recv().unwrap();
            responses.send(Envelope::station_switched(change.seq, 1)).unwrap();
            responses.send(query.respond(0)).unwrap();
        });

        assert!(client.change_station("http://station", 12).unwrap());
        assert!(!client.is_running().unwrap());
        decode_side.join().unwrap();

        assert!(client.wait_station_switch(Duration::from_millis(10)).unwrap());
        assert!(matches!(
            client.wait_station_switch(Duration::from_millis(10)),
            Err(AudioTaskError::NoStationChange)
        ));
    }

    #[test]
    fn unsent_change_station_leaves_nothing_to_wait_for() {
        let (client, commands, _responses) = detached_client(ClientConfig::default());
        drop(commands);

        assert!(matches!(
            client.change_station("http://station", 10),
            Err(AudioTaskError::Disconnected)
        ));
        assert!(matches!(
            client.wait_station_switch(Duration::from_millis(10)),
            Err(AudioTaskError::NoStationChange)
        ));
    }

    #[test]
    fn full_command_queue_times_out_with_deadline() {
        let (client, _commands, _responses) = detached_client(ClientConfig {
            response_timeout_ms: Some(10),
        });
        // Requests pile up unanswered until the queue is full
        for _ in 0..10 {
            assert!(matches!(client.is_running(), Err(AudioTaskError::Timeout)));
        }
        assert!(matches!(
            client.is_running(),
            Err(AudioTaskError::ChannelFull(_))
        ));
    }
}
