//! Histor Radio - Audio Task
//!
//! Drives a streaming decoder that lives on its own thread.
//!
//! This crate provides:
//! - A bounded command/response queue pair (10 envelopes each by default)
//! - The decode-thread control loop that executes commands and pumps the decoder
//! - Beep-then-switch station changes
//! - Edge-triggered run-state notification
//! - A blocking controller client with optional timeout and cancellation
//!
//! # Architecture
//!
//! ```text
//! AudioClient ──command queue──▶ ControlLoop ──▶ StreamDecoder
//!      ▲                              │
//!      └────────response queue────────┘
//! ```
//!
//! The decoder is owned by the control loop; the queue pair is the only thing
//! shared between the controller and the decode thread.
//!
//! # Example
//!
//! ```rust
//! use histor_audio::{AudioTask, AudioTaskConfig, SimulatedDecoder};
//! use histor_core::FileStore;
//! use std::time::Duration;
//!
//! # fn main() -> histor_audio::Result<()> {
//! let decoder = SimulatedDecoder::new().with_file(FileStore::Internal, "/beep.mp3", 8 * 1024);
//! let probe = decoder.probe();
//!
//! let task = AudioTask::builder()
//!     .config(AudioTaskConfig { idle_delay_ms: 1, ..AudioTaskConfig::default() })
//!     .on_run_state(|running: bool| println!("running: {}", running))
//!     .spawn(decoder)?;
//!
//! let client = task.client();
//! client.set_volume(12)?;
//! client.stop_station_prepare_beep("/beep.mp3")?;
//! client.change_station("http://radio.example/stream", 15)?;
//!
//! assert!(client.wait_station_switch(Duration::from_secs(5))?);
//! assert_eq!(probe.current_host().as_deref(), Some("http://radio.example/stream"));
//! assert_eq!(client.volume()?, 15);
//!
//! task.shutdown()?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod client;
mod config;
mod control;
mod error;
mod notifier;
pub mod protocol;
mod sequencer;
pub mod simulated;
mod task;

// Public exports
pub use channel::{envelope_channel, EnvelopeReceiver, EnvelopeSender, DEFAULT_CAPACITY};
pub use client::{AudioClient, CancelToken};
pub use config::{AudioTaskConfig, ClientConfig};
pub use control::{ControlLoop, StepOutcome};
pub use error::{AudioTaskError, Result};
pub use notifier::{NoopListener, RunStateListener, RunStateTracker};
pub use protocol::{CommandKind, Envelope, ReplyKind};
pub use sequencer::{SequencerState, StationSequencer, StationTarget};
pub use simulated::{Connection, DecoderProbe, SimulatedDecoder};
pub use task::{AudioTask, AudioTaskBuilder};
