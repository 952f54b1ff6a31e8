//! Audio task configuration

use crate::channel::DEFAULT_CAPACITY;
use crate::error::{AudioTaskError, Result};
use histor_core::Volume;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decode-thread settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AudioTaskConfig {
    /// Envelopes each queue holds
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long one loop iteration waits for a command before pumping the decoder
    #[serde(default = "default_command_poll_ms")]
    pub command_poll_ms: u64,

    /// Sleep when the decoder is idle, so the loop does not spin
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Connect timeout for plain streams
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Connect timeout for TLS streams
    #[serde(default = "default_connect_timeout_tls_ms")]
    pub connect_timeout_tls_ms: u64,

    /// Volume the beep plays at while switching stations
    #[serde(default = "default_beep_volume")]
    pub beep_volume: u8,

    /// Name of the decode thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for AudioTaskConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            command_poll_ms: default_command_poll_ms(),
            idle_delay_ms: default_idle_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            connect_timeout_tls_ms: default_connect_timeout_tls_ms(),
            beep_volume: default_beep_volume(),
            thread_name: default_thread_name(),
        }
    }
}

impl AudioTaskConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(AudioTaskError::invalid_config(
                "queue_capacity must be at least 1",
            ));
        }

        if self.command_poll_ms == 0 {
            return Err(AudioTaskError::invalid_config(
                "command_poll_ms must be non-zero so the loop keeps pumping",
            ));
        }

        if self.beep_volume > Volume::MAX {
            return Err(AudioTaskError::invalid_config(format!(
                "beep_volume {} exceeds maximum {}",
                self.beep_volume,
                Volume::MAX
            )));
        }

        if self.thread_name.is_empty() {
            return Err(AudioTaskError::invalid_config("thread_name is empty"));
        }

        Ok(())
    }

    pub fn command_poll(&self) -> Duration {
        Duration::from_millis(self.command_poll_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connect_timeout_tls(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_tls_ms)
    }
}

/// Controller-side settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Give up on a round trip after this long; `None` waits forever
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

// Default values
fn default_queue_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_command_poll_ms() -> u64 {
    1
}

fn default_idle_delay_ms() -> u64 {
    1000 / 30
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_connect_timeout_tls_ms() -> u64 {
    10_000
}

fn default_beep_volume() -> u8 {
    Volume::MAX
}

fn default_thread_name() -> String {
    "audioplay".to_string()
}
