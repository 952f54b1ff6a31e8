//! Audio task composition
//!
//! Builds the queue pair, moves the decoder onto its own thread and hands the
//! controller an [`AudioClient`]. Startup either fully succeeds or fails:
//! there is no client without a running control loop.

use crate::channel::envelope_channel;
use crate::client::AudioClient;
use crate::config::{AudioTaskConfig, ClientConfig};
use crate::control::ControlLoop;
use crate::error::{AudioTaskError, Result};
use crate::notifier::{NoopListener, RunStateListener};
use histor_core::StreamDecoder;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// Builder for [`AudioTask`]
pub struct AudioTaskBuilder {
    config: AudioTaskConfig,
    client_config: ClientConfig,
    listener: Box<dyn RunStateListener>,
}

impl Default for AudioTaskBuilder {
    fn default() -> Self {
        Self {
            config: AudioTaskConfig::default(),
            client_config: ClientConfig::default(),
            listener: Box::new(NoopListener),
        }
    }
}

impl AudioTaskBuilder {
    /// Decode-thread settings
    pub fn config(mut self, config: AudioTaskConfig) -> Self {
        self.config = config;
        self
    }

    /// Controller-side settings
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    /// Hook called on every run-state edge
    pub fn on_run_state(mut self, listener: impl RunStateListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    /// Validate the configuration and start the decode thread
    ///
    /// # Errors
    /// Fails on invalid configuration or when the thread cannot be spawned.
    /// Both are fatal: the caller gets no client.
    pub fn spawn<D>(self, decoder: D) -> Result<AudioTask>
    where
        D: StreamDecoder + 'static,
    {
        self.config.validate()?;

        let (command_tx, command_rx) = envelope_channel(self.config.queue_capacity)?;
        let (response_tx, response_rx) = envelope_channel(self.config.queue_capacity)?;

        let control = ControlLoop::new(
            decoder,
            command_rx,
            response_tx,
            self.listener,
            &self.config,
        );

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || control.run())
            .map_err(|err| {
                error!("Audio task could not be started: {}", err);
                AudioTaskError::Spawn(err)
            })?;

        info!(
            "Audio task started (queue capacity {}, thread {})",
            self.config.queue_capacity, self.config.thread_name
        );

        Ok(AudioTask {
            client: AudioClient::new(command_tx, response_rx, &self.client_config),
            handle,
        })
    }
}

/// Running decode thread plus the client that drives it
pub struct AudioTask {
    client: AudioClient,
    handle: JoinHandle<()>,
}

impl AudioTask {
    pub fn builder() -> AudioTaskBuilder {
        AudioTaskBuilder::default()
    }

    /// Start with default settings and no run-state listener
    pub fn spawn<D>(decoder: D) -> Result<AudioTask>
    where
        D: StreamDecoder + 'static,
    {
        Self::builder().spawn(decoder)
    }

    pub fn client(&self) -> &AudioClient {
        &self.client
    }

    /// Split into the client and the decode thread's handle
    ///
    /// The thread exits once the client is dropped.
    pub fn into_parts(self) -> (AudioClient, JoinHandle<()>) {
        (self.client, self.handle)
    }

    /// Drop the client and wait for the decode thread to exit
    pub fn shutdown(self) -> Result<()> {
        let (client, handle) = self.into_parts();
        drop(client);
        handle.join().map_err(|_| {
            error!("Audio task panicked");
            AudioTaskError::Disconnected
        })
    }
}

impl std::fmt::Debug for AudioTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTask")
            .field("client", &self.client)
            .field("thread", &self.handle.thread().name())
            .finish()
    }
}
