/// Player configuration
use anyhow::{bail, Context, Result};
use histor_audio::{AudioTaskConfig, ClientConfig};
use histor_core::Volume;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub audio: AudioTaskConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub station: StationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationSettings {
    /// Beep clip on internal flash, played between stations
    #[serde(default = "default_beep_path")]
    pub beep_path: String,

    /// Length of the simulated beep clip
    #[serde(default = "default_beep_bytes")]
    pub beep_bytes: u32,

    /// Station playing before the switch
    #[serde(default = "default_from_url")]
    pub from_url: String,

    /// Station switched to
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_volume")]
    pub volume: u8,

    /// How long to wait for the switch to complete
    #[serde(default = "default_switch_timeout_secs")]
    pub switch_timeout_secs: u64,
}

impl PlayerConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `histor.toml` in the working directory; a missing
    /// default file is not an error, a missing explicit one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("histor.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables, e.g. HISTOR_AUDIO__QUEUE_CAPACITY
        settings = settings.add_source(
            config::Environment::with_prefix("HISTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(settings)
    }

    fn from_builder(
        settings: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;

        if self.station.beep_path.is_empty() {
            bail!("station.beep_path must not be empty");
        }

        Volume::new(self.station.volume).context("station.volume")?;

        Ok(())
    }
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            beep_path: default_beep_path(),
            beep_bytes: default_beep_bytes(),
            from_url: default_from_url(),
            url: default_url(),
            volume: default_volume(),
            switch_timeout_secs: default_switch_timeout_secs(),
        }
    }
}

// Default values
fn default_beep_path() -> String {
    "/beep.mp3".to_string()
}

fn default_beep_bytes() -> u32 {
    8 * 1024
}

fn default_from_url() -> String {
    "http://radio.example/news".to_string()
}

fn default_url() -> String {
    "http://radio.example/music".to_string()
}

fn default_volume() -> u8 {
    15
}

fn default_switch_timeout_secs() -> u64 {
    10
}
