//! Deterministic in-memory decoder
//!
//! Stands in for the real stream decoder in tests and in the demo binary.
//! Local clips have a fixed byte length and end after enough `pump()` calls;
//! network streams never end unless stopped. A [`DecoderProbe`] shares the
//! decoder's state so a test can inspect it while the decode thread owns the
//! decoder itself.

use histor_core::{DecoderEvents, FileStore, LoggingEvents, StreamDecoder, Volume};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Bytes consumed per `pump()` call
pub const DEFAULT_CHUNK_BYTES: u32 = 1024;

/// Bytes per second of playback (128 kbit/s)
pub const DEFAULT_BYTES_PER_SECOND: u32 = 16_000;

/// What the decoder is connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Network stream
    Host(String),
    /// Local clip
    File(FileStore, String),
}

#[derive(Debug, Clone)]
struct Source {
    connection: Connection,
    /// `None` for endless network streams
    length: Option<u32>,
    position: u32,
}

#[derive(Debug)]
struct SimState {
    files: HashMap<(FileStore, String), u32>,
    unreachable: HashSet<String>,
    source: Option<Source>,
    playing: bool,
    volume: u8,
    chunk_bytes: u32,
    bytes_per_second: u32,
    history: Vec<Connection>,
    pumps: u64,
    timeouts: Option<(Duration, Duration)>,
}

impl SimState {
    fn elapsed_seconds(&self) -> u32 {
        self.source
            .as_ref()
            .map_or(0, |source| source.position / self.bytes_per_second.max(1))
    }
}

/// Simulated stream decoder
pub struct SimulatedDecoder {
    state: Arc<Mutex<SimState>>,
    events: Arc<dyn DecoderEvents>,
}

/// Read-only view of a [`SimulatedDecoder`] that outlives moving it to the decode thread
#[derive(Clone)]
pub struct DecoderProbe {
    state: Arc<Mutex<SimState>>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for SimulatedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDecoder {
    /// Empty decoder: no files, every `http(s)://` host reachable
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                files: HashMap::new(),
                unreachable: HashSet::new(),
                source: None,
                playing: false,
                volume: Volume::MAX,
                chunk_bytes: DEFAULT_CHUNK_BYTES,
                bytes_per_second: DEFAULT_BYTES_PER_SECOND,
                history: Vec::new(),
                pumps: 0,
                timeouts: None,
            })),
            events: Arc::new(LoggingEvents),
        }
    }

    /// Register a local clip of `length` bytes
    pub fn with_file(self, store: FileStore, path: impl Into<String>, length: u32) -> Self {
        lock(&self.state).files.insert((store, path.into()), length);
        self
    }

    /// Make connecting to `url` fail
    pub fn with_unreachable_host(self, url: impl Into<String>) -> Self {
        lock(&self.state).unreachable.insert(url.into());
        self
    }

    /// Bytes consumed per `pump()`
    pub fn with_chunk_bytes(self, bytes: u32) -> Self {
        lock(&self.state).chunk_bytes = bytes.max(1);
        self
    }

    /// Report stream metadata to `events` instead of the log
    pub fn with_events(mut self, events: Arc<dyn DecoderEvents>) -> Self {
        self.events = events;
        self
    }

    /// Shared view for inspecting the decoder from another thread
    pub fn probe(&self) -> DecoderProbe {
        DecoderProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn connect(&mut self, connection: Connection, length: Option<u32>) {
        let mut state = lock(&self.state);
        state.source = Some(Source {
            connection: connection.clone(),
            length,
            position: 0,
        });
        state.playing = true;
        state.history.push(connection);
    }
}

impl StreamDecoder for SimulatedDecoder {
    fn is_running(&self) -> bool {
        lock(&self.state).playing
    }

    fn pause_resume(&mut self) -> bool {
        let mut state = lock(&self.state);
        if state.source.is_none() {
            return false;
        }
        state.playing = !state.playing;
        true
    }

    fn set_file_pos(&mut self, offset: u32) -> bool {
        let mut state = lock(&self.state);
        match state.source.as_mut() {
            Some(source) => match source.length {
                Some(length) if offset <= length => {
                    source.position = offset;
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    fn elapsed_time(&self) -> u32 {
        lock(&self.state).elapsed_seconds()
    }

    fn set_volume(&mut self, level: u8) {
        lock(&self.state).volume = level.min(Volume::MAX);
    }

    fn volume(&self) -> u8 {
        lock(&self.state).volume
    }

    fn connect_to_host(&mut self, url: &str) -> bool {
        let reachable = (url.starts_with("http://") || url.starts_with("https://"))
            && !lock(&self.state).unreachable.contains(url);
        if !reachable {
            self.events.info(&format!("connect to {} failed", url));
            return false;
        }

        self.stop();
        self.connect(Connection::Host(url.to_string()), None);
        self.events.info(&format!("connected to {}", url));
        self.events.last_host(url);
        self.events.bitrate("128000");
        true
    }

    fn connect_to_file(&mut self, store: FileStore, path: &str) -> bool {
        let length = lock(&self.state).files.get(&(store, path.to_string())).copied();
        let Some(length) = length else {
            self.events
                .info(&format!("file {}{} not found", store.mount_point(), path));
            return false;
        };

        self.stop();
        self.connect(Connection::File(store, path.to_string()), Some(length));
        self.events
            .info(&format!("reading file {}{}", store.mount_point(), path));
        true
    }

    fn stop(&mut self) -> u32 {
        let mut state = lock(&self.state);
        let elapsed = state.elapsed_seconds();
        state.source = None;
        state.playing = false;
        elapsed
    }

    fn pump(&mut self) {
        let finished = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            state.pumps += 1;
            if !state.playing {
                return;
            }
            let chunk = state.chunk_bytes;
            let Some(source) = state.source.as_mut() else {
                return;
            };
            source.position = source.position.saturating_add(chunk);
            match (&source.connection, source.length) {
                (Connection::File(_, path), Some(length)) if source.position >= length => {
                    let path = path.clone();
                    state.source = None;
                    state.playing = false;
                    Some(path)
                }
                _ => None,
            }
        };

        if let Some(path) = finished {
            self.events.end_of_file(&path);
        }
    }

    fn set_connection_timeout(&mut self, plain: Duration, tls: Duration) {
        lock(&self.state).timeouts = Some((plain, tls));
    }
}

impl DecoderProbe {
    /// Current connection, if any
    pub fn connection(&self) -> Option<Connection> {
        lock(&self.state)
            .source
            .as_ref()
            .map(|source| source.connection.clone())
    }

    /// URL of the current network stream
    pub fn current_host(&self) -> Option<String> {
        match self.connection() {
            Some(Connection::Host(url)) => Some(url),
            _ => None,
        }
    }

    /// Every connection made, oldest first
    pub fn history(&self) -> Vec<Connection> {
        lock(&self.state).history.clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn volume(&self) -> u8 {
        lock(&self.state).volume
    }

    /// Byte position in the current clip
    pub fn position(&self) -> Option<u32> {
        lock(&self.state)
            .source
            .as_ref()
            .map(|source| source.position)
    }

    pub fn pump_count(&self) -> u64 {
        lock(&self.state).pumps
    }

    /// Timeouts passed to `set_connection_timeout`
    pub fn connection_timeouts(&self) -> Option<(Duration, Duration)> {
        lock(&self.state).timeouts
    }
}
