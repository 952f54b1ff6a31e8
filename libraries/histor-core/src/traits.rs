/// Core traits for Histor Radio
use crate::types::FileStore;
use std::time::Duration;
use tracing::info;

/// Streaming decoder capability
///
/// Implementers wrap a stream fetch + decode + DAC pipeline. Exactly one
/// thread (the decode thread) owns the decoder and calls these methods, so
/// implementations need no internal locking.
///
/// Decoding is iterative: nothing progresses unless `pump()` is called.
pub trait StreamDecoder: Send {
    /// Whether the decoder is currently producing audio
    fn is_running(&self) -> bool;

    /// Toggle between paused and playing
    ///
    /// Returns `false` when there is nothing loaded to toggle.
    fn pause_resume(&mut self) -> bool;

    /// Move the read position to a byte offset in the current clip
    fn set_file_pos(&mut self, offset: u32) -> bool;

    /// Elapsed playback time of the current clip, in seconds
    fn elapsed_time(&self) -> u32;

    /// Set output volume (0..=21)
    fn set_volume(&mut self, level: u8);

    /// Current output volume
    fn volume(&self) -> u8;

    /// Connect to a network stream
    fn connect_to_host(&mut self, url: &str) -> bool;

    /// Open a local clip from one of the file stores
    fn connect_to_file(&mut self, store: FileStore, path: &str) -> bool;

    /// Stop the current clip or stream
    ///
    /// Returns the playback position (seconds) at which it was stopped.
    fn stop(&mut self) -> u32;

    /// Advance decoding by one unit of work
    fn pump(&mut self);

    /// Configure connect timeouts for plain and TLS streams
    fn set_connection_timeout(&mut self, plain: Duration, tls: Duration);
}

impl<D: StreamDecoder + ?Sized> StreamDecoder for Box<D> {
    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn pause_resume(&mut self) -> bool {
        (**self).pause_resume()
    }

    fn set_file_pos(&mut self, offset: u32) -> bool {
        (**self).set_file_pos(offset)
    }

    fn elapsed_time(&self) -> u32 {
        (**self).elapsed_time()
    }

    fn set_volume(&mut self, level: u8) {
        (**self).set_volume(level);
    }

    fn volume(&self) -> u8 {
        (**self).volume()
    }

    fn connect_to_host(&mut self, url: &str) -> bool {
        (**self).connect_to_host(url)
    }

    fn connect_to_file(&mut self, store: FileStore, path: &str) -> bool {
        (**self).connect_to_file(store, path)
    }

    fn stop(&mut self) -> u32 {
        (**self).stop()
    }

    fn pump(&mut self) {
        (**self).pump();
    }

    fn set_connection_timeout(&mut self, plain: Duration, tls: Duration) {
        (**self).set_connection_timeout(plain, tls);
    }
}

/// Observer for stream metadata reported by the decoder
///
/// Callbacks run on the decode thread. They must return quickly and must not
/// block. Every method has a no-op default so implementers only override what
/// they care about.
pub trait DecoderEvents: Send + Sync {
    /// Free-form diagnostic text
    fn info(&self, _text: &str) {}

    /// A network stream ended
    fn end_of_stream(&self, _text: &str) {}

    /// A local clip played to its end
    fn end_of_file(&self, _text: &str) {}

    /// Stream bitrate changed
    fn bitrate(&self, _text: &str) {}

    /// Commercial break announced (duration in seconds)
    fn commercial(&self, _text: &str) {}

    /// Station homepage resolved from the stream headers
    fn icy_url(&self, _text: &str) {}

    /// Station description
    fn icy_description(&self, _text: &str) {}

    /// Stream URL last played
    fn last_host(&self, _text: &str) {}
}

/// `DecoderEvents` that writes every callback to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEvents;

impl DecoderEvents for LoggingEvents {
    fn info(&self, text: &str) {
        info!(target: "histor::decoder", "info        {}", text);
    }

    fn end_of_stream(&self, text: &str) {
        info!(target: "histor::decoder", "eof_stream  {}", text);
    }

    fn end_of_file(&self, text: &str) {
        info!(target: "histor::decoder", "eof_file    {}", text);
    }

    fn bitrate(&self, text: &str) {
        info!(target: "histor::decoder", "bitrate     {}", text);
    }

    fn commercial(&self, text: &str) {
        info!(target: "histor::decoder", "commercial  {}", text);
    }

    fn icy_url(&self, text: &str) {
        info!(target: "histor::decoder", "icyurl      {}", text);
    }

    fn icy_description(&self, text: &str) {
        info!(target: "histor::decoder", "description {}", text);
    }

    fn last_host(&self, text: &str) {
        info!(target: "histor::decoder", "lasthost    {}", text);
    }
}
