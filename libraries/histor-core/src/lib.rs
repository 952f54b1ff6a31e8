//! Histor Radio Core
//!
//! Platform-agnostic traits and types shared by the audio task and the
//! applications that drive it.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Decoder capability**: `StreamDecoder`, the fixed operation set the
//!   decode thread drives (connect, pause/resume, seek, volume, pump)
//! - **Decoder events**: `DecoderEvents`, pure observers the decoder reports
//!   stream metadata through
//! - **Error Handling**: `HistorError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use histor_core::{FileStore, Volume};
//!
//! let level = Volume::clamped(40);
//! assert_eq!(level.get(), Volume::MAX);
//! assert_eq!(FileStore::Internal.mount_point(), "/spiffs");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{HistorError, Result};
pub use traits::{DecoderEvents, LoggingEvents, StreamDecoder};
pub use types::{FileStore, Volume};
