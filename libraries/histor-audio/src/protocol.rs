//! Command envelope exchanged between the controller and the decode thread
//!
//! Every message in either direction is an [`Envelope`]. Requests carry a
//! command tag, optional text and a numeric payload; responses echo the tag
//! and sequence number of their request and fill in `ret`.

use crate::error::{AudioTaskError, Result};
use std::fmt;

/// Closed set of commands the decode thread understands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Query whether audio is being produced
    IsRunning = 0,
    /// Toggle pause
    PauseResume = 1,
    /// Seek to a byte offset
    SetFilePos = 2,
    /// Query elapsed seconds
    ElapsedTime = 3,
    /// Set volume (0..=21)
    SetVolume = 4,
    /// Query volume
    GetVolume = 5,
    /// Connect to a network stream
    ConnectToHost = 6,
    /// Play a clip from the SD card
    ConnectToSd = 7,
    /// Play a clip from internal flash
    ConnectToFlash = 8,
    /// Stop the current clip or stream
    StopSong = 9,
    /// Stop the station and load the beep clip, held at its start
    PrepareBeep = 10,
    /// Play the beep, then switch to a new station once it ends
    ChangeStation = 11,
}

impl CommandKind {
    /// Every command, in tag order
    pub const ALL: [CommandKind; 12] = [
        CommandKind::IsRunning,
        CommandKind::PauseResume,
        CommandKind::SetFilePos,
        CommandKind::ElapsedTime,
        CommandKind::SetVolume,
        CommandKind::GetVolume,
        CommandKind::ConnectToHost,
        CommandKind::ConnectToSd,
        CommandKind::ConnectToFlash,
        CommandKind::StopSong,
        CommandKind::PrepareBeep,
        CommandKind::ChangeStation,
    ];

    /// Wire tag
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = AudioTaskError;

    fn try_from(tag: u8) -> Result<Self> {
        CommandKind::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or(AudioTaskError::UnknownCommand(tag))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::IsRunning => "is-running",
            CommandKind::PauseResume => "pause-resume",
            CommandKind::SetFilePos => "set-file-pos",
            CommandKind::ElapsedTime => "elapsed-time",
            CommandKind::SetVolume => "set-volume",
            CommandKind::GetVolume => "get-volume",
            CommandKind::ConnectToHost => "connect-to-host",
            CommandKind::ConnectToSd => "connect-to-sd",
            CommandKind::ConnectToFlash => "connect-to-flash",
            CommandKind::StopSong => "stop-song",
            CommandKind::PrepareBeep => "prepare-beep",
            CommandKind::ChangeStation => "change-station",
        };
        f.write_str(name)
    }
}

/// Which reply a response envelope is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyKind {
    /// Direct answer to the request (also used on requests themselves)
    #[default]
    Immediate,
    /// Station-change completion, sent once the beep has finished
    Deferred,
}

/// Message crossing the controller/decode-thread boundary
///
/// The envelope owns its text, so nothing the caller holds is borrowed across
/// threads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Raw command tag, see [`CommandKind`]
    pub cmd: u8,
    /// URL or file path
    pub text: Option<String>,
    /// Numeric payload (volume, seek offset)
    pub value: u32,
    /// Result, meaningful only on responses
    pub ret: u32,
    /// Request sequence number, echoed by every response
    pub seq: u32,
    /// Immediate or deferred reply
    pub reply: ReplyKind,
}

impl Envelope {
    /// New request for `kind`
    pub fn request(kind: CommandKind, seq: u32) -> Self {
        Self {
            cmd: kind.tag(),
            seq,
            ..Self::default()
        }
    }

    /// Attach text (URL or path)
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach a numeric payload
    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// Decode the command tag
    pub fn kind(&self) -> Result<CommandKind> {
        CommandKind::try_from(self.cmd)
    }

    /// Immediate response to this request
    pub fn respond(&self, ret: u32) -> Envelope {
        Envelope {
            cmd: self.cmd,
            text: None,
            value: 0,
            ret,
            seq: self.seq,
            reply: ReplyKind::Immediate,
        }
    }

    /// Deferred station-change completion for the request numbered `seq`
    pub fn station_switched(seq: u32, ret: u32) -> Envelope {
        Envelope {
            cmd: CommandKind::ChangeStation.tag(),
            text: None,
            value: 0,
            ret,
            seq,
            reply: ReplyKind::Deferred,
        }
    }

    /// `ret` read as a flag
    pub fn ret_flag(&self) -> bool {
        self.ret != 0
    }
}
