// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: KTP wire types and codec primitives shared by kshell peers.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! KTP wire types and codec primitives shared by the kshell daemon and its
//! clients.
//!
//! A frame is a fixed 24-byte [`Header`] followed by `param_num` parameters,
//! each an 8-byte parameter header and its payload. All integers are in
//! network byte order. [`Framer`] reassembles frames read from a byte
//! stream in two phases: header first, then the declared remainder.

use std::io::{Cursor, Read};

mod framer;
mod header;
mod message;

pub use framer::{Frame, Framer};
pub use header::{Header, HEADER_LEN};
pub use message::{Message, Param, PARAM_HEADER_LEN};

/// Frame magic, ASCII `KTP `.
pub const MAGIC: u32 = 0x4b54_5020;
/// Supported major protocol version.
pub const MAJOR: u8 = 0x01;
/// Supported minor protocol version.
pub const MINOR: u8 = 0x00;

/// Errors produced while encoding or decoding KTP frames.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before a complete field.
    #[error("truncated frame")]
    Truncated,
    /// Header magic did not match [`MAGIC`].
    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),
    /// Header carried an unsupported protocol version.
    #[error("unsupported protocol version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version received.
        major: u8,
        /// Minor version received.
        minor: u8,
    },
    /// Declared length cannot hold the header.
    #[error("declared length {0} is shorter than the header")]
    ShortLength(u32),
    /// Declared length exceeds the configured cap.
    #[error("declared length {declared} exceeds limit {max}")]
    TooLong {
        /// Length declared in the header.
        declared: u32,
        /// Configured limit.
        max: u32,
    },
    /// Body length disagrees with the header.
    #[error("length mismatch: declared {declared} actual {actual}")]
    LengthMismatch {
        /// Length declared in the header.
        declared: u32,
        /// Bytes actually supplied.
        actual: usize,
    },
    /// Bytes remained after the declared parameters.
    #[error("{0} trailing bytes after parameters")]
    TrailingBytes(usize),
    /// Encoded message would not fit the 32-bit length field.
    #[error("message of {0} bytes is too large to encode")]
    Oversized(usize),
}

/// Command carried in the header `cmd` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Execute a line.
    Cmd,
    /// Reply to [`Command::Cmd`].
    CmdAck,
    /// Complete a partial line.
    Completion,
    /// Reply to [`Command::Completion`].
    CompletionAck,
    /// Describe the next token.
    Help,
    /// Reply to [`Command::Help`].
    HelpAck,
    /// Authenticate the connection.
    Auth,
    /// Reply to [`Command::Auth`].
    AuthAck,
    /// Unrecognised command code, preserved verbatim.
    Other(u16),
}

impl Command {
    /// Decode a raw command code.
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x63 => Self::Cmd,
            0x43 => Self::CmdAck,
            0x76 => Self::Completion,
            0x56 => Self::CompletionAck,
            0x68 => Self::Help,
            0x48 => Self::HelpAck,
            0x61 => Self::Auth,
            0x41 => Self::AuthAck,
            other => Self::Other(other),
        }
    }

    /// Raw command code.
    #[must_use]
    pub fn raw(self) -> u16 {
        match self {
            Self::Cmd => u16::from(b'c'),
            Self::CmdAck => u16::from(b'C'),
            Self::Completion => u16::from(b'v'),
            Self::CompletionAck => u16::from(b'V'),
            Self::Help => u16::from(b'h'),
            Self::HelpAck => u16::from(b'H'),
            Self::Auth => u16::from(b'a'),
            Self::AuthAck => u16::from(b'A'),
            Self::Other(raw) => raw,
        }
    }

    /// Acknowledgement paired with a request command.
    #[must_use]
    pub fn ack(self) -> Option<Self> {
        match self {
            Self::Cmd => Some(Self::CmdAck),
            Self::Completion => Some(Self::CompletionAck),
            Self::Help => Some(Self::HelpAck),
            Self::Auth => Some(Self::AuthAck),
            _ => None,
        }
    }
}

/// Header status bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(u32);

impl Status {
    /// No flags.
    pub const NONE: Status = Status(0);
    /// The request failed; an [`ParamType::Error`] parameter explains why.
    pub const ERROR: Status = Status(1);

    /// Wrap raw status bits.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw status bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether the error bit is set.
    #[must_use]
    pub fn is_error(self) -> bool {
        self.0 & Self::ERROR.0 != 0
    }
}

/// Parameter type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Input line, completion candidate or help text.
    Line,
    /// Error text.
    Error,
    /// Exit code as a big-endian `i32`.
    Retcode,
    /// Completion prefix or help subject.
    Prefix,
    /// User name presented during authentication.
    User,
    /// Unrecognised parameter type, preserved verbatim.
    Other(u16),
}

impl ParamType {
    /// Decode a raw parameter type.
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x4c => Self::Line,
            0x45 => Self::Error,
            0x72 => Self::Retcode,
            0x70 => Self::Prefix,
            0x75 => Self::User,
            other => Self::Other(other),
        }
    }

    /// Raw parameter type.
    #[must_use]
    pub fn raw(self) -> u16 {
        match self {
            Self::Line => u16::from(b'L'),
            Self::Error => u16::from(b'E'),
            Self::Retcode => u16::from(b'r'),
            Self::Prefix => u16::from(b'p'),
            Self::User => u16::from(b'u'),
            Self::Other(raw) => raw,
        }
    }
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, WireError> {
    let mut buf = [0u8; 1];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| WireError::Truncated)?;
    Ok(buf[0])
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, WireError> {
    let mut buf = [0u8; 2];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| WireError::Truncated)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, WireError> {
    let mut buf = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| WireError::Truncated)?;
    Ok(u32::from_be_bytes(buf))
}
