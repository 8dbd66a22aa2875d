// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fixed-size KTP frame header codec and validation.
// Author: Lukas Bower

use std::io::Cursor;

use crate::{read_u16, read_u32, read_u8, Command, Status, WireError, MAGIC, MAJOR, MINOR};

/// Encoded header size in bytes.
pub const HEADER_LEN: usize = 24;

/// Decoded KTP frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    magic: u32,
    major: u8,
    minor: u8,
    cmd: Command,
    status: Status,
    req_id: u32,
    param_num: u32,
    len: u32,
}

impl Header {
    /// Build a header for the current protocol version.
    #[must_use]
    pub fn new(cmd: Command, status: Status, req_id: u32, param_num: u32, len: u32) -> Self {
        Self {
            magic: MAGIC,
            major: MAJOR,
            minor: MINOR,
            cmd,
            status,
            req_id,
            param_num,
            len,
        }
    }

    /// Decode the first [`HEADER_LEN`] bytes of `bytes` without validating them.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut cursor = Cursor::new(bytes);
        Ok(Self {
            magic: read_u32(&mut cursor)?,
            major: read_u8(&mut cursor)?,
            minor: read_u8(&mut cursor)?,
            cmd: Command::from_raw(read_u16(&mut cursor)?),
            status: Status::from_bits(read_u32(&mut cursor)?),
            req_id: read_u32(&mut cursor)?,
            param_num: read_u32(&mut cursor)?,
            len: read_u32(&mut cursor)?,
        })
    }

    /// Encode into network byte order.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic.to_be_bytes());
        out[4] = self.major;
        out[5] = self.minor;
        out[6..8].copy_from_slice(&self.cmd.raw().to_be_bytes());
        out[8..12].copy_from_slice(&self.status.bits().to_be_bytes());
        out[12..16].copy_from_slice(&self.req_id.to_be_bytes());
        out[16..20].copy_from_slice(&self.param_num.to_be_bytes());
        out[20..24].copy_from_slice(&self.len.to_be_bytes());
        out
    }

    /// Validate magic, version and declared length against `max_len`.
    pub fn check(&self, max_len: u32) -> Result<(), WireError> {
        if self.magic != MAGIC {
            return Err(WireError::BadMagic(self.magic));
        }
        if self.major != MAJOR || self.minor != MINOR {
            return Err(WireError::UnsupportedVersion {
                major: self.major,
                minor: self.minor,
            });
        }
        if (self.len as usize) < HEADER_LEN {
            return Err(WireError::ShortLength(self.len));
        }
        if self.len > max_len {
            return Err(WireError::TooLong {
                declared: self.len,
                max: max_len,
            });
        }
        Ok(())
    }

    /// Command code.
    #[must_use]
    pub fn cmd(&self) -> Command {
        self.cmd
    }

    /// Status bits.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Request identifier.
    #[must_use]
    pub fn req_id(&self) -> u32 {
        self.req_id
    }

    /// Declared parameter count.
    #[must_use]
    pub fn param_num(&self) -> u32 {
        self.param_num
    }

    /// Declared total frame length, header included.
    #[must_use]
    pub fn total_len(&self) -> u32 {
        self.len
    }

    /// Bytes following the header.
    #[must_use]
    pub fn body_len(&self) -> usize {
        (self.len as usize).saturating_sub(HEADER_LEN)
    }
}
