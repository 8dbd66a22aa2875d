// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Typed KTP messages and their parameter list codec.
// Author: Lukas Bower

use std::io::{Cursor, Read};

use crate::header::{Header, HEADER_LEN};
use crate::{read_u16, read_u32, Command, ParamType, Status, WireError};

/// Encoded parameter header size in bytes.
pub const PARAM_HEADER_LEN: usize = 8;

/// One typed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    ty: ParamType,
    data: Vec<u8>,
}

impl Param {
    /// Build a parameter from raw bytes.
    #[must_use]
    pub fn new(ty: ParamType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            ty,
            data: data.into(),
        }
    }

    /// Parameter type.
    #[must_use]
    pub fn ty(&self) -> ParamType {
        self.ty
    }

    /// Raw payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as UTF-8, if valid.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Decoded KTP message: header fields plus an ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    cmd: Command,
    status: Status,
    req_id: u32,
    params: Vec<Param>,
}

impl Message {
    /// Start a message without parameters.
    #[must_use]
    pub fn new(cmd: Command, status: Status) -> Self {
        Self {
            cmd,
            status,
            req_id: 0,
            params: Vec::new(),
        }
    }

    /// Set the request identifier.
    #[must_use]
    pub fn with_req_id(mut self, req_id: u32) -> Self {
        self.req_id = req_id;
        self
    }

    /// Append a raw parameter.
    pub fn add_param(&mut self, ty: ParamType, data: impl Into<Vec<u8>>) -> &mut Self {
        self.params.push(Param::new(ty, data));
        self
    }

    /// Append a string parameter.
    pub fn add_str(&mut self, ty: ParamType, value: &str) -> &mut Self {
        self.add_param(ty, value.as_bytes())
    }

    /// Append an exit code parameter.
    pub fn add_retcode(&mut self, code: i32) -> &mut Self {
        self.add_param(ParamType::Retcode, code.to_be_bytes())
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

    /// Parameters in wire order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// First parameter of type `ty`.
    #[must_use]
    pub fn param(&self, ty: ParamType) -> Option<&Param> {
        self.params.iter().find(|param| param.ty == ty)
    }

    /// First parameter of type `ty` decoded as UTF-8.
    #[must_use]
    pub fn str_param(&self, ty: ParamType) -> Option<&str> {
        self.param(ty).and_then(Param::as_str)
    }

    /// Every parameter of type `ty` decoded as UTF-8, skipping invalid ones.
    pub fn str_params(&self, ty: ParamType) -> impl Iterator<Item = &str> + '_ {
        self.params
            .iter()
            .filter(move |param| param.ty == ty)
            .filter_map(Param::as_str)
    }

    /// First exit code parameter.
    #[must_use]
    pub fn retcode(&self) -> Option<i32> {
        let data = self.param(ParamType::Retcode)?.data();
        let bytes: [u8; 4] = data.try_into().ok()?;
        Some(i32::from_be_bytes(bytes))
    }

    /// Header describing this message once serialised.
    pub fn header(&self) -> Result<Header, WireError> {
        let len = self.encoded_len();
        let total = u32::try_from(len).map_err(|_| WireError::Oversized(len))?;
        let param_num =
            u32::try_from(self.params.len()).map_err(|_| WireError::Oversized(len))?;
        Ok(Header::new(self.cmd, self.status, self.req_id, param_num, total))
    }

    /// Serialise header and parameters.
    pub fn serialize(&self) -> Result<Vec<u8>, WireError> {
        let header = self.header()?;
        let mut out = Vec::with_capacity(header.total_len() as usize);
        out.extend_from_slice(&header.encode());
        for param in &self.params {
            let len = param.data.len();
            let len = u32::try_from(len).map_err(|_| WireError::Oversized(len))?;
            out.extend_from_slice(&param.ty.raw().to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&param.data);
        }
        Ok(out)
    }

    /// Decode a complete frame, validating the header against `max_len`.
    pub fn deserialize(bytes: &[u8], max_len: u32) -> Result<Self, WireError> {
        let header = Header::decode(bytes)?;
        header.check(max_len)?;
        let declared = header.total_len();
        if declared as usize != bytes.len() {
            return Err(WireError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        Self::deserialize_parts(&header, &bytes[HEADER_LEN..])
    }

    /// Decode the body of a frame whose header was already read.
    pub fn deserialize_parts(header: &Header, body: &[u8]) -> Result<Self, WireError> {
        if body.len() != header.body_len() {
            return Err(WireError::LengthMismatch {
                declared: header.total_len(),
                actual: body.len() + HEADER_LEN,
            });
        }
        let mut cursor = Cursor::new(body);
        let capacity = (header.param_num() as usize).min(body.len() / PARAM_HEADER_LEN);
        let mut params = Vec::with_capacity(capacity);
        for _ in 0..header.param_num() {
            let ty = ParamType::from_raw(read_u16(&mut cursor)?);
            let _reserved = read_u16(&mut cursor)?;
            let len = read_u32(&mut cursor)? as usize;
            let remaining = body.len() - cursor.position() as usize;
            if len > remaining {
                return Err(WireError::Truncated);
            }
            let mut data = vec![0u8; len];
            cursor
                .read_exact(&mut data)
                .map_err(|_| WireError::Truncated)?;
            params.push(Param { ty, data });
        }
        let trailing = body.len() - cursor.position() as usize;
        if trailing != 0 {
            return Err(WireError::TrailingBytes(trailing));
        }
        Ok(Self {
            cmd: header.cmd(),
            status: header.status(),
            req_id: header.req_id(),
            params,
        })
    }

    fn encoded_len(&self) -> usize {
        self.params
            .iter()
            .map(|param| PARAM_HEADER_LEN + param.data.len())
            .sum::<usize>()
            + HEADER_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 1 << 20;

    #[test]
    fn message_round_trip() {
        let mut msg = Message::new(Command::CompletionAck, Status::NONE).with_req_id(9);
        msg.add_str(ParamType::Prefix, "sh")
            .add_str(ParamType::Line, "show")
            .add_str(ParamType::Line, "shutdown")
            .add_retcode(-2);
        let bytes = msg.serialize().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 4 * PARAM_HEADER_LEN + 2 + 4 + 8 + 4);
        let decoded = Message::deserialize(&bytes, MAX).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.str_param(ParamType::Prefix), Some("sh"));
        assert_eq!(
            decoded.str_params(ParamType::Line).collect::<Vec<_>>(),
            ["show", "shutdown"]
        );
        assert_eq!(decoded.retcode(), Some(-2));
    }

    #[test]
    fn missing_and_invalid_string_params() {
        let mut msg = Message::new(Command::Cmd, Status::NONE);
        msg.add_param(ParamType::Line, vec![0xff, 0xfe]);
        assert_eq!(msg.str_param(ParamType::Line), None);
        assert_eq!(msg.str_param(ParamType::Error), None);
        assert!(msg.param(ParamType::Line).is_some());
    }

    #[test]
    fn parameter_overrunning_body_is_truncated() {
        let mut msg = Message::new(Command::Cmd, Status::NONE);
        msg.add_str(ParamType::Line, "show");
        let mut bytes = msg.serialize().unwrap();
        // Claim 5 bytes of payload where only 4 follow.
        bytes[HEADER_LEN + 7] = 5;
        assert_eq!(Message::deserialize(&bytes, MAX), Err(WireError::Truncated));
    }

    #[test]
    fn extra_bytes_after_params_rejected() {
        let mut msg = Message::new(Command::Cmd, Status::NONE);
        msg.add_str(ParamType::Line, "show");
        let mut bytes = msg.serialize().unwrap();
        bytes.extend_from_slice(&[0, 0]);
        let total = bytes.len() as u32;
        bytes[20..24].copy_from_slice(&total.to_be_bytes());
        assert_eq!(
            Message::deserialize(&bytes, MAX),
            Err(WireError::TrailingBytes(2))
        );
    }

    #[test]
    fn body_length_must_match_header() {
        let header = Header::new(Command::Cmd, Status::NONE, 0, 0, 30);
        assert_eq!(
            Message::deserialize_parts(&header, &[0u8; 4]),
            Err(WireError::LengthMismatch {
                declared: 30,
                actual: 28
            })
        );
    }

    #[test]
    fn oversized_param_count_does_not_preallocate() {
        let header = Header::new(Command::Cmd, Status::NONE, 0, u32::MAX, 24);
        assert_eq!(
            Message::deserialize_parts(&header, &[]),
            Err(WireError::Truncated)
        );
    }
}
