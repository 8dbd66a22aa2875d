// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Two-phase reassembly of KTP frames from a byte stream.
// Author: Lukas Bower

use crate::header::{Header, HEADER_LEN};
use crate::message::Message;
use crate::WireError;

/// Progress reported by [`Framer::push`].
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A valid header was read; its body is expected next.
    Pending,
    /// A complete message was decoded.
    Complete(Message),
    /// The body did not decode. The stream stays aligned on the next frame.
    Malformed(WireError),
}

/// Reassembles frames from exact-size chunks.
///
/// Callers read [`Framer::expected`] bytes and hand them to
/// [`Framer::push`]. A header that fails validation is returned as an
/// error: the stream can no longer be trusted and must be closed.
#[derive(Debug)]
pub struct Framer {
    header: Option<Header>,
    max_len: u32,
}

impl Framer {
    /// Framer accepting frames of at most `max_len` bytes.
    #[must_use]
    pub fn new(max_len: u32) -> Self {
        Self {
            header: None,
            max_len,
        }
    }

    /// Bytes to read before the next call to [`Framer::push`].
    #[must_use]
    pub fn expected(&self) -> usize {
        match &self.header {
            None => HEADER_LEN,
            Some(header) => header.body_len(),
        }
    }

    /// Feed exactly [`Framer::expected`] bytes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Frame, WireError> {
        match self.header.take() {
            None => {
                if chunk.len() != HEADER_LEN {
                    return Err(WireError::Truncated);
                }
                let header = Header::decode(chunk)?;
                header.check(self.max_len)?;
                if header.body_len() == 0 {
                    return Ok(Self::body(&header, &[]));
                }
                self.header = Some(header);
                Ok(Frame::Pending)
            }
            Some(header) => Ok(Self::body(&header, chunk)),
        }
    }

    fn body(header: &Header, body: &[u8]) -> Frame {
        match Message::deserialize_parts(header, body) {
            Ok(msg) => Frame::Complete(msg),
            Err(err) => Frame::Malformed(err),
        }
    }
}
