// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Buffered non-blocking socket input and output queues.
// Author: Lukas Bower

//! Buffered non-blocking socket input and output queues.

use std::io::{self, Read, Write};

const READ_CHUNK: usize = 4096;
const READ_BUDGET: usize = 64 * 1024;

/// Result of draining readable bytes into the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The stream is still open.
    Open,
    /// The peer closed its end.
    Eof,
}

/// Result of pushing queued output to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Every queued byte was written.
    Drained,
    /// The stream would block with bytes still queued.
    Stalled,
}

/// Receive buffer and send queue around a non-blocking stream.
#[derive(Debug)]
pub struct AsyncIo<S> {
    stream: S,
    rx: Vec<u8>,
    tx: Vec<u8>,
}

impl<S: Read + Write> AsyncIo<S> {
    /// Wrap a stream already in non-blocking mode.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            rx: Vec::new(),
            tx: Vec::new(),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Read whatever is available, up to a per-call budget.
    pub fn fill(&mut self) -> io::Result<Fill> {
        let mut buf = [0u8; READ_CHUNK];
        let mut total = 0;
        while total < READ_BUDGET {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(Fill::Eof),
                Ok(n) => {
                    self.rx.extend_from_slice(&buf[..n]);
                    total += n;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(Fill::Open)
    }

    /// Bytes received but not yet taken.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Remove exactly `len` bytes from the front of the receive buffer.
    pub fn take(&mut self, len: usize) -> Option<Vec<u8>> {
        if self.rx.len() < len {
            return None;
        }
        let rest = self.rx.split_off(len);
        Some(std::mem::replace(&mut self.rx, rest))
    }

    /// Queue `bytes` and write as much as the stream accepts.
    pub fn send(&mut self, bytes: &[u8]) -> io::Result<Flush> {
        self.tx.extend_from_slice(bytes);
        self.flush()
    }

    /// Write queued bytes until drained or the stream would block.
    pub fn flush(&mut self) -> io::Result<Flush> {
        while !self.tx.is_empty() {
            match self.stream.write(&self.tx) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.tx.drain(..n);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Flush::Stalled)
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(Flush::Drained)
    }

    /// Bytes queued but not yet written.
    pub fn pending_output(&self) -> usize {
        self.tx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory stream replaying scripted read and write outcomes.
    #[derive(Default)]
    struct Scripted {
        reads: VecDeque<io::Result<Vec<u8>>>,
        write_limits: VecDeque<io::Result<usize>>,
        written: Vec<u8>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(err)) => Err(err),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let limit = match self.write_limits.pop_front() {
                Some(Ok(limit)) => limit,
                Some(Err(err)) => return Err(err),
                None => buf.len(),
            };
            let n = limit.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn fill_gathers_until_would_block() {
        let mut stream = Scripted::default();
        stream.reads.push_back(Ok(b"abc".to_vec()));
        stream.reads.push_back(Err(io::ErrorKind::Interrupted.into()));
        stream.reads.push_back(Ok(b"def".to_vec()));
        let mut io = AsyncIo::new(stream);
        assert_eq!(io.fill().unwrap(), Fill::Open);
        assert_eq!(io.buffered(), 6);
        assert_eq!(io.take(4).unwrap(), b"abcd");
        assert!(io.take(3).is_none());
        assert_eq!(io.take(2).unwrap(), b"ef");
    }

    #[test]
    fn fill_reports_eof() {
        let mut stream = Scripted::default();
        stream.reads.push_back(Ok(b"x".to_vec()));
        stream.reads.push_back(Ok(Vec::new()));
        let mut io = AsyncIo::new(stream);
        assert_eq!(io.fill().unwrap(), Fill::Eof);
        assert_eq!(io.buffered(), 1);
    }

    #[test]
    fn send_stalls_and_resumes() {
        let mut stream = Scripted::default();
        stream.write_limits.push_back(Ok(2));
        stream
            .write_limits
            .push_back(Err(io::ErrorKind::WouldBlock.into()));
        let mut io = AsyncIo::new(stream);
        assert_eq!(io.send(b"hello").unwrap(), Flush::Stalled);
        assert_eq!(io.pending_output(), 3);
        assert_eq!(io.get_ref().written, b"he");
        assert_eq!(io.flush().unwrap(), Flush::Drained);
        assert_eq!(io.pending_output(), 0);
        assert_eq!(io.get_ref().written, b"hello");
    }

    #[test]
    fn write_failures_surface() {
        let mut stream = Scripted::default();
        stream
            .write_limits
            .push_back(Err(io::ErrorKind::BrokenPipe.into()));
        let mut io = AsyncIo::new(stream);
        let err = io.send(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
