// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Accept Unix-socket clients and register connection handlers.
// Author: Lukas Bower

use std::fs;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kshell_core::Scheme;
use log::{debug, error, info, warn};

use crate::connection::{Connection, ConnectionOptions};
use crate::eloop::{FdHandler, Flow, Interest, LoopCtl};
use crate::runner::BuiltinRunner;

/// How long read interest stays off after a failed `accept`.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);

/// Listening socket that spawns a [`Connection`] per accepted client.
///
/// A failing `accept` (for example `EMFILE`) would keep the socket readable,
/// so read interest is dropped for [`ACCEPT_BACKOFF`] and restored on a tick.
pub struct Listener {
    listener: UnixListener,
    scheme: Arc<Scheme>,
    options: ConnectionOptions,
    resume_at: Option<Instant>,
}

impl Listener {
    /// Bind `path`, replacing a stale socket file, in non-blocking mode.
    pub fn bind(path: &Path, scheme: Arc<Scheme>, options: ConnectionOptions) -> io::Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => debug!("removed stale socket {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let listener = UnixListener::bind(path)?;
        info!("listening on {}", path.display());
        Self::from_listener(listener, scheme, options)
    }

    /// Wrap an already bound listener.
    pub fn from_listener(
        listener: UnixListener,
        scheme: Arc<Scheme>,
        options: ConnectionOptions,
    ) -> io::Result<Self> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            scheme,
            options,
            resume_at: None,
        })
    }
}

impl FdHandler for Listener {
    fn fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }

    fn on_readable(&mut self, ctl: &mut LoopCtl) -> Flow {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if let Err(err) = stream.set_nonblocking(true) {
                        warn!("cannot make client socket non-blocking: {err}");
                        continue;
                    }
                    match Connection::new(
                        stream,
                        Arc::clone(&self.scheme),
                        &self.options,
                        Box::new(BuiltinRunner::new()),
                    ) {
                        Ok(conn) => {
                            debug!("accepted connection {}", conn.fd());
                            ctl.register(Box::new(conn), Interest::READ);
                        }
                        Err(err) => warn!("cannot start session: {err}"),
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    error!("accept failed, pausing for {ACCEPT_BACKOFF:?}: {err}");
                    self.resume_at = Some(Instant::now() + ACCEPT_BACKOFF);
                    ctl.want_read(false);
                    break;
                }
            }
        }
        Flow::Continue
    }

    fn on_writable(&mut self, ctl: &mut LoopCtl) -> Flow {
        ctl.want_write(false);
        Flow::Continue
    }

    fn on_hangup(&mut self, ctl: &mut LoopCtl) -> Flow {
        error!("listening socket failed, shutting down");
        ctl.shutdown();
        Flow::Stop
    }

    fn on_tick(&mut self, ctl: &mut LoopCtl) -> Flow {
        if let Some(resume_at) = self.resume_at {
            if Instant::now() >= resume_at {
                debug!("resuming accept");
                self.resume_at = None;
                ctl.want_read(true);
            }
        }
        Flow::Continue
    }
}
