// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Single-threaded poll(2) readiness loop driving fd handlers.
// Author: Lukas Bower

//! Single-threaded `poll(2)` readiness loop.
//!
//! Each registered [`FdHandler`] owns one descriptor. On every iteration the
//! loop polls all descriptors, dispatches writable, readable and hangup
//! events in that order, then gives every handler a tick. A handler that
//! returns [`Flow::Stop`] is dropped, which closes its descriptor.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use log::{debug, trace};

use crate::sys;

/// Readiness a handler wants to be woken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest {
    /// Wake when readable.
    pub read: bool,
    /// Wake when writable.
    pub write: bool,
}

impl Interest {
    /// Read readiness only.
    pub const READ: Interest = Interest {
        read: true,
        write: false,
    };
    /// Read and write readiness.
    pub const READ_WRITE: Interest = Interest {
        read: true,
        write: true,
    };

    fn events(self) -> libc::c_short {
        let mut events = 0;
        if self.read {
            events |= libc::POLLIN;
        }
        if self.write {
            events |= libc::POLLOUT;
        }
        events
    }
}

/// Whether a handler stays registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep the handler.
    Continue,
    /// Drop the handler and close its descriptor.
    Stop,
}

/// Callbacks invoked by [`EventLoop`].
pub trait FdHandler {
    /// Descriptor to poll.
    fn fd(&self) -> RawFd;

    /// The descriptor is readable.
    fn on_readable(&mut self, ctl: &mut LoopCtl) -> Flow;

    /// The descriptor is writable.
    fn on_writable(&mut self, ctl: &mut LoopCtl) -> Flow;

    /// The peer hung up or the descriptor failed.
    fn on_hangup(&mut self, _ctl: &mut LoopCtl) -> Flow {
        Flow::Stop
    }

    /// Called once per loop iteration after event dispatch.
    fn on_tick(&mut self, _ctl: &mut LoopCtl) -> Flow {
        Flow::Continue
    }
}

/// Control surface handed to handler callbacks.
pub struct LoopCtl {
    interest: Interest,
    registrations: Vec<(Box<dyn FdHandler>, Interest)>,
    shutdown: bool,
}

impl LoopCtl {
    /// Control surface for a handler currently interested in `interest`.
    #[must_use]
    pub fn new(interest: Interest) -> Self {
        Self {
            interest,
            registrations: Vec::new(),
            shutdown: false,
        }
    }

    /// Current interest of the calling handler.
    #[must_use]
    pub fn interest(&self) -> Interest {
        self.interest
    }

    /// Toggle read interest.
    pub fn want_read(&mut self, on: bool) {
        self.interest.read = on;
    }

    /// Toggle write interest.
    pub fn want_write(&mut self, on: bool) {
        self.interest.write = on;
    }

    /// Register a new handler once the current dispatch finishes.
    pub fn register(&mut self, handler: Box<dyn FdHandler>, interest: Interest) {
        self.registrations.push((handler, interest));
    }

    /// Stop the whole loop after the current iteration.
    pub fn shutdown(&mut self) {
        self.shutdown = true;
    }
}

struct Slot {
    handler: Box<dyn FdHandler>,
    interest: Interest,
}

/// Readiness loop owning every registered handler.
pub struct EventLoop {
    slots: Vec<Slot>,
    tick: Duration,
    shutdown: bool,
}

impl EventLoop {
    /// Loop whose idle poll waits at most `tick`.
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            slots: Vec::new(),
            tick,
            shutdown: false,
        }
    }

    /// Register a handler.
    pub fn register(&mut self, handler: Box<dyn FdHandler>, interest: Interest) {
        debug!("register fd {}", handler.fd());
        self.slots.push(Slot { handler, interest });
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run until shutdown is requested or no handler remains.
    pub fn run(&mut self) -> io::Result<()> {
        while !self.shutdown && !self.slots.is_empty() {
            self.run_once(self.tick)?;
        }
        debug!("event loop finished");
        Ok(())
    }

    /// Poll once, dispatch ready events and tick every handler.
    ///
    /// Returns `false` once shutdown has been requested.
    pub fn run_once(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut fds: Vec<libc::pollfd> = self
            .slots
            .iter()
            .map(|slot| libc::pollfd {
                fd: slot.handler.fd(),
                events: slot.interest.events(),
                revents: 0,
            })
            .collect();
        let ready = sys::poll(&mut fds, timeout)?;
        trace!("poll: {ready} of {} descriptors ready", fds.len());

        let mut kept = Vec::with_capacity(self.slots.len());
        let mut added = Vec::new();
        for (mut slot, pollfd) in self.slots.drain(..).zip(fds) {
            let mut ctl = LoopCtl::new(slot.interest);
            let flow = dispatch(&mut *slot.handler, pollfd.revents, &mut ctl);
            slot.interest = ctl.interest;
            added.append(&mut ctl.registrations);
            self.shutdown |= ctl.shutdown;
            if flow == Flow::Continue {
                kept.push(slot);
            } else {
                debug!("deregister fd {}", pollfd.fd);
            }
        }
        self.slots = kept;
        for (handler, interest) in added {
            self.register(handler, interest);
        }
        Ok(!self.shutdown)
    }
}

fn dispatch(handler: &mut dyn FdHandler, revents: libc::c_short, ctl: &mut LoopCtl) -> Flow {
    if revents & libc::POLLOUT != 0 && handler.on_writable(ctl) == Flow::Stop {
        return Flow::Stop;
    }
    if revents & libc::POLLIN != 0 && handler.on_readable(ctl) == Flow::Stop {
        return Flow::Stop;
    }
    if revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
        && handler.on_hangup(ctl) == Flow::Stop
    {
        return Flow::Stop;
    }
    handler.on_tick(ctl)
}
