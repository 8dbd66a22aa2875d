// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Per-connection KTP session: framing, dispatch and replies.
// Author: Lukas Bower

//! Per-connection KTP protocol handler.
//!
//! A connection starts `NotAuthorized`, becomes `Idle` once authorised and
//! moves to `WaitForProcess` while a command's action runs. While waiting,
//! read interest is dropped so further requests stay buffered in the
//! socket; the pending action is polled on every loop tick.
//!
//! A frame whose header fails validation closes the connection without a
//! reply. A frame whose body fails to decode is logged and discarded.

use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;

use kshell_core::{
    ActionRunner, PargV, ParseStatus, PendingAction, RunOutcome, Scheme, SchemeError, Session,
};
use kshell_wire::{Command, Frame, Framer, Message, ParamType, Status};
use log::{debug, error, info, warn};

use crate::async_io::{AsyncIo, Fill, Flush};
use crate::eloop::{FdHandler, Flow, LoopCtl};
use crate::sys;

const ERR_NO_LINE: &str = "The line is not specified";
const ERR_NOT_AUTHORIZED: &str = "Not authorized";
const ERR_INTERNAL: &str = "Internal parse error";

/// Protocol state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The connection is closed or closing.
    Disconnected,
    /// No AUTH exchange has happened yet.
    NotAuthorized,
    /// Ready for requests.
    Idle,
    /// An action is running; requests stay queued.
    WaitForProcess,
}

/// Who is on the other end of the socket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Peer user id from socket credentials.
    pub uid: Option<u32>,
    /// Peer group id from socket credentials.
    pub gid: Option<u32>,
    /// User name presented in AUTH.
    pub user: Option<String>,
}

/// Settings shared by every connection of a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// View the session starts in.
    pub start_entry: String,
    /// Whether AUTH must precede other requests.
    pub require_auth: bool,
    /// Largest declared frame length accepted.
    pub max_message_len: u32,
}

#[derive(Debug)]
struct Running {
    action: Box<dyn PendingAction>,
    ack: Command,
    req_id: u32,
}

/// One client connection.
pub struct Connection<S> {
    io: AsyncIo<S>,
    framer: Framer,
    state: SessionState,
    identity: Identity,
    session: Session,
    runner: Box<dyn ActionRunner>,
    running: Option<Running>,
    require_auth: bool,
    close_after_flush: bool,
    failed: bool,
}

impl<S: Read + Write + AsRawFd> Connection<S> {
    /// Wrap a non-blocking stream.
    pub fn new(
        stream: S,
        scheme: Arc<Scheme>,
        options: &ConnectionOptions,
        runner: Box<dyn ActionRunner>,
    ) -> Result<Self, SchemeError> {
        let session = Session::new(scheme, &options.start_entry)?;
        let identity = match sys::peer_cred(stream.as_raw_fd()) {
            Ok((uid, gid)) => Identity {
                uid: Some(uid),
                gid: Some(gid),
                user: None,
            },
            Err(err) => {
                debug!("peer credentials unavailable: {err}");
                Identity::default()
            }
        };
        Ok(Self {
            io: AsyncIo::new(stream),
            framer: Framer::new(options.max_message_len),
            state: SessionState::NotAuthorized,
            identity,
            session,
            runner,
            running: None,
            require_auth: options.require_auth,
            close_after_flush: false,
            failed: false,
        })
    }
}

impl<S: Read + Write> Connection<S> {
    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Peer identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Parse session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn process_input(&mut self, ctl: &mut LoopCtl) -> Flow {
        while self.state != SessionState::WaitForProcess && !self.close_after_flush {
            let Some(chunk) = self.io.take(self.framer.expected()) else {
                break;
            };
            match self.framer.push(&chunk) {
                Ok(Frame::Pending) => {}
                Ok(Frame::Complete(msg)) => self.dispatch(&msg),
                Ok(Frame::Malformed(err)) => warn!("discarding malformed message: {err}"),
                Err(err) => {
                    warn!("dropping connection on bad header: {err}");
                    self.state = SessionState::Disconnected;
                    return Flow::Stop;
                }
            }
        }
        ctl.want_read(self.state != SessionState::WaitForProcess && !self.close_after_flush);
        self.sync_output(ctl)
    }

    fn sync_output(&mut self, ctl: &mut LoopCtl) -> Flow {
        if self.failed {
            self.state = SessionState::Disconnected;
            return Flow::Stop;
        }
        let pending = self.io.pending_output() > 0;
        ctl.want_write(pending);
        if !pending && self.close_after_flush {
            debug!("session finished, closing connection");
            self.state = SessionState::Disconnected;
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn dispatch(&mut self, msg: &Message) {
        let cmd = msg.cmd();
        match (cmd, cmd.ack()) {
            (Command::Auth, Some(ack)) => self.process_auth(msg, ack),
            (Command::Cmd, Some(ack)) => self.process_cmd(msg, ack),
            (Command::Completion, Some(ack)) => self.process_completion(msg, ack),
            (Command::Help, Some(ack)) => self.process_help(msg, ack),
            (other, _) => warn!("unsupported command: 0x{:04x}", other.raw()),
        }
    }

    fn authorized(&mut self, ack: Command, req_id: u32) -> bool {
        if self.state != SessionState::NotAuthorized {
            return true;
        }
        if self.require_auth {
            self.send_error(ack, req_id, ERR_NOT_AUTHORIZED);
            return false;
        }
        self.state = SessionState::Idle;
        true
    }

    fn process_auth(&mut self, msg: &Message, ack: Command) {
        if let Some(user) = msg.str_param(ParamType::User) {
            self.identity.user = Some(user.to_owned());
        }
        info!(
            "client authorised: user {:?} uid {:?}",
            self.identity.user, self.identity.uid
        );
        self.state = SessionState::Idle;
        self.reply(Message::new(ack, Status::NONE).with_req_id(msg.req_id()));
    }

    fn process_cmd(&mut self, msg: &Message, ack: Command) {
        let req_id = msg.req_id();
        if !self.authorized(ack, req_id) {
            return;
        }
        let Some(line) = msg.str_param(ParamType::Line) else {
            self.send_error(ack, req_id, ERR_NO_LINE);
            return;
        };
        let chain = match self.session.parse_for_exec(line) {
            Ok(chain) => chain,
            Err(err) => {
                debug!("rejecting {line:?}: {err}");
                self.send_error(ack, req_id, &err.to_string());
                return;
            }
        };
        match self.runner.run(&chain, &mut self.session) {
            Ok(RunOutcome::Done(code)) => self.send_retcode(ack, req_id, code),
            Ok(RunOutcome::Pending(action)) => {
                debug!("waiting for action of {line:?}");
                self.state = SessionState::WaitForProcess;
                self.running = Some(Running {
                    action,
                    ack,
                    req_id,
                });
            }
            Err(err) => {
                warn!("action for {line:?} failed: {err}");
                self.send_error(ack, req_id, &err.to_string());
            }
        }
        if self.session.is_done() {
            self.close_after_flush = true;
        }
    }

    fn process_completion(&mut self, msg: &Message, ack: Command) {
        let req_id = msg.req_id();
        if !self.authorized(ack, req_id) {
            return;
        }
        let Some(line) = msg.str_param(ParamType::Line) else {
            self.send_error(ack, req_id, ERR_NO_LINE);
            return;
        };
        let pargv = self.session.parse_for_completion(line);
        if pargv.status() == ParseStatus::Error {
            self.send_error(ack, req_id, ERR_INTERNAL);
            return;
        }
        let scheme = Arc::clone(self.session.scheme());
        let mut reply = Message::new(ack, Status::NONE).with_req_id(req_id);
        if let Some(prefix) = candidate_prefix(&pargv) {
            reply.add_str(ParamType::Prefix, prefix);
        }
        for entry in candidates(&scheme, &pargv) {
            reply.add_str(ParamType::Line, entry.literal());
        }
        self.reply(reply);
    }

    fn process_help(&mut self, msg: &Message, ack: Command) {
        let req_id = msg.req_id();
        if !self.authorized(ack, req_id) {
            return;
        }
        let Some(line) = msg.str_param(ParamType::Line) else {
            self.send_error(ack, req_id, ERR_NO_LINE);
            return;
        };
        let pargv = self.session.parse_for_help(line);
        if pargv.status() == ParseStatus::Error {
            self.send_error(ack, req_id, ERR_INTERNAL);
            return;
        }
        let scheme = Arc::clone(self.session.scheme());
        let mut reply = Message::new(ack, Status::NONE).with_req_id(req_id);
        for entry in candidates(&scheme, &pargv) {
            reply
                .add_str(ParamType::Prefix, entry.literal())
                .add_str(ParamType::Line, entry.help().unwrap_or(""));
        }
        self.reply(reply);
    }

    fn send_retcode(&mut self, ack: Command, req_id: u32, code: i32) {
        let mut reply = Message::new(ack, Status::NONE).with_req_id(req_id);
        reply.add_retcode(code);
        self.reply(reply);
    }

    fn send_error(&mut self, ack: Command, req_id: u32, text: &str) {
        let mut reply = Message::new(ack, Status::ERROR).with_req_id(req_id);
        reply.add_str(ParamType::Error, text);
        self.reply(reply);
    }

    fn reply(&mut self, msg: Message) {
        let bytes = match msg.serialize() {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("cannot encode reply: {err}");
                return;
            }
        };
        match self.io.send(&bytes) {
            Ok(Flush::Drained) => {}
            Ok(Flush::Stalled) => debug!("output stalled with {} bytes", self.io.pending_output()),
            Err(err) => {
                error!("problem with async output: {err}");
                self.failed = true;
            }
        }
    }
}

/// Prefix the client is completing: the unfinished last token.
fn candidate_prefix(pargv: &PargV) -> Option<&str> {
    if pargv.is_continuable() {
        pargv.last_arg()
    } else {
        None
    }
}

/// Candidate entries, narrowed to those extending the prefix being typed.
fn candidates<'a>(scheme: &'a Scheme, pargv: &PargV) -> Vec<&'a kshell_core::Entry> {
    let prefix = candidate_prefix(pargv).map(str::to_ascii_lowercase);
    pargv
        .completions()
        .iter()
        .filter_map(|id| scheme.entry(*id))
        .filter(|entry| match &prefix {
            Some(prefix) => entry.literal().to_ascii_lowercase().starts_with(prefix.as_str()),
            None => true,
        })
        .collect()
}

impl<S: Read + Write + AsRawFd> FdHandler for Connection<S> {
    fn fd(&self) -> RawFd {
        self.io.get_ref().as_raw_fd()
    }

    fn on_readable(&mut self, ctl: &mut LoopCtl) -> Flow {
        let fill = match self.io.fill() {
            Ok(fill) => fill,
            Err(err) => {
                error!("problem with async input: {err}");
                self.state = SessionState::Disconnected;
                return Flow::Stop;
            }
        };
        if self.process_input(ctl) == Flow::Stop {
            return Flow::Stop;
        }
        if fill == Fill::Eof {
            debug!("peer closed connection {}", self.fd());
            self.state = SessionState::Disconnected;
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn on_writable(&mut self, ctl: &mut LoopCtl) -> Flow {
        match self.io.flush() {
            Ok(Flush::Drained | Flush::Stalled) => self.sync_output(ctl),
            Err(err) => {
                error!("problem with async output: {err}");
                self.state = SessionState::Disconnected;
                Flow::Stop
            }
        }
    }

    fn on_hangup(&mut self, _ctl: &mut LoopCtl) -> Flow {
        debug!("close connection {}", self.fd());
        self.state = SessionState::Disconnected;
        Flow::Stop
    }

    fn on_tick(&mut self, ctl: &mut LoopCtl) -> Flow {
        let Some(running) = self.running.as_mut() else {
            return Flow::Continue;
        };
        let Some(code) = running.action.poll_done() else {
            return Flow::Continue;
        };
        info!("action process terminated: retcode {code}");
        let (ack, req_id) = (running.ack, running.req_id);
        self.running = None;
        self.state = SessionState::Idle;
        self.send_retcode(ack, req_id, code);
        if self.session.is_done() {
            self.close_after_flush = true;
        }
        self.process_input(ctl)
    }
}
