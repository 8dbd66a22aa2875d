// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolved command chains and the action runner seam.
// Author: Lukas Bower

//! Resolved command chains and the action runner seam.
//!
//! The engine only resolves which entry to run. Running its actions is
//! delegated to an [`ActionRunner`], which may finish synchronously or hand
//! back a [`PendingAction`] that the caller polls until it completes.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::entry::EntryId;
use crate::pargv::ParsedArg;
use crate::session::Session;

/// Command resolved from a fully matched line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecChain {
    command: EntryId,
    line: String,
    pargs: Vec<ParsedArg>,
}

impl ExecChain {
    /// Assemble a chain for `command`.
    #[must_use]
    pub fn new(command: EntryId, line: String, pargs: Vec<ParsedArg>) -> Self {
        Self {
            command,
            line,
            pargs,
        }
    }

    /// Entry whose actions run.
    #[must_use]
    pub fn command(&self) -> EntryId {
        self.command
    }

    /// Input line the chain was parsed from.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Accepted tokens.
    #[must_use]
    pub fn pargs(&self) -> &[ParsedArg] {
        &self.pargs
    }

    /// Token accepted by `entry`, if it matched.
    #[must_use]
    pub fn value_of(&self, entry: EntryId) -> Option<&str> {
        self.pargs
            .iter()
            .find(|parg| parg.entry() == entry)
            .map(ParsedArg::value)
    }
}

/// Errors raised while running actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No routine is registered under the symbol.
    #[error("unknown action symbol \"{0}\"")]
    UnknownSym(String),
    /// The chain names an entry missing from the scheme.
    #[error("command entry {0} is not in the scheme")]
    MissingEntry(EntryId),
    /// A routine rejected its input.
    #[error("{sym}: {message}")]
    Failed {
        /// Symbol of the failing routine.
        sym: String,
        /// Failure detail.
        message: String,
    },
    /// A child process could not be started.
    #[error("failed to spawn action: {0}")]
    Spawn(#[from] io::Error),
}

/// Action still running after [`ActionRunner::run`] returned.
pub trait PendingAction: fmt::Debug {
    /// Return the exit code once the action has finished.
    fn poll_done(&mut self) -> Option<i32>;
}

/// Result of starting a chain.
#[derive(Debug)]
pub enum RunOutcome {
    /// Finished with an exit code.
    Done(i32),
    /// Still running; poll until done.
    Pending(Box<dyn PendingAction>),
}

/// Runs the actions of a resolved chain.
pub trait ActionRunner {
    /// Start `chain` within `session`.
    fn run(&mut self, chain: &ExecChain, session: &mut Session) -> Result<RunOutcome, ActionError>;
}
