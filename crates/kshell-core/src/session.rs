// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolve input lines against a session's view path.
// Author: Lukas Bower

//! Resolve input lines against a session's view path.
//!
//! Levels are tried from the innermost view outwards. Resolution stops at
//! the first level that matches anything, so a partial match in an inner
//! view never falls back to an outer one.

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::argv::Argv;
use crate::exec::ExecChain;
use crate::pargv::{PargV, ParseStatus, Purpose};
use crate::parse::parse_entry;
use crate::path::Path;
use crate::scheme::{Scheme, SchemeError};

/// Reason a line could not be turned into an executable chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token was not accepted.
    #[error("Illegal command: \"{token}\"")]
    Illegal {
        /// First rejected token.
        token: String,
    },
    /// Input ended before the command was complete.
    #[error("Incomplete command")]
    Incomplete,
    /// The engine failed internally.
    #[error("Internal parse error")]
    Internal,
}

impl ParseError {
    fn from_pargv(pargv: &PargV) -> Self {
        match (pargv.status(), pargv.last_arg()) {
            (ParseStatus::Illegal, Some(token)) => Self::Illegal {
                token: token.to_owned(),
            },
            (ParseStatus::Illegal, None) => Self::Incomplete,
            _ => Self::Internal,
        }
    }
}

/// Per-client parse context.
#[derive(Debug)]
pub struct Session {
    scheme: Arc<Scheme>,
    path: Path,
    done: bool,
}

impl Session {
    /// Start a session positioned in the view named `start_entry`.
    pub fn new(scheme: Arc<Scheme>, start_entry: &str) -> Result<Self, SchemeError> {
        let root = scheme
            .view(start_entry)
            .ok_or_else(|| SchemeError::UnknownView(start_entry.to_owned()))?;
        Ok(Self {
            scheme,
            path: Path::new(root),
            done: false,
        })
    }

    /// Shared scheme.
    #[must_use]
    pub fn scheme(&self) -> &Arc<Scheme> {
        &self.scheme
    }

    /// Current view path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutable view path for navigation.
    pub fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }

    /// Whether the session asked to terminate.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Request session termination.
    pub fn set_done(&mut self) {
        self.done = true;
    }

    /// Parse `line` for `purpose` across every path level.
    #[must_use]
    pub fn parse_line(&self, line: &str, purpose: Purpose) -> PargV {
        let argv = Argv::parse(line);
        let mut pargv = PargV::new(purpose, argv.is_continuable(), line);
        let mut cursor = argv.cursor();
        let mut status = ParseStatus::None;
        let mut level = None;

        for (index, path_level) in self.path.levels().iter().enumerate().rev() {
            status = parse_entry(&self.scheme, path_level.entry(), &mut cursor, &mut pargv);
            if status != ParseStatus::NotFound || !pargv.pargs().is_empty() {
                level = Some(index);
                break;
            }
        }

        let status = normalize(status, purpose, cursor.is_end());
        pargv.finish(status, level, cursor.current());
        debug!(
            "parse {:?} for {:?}: {} at level {:?}",
            line, purpose, status, level
        );
        pargv
    }

    /// Parse `line` and build the chain to execute.
    pub fn parse_for_exec(&self, line: &str) -> Result<ExecChain, ParseError> {
        let pargv = self.parse_line(line, Purpose::Exec);
        if pargv.status() != ParseStatus::Ok {
            return Err(ParseError::from_pargv(&pargv));
        }
        let Some(command) = pargv.command() else {
            return Err(ParseError::Incomplete);
        };
        Ok(ExecChain::new(command, pargv.line().to_owned(), pargv.into_pargs()))
    }

    /// Parse `line` collecting completion candidates.
    #[must_use]
    pub fn parse_for_completion(&self, line: &str) -> PargV {
        self.parse_line(line, Purpose::Completion)
    }

    /// Parse `line` collecting help candidates.
    #[must_use]
    pub fn parse_for_help(&self, line: &str) -> PargV {
        self.parse_line(line, Purpose::Help)
    }
}

fn normalize(status: ParseStatus, purpose: Purpose, at_end: bool) -> ParseStatus {
    match purpose {
        Purpose::Exec => match status {
            ParseStatus::InProgress if at_end => ParseStatus::Ok,
            ParseStatus::InProgress | ParseStatus::NotFound | ParseStatus::Incompleted => {
                ParseStatus::Illegal
            }
            ParseStatus::None => ParseStatus::Error,
            other => other,
        },
        Purpose::Completion | Purpose::Help => match status {
            ParseStatus::InProgress | ParseStatus::Ok => ParseStatus::Incompleted,
            ParseStatus::Illegal => ParseStatus::NotFound,
            ParseStatus::None => ParseStatus::Error,
            other => other,
        },
    }
}
