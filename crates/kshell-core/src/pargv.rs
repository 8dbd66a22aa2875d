// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Parse results shared between the engine and its callers.
// Author: Lukas Bower

//! Parse results shared between the engine and its callers.

use std::fmt;

use crate::entry::EntryId;

/// Why a line is being parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    /// Resolve a command to run.
    Exec,
    /// Collect candidates for the next token.
    Completion,
    /// Collect entries to describe.
    Help,
}

impl Purpose {
    /// Whether the engine should collect candidate entries.
    #[must_use]
    pub fn collects_candidates(self) -> bool {
        matches!(self, Self::Completion | Self::Help)
    }
}

/// Outcome of matching input against an entry or a whole line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStatus {
    /// Nothing was attempted.
    None,
    /// The whole line resolved.
    Ok,
    /// Input matched so far and more may follow.
    InProgress,
    /// The entry did not match and consumed nothing.
    NotFound,
    /// Input ran out before a mandatory entry.
    Incompleted,
    /// Input matched partially and then failed.
    Illegal,
    /// Internal failure.
    Error,
}

impl ParseStatus {
    /// Upper-case status label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Ok => "OK",
            Self::InProgress => "INPROGRESS",
            Self::NotFound => "NOTFOUND",
            Self::Incompleted => "INCOMPLETED",
            Self::Illegal => "ILLEGAL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token accepted by an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedArg {
    entry: EntryId,
    value: String,
}

impl ParsedArg {
    /// Pair a matched entry with its token.
    #[must_use]
    pub fn new(entry: EntryId, value: impl Into<String>) -> Self {
        Self {
            entry,
            value: value.into(),
        }
    }

    /// Matched entry.
    #[must_use]
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    /// Token text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Accumulated result of parsing one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PargV {
    pargs: Vec<ParsedArg>,
    status: ParseStatus,
    purpose: Purpose,
    continuable: bool,
    completions: Vec<EntryId>,
    last_arg: Option<String>,
    level: Option<usize>,
    command: Option<EntryId>,
    line: String,
}

impl PargV {
    /// Start an empty result for `line`.
    #[must_use]
    pub fn new(purpose: Purpose, continuable: bool, line: impl Into<String>) -> Self {
        Self {
            pargs: Vec::new(),
            status: ParseStatus::None,
            purpose,
            continuable,
            completions: Vec::new(),
            last_arg: None,
            level: None,
            command: None,
            line: line.into(),
        }
    }

    /// Accepted tokens in match order.
    #[must_use]
    pub fn pargs(&self) -> &[ParsedArg] {
        &self.pargs
    }

    /// Final status.
    #[must_use]
    pub fn status(&self) -> ParseStatus {
        self.status
    }

    /// Parse purpose.
    #[must_use]
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// Whether the input line ended inside its last token.
    #[must_use]
    pub fn is_continuable(&self) -> bool {
        self.continuable
    }

    /// Candidate entries collected for completion or help.
    #[must_use]
    pub fn completions(&self) -> &[EntryId] {
        &self.completions
    }

    /// First token left unconsumed, if any.
    #[must_use]
    pub fn last_arg(&self) -> Option<&str> {
        self.last_arg.as_deref()
    }

    /// Path level (0 is outermost) where resolution stopped.
    #[must_use]
    pub fn level(&self) -> Option<usize> {
        self.level
    }

    /// Deepest matched entry carrying actions.
    #[must_use]
    pub fn command(&self) -> Option<EntryId> {
        self.command
    }

    /// Raw input line.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Whether `entry` already accepted a token.
    #[must_use]
    pub fn contains_entry(&self, entry: EntryId) -> bool {
        self.pargs.iter().any(|parg| parg.entry == entry)
    }

    /// Consume the result, yielding the accepted tokens.
    #[must_use]
    pub fn into_pargs(self) -> Vec<ParsedArg> {
        self.pargs
    }

    pub(crate) fn push(&mut self, parg: ParsedArg) {
        self.pargs.push(parg);
    }

    pub(crate) fn add_completion(&mut self, entry: EntryId) {
        if !self.completions.contains(&entry) {
            self.completions.push(entry);
        }
    }

    pub(crate) fn set_command(&mut self, entry: Option<EntryId>) {
        self.command = entry;
    }

    pub(crate) fn rollback(&mut self, len: usize, command: Option<EntryId>) {
        self.pargs.truncate(len);
        self.command = command;
    }

    pub(crate) fn finish(&mut self, status: ParseStatus, level: Option<usize>, last_arg: Option<&str>) {
        self.status = status;
        self.level = level;
        self.last_arg = last_arg.map(str::to_owned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_are_deduplicated() {
        let mut pargv = PargV::new(Purpose::Completion, true, "s");
        pargv.add_completion(EntryId::new(3));
        pargv.add_completion(EntryId::new(1));
        pargv.add_completion(EntryId::new(3));
        assert_eq!(pargv.completions(), &[EntryId::new(3), EntryId::new(1)]);
    }

    #[test]
    fn rollback_restores_command() {
        let mut pargv = PargV::new(Purpose::Exec, false, "a b");
        pargv.push(ParsedArg::new(EntryId::new(0), "a"));
        pargv.set_command(Some(EntryId::new(0)));
        pargv.push(ParsedArg::new(EntryId::new(1), "b"));
        pargv.set_command(Some(EntryId::new(1)));
        pargv.rollback(1, Some(EntryId::new(0)));
        assert_eq!(pargv.pargs().len(), 1);
        assert!(pargv.contains_entry(EntryId::new(0)));
        assert!(!pargv.contains_entry(EntryId::new(1)));
        assert_eq!(pargv.command(), Some(EntryId::new(0)));
    }

    #[test]
    fn status_labels() {
        assert_eq!(ParseStatus::Incompleted.to_string(), "INCOMPLETED");
        assert!(Purpose::Help.collects_candidates());
        assert!(!Purpose::Exec.collects_candidates());
    }
}
