// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Token acceptance checks applied by scheme entries.
// Author: Lukas Bower

//! Token acceptance checks applied by scheme entries.

use std::fmt;
use std::sync::Arc;

use crate::entry::Entry;

/// Pluggable token validator for entries whose argument is not a literal.
pub trait ArgValidator: fmt::Debug + Send + Sync {
    /// Return `true` when `arg` is acceptable for `entry`.
    fn validate(&self, entry: &Entry, arg: &str) -> bool;
}

/// Argument check bound to an entry.
#[derive(Clone, Debug, Default)]
pub enum ArgCheck {
    /// Token must equal the entry literal, ignoring ASCII case.
    #[default]
    Command,
    /// Token must equal the entry literal exactly.
    CommandCase,
    /// Token is judged by an external validator.
    Custom(Arc<dyn ArgValidator>),
}

impl ArgCheck {
    /// Resolve a named ptype such as `COMMAND` or `COMMAND_CASE`.
    #[must_use]
    pub fn from_ptype(name: &str) -> Option<Self> {
        match name {
            "COMMAND" => Some(Self::Command),
            "COMMAND_CASE" => Some(Self::CommandCase),
            _ => None,
        }
    }

    /// Apply the check to a token.
    #[must_use]
    pub fn validate(&self, entry: &Entry, arg: &str) -> bool {
        match self {
            Self::Command => entry.literal().eq_ignore_ascii_case(arg),
            Self::CommandCase => entry.literal() == arg,
            Self::Custom(validator) => validator.validate(entry, arg),
        }
    }
}
