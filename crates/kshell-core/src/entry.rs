// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Schema entry nodes matched by the kshell parse engine.
// Author: Lukas Bower

//! Schema entry nodes matched by the parse engine.

use std::fmt;

use crate::check::ArgCheck;

/// Index of an [`Entry`] inside its owning [`crate::Scheme`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the entry inside the scheme arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Traversal applied to the nested entries of an entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Nested entries are not traversed.
    #[default]
    None,
    /// The entry has no nested grammar.
    Empty,
    /// Exactly one nested entry may match.
    Switch,
    /// Nested entries match in order, honouring repetition bounds.
    Sequence,
}

impl Mode {
    /// Parse a lower-case mode token such as `switch`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "none" => Some(Self::None),
            "empty" => Some(Self::Empty),
            "switch" => Some(Self::Switch),
            "sequence" => Some(Self::Sequence),
            _ => None,
        }
    }

    /// Canonical lower-case token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Empty => "empty",
            Self::Switch => "switch",
            Self::Sequence => "sequence",
        }
    }
}

/// Action bound to an entry, resolved by symbol name at execution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    /// Symbol naming the routine to run.
    pub sym: String,
    /// Optional script text handed to the routine.
    pub script: Option<String>,
}

impl Action {
    /// Build an action without a script body.
    #[must_use]
    pub fn new(sym: impl Into<String>) -> Self {
        Self {
            sym: sym.into(),
            script: None,
        }
    }

    /// Attach a script body to the action.
    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }
}

/// A node of the command scheme.
///
/// Non-container entries consume one token when their argument check
/// accepts it. Containers only group nested entries and never consume
/// input themselves. Nested entries are attached through
/// [`crate::SchemeBuilder::nest`].
#[derive(Clone, Debug)]
pub struct Entry {
    name: String,
    help: Option<String>,
    value: Option<String>,
    mode: Mode,
    min: usize,
    max: usize,
    order: bool,
    container: bool,
    check: ArgCheck,
    actions: Vec<Action>,
    pub(crate) entries: Vec<EntryId>,
}

impl Entry {
    /// Create a non-container entry matching its own name exactly once.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            value: None,
            mode: Mode::None,
            min: 1,
            max: 1,
            order: false,
            container: false,
            check: ArgCheck::default(),
            actions: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Create a container entry with the supplied traversal mode.
    #[must_use]
    pub fn container(name: impl Into<String>, mode: Mode) -> Self {
        Self::new(name).with_container(true).with_mode(mode)
    }

    /// Set the traversal mode.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Mark the entry as a container or a token consumer.
    #[must_use]
    pub fn with_container(mut self, container: bool) -> Self {
        self.container = container;
        self
    }

    /// Set the minimum number of repetitions inside a sequence.
    #[must_use]
    pub fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Set the maximum number of repetitions inside a sequence.
    #[must_use]
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Mark an optional entry as ordered.
    #[must_use]
    pub fn with_order(mut self, order: bool) -> Self {
        self.order = order;
        self
    }

    /// Attach help text.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Override the literal matched instead of the name.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Replace the argument check.
    #[must_use]
    pub fn with_check(mut self, check: ArgCheck) -> Self {
        self.check = check;
        self
    }

    /// Append an action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text, if any.
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Explicit literal value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Literal a token must match: the value when set, otherwise the name.
    #[must_use]
    pub fn literal(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.name)
    }

    /// Traversal mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Minimum repetitions.
    #[must_use]
    pub fn min(&self) -> usize {
        self.min
    }

    /// Maximum repetitions.
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Whether the entry is ordered.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.order
    }

    /// Whether the entry is a container.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.container
    }

    /// Argument check applied to tokens.
    #[must_use]
    pub fn check(&self) -> &ArgCheck {
        &self.check
    }

    /// Bound actions.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether a match on this entry selects a command.
    #[must_use]
    pub fn is_command(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Nested entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }
}
