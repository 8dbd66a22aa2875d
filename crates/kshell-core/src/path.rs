// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Stack of nested views a session is positioned in.
// Author: Lukas Bower

//! Stack of nested views a session is positioned in.

use crate::entry::EntryId;

/// One position on the view stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level {
    entry: EntryId,
}

impl Level {
    /// Level rooted at `entry`.
    #[must_use]
    pub fn new(entry: EntryId) -> Self {
        Self { entry }
    }

    /// Entry parsed at this level.
    #[must_use]
    pub fn entry(&self) -> EntryId {
        self.entry
    }
}

/// Non-empty stack of levels; index 0 is the outermost.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    levels: Vec<Level>,
}

impl Path {
    /// Path holding only `root`.
    #[must_use]
    pub fn new(root: EntryId) -> Self {
        Self {
            levels: vec![Level::new(root)],
        }
    }

    /// Levels from outermost to innermost.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; a path keeps its root level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Innermost level.
    #[must_use]
    pub fn current(&self) -> Level {
        self.levels[self.levels.len() - 1]
    }

    /// Enter a nested view.
    pub fn push(&mut self, entry: EntryId) {
        self.levels.push(Level::new(entry));
    }

    /// Leave the innermost view. The root level is never removed.
    pub fn pop(&mut self) -> Option<Level> {
        if self.levels.len() > 1 {
            self.levels.pop()
        } else {
            None
        }
    }

    /// Drop every level above the root.
    pub fn top(&mut self) {
        self.levels.truncate(1);
    }

    /// Swap the innermost view for `entry`.
    pub fn replace(&mut self, entry: EntryId) {
        let last = self.levels.len() - 1;
        self.levels[last] = Level::new(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_level_survives_pop() {
        let mut path = Path::new(EntryId::new(0));
        path.push(EntryId::new(1));
        path.push(EntryId::new(2));
        assert_eq!(path.current().entry(), EntryId::new(2));
        assert_eq!(path.pop(), Some(Level::new(EntryId::new(2))));
        assert_eq!(path.pop(), Some(Level::new(EntryId::new(1))));
        assert_eq!(path.pop(), None);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn top_and_replace() {
        let mut path = Path::new(EntryId::new(0));
        path.push(EntryId::new(1));
        path.replace(EntryId::new(5));
        assert_eq!(path.current().entry(), EntryId::new(5));
        path.top();
        assert_eq!(path.levels(), &[Level::new(EntryId::new(0))]);
        path.replace(EntryId::new(9));
        assert_eq!(path.current().entry(), EntryId::new(9));
    }
}
