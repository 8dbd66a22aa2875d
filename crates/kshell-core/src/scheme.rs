// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Arena-backed command scheme and its builder.
// Author: Lukas Bower

//! Arena-backed command scheme and its builder.
//!
//! Entries are owned by the scheme and referenced by [`EntryId`]. An entry
//! may be nested under several parents, but the nesting graph must stay
//! acyclic; [`SchemeBuilder::build`] rejects cycles.

use log::debug;
use thiserror::Error;

use crate::entry::{Entry, EntryId};

/// Errors raised while assembling a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemeError {
    /// An identifier does not refer to an entry of this scheme.
    #[error("entry {0} does not belong to this scheme")]
    UnknownEntry(EntryId),
    /// A view with the same name was already registered.
    #[error("view \"{0}\" is already defined")]
    DuplicateView(String),
    /// A named view could not be found.
    #[error("view \"{0}\" is not defined")]
    UnknownView(String),
    /// The nesting graph loops back onto the named entry.
    #[error("entry \"{0}\" is nested inside itself")]
    Cycle(String),
}

/// Mutable builder producing an immutable [`Scheme`].
#[derive(Debug, Default)]
pub struct SchemeBuilder {
    entries: Vec<Entry>,
    views: Vec<EntryId>,
}

impl SchemeBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the arena and return its identifier.
    pub fn add(&mut self, entry: Entry) -> EntryId {
        let id = EntryId::new(self.entries.len());
        self.entries.push(entry);
        id
    }

    /// Append `child` to the nested entries of `parent`.
    pub fn nest(&mut self, parent: EntryId, child: EntryId) -> Result<(), SchemeError> {
        if child.index() >= self.entries.len() {
            return Err(SchemeError::UnknownEntry(child));
        }
        let parent_entry = self
            .entries
            .get_mut(parent.index())
            .ok_or(SchemeError::UnknownEntry(parent))?;
        parent_entry.entries.push(child);
        Ok(())
    }

    /// Register an entry as a named top-level view.
    pub fn add_view(&mut self, id: EntryId) -> Result<(), SchemeError> {
        let name = self
            .entries
            .get(id.index())
            .ok_or(SchemeError::UnknownEntry(id))?
            .name()
            .to_owned();
        if self.view(&name).is_some() {
            return Err(SchemeError::DuplicateView(name));
        }
        self.views.push(id);
        Ok(())
    }

    /// Look up a registered view by name.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<EntryId> {
        find_view(&self.entries, &self.views, name)
    }

    /// Borrow an entry that was already added.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.index())
    }

    /// Validate the nesting graph and freeze the scheme.
    pub fn build(self) -> Result<Scheme, SchemeError> {
        let mut marks = vec![Mark::Unvisited; self.entries.len()];
        for index in 0..self.entries.len() {
            visit(&self.entries, EntryId::new(index), &mut marks)?;
        }
        debug!(
            "scheme built: {} entries, {} views",
            self.entries.len(),
            self.views.len()
        );
        Ok(Scheme {
            entries: self.entries,
            views: self.views,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

fn visit(entries: &[Entry], id: EntryId, marks: &mut [Mark]) -> Result<(), SchemeError> {
    match marks[id.index()] {
        Mark::Done => return Ok(()),
        Mark::Active => {
            return Err(SchemeError::Cycle(entries[id.index()].name().to_owned()));
        }
        Mark::Unvisited => {}
    }
    marks[id.index()] = Mark::Active;
    for &child in entries[id.index()].entries() {
        visit(entries, child, marks)?;
    }
    marks[id.index()] = Mark::Done;
    Ok(())
}

fn find_view(entries: &[Entry], views: &[EntryId], name: &str) -> Option<EntryId> {
    views
        .iter()
        .copied()
        .find(|id| entries[id.index()].name() == name)
}

/// Immutable command scheme shared by every session.
#[derive(Debug)]
pub struct Scheme {
    entries: Vec<Entry>,
    views: Vec<EntryId>,
}

impl Scheme {
    /// Borrow an entry.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.index())
    }

    /// Look up a top-level view by name.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<EntryId> {
        find_view(&self.entries, &self.views, name)
    }

    /// Top-level views in registration order.
    #[must_use]
    pub fn views(&self) -> &[EntryId] {
        &self.views
    }

    /// Number of entries in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scheme holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
