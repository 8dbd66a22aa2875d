// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Build a kshell scheme from TOML scheme documents.
// Author: Lukas Bower

//! Build a [`Scheme`] from TOML scheme documents.
//!
//! A document lists top-level `[[view]]` tables. Every node carries a
//! `kind` that supplies defaults for its container flag, traversal mode and
//! repetition bounds; each default may be overridden on the node itself.
//!
//! ```toml
//! [[view]]
//! name = "main"
//!
//! [[view.entry]]
//! name = "show"
//! mode = "switch"
//! help = "Show system state"
//!
//! [[view.entry.entry]]
//! name = "version"
//! action = [{ sym = "nop" }]
//! ```
//!
//! A view defined again in a later document is merged: its nested entries
//! are appended to the existing view.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kshell_core::{Action, ArgCheck, Entry, EntryId, Mode, Scheme, SchemeBuilder, SchemeError};
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading scheme documents.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A document is not valid scheme TOML.
    #[error("invalid scheme TOML in {}: {source}", path.display())]
    Toml {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// A node names a ptype that does not exist.
    #[error("{}: entry \"{entry}\" uses unknown ptype \"{ptype}\"", path.display())]
    UnknownPtype {
        /// Offending path.
        path: PathBuf,
        /// Entry carrying the ptype.
        entry: String,
        /// Unrecognised ptype name.
        ptype: String,
    },
    /// A top-level node is not a view.
    #[error("{}: top-level entry \"{name}\" must be a view", path.display())]
    NotAView {
        /// Offending path.
        path: PathBuf,
        /// Node name.
        name: String,
    },
    /// The builder rejected a node.
    #[error("{}: {source}", path.display())]
    Scheme {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: SchemeError,
    },
    /// The assembled scheme is invalid.
    #[error("invalid scheme: {0}")]
    Build(#[from] SchemeError),
    /// No document was found on any path.
    #[error("no scheme documents found")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemeDoc {
    #[serde(default)]
    view: Vec<NodeDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDoc {
    name: String,
    kind: Option<Kind>,
    help: Option<String>,
    value: Option<String>,
    mode: Option<ModeDoc>,
    min: Option<usize>,
    max: Option<usize>,
    order: Option<bool>,
    container: Option<bool>,
    ptype: Option<String>,
    #[serde(default)]
    entry: Vec<NodeDoc>,
    #[serde(default)]
    action: Vec<ActionDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionDoc {
    sym: String,
    script: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Kind {
    View,
    Command,
    Param,
    Switch,
    Sequence,
    Entry,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ModeDoc {
    None,
    Empty,
    Switch,
    Sequence,
}

impl From<ModeDoc> for Mode {
    fn from(mode: ModeDoc) -> Self {
        match mode {
            ModeDoc::None => Mode::None,
            ModeDoc::Empty => Mode::Empty,
            ModeDoc::Switch => Mode::Switch,
            ModeDoc::Sequence => Mode::Sequence,
        }
    }
}

impl Kind {
    /// Container flag and traversal mode implied by the kind.
    fn defaults(self) -> (bool, Mode) {
        match self {
            Self::View | Self::Switch => (true, Mode::Switch),
            Self::Sequence => (true, Mode::Sequence),
            Self::Command | Self::Param => (false, Mode::Sequence),
            Self::Entry => (false, Mode::None),
        }
    }

    /// Kind assumed for nested nodes that do not name one.
    fn nested_default(self) -> Self {
        match self {
            Self::View => Self::Command,
            _ => Self::Param,
        }
    }
}

/// Accumulates scheme documents into one scheme.
#[derive(Debug, Default)]
pub struct SchemeLoader {
    builder: SchemeBuilder,
    documents: usize,
}

impl SchemeLoader {
    /// Empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents loaded so far.
    #[must_use]
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Load every path: files directly, directories by their `*.toml` files
    /// in name order. Missing paths are skipped.
    pub fn load_paths(&mut self, paths: &[PathBuf]) -> Result<(), LoadError> {
        for path in paths {
            if path.is_dir() {
                for file in toml_files(path)? {
                    self.load_file(&file)?;
                }
            } else if path.is_file() {
                self.load_file(path)?;
            } else {
                debug!("scheme path {} does not exist, skipping", path.display());
            }
        }
        Ok(())
    }

    /// Load one document from disk.
    pub fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&text, path)
    }

    /// Load one document; `origin` names it in errors.
    pub fn load_str(&mut self, text: &str, origin: &Path) -> Result<(), LoadError> {
        let doc: SchemeDoc = toml::from_str(text).map_err(|source| LoadError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        for node in &doc.view {
            if node.kind.is_some_and(|kind| kind != Kind::View) {
                return Err(LoadError::NotAView {
                    path: origin.to_path_buf(),
                    name: node.name.clone(),
                });
            }
            match self.builder.view(&node.name) {
                Some(existing) => {
                    debug!("{}: merging view {}", origin.display(), node.name);
                    self.build_children(existing, node, Kind::View, origin)?;
                }
                None => {
                    let id = self.build_node(node, Kind::View, origin)?;
                    self.builder
                        .add_view(id)
                        .map_err(|source| scheme_error(origin, source))?;
                }
            }
        }
        self.documents += 1;
        Ok(())
    }

    /// Freeze the accumulated scheme.
    pub fn finish(self) -> Result<Scheme, LoadError> {
        if self.documents == 0 {
            return Err(LoadError::Empty);
        }
        Ok(self.builder.build()?)
    }

    fn build_node(&mut self, node: &NodeDoc, default: Kind, origin: &Path) -> Result<EntryId, LoadError> {
        let kind = node.kind.unwrap_or(default);
        let (container, mode) = kind.defaults();
        let mut entry = Entry::new(node.name.as_str())
            .with_container(node.container.unwrap_or(container))
            .with_mode(node.mode.map_or(mode, Mode::from))
            .with_min(node.min.unwrap_or(1))
            .with_max(node.max.unwrap_or(1))
            .with_order(node.order.unwrap_or(false));
        if let Some(help) = &node.help {
            entry = entry.with_help(help.as_str());
        }
        if let Some(value) = &node.value {
            entry = entry.with_value(value.as_str());
        }
        if let Some(ptype) = &node.ptype {
            let check = ArgCheck::from_ptype(ptype).ok_or_else(|| LoadError::UnknownPtype {
                path: origin.to_path_buf(),
                entry: node.name.clone(),
                ptype: ptype.clone(),
            })?;
            entry = entry.with_check(check);
        }
        for action in &node.action {
            let mut bound = Action::new(action.sym.as_str());
            if let Some(script) = &action.script {
                bound = bound.with_script(script.as_str());
            }
            entry = entry.with_action(bound);
        }
        let id = self.builder.add(entry);
        self.build_children(id, node, kind, origin)?;
        Ok(id)
    }

    fn build_children(
        &mut self,
        parent: EntryId,
        node: &NodeDoc,
        kind: Kind,
        origin: &Path,
    ) -> Result<(), LoadError> {
        for child in &node.entry {
            let id = self.build_node(child, kind.nested_default(), origin)?;
            self.builder
                .nest(parent, id)
                .map_err(|source| scheme_error(origin, source))?;
        }
        Ok(())
    }
}

fn scheme_error(origin: &Path, source: SchemeError) -> LoadError {
    LoadError::Scheme {
        path: origin.to_path_buf(),
        source,
    }
}

fn toml_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let read_dir = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for dirent in read_dir {
        let dirent = dirent.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dirent.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every scheme document found on `paths`.
pub fn load_scheme(paths: &[PathBuf]) -> Result<Scheme, LoadError> {
    let mut loader = SchemeLoader::new();
    loader.load_paths(paths)?;
    let documents = loader.documents();
    let scheme = loader.finish()?;
    info!(
        "loaded {} scheme documents: {} views, {} entries",
        documents,
        scheme.views().len(),
        scheme.len()
    );
    Ok(scheme)
}
