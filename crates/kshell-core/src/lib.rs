// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command scheme tree, parse engine and session path resolution.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Command scheme tree, recursive parse engine and multi-level path
//! resolution shared by the kshell daemon and host tooling.
//!
//! A [`Scheme`] is an immutable arena of [`Entry`] nodes. A [`Session`]
//! carries a [`Path`] of nested views and resolves raw input lines against
//! it, producing a [`PargV`] for execution, completion or help.

pub mod argv;
pub mod check;
pub mod entry;
pub mod exec;
pub mod pargv;
pub mod parse;
pub mod path;
pub mod scheme;
pub mod session;

pub use argv::{Argv, Cursor};
pub use check::{ArgCheck, ArgValidator};
pub use entry::{Action, Entry, EntryId, Mode};
pub use exec::{ActionError, ActionRunner, ExecChain, PendingAction, RunOutcome};
pub use pargv::{PargV, ParseStatus, ParsedArg, Purpose};
pub use parse::parse_entry;
pub use path::{Level, Path};
pub use scheme::{Scheme, SchemeBuilder, SchemeError};
pub use session::{ParseError, Session};
