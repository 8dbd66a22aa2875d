// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: kshelld daemon library: event loop, protocol handler and loaders.
// Author: Lukas Bower
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! kshelld daemon library.
//!
//! The daemon listens on a Unix socket and serves KTP requests against a
//! shared [`kshell_core::Scheme`]. Everything runs on one thread driven by a
//! `poll(2)` readiness loop; each connection owns its own parse session.

pub mod async_io;
pub mod config;
pub mod connection;
pub mod eloop;
pub mod listener;
pub mod runner;
pub mod scheme_file;
mod sys;

pub use async_io::{AsyncIo, Fill, Flush};
pub use config::{ConfigOverrides, DaemonConfig};
pub use connection::{Connection, ConnectionOptions, Identity, SessionState};
pub use eloop::{EventLoop, FdHandler, Flow, Interest, LoopCtl};
pub use listener::Listener;
pub use runner::BuiltinRunner;
pub use scheme_file::{load_scheme, LoadError, SchemeLoader};
