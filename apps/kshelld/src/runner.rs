// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Builtin action symbols: nop, view navigation and shell scripts.
// Author: Lukas Bower

//! Builtin action symbols.
//!
//! | Symbol | Effect |
//! |---|---|
//! | `nop` | Finishes with exit code 0. |
//! | `nav` | Runs navigation lines from the script: `push <view>`, `pop`, `top`, `replace <view>`, `exit`. |
//! | `script`, `sh` | Spawns `sh -c <script>` and finishes when the child exits. |

use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use kshell_core::{
    ActionError, ActionRunner, ExecChain, PendingAction, RunOutcome, Scheme, Session,
};
use log::{debug, warn};

/// Environment variable carrying the executed line to script actions.
pub const LINE_ENV: &str = "KSHELL_LINE";

/// Runner for the builtin action symbols.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRunner;

impl BuiltinRunner {
    /// New runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ActionRunner for BuiltinRunner {
    fn run(&mut self, chain: &ExecChain, session: &mut Session) -> Result<RunOutcome, ActionError> {
        let scheme = Arc::clone(session.scheme());
        let entry = scheme
            .entry(chain.command())
            .ok_or(ActionError::MissingEntry(chain.command()))?;
        let mut code = 0;
        for action in entry.actions() {
            let script = action.script.as_deref().unwrap_or("");
            match action.sym.as_str() {
                "nop" => code = 0,
                "nav" => code = navigate(&scheme, session, script)?,
                "script" | "sh" => {
                    let child = ScriptAction::spawn(script, chain.line())?;
                    return Ok(RunOutcome::Pending(Box::new(child)));
                }
                other => return Err(ActionError::UnknownSym(other.to_owned())),
            }
        }
        Ok(RunOutcome::Done(code))
    }
}

fn navigate(scheme: &Scheme, session: &mut Session, script: &str) -> Result<i32, ActionError> {
    for line in script.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let mut words = line.split_whitespace();
        let op = words.next().unwrap_or_default();
        let arg = words.next();
        match (op, arg) {
            ("push", Some(name)) => {
                let view = find_view(scheme, name)?;
                session.path_mut().push(view);
            }
            ("replace", Some(name)) => {
                let view = find_view(scheme, name)?;
                session.path_mut().replace(view);
            }
            ("pop", None) => {
                if session.path_mut().pop().is_none() {
                    session.set_done();
                }
            }
            ("top", None) => session.path_mut().top(),
            ("exit", None) => session.set_done(),
            _ => {
                return Err(ActionError::Failed {
                    sym: "nav".to_owned(),
                    message: format!("unsupported navigation \"{line}\""),
                })
            }
        }
        debug!("nav {line}: depth {}", session.path().len());
    }
    Ok(0)
}

fn find_view(scheme: &Scheme, name: &str) -> Result<kshell_core::EntryId, ActionError> {
    scheme.view(name).ok_or_else(|| ActionError::Failed {
        sym: "nav".to_owned(),
        message: format!("unknown view \"{name}\""),
    })
}

/// Child process started by a `script` action.
#[derive(Debug)]
pub struct ScriptAction {
    child: Child,
    finished: bool,
}

impl ScriptAction {
    /// Spawn `sh -c script` with the executed line in [`LINE_ENV`].
    pub fn spawn(script: &str, line: &str) -> Result<Self, ActionError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .env(LINE_ENV, line)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!("spawned action process {}", child.id());
        Ok(Self {
            child,
            finished: false,
        })
    }
}

impl PendingAction for ScriptAction {
    fn poll_done(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.finished = true;
                Some(status.code().unwrap_or(-1))
            }
            Ok(None) => None,
            Err(err) => {
                warn!("failed to reap action process {}: {err}", self.child.id());
                self.finished = true;
                Some(-1)
            }
        }
    }
}

impl Drop for ScriptAction {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
