// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Recursive matcher walking the scheme tree against tokens.
// Author: Lukas Bower

//! Recursive matcher walking the scheme tree against input tokens.
//!
//! Every nested attempt runs on a copy of the cursor. A `NotFound` attempt
//! discards the copy and any parsed arguments it pushed; any other outcome
//! commits both. Completion candidates are never rolled back.

use log::trace;

use crate::argv::Cursor;
use crate::entry::{Entry, EntryId, Mode};
use crate::pargv::{PargV, ParseStatus, ParsedArg};
use crate::scheme::Scheme;

/// Match `id` against the tokens under `cursor`, accumulating into `pargv`.
///
/// The cursor is advanced past every token the entry and its nested
/// entries accept.
pub fn parse_entry(
    scheme: &Scheme,
    id: EntryId,
    cursor: &mut Cursor<'_>,
    pargv: &mut PargV,
) -> ParseStatus {
    let Some(entry) = scheme.entry(id) else {
        return ParseStatus::Error;
    };

    if !entry.is_container() {
        if let Some(status) = match_self(entry, id, cursor, pargv) {
            return status;
        }
    }

    if entry.entries().is_empty() {
        return ParseStatus::InProgress;
    }

    let saved = *cursor;
    let status = match entry.mode() {
        Mode::None | Mode::Empty => return ParseStatus::InProgress,
        Mode::Switch => parse_switch(scheme, entry, cursor, pargv),
        Mode::Sequence => parse_sequence(scheme, entry, cursor, pargv),
    };

    if status == ParseStatus::NotFound && (*cursor != saved || !entry.is_container()) {
        trace!("{}: partial match turns illegal", entry.name());
        return ParseStatus::Illegal;
    }
    status
}

/// Match the entry's own token. Returns a status when matching must stop.
fn match_self(
    entry: &Entry,
    id: EntryId,
    cursor: &mut Cursor<'_>,
    pargv: &mut PargV,
) -> Option<ParseStatus> {
    if pargv.purpose().collects_candidates() {
        if cursor.is_end() {
            if !pargv.is_continuable() {
                pargv.add_completion(id);
            }
            return Some(ParseStatus::Incompleted);
        }
        if cursor.is_last() && pargv.is_continuable() {
            pargv.add_completion(id);
            return Some(ParseStatus::NotFound);
        }
    }

    let Some(arg) = cursor.current() else {
        return Some(ParseStatus::Incompleted);
    };
    if !entry.check().validate(entry, arg) {
        return Some(ParseStatus::NotFound);
    }

    trace!("{} accepts {arg:?}", entry.name());
    pargv.push(ParsedArg::new(id, arg));
    if entry.is_command() {
        pargv.set_command(Some(id));
    }
    cursor.advance();
    None
}

/// Run one nested attempt on a copy of the cursor.
fn attempt(scheme: &Scheme, id: EntryId, cursor: &mut Cursor<'_>, pargv: &mut PargV) -> ParseStatus {
    let mut trial = *cursor;
    let mark = pargv.pargs().len();
    let command = pargv.command();
    let status = parse_entry(scheme, id, &mut trial, pargv);
    if status == ParseStatus::NotFound {
        pargv.rollback(mark, command);
    } else {
        *cursor = trial;
    }
    status
}

fn parse_switch(
    scheme: &Scheme,
    entry: &Entry,
    cursor: &mut Cursor<'_>,
    pargv: &mut PargV,
) -> ParseStatus {
    let mut status = ParseStatus::NotFound;
    for &nested in entry.entries() {
        let before = *cursor;
        status = attempt(scheme, nested, cursor, pargv);
        if *cursor != before {
            break;
        }
        if !matches!(status, ParseStatus::NotFound | ParseStatus::Incompleted) {
            break;
        }
    }
    status
}

fn parse_sequence(
    scheme: &Scheme,
    entry: &Entry,
    cursor: &mut Cursor<'_>,
    pargv: &mut PargV,
) -> ParseStatus {
    let nested_entries = entry.entries();
    let mut status = ParseStatus::NotFound;
    let mut next = 0;
    let mut resume = 0;

    while let Some(&nested_id) = nested_entries.get(next) {
        next += 1;
        if pargv.contains_entry(nested_id) {
            continue;
        }
        let Some(nested) = scheme.entry(nested_id) else {
            return ParseStatus::Error;
        };

        let start = *cursor;
        let mut nested_status = ParseStatus::NotFound;
        let mut matched = 0;
        while matched < nested.max() {
            let before = *cursor;
            nested_status = attempt(scheme, nested_id, cursor, pargv);
            if nested_status != ParseStatus::InProgress {
                break;
            }
            if *cursor == before {
                // Repeating a match that consumed nothing yields the same result.
                matched = nested.max();
                break;
            }
            matched += 1;
        }

        if matches!(
            nested_status,
            ParseStatus::Error | ParseStatus::Illegal | ParseStatus::None
        ) {
            status = nested_status;
            break;
        }
        if matched < nested.min() {
            status = if nested_status == ParseStatus::InProgress {
                ParseStatus::NotFound
            } else {
                nested_status
            };
            break;
        }

        status = ParseStatus::InProgress;
        if nested.min() > 0 || nested.is_ordered() {
            resume = next;
        }
        if nested.min() == 0 && matched > 0 && *cursor != start {
            next = resume;
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv::Argv;
    use crate::pargv::Purpose;
    use crate::scheme::SchemeBuilder;

    fn run(scheme: &Scheme, root: EntryId, line: &str, purpose: Purpose) -> (ParseStatus, PargV, usize) {
        let argv = Argv::parse(line);
        let mut pargv = PargV::new(purpose, argv.is_continuable(), line);
        let mut cursor = argv.cursor();
        let status = parse_entry(scheme, root, &mut cursor, &mut pargv);
        (status, pargv, cursor.position())
    }

    #[test]
    fn container_without_match_is_not_found() {
        let mut builder = SchemeBuilder::new();
        let root = builder.add(Entry::container("root", Mode::Sequence));
        let a = builder.add(Entry::new("a"));
        builder.nest(root, a).unwrap();
        let scheme = builder.build().unwrap();

        let (status, pargv, pos) = run(&scheme, root, "b", Purpose::Exec);
        assert_eq!(status, ParseStatus::NotFound);
        assert!(pargv.pargs().is_empty());
        assert_eq!(pos, 0);

        let (status, _, _) = run(&scheme, root, "", Purpose::Exec);
        assert_eq!(status, ParseStatus::Incompleted);
    }

    #[test]
    fn non_container_partial_match_is_illegal() {
        let mut builder = SchemeBuilder::new();
        let root = builder.add(Entry::container("root", Mode::Switch));
        let show = builder.add(Entry::new("show").with_mode(Mode::Sequence));
        let version = builder.add(Entry::new("version"));
        builder.nest(root, show).unwrap();
        builder.nest(show, version).unwrap();
        let scheme = builder.build().unwrap();

        let (status, pargv, pos) = run(&scheme, root, "show bogus", Purpose::Exec);
        assert_eq!(status, ParseStatus::Illegal);
        assert_eq!(pargv.pargs().len(), 1);
        assert_eq!(pos, 1);
    }

    #[test]
    fn empty_mode_ignores_nested_entries() {
        let mut builder = SchemeBuilder::new();
        let root = builder.add(Entry::new("root").with_mode(Mode::Empty));
        let child = builder.add(Entry::new("child"));
        builder.nest(root, child).unwrap();
        let scheme = builder.build().unwrap();

        let (status, pargv, pos) = run(&scheme, root, "root child", Purpose::Exec);
        assert_eq!(status, ParseStatus::InProgress);
        assert_eq!(pargv.pargs().len(), 1);
        assert_eq!(pos, 1);
    }

    #[test]
    fn optional_empty_container_does_not_spin() {
        let mut builder = SchemeBuilder::new();
        let cmd = builder.add(Entry::new("cmd").with_mode(Mode::Sequence));
        let group = builder.add(
            Entry::container("group", Mode::Sequence)
                .with_min(0)
                .with_max(5),
        );
        let flag = builder.add(Entry::new("flag").with_min(0));
        builder.nest(cmd, group).unwrap();
        builder.nest(group, flag).unwrap();
        let scheme = builder.build().unwrap();

        let (status, _, pos) = run(&scheme, cmd, "cmd", Purpose::Exec);
        assert_eq!(status, ParseStatus::InProgress);
        assert_eq!(pos, 1);
    }
}
