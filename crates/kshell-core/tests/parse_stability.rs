// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Randomised checks that parsing is repeatable and purpose-safe.
// Author: Lukas Bower

use std::sync::Arc;

use kshell_core::{Action, Entry, Mode, ParseStatus, Purpose, SchemeBuilder, Session};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WORDS: &[&str] = &[
    "show", "version", "set", "mode", "fast", "slow", "tag", "quit", "\"a b\"", "x",
];

fn session() -> Session {
    let mut b = SchemeBuilder::new();
    let main = b.add(Entry::container("main", Mode::Switch));
    let show = b.add(Entry::new("show").with_mode(Mode::Switch));
    let version = b.add(Entry::new("version").with_action(Action::new("nop")));
    b.nest(show, version).unwrap();

    let set = b.add(Entry::new("set").with_mode(Mode::Sequence).with_action(Action::new("nop")));
    let mode = b.add(Entry::new("mode").with_mode(Mode::Switch));
    let fast = b.add(Entry::new("fast"));
    let slow = b.add(Entry::new("slow"));
    b.nest(mode, fast).unwrap();
    b.nest(mode, slow).unwrap();
    let tags = b.add(Entry::container("tags", Mode::Sequence).with_min(0));
    let tag = b.add(Entry::new("tag").with_min(0).with_max(4));
    b.nest(tags, tag).unwrap();
    b.nest(set, tags).unwrap();
    b.nest(set, mode).unwrap();

    let quit = b.add(Entry::new("quit").with_action(Action::new("nop")));
    for child in [show, set, quit] {
        b.nest(main, child).unwrap();
    }
    b.add_view(main).unwrap();
    Session::new(Arc::new(b.build().unwrap()), "main").unwrap()
}

fn random_line(rng: &mut StdRng) -> String {
    let count = rng.gen_range(0..6);
    let mut line = (0..count)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ");
    if rng.gen_bool(0.3) {
        line.push(' ');
    }
    line
}

#[test]
fn repeated_parses_are_identical() {
    let session = session();
    let mut rng = StdRng::seed_from_u64(0x6b73_6800);
    for _ in 0..500 {
        let line = random_line(&mut rng);
        for purpose in [Purpose::Exec, Purpose::Completion, Purpose::Help] {
            let first = session.parse_line(&line, purpose);
            let second = session.parse_line(&line, purpose);
            assert_eq!(first, second, "line {line:?}");
        }
    }
}

#[test]
fn completion_and_help_never_resolve() {
    let session = session();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let line = random_line(&mut rng);
        for purpose in [Purpose::Completion, Purpose::Help] {
            let pargv = session.parse_line(&line, purpose);
            assert!(
                matches!(
                    pargv.status(),
                    ParseStatus::Incompleted | ParseStatus::NotFound
                ),
                "line {line:?} gave {}",
                pargv.status()
            );
        }
    }
}

#[test]
fn exec_success_consumes_everything() {
    let session = session();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let line = random_line(&mut rng);
        let pargv = session.parse_line(&line, Purpose::Exec);
        assert_ne!(pargv.status(), ParseStatus::InProgress);
        assert_ne!(pargv.status(), ParseStatus::NotFound);
        if pargv.status() == ParseStatus::Ok {
            assert_eq!(pargv.last_arg(), None, "line {line:?}");
            assert_eq!(pargv.pargs().len(), kshell_core::Argv::parse(&line).len());
        }
    }
}
