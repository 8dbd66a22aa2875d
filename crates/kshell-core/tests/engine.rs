// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise line resolution against a router-style scheme.
// Author: Lukas Bower

use std::sync::Arc;

use kshell_core::{
    Action, Entry, EntryId, Mode, ParseError, ParseStatus, ParsedArg, Purpose, Scheme,
    SchemeBuilder, Session,
};

fn nop() -> Action {
    Action::new("nop")
}

fn router_scheme() -> Arc<Scheme> {
    let mut b = SchemeBuilder::new();
    let main = b.add(Entry::container("main", Mode::Switch));

    let show = b.add(
        Entry::new("show")
            .with_mode(Mode::Switch)
            .with_help("Show system state"),
    );
    let version = b.add(Entry::new("version").with_action(nop()));
    let interfaces = b.add(Entry::new("interfaces").with_action(nop()));
    b.nest(show, version).unwrap();
    b.nest(show, interfaces).unwrap();

    let shutdown = b.add(Entry::new("shutdown").with_action(nop()));

    let ping = b.add(Entry::new("ping").with_mode(Mode::Sequence).with_action(nop()));
    for entry in [
        Entry::new("verbose").with_min(0),
        Entry::new("quiet").with_min(0),
        Entry::new("host"),
        Entry::new("size").with_min(0).with_order(true),
        Entry::new("count").with_min(0),
    ] {
        let id = b.add(entry);
        b.nest(ping, id).unwrap();
    }

    let label = b.add(Entry::new("label").with_mode(Mode::Sequence).with_action(nop()));
    let tag = b.add(Entry::new("tag").with_min(0).with_max(3));
    b.nest(label, tag).unwrap();

    let go_a = b.add(Entry::new("go-a").with_value("go").with_mode(Mode::Sequence));
    let now = b.add(Entry::new("now").with_action(nop()));
    b.nest(go_a, now).unwrap();
    let go_b = b.add(Entry::new("go-b").with_value("go").with_action(nop()));

    let configure = b.add(
        Entry::new("configure").with_action(Action::new("nav").with_script("push config")),
    );

    for child in [show, shutdown, ping, label, go_a, go_b, configure] {
        b.nest(main, child).unwrap();
    }
    b.add_view(main).unwrap();
    Arc::new(b.build().unwrap())
}

fn session() -> Session {
    Session::new(router_scheme(), "main").unwrap()
}

fn names<'a>(scheme: &'a Scheme, pargs: &[ParsedArg]) -> Vec<&'a str> {
    pargs
        .iter()
        .map(|parg| scheme.entry(parg.entry()).unwrap().name())
        .collect()
}

fn candidate_names<'a>(scheme: &'a Scheme, ids: &[EntryId]) -> Vec<&'a str> {
    ids.iter().map(|id| scheme.entry(*id).unwrap().name()).collect()
}

fn exec_names(session: &Session, line: &str) -> Result<Vec<String>, ParseError> {
    let chain = session.parse_for_exec(line)?;
    Ok(names(session.scheme(), chain.pargs())
        .into_iter()
        .map(str::to_owned)
        .collect())
}

fn illegal(token: &str) -> ParseError {
    ParseError::Illegal {
        token: token.to_owned(),
    }
}

const ALL_MAIN: [&str; 7] = ["show", "shutdown", "ping", "label", "go-a", "go-b", "configure"];

#[test]
fn full_command_resolves() {
    let session = session();
    let chain = session.parse_for_exec("show version").unwrap();
    let scheme = session.scheme();
    assert_eq!(scheme.entry(chain.command()).unwrap().name(), "version");
    assert_eq!(names(scheme, chain.pargs()), ["show", "version"]);
    assert_eq!(chain.pargs()[1].value(), "version");

    let pargv = session.parse_line("show version", Purpose::Exec);
    assert_eq!(pargv.status(), ParseStatus::Ok);
    assert_eq!(pargv.level(), Some(0));
    assert_eq!(pargv.last_arg(), None);
}

#[test]
fn keywords_ignore_case() {
    let session = session();
    assert_eq!(exec_names(&session, "SHOW Version").unwrap(), ["show", "version"]);
}

#[test]
fn missing_keyword_is_incomplete() {
    let session = session();
    assert_eq!(session.parse_for_exec("show"), Err(ParseError::Incomplete));
    let pargv = session.parse_line("show", Purpose::Exec);
    assert_eq!(pargv.status(), ParseStatus::Illegal);
    assert_eq!(names(session.scheme(), pargv.pargs()), ["show"]);
}

#[test]
fn wrong_keyword_after_match_is_illegal() {
    let session = session();
    assert_eq!(session.parse_for_exec("show bogus"), Err(illegal("bogus")));
    assert_eq!(
        session.parse_for_exec("show version extra"),
        Err(illegal("extra"))
    );
}

#[test]
fn unknown_command_is_illegal_without_level() {
    let session = session();
    let pargv = session.parse_line("bogus", Purpose::Exec);
    assert_eq!(pargv.status(), ParseStatus::Illegal);
    assert_eq!(pargv.level(), None);
    assert_eq!(pargv.last_arg(), Some("bogus"));
    assert!(pargv.pargs().is_empty());
    assert_eq!(session.parse_for_exec("bogus"), Err(illegal("bogus")));
}

#[test]
fn switch_commits_to_first_consuming_alternative() {
    let session = session();
    // "go" is accepted by go-a first, so go-b is never tried.
    assert_eq!(session.parse_for_exec("go"), Err(ParseError::Incomplete));
    let pargv = session.parse_line("go", Purpose::Exec);
    assert_eq!(names(session.scheme(), pargv.pargs()), ["go-a"]);
    assert_eq!(exec_names(&session, "go now").unwrap(), ["go-a", "now"]);
}

#[test]
fn switch_stops_on_non_consuming_progress() {
    let mut b = SchemeBuilder::new();
    let root = b.add(Entry::container("root", Mode::Switch));
    let blank = b.add(Entry::container("blank", Mode::Switch));
    let go = b.add(Entry::new("go").with_action(nop()));
    b.nest(root, blank).unwrap();
    b.nest(root, go).unwrap();
    b.add_view(root).unwrap();
    let session = Session::new(Arc::new(b.build().unwrap()), "root").unwrap();

    let pargv = session.parse_line("go", Purpose::Exec);
    assert_eq!(pargv.status(), ParseStatus::Illegal);
    assert!(pargv.pargs().is_empty());
    assert_eq!(pargv.last_arg(), Some("go"));
}

#[test]
fn optional_children_match_in_any_order_before_mandatory() {
    let session = session();
    assert_eq!(
        exec_names(&session, "ping quiet verbose host").unwrap(),
        ["ping", "quiet", "verbose", "host"]
    );
    assert_eq!(
        exec_names(&session, "ping verbose quiet host").unwrap(),
        ["ping", "verbose", "quiet", "host"]
    );
}

#[test]
fn optional_children_before_mandatory_close_once_it_matches() {
    let session = session();
    assert_eq!(session.parse_for_exec("ping host verbose"), Err(illegal("verbose")));
    assert_eq!(session.parse_for_exec("ping host host"), Err(illegal("host")));
}

#[test]
fn ordered_optional_closes_later_choices() {
    let session = session();
    assert_eq!(
        exec_names(&session, "ping host size count").unwrap(),
        ["ping", "host", "size", "count"]
    );
    assert_eq!(session.parse_for_exec("ping host count size"), Err(illegal("size")));
}

#[test]
fn missing_mandatory_child_never_resolves() {
    let session = session();
    assert_eq!(session.parse_for_exec("ping verbose"), Err(ParseError::Incomplete));
    assert_eq!(session.parse_for_exec("ping verbose bogus"), Err(illegal("bogus")));
    let chain = session.parse_for_exec("ping host").unwrap();
    assert_eq!(session.scheme().entry(chain.command()).unwrap().name(), "ping");
}

#[test]
fn repetition_honours_max() {
    let session = session();
    assert_eq!(
        exec_names(&session, "label tag tag tag").unwrap(),
        ["label", "tag", "tag", "tag"]
    );
    assert_eq!(exec_names(&session, "label").unwrap(), ["label"]);
    assert_eq!(session.parse_for_exec("label tag tag tag tag"), Err(illegal("tag")));
}

#[test]
fn completion_of_partial_first_token_lists_siblings() {
    let session = session();
    let pargv = session.parse_for_completion("sh");
    assert_eq!(pargv.status(), ParseStatus::NotFound);
    assert_eq!(pargv.last_arg(), Some("sh"));
    assert_eq!(candidate_names(session.scheme(), pargv.completions()), ALL_MAIN);
}

#[test]
fn completion_of_empty_line_lists_top_level() {
    let session = session();
    let pargv = session.parse_for_completion("");
    assert_eq!(pargv.status(), ParseStatus::Incompleted);
    assert_eq!(pargv.last_arg(), None);
    assert_eq!(candidate_names(session.scheme(), pargv.completions()), ALL_MAIN);
}

#[test]
fn completion_after_keyword_lists_nested_entries() {
    let session = session();
    let pargv = session.parse_for_completion("show ");
    assert_eq!(pargv.status(), ParseStatus::Incompleted);
    assert_eq!(
        candidate_names(session.scheme(), pargv.completions()),
        ["version", "interfaces"]
    );

    let pargv = session.parse_for_completion("show ver");
    assert_eq!(pargv.status(), ParseStatus::NotFound);
    assert_eq!(pargv.last_arg(), Some("ver"));
    assert_eq!(
        candidate_names(session.scheme(), pargv.completions()),
        ["version", "interfaces"]
    );
}

#[test]
fn completion_of_finished_command_is_empty() {
    let session = session();
    let pargv = session.parse_for_completion("show version ");
    assert_eq!(pargv.status(), ParseStatus::Incompleted);
    assert!(pargv.completions().is_empty());
}

#[test]
fn help_collects_like_completion() {
    let session = session();
    let pargv = session.parse_for_help("show ");
    assert_eq!(pargv.purpose(), Purpose::Help);
    assert_eq!(pargv.status(), ParseStatus::Incompleted);
    let scheme = session.scheme();
    let show = scheme.entry(pargv.pargs()[0].entry()).unwrap();
    assert_eq!(show.help(), Some("Show system state"));
    assert_eq!(pargv.completions().len(), 2);
}

#[test]
fn unknown_start_view_is_rejected() {
    let err = Session::new(router_scheme(), "nowhere").unwrap_err();
    assert_eq!(err.to_string(), "view \"nowhere\" is not defined");
}
