//! Text rendering of errors and error chains.

use std::fmt;

use stackerr::{adapt, format_with, FormatOptions, ForeignError, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("EOF")]
struct Eof;

#[derive(Error, Debug)]
#[error("query failed")]
struct QueryFailed {
    #[source]
    source: Eof,
}

/// Renders itself when asked to, and exposes nothing else.
#[derive(Error, Debug)]
#[error("remote failure")]
struct Remote {
    #[source]
    source: Option<Eof>,
}

impl ForeignError for Remote {
    fn format_rich(&self, w: &mut dyn fmt::Write, _opts: &FormatOptions) -> Option<fmt::Result> {
        Some(w.write_str("remote failure (code 503)"))
    }
}

#[derive(Debug)]
struct Legacy {
    trace: backtrace::Backtrace,
}

impl fmt::Display for Legacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("legacy failure")
    }
}

impl std::error::Error for Legacy {}

impl ForeignError for Legacy {
    fn backtrace(&self) -> Option<&backtrace::Backtrace> {
        Some(&self.trace)
    }
}

fn joined() -> stackerr::Error {
    stackerr::join([Some(stackerr::new("error1")), Some(stackerr::new("error2"))]).expect("joined")
}

const STACK_HEADER: &str = "stack trace (most recent call first):";

// ============================================================
// Verbs
// ============================================================

#[test]
fn empty_message() {
    let err = stackerr::new("");
    assert_eq!(format_with(&err, "%s"), "");
    assert_eq!(err.to_string(), "");

    assert!(format!("{:+}", err).starts_with(STACK_HEADER));

    let rich = format_with(&err, "% +v");
    assert!(rich.starts_with(STACK_HEADER), "{}", rich);
    let frame_lines = rich.lines().skip(1).collect::<Vec<_>>();
    assert!(frame_lines.len() >= 2);
    assert!(frame_lines[1].starts_with('\t'));
}

#[test]
fn plain_verbs() {
    let err = stackerr::wrap(stackerr::new("inner"), "say \"hi\"");
    assert_eq!(format_with(&err, "%s"), "say \"hi\"");
    assert_eq!(format_with(&err, "%v"), "say \"hi\"");
    assert_eq!(format_with(&err, "%q"), "\"say \\\"hi\\\"\"");
    assert_eq!(format!("{}", err), "say \"hi\"");
}

#[test]
fn bad_verb_and_precision() {
    let err = stackerr::new("boom");
    let bad = format_with(&err, "%x");
    assert!(bad.starts_with("%!x("), "{}", bad);
    assert!(bad.ends_with("Error=boom)"), "{}", bad);

    assert_eq!(format_with(&err, "%.4v"), "%!v(BADPREC)");
    assert_eq!(format!("{:.9}", err), "%!v(BADPREC)");
    assert_eq!(format_with(&err, "%+"), "%!(NOVERB)");
}

// ============================================================
// Joined errors
// ============================================================

#[test]
fn joined_errors_are_indented() {
    let err = joined();
    assert_eq!(err.to_string(), "error1\nerror2");
    assert_eq!(format_with(&err, "%.1v"), "error1\nerror2\n\terror1\n\terror2\n");
    assert_eq!(format_with(&err, "%.0v"), "error1\nerror2\n");
    assert_eq!(
        format_with(&err, "% .1v"),
        "error1\nerror2\nthe above error joins errors:\n\terror1\n\terror2\n"
    );
    assert_eq!(
        format_with(&err, "% -.1v"),
        "error1\nerror2\n\nthe above error joins errors:\n\n\terror1\n\n\terror2\n"
    );
    assert_eq!(
        format_with(&err, "%-.1v"),
        "error1\nerror2\n\n\terror1\n\n\terror2\n"
    );
}

#[test]
fn width_sets_indentation() {
    let err = joined();
    assert_eq!(
        format!("{:4.1}", err),
        "error1\nerror2\nthe above error joins errors:\n    error1\n    error2\n"
    );
    assert_eq!(format_with(&err, "%2.1v"), "error1\nerror2\n  error1\n  error2\n");
}

#[test]
fn joined_errors_show_their_own_stacks() {
    let err = joined();
    let text = format_with(&err, "% +.1v");
    assert_eq!(text.matches(STACK_HEADER).count(), 3);
    assert_eq!(text.matches(&format!("\t{}", STACK_HEADER)).count(), 2);
    assert!(text.contains("\n\terror1\n\tstack trace"));
}

#[test]
fn nested_chains() {
    let err = stackerr::join([
        Some(stackerr::wrap(stackerr::new("x"), "a")),
        Some(stackerr::new("b")),
    ])
    .expect("joined");
    assert_eq!(format_with(&err, "%.1v"), "a\nb\n\ta\n\tx\n\tb\n");

    let deeper = stackerr::join([Some(err), Some(stackerr::new("c"))]).expect("joined");
    assert_eq!(
        format_with(&deeper, "%.1v"),
        "a\nb\nc\n\ta\n\tb\n\t\ta\n\t\tx\n\t\tb\n\tc\n"
    );
}

// ============================================================
// Causes
// ============================================================

#[test]
fn cause_stays_at_the_same_level() {
    let err = stackerr::wrap(stackerr::new("eof"), "read");
    assert_eq!(format_with(&err, "%.1v"), "read\neof\n");
    assert_eq!(
        format_with(&err, "% .1v"),
        "read\nthe above error was caused by the following error:\neof\n"
    );
    assert_eq!(
        format_with(&err, "% -.1v"),
        "read\n\nthe above error was caused by the following error:\n\neof\n"
    );
    assert_eq!(format_with(&err, "%-.1v"), "read\n\neof\n");
}

#[test]
fn foreign_sources_are_causes() {
    let err = stackerr::wrap(QueryFailed { source: Eof }, "load");
    assert_eq!(format_with(&err, "%.1v"), "load\nquery failed\nEOF\n");
    assert_eq!(format!("{:.0}", err), "load\n");
}

#[test]
fn children_render_before_cause() {
    let err = stackerr::from_json(
        r#"{"error":"top","errors":[{"error":"a"},{"error":"b"}],"cause":{"error":"c"}}"#,
    )
    .expect("decodes");
    assert_eq!(format_with(&err, "%.1v"), "top\n\ta\n\tb\nc\n");
    assert_eq!(
        format_with(&err, "% .1v"),
        "top\nthe above error joins errors:\n\ta\n\tb\nthe above error was caused by the following error:\nc\n"
    );
}

// ============================================================
// Details and stacks
// ============================================================

#[test]
fn details_are_sorted_lines() {
    let err = stackerr::with_details!(stackerr::new("x"), "b" => 2, "a" => "y");
    assert_eq!(format!("{:#}", err), "x\na=y\nb=2\n");
    assert_eq!(format_with(&err, "%#v"), "x\na=y\nb=2\n");
}

#[test]
fn stack_lines_name_then_location() {
    let err = stackerr::new("here");
    let text = format!("{:+}", err);
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("here"));
    assert_eq!(lines.next(), Some(STACK_HEADER));
    let name = lines.next().expect("frame name");
    assert!(name.contains("stack_lines_name_then_location"), "{}", name);
    let location = lines.next().expect("frame location");
    assert!(location.starts_with('\t'));
    assert!(location.contains("format.rs:"), "{}", location);
}

#[test]
fn stack_header_follows_delimiters() {
    let err = stackerr::new("x");

    let plain = format_with(&err, "%+v");
    assert!(!plain.contains(STACK_HEADER), "{}", plain);
    let mut lines = plain.lines();
    assert_eq!(lines.next(), Some("x"));
    let name = lines.next().expect("frame name");
    assert!(name.contains("stack_header_follows_delimiters"), "{}", name);
    assert!(lines.next().map_or(false, |l| l.starts_with('\t')));

    let delimited = format_with(&err, "% +v");
    assert!(delimited.starts_with(&format!("x\n{}\n", STACK_HEADER)), "{}", delimited);
    assert_eq!(delimited.replacen(&format!("{}\n", STACK_HEADER), "", 1), plain);

    assert!(format!("{:+}", err).contains(STACK_HEADER));
}

#[test]
fn debug_renders_everything() {
    let err = stackerr::with_details!(stackerr::wrap(Eof, "read"), "file" => "a.txt");
    let text = format!("{:?}", err);
    assert!(text.starts_with("read\nfile=a.txt\nstack trace"), "{}", text);
    assert!(text.ends_with("the above error was caused by the following error:\nEOF\n"));

    let structure = format!("{:#?}", err);
    assert!(structure.starts_with("Error {"));
}

// ============================================================
// Foreign errors
// ============================================================

#[test]
fn formatter_for_foreign_errors() {
    let err = QueryFailed { source: Eof };
    assert_eq!(format!("{}", Formatter::new(&err)), "query failed");
    assert_eq!(format!("{:.1}", Formatter::new(&err)), "query failed\nthe above error was caused by the following error:\nEOF\n");

    let bad = format_with(&err, "%d");
    assert!(bad.starts_with("%!d(") && bad.ends_with("=query failed)"), "{}", bad);

    let mut out = String::new();
    Formatter::dynamic(&err)
        .render(&mut out, &FormatOptions::new('v').with_precision(0))
        .expect("writes to a string");
    assert_eq!(out, "query failed\n");
}

#[test]
fn adapted_rich_formatting_when_preferred() {
    let err = adapt(Remote { source: Some(Eof) });
    assert_eq!(format_with(&err, "%.1v"), "remote failure\nEOF\n");
    assert_eq!(format_with(&err, "%.2v"), "remote failure (code 503)\n");
    assert_eq!(format_with(&err, "%.3v"), "remote failure (code 503)\nEOF\n");
}

#[test]
fn failed_rich_formatting_is_marked() {
    #[derive(Error, Debug)]
    #[error("flaky")]
    struct Flaky;

    impl ForeignError for Flaky {
        fn format_rich(&self, w: &mut dyn fmt::Write, _opts: &FormatOptions) -> Option<fmt::Result> {
            Some(w.write_str("flaky: partial").and(Err(fmt::Error)))
        }
    }

    let err = adapt(Flaky);
    assert_eq!(
        format_with(&err, "%.2v"),
        "flaky: partial%!v(PANIC=format_rich failed)\n"
    );
    assert_eq!(format_with(&err, "%.1v"), "flaky\n");
}

#[test]
fn adapted_with_stack_is_rendered_here() {
    let err = adapt(Legacy {
        trace: backtrace::Backtrace::new(),
    });
    assert!(stackerr::has_stack(&err));

    let text = format_with(&err, "% +.2v");
    assert!(text.starts_with("legacy failure\nstack trace"), "{}", text);

    let wrapped = stackerr::with_stack(err);
    assert!(wrapped.own_stack().is_none());
    assert!(format!("{:+}", wrapped).contains(STACK_HEADER));
}
