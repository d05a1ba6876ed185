//! Construction operations and the stacks they record.

use stackerr::{errorf, Error, OptionExt, ResultExt};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("EOF")]
struct Eof;

#[derive(Error, Debug)]
enum StoreError {
    #[error("record {0} not found")]
    NotFound(u32),
}

fn frames_of(err: &Error) -> Vec<stackerr::Frame> {
    err.stack_trace().expect("error has a stack").frames().into_owned()
}

// ============================================================
// Stack recording
// ============================================================

#[test]
fn first_frame_is_the_caller() {
    let err = stackerr::new("boom");
    let frames = frames_of(&err);
    assert!(!frames.is_empty());
    assert!(frames.len() <= stackerr::MAX_DEPTH);
    assert!(
        frames[0].name.contains("first_frame_is_the_caller"),
        "unexpected first frame: {:?}",
        frames[0]
    );
    assert!(frames[0].file.ends_with("construct.rs"), "{:?}", frames[0]);
    assert!(frames[0].line > 0);
}

#[inline(never)]
fn open_settings() -> Error {
    stackerr::new("missing settings")
}

#[test]
fn frames_below_the_caller_are_kept() {
    let err = open_settings();
    let frames = frames_of(&err);
    assert!(frames[0].name.contains("open_settings"), "{:?}", frames[0]);
    assert!(
        frames[1..]
            .iter()
            .any(|f| f.name.contains("frames_below_the_caller_are_kept")),
        "{:?}",
        frames
    );
    assert!(frames.iter().all(|f| !f.name.starts_with("stackerr::")));
}

#[test]
fn extension_frames_are_dropped() {
    let err = Err::<(), _>(Eof).wrap_err("read error").unwrap_err();
    let frames = frames_of(&err);
    assert!(
        frames[0].name.contains("extension_frames_are_dropped"),
        "unexpected first frame: {:?}",
        frames[0]
    );
    assert!(frames[0].file.ends_with("construct.rs"), "{:?}", frames[0]);

    let err = None::<Eof>.wrap("absent");
    let frames = frames_of(&err);
    assert!(frames[0].name.contains("extension_frames_are_dropped"), "{:?}", frames[0]);

    let err = Err::<(), _>(Eof).attach("k", 1).unwrap_err();
    let frames = frames_of(&err);
    assert!(frames[0].name.contains("extension_frames_are_dropped"), "{:?}", frames[0]);
}

#[test]
fn with_stack_is_idempotent() {
    let once = stackerr::with_stack(Eof);
    let expected = frames_of(&once);

    let mut err = once;
    for _ in 0..5 {
        err = stackerr::with_stack(err);
    }
    assert_eq!(frames_of(&err), expected);
    assert_eq!(err.to_string(), "EOF");
}

#[test]
fn wrap_always_records_a_new_stack() {
    let err = stackerr::new("inner");
    let inner_frames = frames_of(&err);

    let wrapped = stackerr::wrap(err, "outer");
    let outer_frames = frames_of(&wrapped);
    assert_ne!(outer_frames, inner_frames);
    assert_eq!(outer_frames[0].name, inner_frames[0].name);
    assert_ne!(outer_frames[0].line, inner_frames[0].line);

    let cause = stackerr::cause(&wrapped)
        .and_then(|c| c.downcast_ref::<Error>())
        .expect("cause is the wrapped error");
    assert_eq!(cause.to_string(), "inner");
    assert_eq!(frames_of(cause), inner_frames);
}

#[test]
fn with_message_delegates_existing_stack() {
    let err = stackerr::new("eof");
    let frames = frames_of(&err);

    let prefixed = stackerr::with_message(err, "read");
    assert_eq!(prefixed.to_string(), "read: eof");
    assert!(prefixed.own_stack().is_none());
    assert_eq!(frames_of(&prefixed), frames);

    let foreign = stackerr::with_message(Eof, "read");
    assert_eq!(foreign.to_string(), "read: EOF");
    assert!(foreign.own_stack().is_some());
}

#[test]
fn with_message_collapses_empty_parts() {
    assert_eq!(stackerr::with_message(Eof, "").to_string(), "EOF");
    assert_eq!(stackerr::with_message(stackerr::new(""), "read").to_string(), "read");
}

#[test]
fn base_never_records() {
    let sentinel = stackerr::base("not found");
    assert!(!stackerr::has_stack(&sentinel));

    let annotated = stackerr::base_wrap(Eof, "lookup");
    assert_eq!(annotated.to_string(), "lookup");
    assert!(!stackerr::has_stack(&annotated));

    let over_stack = stackerr::base_wrap(stackerr::new("inner"), "lookup");
    assert!(stackerr::has_stack(&over_stack));
    assert!(stackerr::with_stack(over_stack).own_stack().is_none());
}

// ============================================================
// errorf! and join
// ============================================================

#[test]
fn errorf_without_errors_is_new() {
    let err = errorf!("code {}", 7);
    assert_eq!(err.to_string(), "code 7");
    assert!(err.own_stack().is_some());
    assert!(err.parent().is_none());
}

#[test]
fn errorf_with_one_error_annotates_it() {
    let inner = stackerr::new("timeout");
    let frames = frames_of(&inner);
    let err = errorf!("fetch {}: {inner}", "page"; inner = inner);

    assert_eq!(err.to_string(), "fetch page: timeout");
    assert!(err.own_stack().is_none());
    assert_eq!(frames_of(&err), frames);
    assert!(stackerr::cause(&err).is_none());

    let foreign = errorf!("lookup: {e}"; e = StoreError::NotFound(4));
    assert_eq!(foreign.to_string(), "lookup: record 4 not found");
    assert!(foreign.own_stack().is_some());
    assert!(foreign.parent().map_or(false, |p| p.is::<StoreError>()));
}

#[test]
fn errorf_with_several_errors_joins_them() {
    let err = errorf!("{a}; {b}"; a = stackerr::new("disk"), b = Eof);
    assert_eq!(err.to_string(), "disk; EOF");
    assert!(err.own_stack().is_some());

    let children = stackerr::unjoin(&err);
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].to_string(), "disk");
    assert!(children[1].is::<Eof>());
}

#[test]
fn join_messages_and_shapes() {
    let err = stackerr::join([Some(stackerr::new("error1")), Some(stackerr::new("error2"))])
        .expect("two errors join");
    assert_eq!(err.to_string(), "error1\nerror2");
    assert_eq!(stackerr::unjoin(&err).len(), 2);
    assert!(err.own_stack().is_some());

    let single = stackerr::join([None, Some(Eof), None]).expect("one error survives");
    assert_eq!(single.to_string(), "EOF");
    assert!(stackerr::unjoin(&single).is_empty());
    assert!(stackerr::has_stack(&single));
}

// ============================================================
// Absent errors
// ============================================================

#[test]
fn absent_errors_stay_absent() {
    assert!(None::<Eof>.with_stack().is_none());
    assert!(None::<Eof>.with_message("x").is_none());
    assert!(None::<Eof>.with_details([("k", "v")]).is_none());
    assert!(stackerr::join::<_, Eof>([None, None]).is_none());
    assert!(stackerr::join(Vec::<Option<Error>>::new()).is_none());
}

#[test]
fn wrap_of_absent_error_creates_one() {
    let err = None::<Eof>.wrap("read error");
    assert_eq!(err.to_string(), "read error");
    assert!(stackerr::cause(&err).is_none());

    let err = Some(Eof).wrap("read error");
    assert!(stackerr::cause(&err).map_or(false, |c| c.is::<Eof>()));
}

#[test]
fn result_extensions() {
    let ok: Result<u8, Eof> = Ok(3);
    assert_eq!(ok.with_message("unused").unwrap(), 3);

    let err = Err::<(), _>(Eof).with_message("read").unwrap_err();
    assert_eq!(err.to_string(), "read: EOF");

    let err = Err::<(), _>(Eof)
        .wrap_err_with(|| format!("attempt {}", 2))
        .unwrap_err();
    assert_eq!(err.to_string(), "attempt 2");

    let err = Err::<(), _>(Eof).with_stack().unwrap_err();
    assert!(err.own_stack().is_some());

    let err = Err::<(), _>(Eof)
        .with_details([("file", "plans.txt")])
        .attach("user", "vader")
        .unwrap_err();
    let all = stackerr::all_details(&err);
    assert_eq!(all["file"], "plans.txt");
    assert_eq!(all["user"], "vader");
}

// ============================================================
// Std interop
// ============================================================

#[test]
fn source_follows_parent_and_cause() {
    let err = stackerr::with_stack(Eof);
    assert!(std::error::Error::source(&err).map_or(false, |s| s.is::<Eof>()));

    let err = stackerr::wrap(Eof, "read");
    assert!(std::error::Error::source(&err).map_or(false, |s| s.is::<Eof>()));

    let joined = stackerr::join([Some(Eof), Some(Eof)]).expect("joined");
    assert!(std::error::Error::source(&joined).is_none());
}

#[test]
fn errors_cross_threads() {
    let err = stackerr::wrap(Eof, "read");
    let handle = std::thread::spawn(move || err.to_string());
    assert_eq!(handle.join().expect("thread finished"), "read");

    let shared = std::sync::Arc::new(stackerr::new("shared"));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let err = std::sync::Arc::clone(&shared);
            std::thread::spawn(move || err.stack_trace().map(|t| t.frames().len()))
        })
        .collect();
    let lens: Vec<_> = readers
        .into_iter()
        .map(|h| h.join().expect("reader finished"))
        .collect();
    assert!(lens.windows(2).all(|w| w[0] == w[1]));
}
