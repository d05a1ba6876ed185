//! Construction and annotation operations.
//!
//! Every operation that records a stack does so here, so that stack
//! resolution can drop this module's frames and start at the caller. An
//! operation records a new stack only when the error it wraps does not
//! already expose one; [`wrap`] is the exception and always records.

use crate::details::{has_stack, Details};
use crate::error::{init_details, BaseError, BoxError, Error, Repr};
use crate::stack::Stack;
use crate::value::{IntoValue, Value};

// ============================================================
// Creating errors
// ============================================================

/// Create an error with `message` and a stack recorded here.
///
/// ```
/// let err = stackerr::new("disk full");
/// assert_eq!(err.to_string(), "disk full");
/// assert!(stackerr::has_stack(&err));
/// ```
#[inline(never)]
pub fn new(message: impl Into<String>) -> Error {
    Error::from_repr(Repr::Fundamental {
        message: message.into(),
        stack: Stack::capture(),
    })
}

/// Create an error with a preformatted message over the errors it mentions.
///
/// This is the function behind [`errorf!`](crate::errorf): with nothing
/// wrapped it is [`new`]; with one error the message annotates it and a
/// stack is recorded only if it has none; with several the result joins
/// them under a new stack.
#[inline(never)]
pub fn errorf(message: impl Into<String>, mut wrapped: Vec<BoxError>) -> Error {
    let message = message.into();
    if wrapped.len() > 1 {
        return Error::from_repr(Repr::Joined {
            message,
            errors: wrapped,
            stack: Stack::capture(),
        });
    }
    match wrapped.pop() {
        None => Error::from_repr(Repr::Fundamental {
            message,
            stack: Stack::capture(),
        }),
        Some(parent) if has_stack(&*parent) => Error::from_repr(Repr::Message { message, parent }),
        Some(parent) => Error::from_repr(Repr::MessageWithStack {
            message,
            parent,
            stack: Stack::capture(),
        }),
    }
}

/// Make sure `err` exposes a stack.
///
/// An [`Error`] that already has one is returned as is, so applying this
/// repeatedly never records a second stack.
#[inline(never)]
pub fn with_stack<E: Into<BoxError>>(err: E) -> Error {
    let err: BoxError = err.into();
    match err.downcast::<Error>() {
        Ok(own) if own.stack_trace().map_or(false, |t| !t.is_empty()) => *own,
        Ok(own) => Error::from_repr(Repr::WithOwnStack {
            parent: own,
            stack: Stack::capture(),
        }),
        Err(foreign) if has_stack(&*foreign) => Error::from_repr(Repr::WithStack { parent: foreign }),
        Err(foreign) => Error::from_repr(Repr::WithOwnStack {
            parent: foreign,
            stack: Stack::capture(),
        }),
    }
}

/// Record `err` as the cause of a new error with `message`.
///
/// Always records a new stack, even when `err` has one.
///
/// ```
/// let err = stackerr::wrap(std::fmt::Error, "cannot render");
/// assert_eq!(err.to_string(), "cannot render");
/// assert!(stackerr::cause(&err).is_some());
/// ```
#[inline(never)]
pub fn wrap<E: Into<BoxError>>(err: E, message: impl Into<String>) -> Error {
    Error::from_repr(Repr::Cause {
        message: message.into(),
        cause: err.into(),
        stack: Stack::capture(),
    })
}

/// Prefix the message of `err` with `prefix` and `": "`.
///
/// An empty prefix or an empty message drops the separator.
#[inline(never)]
pub fn with_message<E: Into<BoxError>>(err: E, prefix: impl Into<String>) -> Error {
    let parent: BoxError = err.into();
    let message = prefixed(prefix.into(), parent.to_string());
    if has_stack(&*parent) {
        Error::from_repr(Repr::Message { message, parent })
    } else {
        Error::from_repr(Repr::MessageWithStack {
            message,
            parent,
            stack: Stack::capture(),
        })
    }
}

fn prefixed(prefix: String, message: String) -> String {
    match (prefix.is_empty(), message.is_empty()) {
        (true, _) => message,
        (false, true) => prefix,
        (false, false) => format!("{}: {}", prefix, message),
    }
}

/// Join errors as siblings.
///
/// `None` entries are skipped. Nothing left gives `None`, a single error is
/// passed through [`with_stack`], and several are joined under a new stack
/// with their messages separated by newlines.
///
/// ```
/// let joined = stackerr::join([Some(stackerr::new("error1")), None, Some(stackerr::new("error2"))]);
/// assert_eq!(joined.unwrap().to_string(), "error1\nerror2");
///
/// assert!(stackerr::join::<_, stackerr::Error>([None, None]).is_none());
/// ```
#[inline(never)]
pub fn join<I, E>(errs: I) -> Option<Error>
where
    I: IntoIterator<Item = Option<E>>,
    E: Into<BoxError>,
{
    let mut errors: Vec<BoxError> = errs.into_iter().flatten().map(Into::into).collect();
    if errors.len() < 2 {
        return match errors.pop() {
            Some(single) => Some(with_stack(single)),
            None => None,
        };
    }
    let message = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    Some(Error::from_repr(Repr::Joined {
        message,
        errors,
        stack: Stack::capture(),
    }))
}

// ============================================================
// Details
// ============================================================

/// Add a layer carrying `pairs` as its details.
///
/// Always adds a layer, even over an error that has a stack. Before
/// wrapping, every layer of this crate reachable from `err` gets its
/// details map created, so later readers never race to create one.
///
/// ```
/// let err = stackerr::with_details(stackerr::new("denied"), [("user", "vader")]);
/// assert_eq!(err.details().unwrap()["user"], "vader");
/// ```
#[inline(never)]
pub fn with_details<E, I, K, V>(err: E, pairs: I) -> Error
where
    E: Into<BoxError>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: IntoValue,
{
    let mut parent: BoxError = err.into();
    init_details(&mut *parent);
    let details: Details = pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into_value()))
        .collect();

    let repr = if has_stack(&*parent) {
        Repr::WithStack { parent }
    } else {
        Repr::WithOwnStack {
            parent,
            stack: Stack::capture(),
        }
    };
    Error::with_details(repr, details)
}

/// [`with_details`] over a flat `key, value, key, value, ...` list.
///
/// # Panics
///
/// Panics if the list has an odd length or a key is not a string.
#[inline(never)]
pub fn with_details_list<E, I>(err: E, kv: I) -> Error
where
    E: Into<BoxError>,
    I: IntoIterator<Item = Value>,
{
    let kv: Vec<Value> = kv.into_iter().collect();
    assert!(
        kv.len() % 2 == 0,
        "details need key/value pairs, got {} values",
        kv.len()
    );

    let mut pairs = Vec::with_capacity(kv.len() / 2);
    let mut iter = kv.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        match key {
            Value::String(key) => pairs.push((key, value)),
            other => panic!("details key must be a string, got {:?}", other),
        }
    }
    with_details(err, pairs)
}

// ============================================================
// Sentinels
// ============================================================

/// Create a message-only error that never records a stack.
#[inline]
pub fn base(message: impl Into<String>) -> BaseError {
    BaseError::new(message.into(), None)
}

/// Like [`base`], annotating `err`. The message is used as is.
#[inline]
pub fn base_wrap<E: Into<BoxError>>(err: E, message: impl Into<String>) -> BaseError {
    BaseError::new(message.into(), Some(err.into()))
}
