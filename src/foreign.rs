//! Adapting errors not created by this crate.
//!
//! Any `std::error::Error` can be wrapped, formatted, and encoded: its
//! message comes from `Display` and its `source()` is treated as its cause.
//! Types that carry more (a stack, a `backtrace::Backtrace`, details, their
//! own rich text or JSON form) implement [`ForeignError`] and are wrapped in
//! [`Adapted`] so the rest of the crate can see those capabilities.

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use crate::details::Details;
use crate::error::{BaseError, Error};
use crate::format::FormatOptions;
use crate::stack::{Stack, StackTrace};

/// Capabilities an external error type can advertise.
///
/// Every method has a default, so implementors only override what they
/// carry.
///
/// # Examples
///
/// ```
/// use stackerr::{ForeignError, Adapted};
///
/// #[derive(Debug)]
/// struct Timeout {
///     trace: backtrace::Backtrace,
/// }
///
/// impl std::fmt::Display for Timeout {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str("timed out")
///     }
/// }
///
/// impl std::error::Error for Timeout {}
///
/// impl ForeignError for Timeout {
///     fn backtrace(&self) -> Option<&backtrace::Backtrace> {
///         Some(&self.trace)
///     }
/// }
///
/// let err = Adapted::new(Timeout { trace: backtrace::Backtrace::new() });
/// assert!(stackerr::has_stack(&err));
/// ```
pub trait ForeignError: StdError + Send + Sync + 'static {
    /// A stack recorded with this crate's [`Stack`].
    fn stack(&self) -> Option<&Stack> {
        None
    }

    /// A stack recorded directly with the `backtrace` crate.
    fn backtrace(&self) -> Option<&backtrace::Backtrace> {
        None
    }

    /// Details of this error. `Some` marks the error as carrying details
    /// even when the map is empty.
    fn details(&self) -> Option<&Details> {
        None
    }

    /// The error this one annotates without recording it as a cause.
    fn parent(&self) -> Option<&(dyn StdError + 'static)> {
        None
    }

    /// The cause of this error. Defaults to `source()`; types that override
    /// [`ForeignError::parent`] should override this too.
    fn caused_by(&self) -> Option<&(dyn StdError + 'static)> {
        self.source()
    }

    /// Errors aggregated by this one.
    fn joined(&self) -> Vec<&(dyn StdError + 'static)> {
        Vec::new()
    }

    /// Custom rich text, used when formatting prefers foreign output and the
    /// error exposes no stack and no details. `None` when not supported.
    fn format_rich(&self, w: &mut dyn fmt::Write, opts: &FormatOptions) -> Option<fmt::Result> {
        let _ = (w, opts);
        None
    }

    /// Custom JSON form. `None` when not supported.
    fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        None
    }
}

// ============================================================
// Adapted - carrier for ForeignError implementors
// ============================================================

/// An error whose [`ForeignError`] capabilities are visible to this crate.
///
/// `Display`, `Debug` and `source()` are those of the wrapped error.
pub struct Adapted(Box<dyn ForeignError>);

impl Adapted {
    /// Wrap an error advertising foreign capabilities.
    pub fn new<E: ForeignError>(err: E) -> Self {
        Self(Box::new(err))
    }

    /// The wrapped error.
    pub fn inner(&self) -> &dyn ForeignError {
        &*self.0
    }
}

/// Shorthand for [`Adapted::new`].
#[inline]
pub fn adapt<E: ForeignError>(err: E) -> Adapted {
    Adapted::new(err)
}

impl fmt::Display for Adapted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Adapted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl StdError for Adapted {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

// ============================================================
// Serializable - JSON through serde
// ============================================================

/// Encodes the wrapped error with its own `Serialize` implementation.
///
/// If the serialized form is empty (`null`, `{}`, `[]` or `""`) the generic
/// encoding is used instead.
///
/// ```
/// use stackerr::{adapt, Serializable};
///
/// #[derive(Debug, serde::Serialize)]
/// struct Rejected {
///     code: u16,
/// }
///
/// impl std::fmt::Display for Rejected {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "rejected with {}", self.code)
///     }
/// }
///
/// impl std::error::Error for Rejected {}
///
/// let err = adapt(Serializable(Rejected { code: 409 }));
/// assert_eq!(stackerr::to_json(&err).unwrap(), r#"{"code":409}"#);
/// ```
#[derive(Debug)]
pub struct Serializable<E>(pub E);

impl<E: fmt::Display> fmt::Display for Serializable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: StdError> StdError for Serializable<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl<E> ForeignError for Serializable<E>
where
    E: StdError + Serialize + Send + Sync + 'static,
{
    fn to_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        Some(serde_json::to_value(&self.0))
    }
}

// ============================================================
// Node - one view over every error convention
// ============================================================

/// An error classified by the conventions it follows.
#[derive(Clone, Copy)]
pub(crate) enum Node<'a> {
    Own(&'a Error),
    Base(&'a BaseError),
    Adapted(&'a dyn ForeignError),
    Foreign(&'a (dyn StdError + 'static)),
}

impl<'a> Node<'a> {
    pub(crate) fn of(err: &'a (dyn StdError + 'static)) -> Self {
        if let Some(own) = err.downcast_ref::<Error>() {
            Node::Own(own)
        } else if let Some(base) = err.downcast_ref::<BaseError>() {
            Node::Base(base)
        } else if let Some(adapted) = err.downcast_ref::<Adapted>() {
            Node::Adapted(adapted.inner())
        } else {
            Node::Foreign(err)
        }
    }

    pub(crate) fn type_name(self) -> &'static str {
        match self {
            Node::Own(_) => std::any::type_name::<Error>(),
            Node::Base(_) => std::any::type_name::<BaseError>(),
            Node::Adapted(_) => std::any::type_name::<Adapted>(),
            Node::Foreign(_) => "dyn std::error::Error",
        }
    }

    /// The stack exposed by this error, own or delegated.
    pub(crate) fn stack_trace(self) -> Option<StackTrace<'a>> {
        match self {
            Node::Own(own) => own.stack_trace(),
            Node::Base(base) => base.parent().and_then(|p| Node::of(p).stack_trace()),
            Node::Adapted(foreign) => foreign
                .stack()
                .map(StackTrace::Captured)
                .or_else(|| foreign.backtrace().map(StackTrace::Legacy)),
            Node::Foreign(_) => None,
        }
    }

    /// `None` when the error cannot carry details at all, `Some(None)` when
    /// it can but has none yet.
    pub(crate) fn details(self) -> Option<Option<&'a Details>> {
        match self {
            Node::Own(own) => Some(own.details()),
            Node::Adapted(foreign) => foreign.details().map(Some),
            Node::Base(_) | Node::Foreign(_) => None,
        }
    }

    pub(crate) fn parent(self) -> Option<&'a (dyn StdError + 'static)> {
        match self {
            Node::Own(own) => own.parent(),
            Node::Base(base) => base.parent(),
            Node::Adapted(foreign) => foreign.parent(),
            Node::Foreign(_) => None,
        }
    }

    pub(crate) fn cause(self) -> Option<&'a (dyn StdError + 'static)> {
        match self {
            Node::Own(own) => own.cause(),
            Node::Base(_) => None,
            Node::Adapted(foreign) => foreign.caused_by(),
            Node::Foreign(err) => err.source(),
        }
    }

    pub(crate) fn joined(self) -> Vec<&'a (dyn StdError + 'static)> {
        match self {
            Node::Own(own) => own.joined().collect(),
            Node::Adapted(foreign) => foreign.joined(),
            Node::Base(_) | Node::Foreign(_) => Vec::new(),
        }
    }

    /// The adapted error to delegate rich formatting to. Errors exposing a
    /// stack or details are always rendered by this crate.
    pub(crate) fn rich_formatter(self) -> Option<&'a dyn ForeignError> {
        match self {
            Node::Adapted(foreign)
                if foreign.stack().is_none()
                    && foreign.backtrace().is_none()
                    && foreign.details().is_none() =>
            {
                Some(foreign)
            }
            _ => None,
        }
    }

    pub(crate) fn marshal(self) -> Option<serde_json::Result<serde_json::Value>> {
        match self {
            Node::Adapted(foreign) => foreign.to_json(),
            _ => None,
        }
    }
}
