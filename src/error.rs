//! Core error type and its wrapping variants.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;

use crate::details::Details;
use crate::foreign::Node;
use crate::format::{self, FormatOptions};
use crate::stack::{Stack, StackTrace};

/// Boxed error accepted and stored by every wrapping operation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[inline]
pub(crate) fn as_dyn(err: &BoxError) -> &(dyn StdError + 'static) {
    &**err
}

// ============================================================
// Core types
// ============================================================

/// Error value carrying a call stack, structured details, and links to the
/// errors it wraps.
///
/// Every `Error` is one layer of a chain. A layer either owns its message or
/// delegates to the error it wraps, and likewise owns a captured [`Stack`] or
/// reports the nearest wrapped stack. A layer is linked to at most one parent,
/// one cause, or a list of joined errors; see the construction operations in
/// the crate root for which shape each one produces.
///
/// # Examples
///
/// ```
/// let err = stackerr::new("connection refused");
/// let err = stackerr::wrap(err, "cannot load profile");
///
/// assert_eq!(err.to_string(), "cannot load profile");
/// assert_eq!(err.cause().map(|c| c.to_string()).as_deref(), Some("connection refused"));
/// assert!(err.stack_trace().is_some());
/// ```
pub struct Error {
    pub(crate) repr: Repr,
    /// Created on first mutable access, or eagerly by `with_details`.
    pub(crate) details: Option<Details>,
}

/// The closed set of layer shapes.
pub(crate) enum Repr {
    /// Own message, own stack, wraps nothing.
    Fundamental { message: String, stack: Stack },
    /// Own message, stack delegated to `parent`.
    Message { message: String, parent: BoxError },
    /// Own message and stack over a parent without one.
    MessageWithStack {
        message: String,
        parent: BoxError,
        stack: Stack,
    },
    /// Aggregates several errors as siblings.
    Joined {
        message: String,
        errors: Vec<BoxError>,
        stack: Stack,
    },
    /// Message and stack both delegated to `parent`.
    WithStack { parent: BoxError },
    /// Message delegated, stack captured here.
    WithOwnStack { parent: BoxError, stack: Stack },
    /// Own message and stack, records `cause` as the reason.
    Cause {
        message: String,
        cause: BoxError,
        stack: Stack,
    },
    /// Generic layer rebuilt from JSON.
    Decoded {
        message: String,
        stack: Option<Stack>,
        cause: Option<BoxError>,
        errors: Vec<BoxError>,
    },
}

impl Error {
    #[inline]
    pub(crate) fn from_repr(repr: Repr) -> Self {
        Self {
            repr,
            details: None,
        }
    }

    #[inline]
    pub(crate) fn with_details(repr: Repr, details: Details) -> Self {
        Self {
            repr,
            details: Some(details),
        }
    }

    /// The stack this layer owns, if any.
    pub fn own_stack(&self) -> Option<&Stack> {
        match &self.repr {
            Repr::Fundamental { stack, .. }
            | Repr::MessageWithStack { stack, .. }
            | Repr::Joined { stack, .. }
            | Repr::WithOwnStack { stack, .. }
            | Repr::Cause { stack, .. } => Some(stack),
            Repr::Decoded { stack, .. } => stack.as_ref(),
            Repr::Message { .. } | Repr::WithStack { .. } => None,
        }
    }

    /// The stack of this error: its own, or the one of the wrapped error it
    /// delegates to.
    pub fn stack_trace(&self) -> Option<StackTrace<'_>> {
        match self.own_stack() {
            Some(stack) => Some(StackTrace::Captured(stack)),
            None => self.parent().and_then(|parent| Node::of(parent).stack_trace()),
        }
    }

    /// The error this layer annotates, for layers that wrap a single error
    /// without recording it as a cause.
    pub fn parent(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.repr {
            Repr::Message { parent, .. }
            | Repr::MessageWithStack { parent, .. }
            | Repr::WithStack { parent }
            | Repr::WithOwnStack { parent, .. } => Some(as_dyn(parent)),
            Repr::Fundamental { .. }
            | Repr::Joined { .. }
            | Repr::Cause { .. }
            | Repr::Decoded { .. } => None,
        }
    }

    /// The cause recorded on this layer.
    pub fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.repr {
            Repr::Cause { cause, .. } => Some(as_dyn(cause)),
            Repr::Decoded { cause, .. } => cause.as_ref().map(as_dyn),
            _ => None,
        }
    }

    /// Errors joined by this layer.
    pub fn joined(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> + '_ {
        self.joined_slice().iter().map(as_dyn)
    }

    fn joined_slice(&self) -> &[BoxError] {
        match &self.repr {
            Repr::Joined { errors, .. } | Repr::Decoded { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Details recorded on this layer only, if they were ever created.
    ///
    /// Use [`crate::all_details`] to see details of the wrapped layers too.
    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    /// Mutable details of this layer, created empty on first access.
    ///
    /// Layers never share maps: changes here are invisible through the
    /// errors this one wraps.
    pub fn details_mut(&mut self) -> &mut Details {
        self.details.get_or_insert_with(Details::new)
    }

    /// Make sure this layer's details map exists.
    #[inline]
    pub fn ensure_details(&mut self) {
        self.details_mut();
    }

    /// Initialize the details map of this layer and of every layer of this
    /// crate reachable through parents, causes, and joined errors.
    pub(crate) fn ensure_details_deep(&mut self) {
        self.ensure_details();
        match &mut self.repr {
            Repr::Fundamental { .. } => {}
            Repr::Message { parent, .. }
            | Repr::MessageWithStack { parent, .. }
            | Repr::WithStack { parent }
            | Repr::WithOwnStack { parent, .. } => init_details(&mut **parent),
            Repr::Cause { cause, .. } => init_details(&mut **cause),
            Repr::Joined { errors, .. } => errors.iter_mut().for_each(|e| init_details(&mut **e)),
            Repr::Decoded { cause, errors, .. } => {
                if let Some(cause) = cause {
                    init_details(&mut **cause);
                }
                errors.iter_mut().for_each(|e| init_details(&mut **e));
            }
        }
    }

    /// The message this layer owns, `None` when it delegates to its parent.
    pub fn own_message(&self) -> Option<&str> {
        match &self.repr {
            Repr::Fundamental { message, .. }
            | Repr::Message { message, .. }
            | Repr::MessageWithStack { message, .. }
            | Repr::Joined { message, .. }
            | Repr::Cause { message, .. }
            | Repr::Decoded { message, .. } => Some(message),
            Repr::WithStack { .. } | Repr::WithOwnStack { .. } => None,
        }
    }

    fn write_message(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.own_message(), self.parent()) {
            (Some(message), _) => f.write_str(message),
            (None, Some(parent)) => write!(f, "{}", parent),
            (None, None) => Ok(()),
        }
    }
}

/// Create the details maps of every layer of this crate in `err`, passing
/// through [`BaseError`] parents.
pub(crate) fn init_details(err: &mut (dyn StdError + 'static)) {
    if err.is::<Error>() {
        if let Some(own) = err.downcast_mut::<Error>() {
            own.ensure_details_deep();
        }
    } else if let Some(base) = err.downcast_mut::<BaseError>() {
        if let Some(parent) = base.parent_mut() {
            init_details(parent);
        }
    }
}

// ============================================================
// Display and Error implementations
// ============================================================

impl fmt::Display for Error {
    /// `{}` writes the message only. Flags switch to the detailed layout:
    /// `#` lists details, `+` adds stacks, `-` adds blank lines, the
    /// precision selects recursion into causes and joined errors, and the
    /// width sets the indentation step in spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opts = FormatOptions::from_formatter(f);
        if !opts.is_rich() {
            return self.write_message(f);
        }
        format::render_named(f, &opts, self, type_name::<Self>())
    }
}

impl fmt::Debug for Error {
    /// `{:?}` renders the whole chain with details and stacks, `{:#?}` shows
    /// the layer structure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("message", &self.own_message())
                .field("stack", &self.own_stack())
                .field("details", &self.details)
                .field("parent", &self.parent())
                .field("cause", &self.cause())
                .field("joined", &self.joined_slice())
                .finish();
        }
        format::render_named(f, &FormatOptions::full(), self, type_name::<Self>())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.parent().or_else(|| self.cause())
    }
}

// ============================================================
// BaseError - sentinel errors without a stack
// ============================================================

/// A message-only error that never records a stack.
///
/// Meant for sentinel values declared once and compared or annotated later;
/// wrapping one with any stack-recording operation captures the stack at
/// that point instead.
#[derive(Debug)]
pub struct BaseError {
    message: String,
    parent: Option<BoxError>,
}

impl BaseError {
    pub(crate) fn new(message: String, parent: Option<BoxError>) -> Self {
        Self { message, parent }
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped error, if created with [`crate::base_wrap`].
    pub fn parent(&self) -> Option<&(dyn StdError + 'static)> {
        self.parent.as_ref().map(as_dyn)
    }

    pub(crate) fn parent_mut(&mut self) -> Option<&mut (dyn StdError + 'static)> {
        match &mut self.parent {
            Some(parent) => Some(&mut **parent),
            None => None,
        }
    }
}

impl fmt::Display for BaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for BaseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.parent()
    }
}
