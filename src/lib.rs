//! stackerr - Errors with call stacks, details, causes and joined errors
//!
//! # Overview
//!
//! `stackerr` errors record where they were created, carry structured
//! key/value details, and keep the errors they wrap: a plain parent, an
//! explicit cause, or a list of joined errors. A stack is recorded once per
//! error chain; annotating an error that already has one delegates to it.
//!
//! # Quick Start
//!
//! ```
//! use stackerr::{ResultExt, Result};
//!
//! fn load(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .wrap_err("cannot load settings")
//!         .attach("path", path)
//! }
//!
//! let err = load("/does/not/exist").unwrap_err();
//! assert_eq!(err.to_string(), "cannot load settings");
//! assert_eq!(stackerr::all_details(&err)["path"], "/does/not/exist");
//!
//! // `{:+.1}` adds the stack and the cause.
//! let text = format!("{:+.1}", err);
//! assert!(text.starts_with("cannot load settings\nstack trace (most recent call first):\n"));
//! ```
//!
//! # Operations
//!
//! | Operation | Result |
//! |-----------|--------|
//! | [`new`] | new error, stack recorded |
//! | [`errorf!`] | formatted message, optionally over named errors |
//! | [`with_stack`] | stack recorded only if missing |
//! | [`wrap`] / [`wrapf!`] | new error recording the input as its cause |
//! | [`with_message`] / [`with_messagef!`] | message prefixed with `"prefix: "` |
//! | [`join`] | errors aggregated as siblings |
//! | [`with_details`] / [`with_details!`] | new layer carrying details |
//! | [`base`] / [`base_wrap`] | message-only sentinel, never records a stack |
//!
//! # Formatting
//!
//! | Format | Output |
//! |--------|--------|
//! | `{}` | message |
//! | `{:#}` | message and details |
//! | `{:+}` | message and stack |
//! | `{:-}` | blank lines between sections |
//! | `{:.0}` | this error only |
//! | `{:.1}` | with joined errors and the cause |
//! | `{:4}` | indent with four spaces |
//! | `{:?}` | everything |
//!
//! [`format_with`] accepts full printf-style directives such as `"% +#-.1v"`.
//!
//! # JSON
//!
//! [`to_json`] and [`from_json`] encode chains as objects with `error`,
//! `stack`, `cause` and `errors` keys plus flattened details.

// ============================================================
// Modules
// ============================================================

mod construct;
mod details;
mod error;
mod ext;
mod foreign;
mod format;
mod json;
mod macros;
mod stack;
mod value;

// ============================================================
// Re-exports
// ============================================================

pub use construct::{
    base, base_wrap, errorf, join, new, with_details, with_details_list, with_message, with_stack,
    wrap,
};
pub use details::{all_details, cause, details, details_mut, has_stack, links, unjoin, Details};
pub use error::{BaseError, BoxError, Error};
pub use ext::{OptionExt, ResultExt};
pub use foreign::{adapt, Adapted, ForeignError, Serializable};
pub use format::{format_with, render, FormatOptions, Formatter};
pub use json::{from_json, from_json_value, to_json, to_json_value, to_writer};
pub use stack::{Frame, Stack, StackTrace, MAX_DEPTH};
pub use value::{IntoValue, Value};

// ============================================================
// Type aliases
// ============================================================

/// Result type alias.
///
/// - `Result<T>` = `core::result::Result<T, Error>`
/// - `Result<T, E>` = any other error type
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync + 'static>() {}

    #[test]
    fn public_types_are_thread_safe() {
        assert_send_sync::<Error>();
        assert_send_sync::<BaseError>();
        assert_send_sync::<Adapted>();
        assert_send_sync::<Stack>();
    }
}
