//! Extension traits for annotating `Result` and `Option` values.
//!
//! Both pass "no error" through untouched: `Ok` stays `Ok` and `None` stays
//! `None`, except for [`OptionExt::wrap`], which creates an error either way.

use crate::construct;
use crate::error::{BoxError, Error};
use crate::value::IntoValue;
use crate::Result;

/// Annotate the error of a `Result`.
///
/// ```
/// use stackerr::ResultExt;
///
/// fn parse(input: &str) -> stackerr::Result<u16> {
///     input.parse::<u16>().wrap_err("invalid port")
/// }
///
/// let err = parse("http").unwrap_err();
/// assert_eq!(err.to_string(), "invalid port");
/// assert!(stackerr::cause(&err).is_some());
/// ```
pub trait ResultExt<T> {
    /// Make sure the error exposes a stack, see [`with_stack`](crate::with_stack).
    fn with_stack(self) -> Result<T>;

    /// Record the error as the cause of a new one, see [`wrap`](crate::wrap).
    fn wrap_err(self, message: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::wrap_err`], building the message only on error.
    fn wrap_err_with<M, F>(self, message: F) -> Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M;

    /// Prefix the error message, see [`with_message`](crate::with_message).
    fn with_message(self, prefix: impl Into<String>) -> Result<T>;

    /// Add a details layer, see [`with_details`](crate::with_details).
    fn with_details<I, K, V>(self, pairs: I) -> Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoValue;

    /// Set one detail on the outermost layer, adding a stack layer only if
    /// the error has no stack yet.
    fn attach(self, key: impl Into<String>, value: impl IntoValue) -> Result<T>;
}

impl<T, E: Into<BoxError>> ResultExt<T> for core::result::Result<T, E> {
    #[inline(never)]
    fn with_stack(self) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(construct::with_stack(e)),
        }
    }

    #[inline(never)]
    fn wrap_err(self, message: impl Into<String>) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(construct::wrap(e, message)),
        }
    }

    #[inline(never)]
    fn wrap_err_with<M, F>(self, message: F) -> Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(construct::wrap(e, message())),
        }
    }

    #[inline(never)]
    fn with_message(self, prefix: impl Into<String>) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(construct::with_message(e, prefix)),
        }
    }

    #[inline(never)]
    fn with_details<I, K, V>(self, pairs: I) -> Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoValue,
    {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(construct::with_details(e, pairs)),
        }
    }

    #[inline(never)]
    fn attach(self, key: impl Into<String>, value: impl IntoValue) -> Result<T> {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => {
                let mut err = construct::with_stack(e);
                err.details_mut().insert(key.into(), value.into_value());
                Err(err)
            }
        }
    }
}

/// Annotate an optional error.
pub trait OptionExt {
    /// See [`with_stack`](crate::with_stack).
    fn with_stack(self) -> Option<Error>;

    /// See [`with_message`](crate::with_message).
    fn with_message(self, prefix: impl Into<String>) -> Option<Error>;

    /// See [`with_details`](crate::with_details).
    fn with_details<I, K, V>(self, pairs: I) -> Option<Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoValue;

    /// [`wrap`](crate::wrap) the error, or create a new one with `message`
    /// when there is none.
    fn wrap(self, message: impl Into<String>) -> Error;
}

impl<E: Into<BoxError>> OptionExt for Option<E> {
    #[inline(never)]
    fn with_stack(self) -> Option<Error> {
        match self {
            Some(e) => Some(construct::with_stack(e)),
            None => None,
        }
    }

    #[inline(never)]
    fn with_message(self, prefix: impl Into<String>) -> Option<Error> {
        match self {
            Some(e) => Some(construct::with_message(e, prefix)),
            None => None,
        }
    }

    #[inline(never)]
    fn with_details<I, K, V>(self, pairs: I) -> Option<Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoValue,
    {
        match self {
            Some(e) => Some(construct::with_details(e, pairs)),
            None => None,
        }
    }

    #[inline(never)]
    fn wrap(self, message: impl Into<String>) -> Error {
        match self {
            Some(e) => construct::wrap(e, message),
            None => construct::new(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_and_none_pass_through() {
        let ok: core::result::Result<u8, std::fmt::Error> = Ok(1);
        assert_eq!(ok.wrap_err("unused").unwrap(), 1);

        let none: Option<Error> = None;
        assert!(none.with_stack().is_none());
        assert!(None::<Error>.with_message("x").is_none());
        assert!(None::<Error>.with_details([("k", 1)]).is_none());
    }

    #[test]
    fn wrap_on_none_creates() {
        let err = None::<Error>.wrap("fresh");
        assert_eq!(err.to_string(), "fresh");
        assert!(crate::cause(&err).is_none());
    }

    #[test]
    fn attach_reuses_existing_stack_layer() {
        let err = Err::<(), _>(construct::new("base"))
            .attach("attempt", 3u8)
            .unwrap_err();
        assert_eq!(err.to_string(), "base");
        assert_eq!(err.details().unwrap()["attempt"], 3u64);
        assert!(err.parent().is_none());
    }
}
