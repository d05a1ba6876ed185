//! `errorf!`, `wrapf!` and `with_messagef!`.

/// Create an error from a format string, optionally over other errors.
///
/// Errors to wrap follow a `;` as named arguments and must be referenced by
/// name in the format string. With none this is [`new`](crate::new); with
/// one the message annotates that error and a stack is recorded only if it
/// has none; with several the result joins them.
///
/// # Examples
///
/// ```
/// use stackerr::errorf;
///
/// let plain = errorf!("retry {} of {}", 2, 3);
/// assert_eq!(plain.to_string(), "retry 2 of 3");
///
/// let inner = stackerr::new("timeout");
/// let outer = errorf!("fetch failed: {inner}"; inner = inner);
/// assert_eq!(outer.to_string(), "fetch failed: timeout");
///
/// let (a, b) = (stackerr::new("disk"), stackerr::new("network"));
/// let both = errorf!("{a} and {b}"; a = a, b = b);
/// assert_eq!(stackerr::unjoin(&both).len(), 2);
/// ```
#[macro_export]
macro_rules! errorf {
    ($fmt:literal $(, $arg:expr)* ; $($name:ident = $err:expr),+ $(,)?) => {{
        $(let $name = $err;)+
        let message = ::std::format!($fmt $(, $arg)*, $($name = &$name),+);
        $crate::errorf(message, ::std::vec![$($crate::BoxError::from($name)),+])
    }};
    ($($arg:tt)+) => {
        $crate::new(::std::format!($($arg)+))
    };
}

/// [`wrap`](crate::wrap) with a formatted message.
///
/// ```
/// let err = stackerr::wrapf!(std::fmt::Error, "render {} failed", "page");
/// assert_eq!(err.to_string(), "render page failed");
/// ```
#[macro_export]
macro_rules! wrapf {
    ($err:expr, $($arg:tt)+) => {
        $crate::wrap($err, ::std::format!($($arg)+))
    };
}

/// [`with_message`](crate::with_message) with a formatted prefix.
///
/// ```
/// let err = stackerr::with_messagef!(stackerr::new("eof"), "chunk {}", 7);
/// assert_eq!(err.to_string(), "chunk 7: eof");
/// ```
#[macro_export]
macro_rules! with_messagef {
    ($err:expr, $($arg:tt)+) => {
        $crate::with_message($err, ::std::format!($($arg)+))
    };
}
