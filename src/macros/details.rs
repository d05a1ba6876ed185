//! `with_details!`.

/// [`with_details`](crate::with_details) with `key => value` pairs of mixed
/// value types.
///
/// ```
/// use stackerr::with_details;
///
/// let err = with_details!(stackerr::new("denied"), "user" => "vader", "attempt" => 3);
/// let details = err.details().unwrap();
/// assert_eq!(details["user"], "vader");
/// assert_eq!(details["attempt"], 3i64);
/// ```
#[macro_export]
macro_rules! with_details {
    ($err:expr $(,)?) => {
        $crate::with_details($err, ::core::iter::empty::<(&str, $crate::Value)>())
    };
    ($err:expr, $($key:expr => $value:expr),+ $(,)?) => {
        $crate::with_details(
            $err,
            [$((
                ::std::string::String::from($key),
                $crate::IntoValue::into_value($value),
            )),+],
        )
    };
}
