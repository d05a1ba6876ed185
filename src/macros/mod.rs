//! Declarative macros for building errors from format strings.

// Both files define #[macro_export] macros, which land at the crate root.
#[macro_use]
mod formatted;
#[macro_use]
mod details;
