//! Rich text rendering of error chains.
//!
//! Rendering is driven by [`FormatOptions`], which mirror printf-style
//! directives:
//!
//! | Directive | Effect |
//! |-----------|--------|
//! | `s` | message only |
//! | `q` | message, quoted |
//! | `v` | message; rich layout when any flag, width or precision is set |
//! | `#` | list details, one `key=value` per line, sorted |
//! | `+` | add the stack of every rendered error |
//! | ` ` | add header lines between an error and what it joins or wraps |
//! | `-` | add blank lines around those sections |
//! | width | indent joined errors with that many spaces instead of a tab |
//! | `.0` | this error only |
//! | `.1` | also render joined errors and the cause (default) |
//! | `.2` | prefer the foreign error's own rich output |
//! | `.3` | both |
//!
//! Joined errors are rendered one level deeper than the error joining them,
//! the cause at the same level after them.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt::{self, Write as _};

use crate::details::{all_details, links};
use crate::foreign::Node;

const STACK_HEADER: &str = "stack trace (most recent call first):\n";
const JOINED_HEADER: &str = "the above error joins errors:\n";
const CAUSE_HEADER: &str = "the above error was caused by the following error:\n";

const BAD_PRECISION: &str = "%!v(BADPREC)";
const NO_VERB: &str = "%!(NOVERB)";
const RICH_FAILED: &str = "%!v(PANIC=format_rich failed)";

// ============================================================
// Options
// ============================================================

/// Parsed form of a formatting directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// `s`, `q` or `v` for errors; frames also accept `d` and `n`.
    pub verb: char,
    /// List details (`#`).
    pub details: bool,
    /// Include stacks (`+`).
    pub stack: bool,
    /// Header lines between sections (` `).
    pub delimiters: bool,
    /// Blank lines between sections (`-`).
    pub extra_newlines: bool,
    /// Spaces per indentation level; tabs when `None`.
    pub width: Option<usize>,
    /// Recursion mode, see the module documentation.
    pub precision: Option<usize>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::new('v')
    }
}

impl FormatOptions {
    /// Options for `verb` with no flags set.
    pub const fn new(verb: char) -> Self {
        Self {
            verb,
            details: false,
            stack: false,
            delimiters: false,
            extra_newlines: false,
            width: None,
            precision: None,
        }
    }

    /// Everything on: details, stacks, header lines, full recursion.
    pub const fn full() -> Self {
        Self {
            verb: 'v',
            details: true,
            stack: true,
            delimiters: true,
            extra_newlines: false,
            width: None,
            precision: None,
        }
    }

    #[inline]
    pub fn with_details(mut self) -> Self {
        self.details = true;
        self
    }

    #[inline]
    pub fn with_stack(mut self) -> Self {
        self.stack = true;
        self
    }

    #[inline]
    pub fn with_delimiters(mut self) -> Self {
        self.delimiters = true;
        self
    }

    #[inline]
    pub fn with_extra_newlines(mut self) -> Self {
        self.extra_newlines = true;
        self
    }

    #[inline]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    #[inline]
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Parse a printf-style directive such as `"% +#-4.1v"`.
    ///
    /// The leading `%` is optional. Returns `None` if the directive has no
    /// verb or trailing characters after it.
    ///
    /// ```
    /// use stackerr::FormatOptions;
    ///
    /// let opts = FormatOptions::parse("% +4.1v").unwrap();
    /// assert!(opts.delimiters && opts.stack && !opts.details);
    /// assert_eq!(opts.width, Some(4));
    /// assert_eq!(opts.precision, Some(1));
    /// ```
    pub fn parse(directive: &str) -> Option<Self> {
        let rest = directive.strip_prefix('%').unwrap_or(directive);
        let mut opts = Self::new('v');
        let mut chars = rest.chars().peekable();

        while let Some(&c) = chars.peek() {
            match c {
                '#' => opts.details = true,
                '+' => opts.stack = true,
                ' ' => opts.delimiters = true,
                '-' => opts.extra_newlines = true,
                _ => break,
            }
            chars.next();
        }

        opts.width = take_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            opts.precision = Some(take_number(&mut chars).unwrap_or(0));
        }

        opts.verb = chars.next()?;
        match chars.next() {
            None => Some(opts),
            Some(_) => None,
        }
    }

    /// Options matching the flags of a `{}` formatter: `#` for details, `+`
    /// for stacks, `-` for blank lines, width and precision as is. Any of
    /// them also turns on header lines.
    pub fn from_formatter(f: &fmt::Formatter<'_>) -> Self {
        let mut opts = Self::new('v');
        opts.details = f.alternate();
        opts.stack = f.sign_plus();
        opts.extra_newlines = f.sign_minus();
        opts.width = f.width();
        opts.precision = f.precision();
        opts.delimiters = opts.is_rich();
        opts
    }

    /// Whether the `v` verb renders more than the message.
    pub fn is_rich(&self) -> bool {
        self.verb == 'v'
            && (self.details
                || self.stack
                || self.delimiters
                || self.extra_newlines
                || self.width.is_some()
                || self.precision.is_some())
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        number = Some(number.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    number
}

// ============================================================
// Entry points
// ============================================================

/// Render `err` into `w`.
pub fn render(
    w: &mut dyn fmt::Write,
    opts: &FormatOptions,
    err: &(dyn StdError + 'static),
) -> fmt::Result {
    render_named(w, opts, err, Node::of(err).type_name())
}

/// Render `err` with a printf-style directive, e.g. `"%+-v"`.
///
/// ```
/// let err = stackerr::wrap(stackerr::new("eof"), "read failed");
/// assert_eq!(stackerr::format_with(&err, "%.1v"), "read failed\neof\n");
/// ```
pub fn format_with(err: &(dyn StdError + 'static), directive: &str) -> String {
    let Some(opts) = FormatOptions::parse(directive) else {
        return NO_VERB.to_string();
    };
    let mut out = String::new();
    if render(&mut out, &opts, err).is_err() {
        out.push_str(RICH_FAILED);
    }
    out
}

pub(crate) fn render_named(
    w: &mut dyn fmt::Write,
    opts: &FormatOptions,
    err: &(dyn StdError + 'static),
    type_name: &str,
) -> fmt::Result {
    match opts.verb {
        's' => write!(w, "{}", err),
        'q' => write!(w, "{:?}", err.to_string()),
        'v' if !opts.is_rich() => write!(w, "{}", err),
        'v' => {
            let Some(mode) = Mode::from_precision(opts.precision) else {
                return w.write_str(BAD_PRECISION);
            };
            let engine = Engine { opts, mode };
            let mut out = Indented::new(w, opts.width);
            engine.render(&mut out, err)
        }
        verb => write!(w, "%!{}({}={})", verb, type_name, err),
    }
}

/// A borrowed error paired with its static type name, rendered through
/// `Display` like [`Error`](crate::Error).
///
/// Use it to get the rich layout for errors of other types:
///
/// ```
/// use stackerr::Formatter;
///
/// let err = stackerr::wrap(std::fmt::Error, "cannot render");
/// let text = format!("{:.1}", Formatter::new(&err));
/// assert_eq!(text, "cannot render\nthe above error was caused by the following error:\nan error occurred when formatting an argument\n");
/// ```
#[derive(Clone, Copy)]
pub struct Formatter<'a> {
    err: &'a (dyn StdError + 'static),
    type_name: &'static str,
}

impl<'a> Formatter<'a> {
    pub fn new<E: StdError + 'static>(err: &'a E) -> Self {
        Self {
            err,
            type_name: type_name::<E>(),
        }
    }

    /// For an error known only as a trait object.
    pub fn dynamic(err: &'a (dyn StdError + 'static)) -> Self {
        Self {
            err,
            type_name: Node::of(err).type_name(),
        }
    }

    pub fn render(&self, w: &mut dyn fmt::Write, opts: &FormatOptions) -> fmt::Result {
        render_named(w, opts, self.err, self.type_name)
    }
}

impl fmt::Display for Formatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opts = FormatOptions::from_formatter(f);
        if !opts.is_rich() {
            return write!(f, "{}", self.err);
        }
        self.render(f, &opts)
    }
}

impl fmt::Debug for Formatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &FormatOptions::full())
    }
}

// ============================================================
// Engine
// ============================================================

#[derive(Clone, Copy)]
struct Mode {
    recurse: bool,
    prefer_foreign: bool,
}

impl Mode {
    fn from_precision(precision: Option<usize>) -> Option<Self> {
        let precision = precision.unwrap_or(1);
        if precision > 3 {
            return None;
        }
        Some(Self {
            recurse: precision & 1 != 0,
            prefer_foreign: precision & 2 != 0,
        })
    }
}

struct Engine<'o> {
    opts: &'o FormatOptions,
    mode: Mode,
}

impl Engine<'_> {
    fn render(&self, out: &mut Indented<'_>, err: &(dyn StdError + 'static)) -> fmt::Result {
        let node = Node::of(err);
        if !(self.mode.prefer_foreign && self.delegate(out, node)?) {
            self.write_own(out, err, node)?;
        }
        if self.mode.recurse {
            self.write_links(out, err)?;
        }
        Ok(())
    }

    /// Let an adapted error render itself. Returns whether it did.
    fn delegate(&self, out: &mut Indented<'_>, node: Node<'_>) -> Result<bool, fmt::Error> {
        let Some(foreign) = node.rich_formatter() else {
            return Ok(false);
        };
        let mut buffer = String::new();
        match foreign.format_rich(&mut buffer, self.opts) {
            None => Ok(false),
            Some(result) => {
                out.write_str(&buffer)?;
                let failed = result.is_err();
                if failed {
                    tracing::debug!(kind = node.type_name(), "rich formatting failed, output truncated");
                    out.write_str(RICH_FAILED)?;
                }
                if failed || (!buffer.is_empty() && !buffer.ends_with('\n')) {
                    out.write_str("\n")?;
                }
                Ok(true)
            }
        }
    }

    fn write_own(
        &self,
        out: &mut Indented<'_>,
        err: &(dyn StdError + 'static),
        node: Node<'_>,
    ) -> fmt::Result {
        let message = err.to_string();
        if !message.is_empty() {
            out.write_str(&message)?;
            if !message.ends_with('\n') {
                out.write_str("\n")?;
            }
        }

        if self.opts.details {
            for (key, value) in all_details(err) {
                writeln!(out, "{}={}", key, value)?;
            }
        }

        if self.opts.stack {
            if let Some(trace) = node.stack_trace() {
                let frames = trace.frames();
                if !frames.is_empty() {
                    if self.opts.delimiters {
                        out.write_str(STACK_HEADER)?;
                    }
                    for frame in frames.iter() {
                        writeln!(out, "{}\n\t{}:{}", frame.name, frame.file, frame.line)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_links(&self, out: &mut Indented<'_>, err: &(dyn StdError + 'static)) -> fmt::Result {
        let (cause, joined) = links(err);

        if !joined.is_empty() {
            let mut after_delimiter = self.delimiter(out, JOINED_HEADER)?;
            out.level += 1;
            for child in joined {
                self.separate(out, after_delimiter)?;
                after_delimiter = false;
                self.render(out, child)?;
            }
            out.level -= 1;
        }

        if let Some(cause) = cause {
            let after_delimiter = self.delimiter(out, CAUSE_HEADER)?;
            self.separate(out, after_delimiter)?;
            self.render(out, cause)?;
        }
        Ok(())
    }

    /// Write a header line if requested. Returns whether one was written.
    fn delimiter(&self, out: &mut Indented<'_>, header: &str) -> Result<bool, fmt::Error> {
        if !self.opts.delimiters {
            return Ok(false);
        }
        if self.opts.extra_newlines {
            write!(out, "\n{}\n", header)?;
        } else {
            out.write_str(header)?;
        }
        Ok(true)
    }

    fn separate(&self, out: &mut Indented<'_>, after_delimiter: bool) -> fmt::Result {
        if self.opts.extra_newlines && !after_delimiter {
            out.write_str("\n")?;
        }
        Ok(())
    }
}

// ============================================================
// Indentation
// ============================================================

/// Prefixes every non-empty line with the current indentation.
struct Indented<'w> {
    inner: &'w mut dyn fmt::Write,
    width: Option<usize>,
    level: usize,
    line_start: bool,
}

impl<'w> Indented<'w> {
    fn new(inner: &'w mut dyn fmt::Write, width: Option<usize>) -> Self {
        Self {
            inner,
            width,
            level: 0,
            line_start: true,
        }
    }

    fn indent(&mut self) -> fmt::Result {
        for _ in 0..self.level {
            match self.width {
                Some(width) => {
                    for _ in 0..width {
                        self.inner.write_char(' ')?;
                    }
                }
                None => self.inner.write_char('\t')?,
            }
        }
        Ok(())
    }
}

impl fmt::Write for Indented<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for piece in s.split_inclusive('\n') {
            if self.line_start && piece != "\n" {
                self.indent()?;
            }
            self.inner.write_str(piece)?;
            self.line_start = piece.ends_with('\n');
        }
        Ok(())
    }
}
