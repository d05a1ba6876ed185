//! Call stack capture and frame formatting.
//!
//! A [`Stack`] records raw return addresses when an error is created and only
//! resolves them into [`Frame`]s (function name, file, line) the first time
//! they are formatted or encoded. Constructing and discarding an error never
//! pays for symbolization.

use core::ffi::c_void;
use core::fmt;
use std::borrow::Cow;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::format::FormatOptions;

/// Maximum number of frames kept for a captured stack.
pub const MAX_DEPTH: usize = 32;

/// Extra addresses recorded so that capture machinery frames can be dropped
/// without eating into `MAX_DEPTH`.
const INTERNAL_SLACK: usize = 16;

/// Inline storage for return addresses; deeper stacks spill to the heap.
const INLINE_CAPACITY: usize = 16;

/// Symbol paths of stack capture and of the public construction
/// operations. The leading run of frames under these paths is dropped.
const INTERNAL_PATHS: &[&str] = &[
    "backtrace::",
    concat!(env!("CARGO_CRATE_NAME"), "::stack::"),
    concat!(env!("CARGO_CRATE_NAME"), "::construct::"),
    concat!(env!("CARGO_CRATE_NAME"), "::ext::"),
];

/// Trait impls show up as `<Type as path::Trait>::method`.
const INTERNAL_IMPLS: &[&str] = &[concat!(" as ", env!("CARGO_CRATE_NAME"), "::ext::")];

const UNKNOWN: &str = "unknown";

// ============================================================
// Frame
// ============================================================

/// One resolved location of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Fully qualified function name, without the symbol hash.
    pub name: String,
    /// Source file path.
    pub file: String,
    /// Line number, 0 when unknown.
    pub line: u32,
}

impl Frame {
    /// Create a frame from its parts.
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
        }
    }

    fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN, 0)
    }

    fn from_parts(name: Option<String>, file: Option<String>, line: Option<u32>) -> Self {
        Self {
            name: name.unwrap_or_else(|| UNKNOWN.to_string()),
            file: file.unwrap_or_else(|| UNKNOWN.to_string()),
            line: line.unwrap_or(0),
        }
    }

    fn from_symbol(symbol: &backtrace::Symbol) -> Self {
        Self::from_parts(
            symbol.name().map(|n| format!("{:#}", n)),
            symbol.filename().map(|p| p.display().to_string()),
            symbol.lineno(),
        )
    }

    fn from_backtrace_symbol(symbol: &backtrace::BacktraceSymbol) -> Self {
        Self::from_parts(
            symbol.name().map(|n| format!("{:#}", n)),
            symbol.filename().map(|p| p.display().to_string()),
            symbol.lineno(),
        )
    }

    fn is_internal(&self) -> bool {
        let name = self.name.strip_prefix('<').unwrap_or(&self.name);
        INTERNAL_PATHS.iter().any(|path| name.starts_with(path))
            || (self.name.starts_with('<') && INTERNAL_IMPLS.iter().any(|path| name.contains(path)))
    }

    /// Base name of the source file.
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.file)
    }

    /// Function name without its module path. Closures keep their enclosing
    /// function, e.g. `load::{{closure}}`.
    pub fn short_name(&self) -> &str {
        let mut segments = self.name.rmatch_indices("::").map(|(i, _)| i);
        match segments.next() {
            None => &self.name,
            Some(last) => {
                if self.name[last + 2..].starts_with("{{") {
                    match segments.next() {
                        Some(prev) => &self.name[prev + 2..],
                        None => &self.name,
                    }
                } else {
                    &self.name[last + 2..]
                }
            }
        }
    }

    /// Render the frame for a printf-style verb.
    ///
    /// | Verb | Output |
    /// |------|--------|
    /// | `%s` | file base name |
    /// | `%+s` | function name, newline, tab, full file path |
    /// | `%d` | line number |
    /// | `%n` | short function name |
    /// | `%v` | `file:line` with the base name |
    /// | `%+v` | function name, newline, tab, `path:line` |
    pub fn render(&self, w: &mut dyn fmt::Write, opts: &FormatOptions) -> fmt::Result {
        match opts.verb {
            's' if opts.stack => write!(w, "{}\n\t{}", self.name, self.file),
            's' => w.write_str(self.file_name()),
            'd' => write!(w, "{}", self.line),
            'n' => w.write_str(self.short_name()),
            'v' if opts.stack => write!(w, "{}\n\t{}:{}", self.name, self.file, self.line),
            'v' => write!(w, "{}:{}", self.file_name(), self.line),
            verb => write!(w, "%!{}(stackerr::Frame={}:{})", verb, self.file, self.line),
        }
    }
}

impl fmt::Display for Frame {
    /// `{}` renders `file:line`, `{:#}` renders the function name followed by
    /// the indented full path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut opts = FormatOptions::new('v');
        opts.stack = f.alternate();
        self.render(f, &opts)
    }
}

// ============================================================
// Stack
// ============================================================

/// A call stack, most recent call first.
///
/// Captured stacks hold return addresses and resolve them once, on first
/// access to [`Stack::frames`]. Decoded stacks hold frames directly.
#[derive(Clone)]
pub struct Stack {
    repr: StackRepr,
}

#[derive(Clone)]
enum StackRepr {
    Captured {
        addresses: SmallVec<[usize; INLINE_CAPACITY]>,
        frames: OnceLock<Vec<Frame>>,
    },
    Resolved(Vec<Frame>),
}

impl Stack {
    /// Capture the current call stack.
    ///
    /// Frames of the capture itself and of this crate's construction
    /// operations are dropped on resolution, so the first frame is the caller.
    #[inline(never)]
    pub fn capture() -> Self {
        let mut addresses = SmallVec::new();
        backtrace::trace(|frame| {
            addresses.push(frame.ip() as usize);
            addresses.len() < MAX_DEPTH + INTERNAL_SLACK
        });
        Self {
            repr: StackRepr::Captured {
                addresses,
                frames: OnceLock::new(),
            },
        }
    }

    /// Build a stack from already resolved frames.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self {
            repr: StackRepr::Resolved(frames),
        }
    }

    /// Resolved frames, most recent call first.
    pub fn frames(&self) -> &[Frame] {
        match &self.repr {
            StackRepr::Captured { addresses, frames } => frames.get_or_init(|| resolve(addresses)),
            StackRepr::Resolved(frames) => frames,
        }
    }

    /// Raw return addresses of a captured stack. Empty for decoded stacks.
    pub fn addresses(&self) -> &[usize] {
        match &self.repr {
            StackRepr::Captured { addresses, .. } => addresses,
            StackRepr::Resolved(_) => &[],
        }
    }

    /// Whether nothing was recorded. Does not trigger resolution.
    pub fn is_empty(&self) -> bool {
        match &self.repr {
            StackRepr::Captured { addresses, .. } => addresses.is_empty(),
            StackRepr::Resolved(frames) => frames.is_empty(),
        }
    }
}

fn resolve(addresses: &[usize]) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(addresses.len());
    for &ip in addresses {
        let before = frames.len();
        backtrace::resolve(ip as *mut c_void, |symbol| {
            frames.push(Frame::from_symbol(symbol));
        });
        if frames.len() == before {
            frames.push(Frame::unknown());
        }
    }

    drop_internal(&mut frames);
    frames.truncate(MAX_DEPTH);

    tracing::trace!(frames = frames.len(), "resolved captured stack");
    frames
}

/// Drop the frames above the caller: whatever precedes the first internal
/// frame near the top, then the contiguous internal run itself. Frames
/// further down are kept even when they look internal.
fn drop_internal(frames: &mut Vec<Frame>) {
    let Some(start) = frames.iter().take(INTERNAL_SLACK).position(Frame::is_internal) else {
        return;
    };
    let end = frames[start..]
        .iter()
        .position(|frame| !frame.is_internal())
        .map_or(frames.len(), |offset| start + offset);
    if end < frames.len() {
        frames.drain(..end);
    }
}

impl PartialEq for Stack {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (StackRepr::Captured { addresses: a, .. }, StackRepr::Captured { addresses: b, .. }) => {
                a == b
            }
            _ => self.frames() == other.frames(),
        }
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.frames()).finish()
    }
}

impl fmt::Display for Stack {
    /// `{}` renders `[file:line file:line ...]`, `{:#}` renders every frame
    /// on its own line with the function name and full path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verbose = f.alternate();
        write_frames(f, self.frames(), verbose)
    }
}

fn write_frames(f: &mut fmt::Formatter<'_>, frames: &[Frame], verbose: bool) -> fmt::Result {
    if verbose {
        for frame in frames {
            write!(f, "\n{:#}", frame)?;
        }
        return Ok(());
    }
    f.write_str("[")?;
    for (idx, frame) in frames.iter().enumerate() {
        if idx > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", frame)?;
    }
    f.write_str("]")
}

// ============================================================
// StackTrace - normalized view over stack conventions
// ============================================================

/// A borrowed stack exposed by an error, whichever convention recorded it.
///
/// Errors of this crate and adapters built on [`Stack`] expose
/// `Captured`; adapters carrying a `backtrace::Backtrace` expose `Legacy`.
#[derive(Debug, Clone, Copy)]
pub enum StackTrace<'a> {
    /// Recorded by [`Stack::capture`] or decoded from JSON.
    Captured(&'a Stack),
    /// Recorded directly with the `backtrace` crate.
    Legacy(&'a backtrace::Backtrace),
}

impl<'a> StackTrace<'a> {
    /// Resolved frames, most recent call first.
    pub fn frames(&self) -> Cow<'a, [Frame]> {
        match *self {
            StackTrace::Captured(stack) => Cow::Borrowed(stack.frames()),
            StackTrace::Legacy(backtrace) => Cow::Owned(legacy_frames(backtrace)),
        }
    }

    /// Whether the stack holds no frames.
    pub fn is_empty(&self) -> bool {
        match *self {
            StackTrace::Captured(stack) => stack.is_empty(),
            StackTrace::Legacy(backtrace) => backtrace.frames().is_empty(),
        }
    }

    /// The underlying [`Stack`], if this is the crate's own convention.
    pub fn as_stack(&self) -> Option<&'a Stack> {
        match *self {
            StackTrace::Captured(stack) => Some(stack),
            StackTrace::Legacy(_) => None,
        }
    }
}

fn legacy_frames(backtrace: &backtrace::Backtrace) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(backtrace.frames().len());
    for frame in backtrace.frames() {
        let symbols = frame.symbols();
        if symbols.is_empty() {
            // Unresolved backtraces still carry addresses.
            let before = frames.len();
            backtrace::resolve(frame.ip(), |symbol| frames.push(Frame::from_symbol(symbol)));
            if frames.len() == before {
                frames.push(Frame::unknown());
            }
        } else {
            frames.extend(symbols.iter().map(Frame::from_backtrace_symbol));
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_strips_module_path() {
        let frame = Frame::new("app::storage::load", "src/storage.rs", 10);
        assert_eq!(frame.short_name(), "load");

        let closure = Frame::new("app::storage::load::{{closure}}", "src/storage.rs", 12);
        assert_eq!(closure.short_name(), "load::{{closure}}");

        let bare = Frame::new("main", "src/main.rs", 1);
        assert_eq!(bare.short_name(), "main");
    }

    #[test]
    fn file_name_is_base_name() {
        let frame = Frame::new("app::run", "/home/user/app/src/run.rs", 7);
        assert_eq!(frame.file_name(), "run.rs");
        assert_eq!(frame.to_string(), "run.rs:7");
        assert_eq!(format!("{:#}", frame), "app::run\n\t/home/user/app/src/run.rs:7");
    }

    #[test]
    fn internal_frames_are_recognized() {
        let crate_name = env!("CARGO_CRATE_NAME");
        assert!(Frame::new(format!("{}::construct::new", crate_name), "", 0).is_internal());
        assert!(Frame::new(format!("{}::stack::Stack::capture", crate_name), "", 0).is_internal());
        assert!(Frame::new(format!("<{}::stack::Stack>::capture", crate_name), "", 0).is_internal());
        assert!(Frame::new(
            format!("<core::result::Result<T, E> as {}::ext::ResultExt<T>>::wrap_err", crate_name),
            "",
            0
        )
        .is_internal());
        assert!(Frame::new("backtrace::backtrace::trace", "", 0).is_internal());

        assert!(!Frame::new("app::main", "", 0).is_internal());
        assert!(!Frame::new("std::sys::backtrace::__rust_begin_short_backtrace", "", 0).is_internal());
        assert!(!Frame::new(format!("app::{}::construct::new", crate_name), "", 0).is_internal());
    }

    #[test]
    fn only_the_leading_internal_run_is_dropped() {
        let crate_name = env!("CARGO_CRATE_NAME");
        let mut frames = vec![
            Frame::new("_Unwind_Backtrace", "unknown", 0),
            Frame::new("backtrace::backtrace::libunwind::trace", "libunwind.rs", 93),
            Frame::new("backtrace::backtrace::trace_unsynchronized", "mod.rs", 66),
            Frame::new(format!("{}::stack::Stack::capture", crate_name), "stack.rs", 186),
            Frame::new(format!("{}::construct::new", crate_name), "construct.rs", 28),
            Frame::new("app::load", "src/load.rs", 12),
            Frame::new("app::main", "src/main.rs", 3),
            Frame::new("std::sys::backtrace::__rust_begin_short_backtrace", "backtrace.rs", 152),
            Frame::new("std::rt::lang_start_internal", "rt.rs", 175),
        ];
        drop_internal(&mut frames);

        let names: Vec<&str> = frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "app::load",
                "app::main",
                "std::sys::backtrace::__rust_begin_short_backtrace",
                "std::rt::lang_start_internal",
            ]
        );
    }

    #[test]
    fn unrecognized_stacks_are_kept_whole() {
        let mut frames = vec![Frame::new("unknown", "unknown", 0), Frame::new("app::main", "main.rs", 1)];
        drop_internal(&mut frames);
        assert_eq!(frames.len(), 2);

        let crate_name = env!("CARGO_CRATE_NAME");
        let mut frames = vec![Frame::new(format!("{}::construct::new", crate_name), "construct.rs", 28)];
        drop_internal(&mut frames);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn resolved_stack_display() {
        let stack = Stack::from_frames(vec![
            Frame::new("app::inner", "src/a.rs", 3),
            Frame::new("app::outer", "src/b.rs", 9),
        ]);
        assert_eq!(stack.to_string(), "[a.rs:3 b.rs:9]");
        assert_eq!(
            format!("{:#}", stack),
            "\napp::inner\n\tsrc/a.rs:3\napp::outer\n\tsrc/b.rs:9"
        );
        assert!(stack.addresses().is_empty());
        assert!(!stack.is_empty());
    }

    #[test]
    fn capture_records_addresses() {
        let stack = Stack::capture();
        assert!(!stack.is_empty());
        assert!(stack.addresses().len() <= MAX_DEPTH + INTERNAL_SLACK);
        assert!(stack.frames().len() <= MAX_DEPTH);
    }
}
