//! Details lookup and chain walking.
//!
//! Every layer of an [`Error`](crate::Error) may carry its own details map.
//! The walkers here follow parent links only; a layer with a cause or with
//! joined errors ends the walk, so details recorded below that boundary stay
//! with the errors they describe.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use crate::error::{BaseError, Error};
use crate::foreign::Node;
use crate::value::Value;

/// Per-layer details, ordered by key.
pub type Details = BTreeMap<String, Value>;

/// Details of the first layer that can carry them, following parents.
///
/// Returns `None` when no layer can carry details or when that layer has
/// not created its map yet.
pub fn details<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Details> {
    let mut node = Node::of(err);
    loop {
        if let Some(found) = node.details() {
            return found;
        }
        node = Node::of(node.parent()?);
    }
}

/// Mutable details of the first layer of this crate, following parents,
/// created empty if needed.
pub fn details_mut<'a>(err: &'a mut (dyn StdError + 'static)) -> Option<&'a mut Details> {
    if err.is::<Error>() {
        return err.downcast_mut::<Error>().map(Error::details_mut);
    }
    let base = err.downcast_mut::<BaseError>()?;
    details_mut(base.parent_mut()?)
}

/// Details of every layer down to the first cause or joined boundary,
/// merged so that outer layers win.
///
/// # Examples
///
/// ```
/// let err = stackerr::with_details(stackerr::base("not found"), [("file", "plans.txt")]);
/// let outer = stackerr::with_details(err, [("user", "vader")]);
///
/// let all = stackerr::all_details(&outer);
/// assert_eq!(all["file"], "plans.txt");
/// assert_eq!(all["user"], "vader");
/// ```
pub fn all_details(err: &(dyn StdError + 'static)) -> Details {
    let mut merged = Details::new();
    let mut node = Node::of(err);
    loop {
        if let Some(Some(layer)) = node.details() {
            for (key, value) in layer {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        if node.cause().is_some() || !node.joined().is_empty() {
            break;
        }
        match node.parent() {
            Some(parent) => node = Node::of(parent),
            None => break,
        }
    }
    merged
}

/// The cause and joined errors of the first layer that has either,
/// following parents.
pub fn links<'a>(
    err: &'a (dyn StdError + 'static),
) -> (
    Option<&'a (dyn StdError + 'static)>,
    Vec<&'a (dyn StdError + 'static)>,
) {
    let mut node = Node::of(err);
    loop {
        let cause = node.cause();
        let joined = node.joined();
        if cause.is_some() || !joined.is_empty() {
            return (cause, joined);
        }
        match node.parent() {
            Some(parent) => node = Node::of(parent),
            None => return (None, Vec::new()),
        }
    }
}

/// The cause recorded by [`wrap`](crate::wrap), found through parents.
pub fn cause<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    links(err).0
}

/// The errors aggregated by [`join`](crate::join), found through parents.
pub fn unjoin<'a>(err: &'a (dyn StdError + 'static)) -> Vec<&'a (dyn StdError + 'static)> {
    links(err).1
}

/// Whether `err` exposes a non-empty stack, its own or a delegated one.
pub fn has_stack(err: &(dyn StdError + 'static)) -> bool {
    Node::of(err)
        .stack_trace()
        .map_or(false, |trace| !trace.is_empty())
}
