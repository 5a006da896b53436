//! Routing-prefix extraction.
//!
//! A filename routes by the text before its first underscore. The text after
//! it becomes the name the file carries inside its run directory.

use crate::error::{IngestError, IngestResult};

const SEPARATOR: char = '_';

/// Extract the routing prefix of `name`.
///
/// Prefixes are returned verbatim; pipeline lookup lowercases them.
///
/// # Errors
///
/// Returns [`IngestError::Unclassifiable`] when `name` has no underscore, or
/// when either side of the first underscore is empty.
pub fn classify(name: &str) -> IngestResult<&str> {
    match name.split_once(SEPARATOR) {
        Some((prefix, rest)) if !prefix.is_empty() && !rest.is_empty() => Ok(prefix),
        _ => Err(IngestError::Unclassifiable {
            file: name.to_string(),
        }),
    }
}

/// Remainder of `name` after its routing prefix and separator.
///
/// Returns `None` for unclassifiable names.
#[must_use]
pub fn strip_prefix(name: &str) -> Option<&str> {
    classify(name).ok().map(|prefix| &name[prefix.len() + SEPARATOR.len_utf8()..])
}

/// Whether `name` routes under `prefix`, ignoring ASCII case.
#[must_use]
pub fn shares_prefix(name: &str, prefix: &str) -> bool {
    classify(name).is_ok_and(|candidate| candidate.eq_ignore_ascii_case(prefix))
}
