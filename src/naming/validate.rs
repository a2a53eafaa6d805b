//! Safe-id validation for session ids and aliases (§4.A).
//!
//! Applied at every ingress that accepts an id from the wire or disk: the
//! endpoint add path, alias resolution, and relay target.

use crate::error::ErrorKind;

/// Rejects empty ids and anything that could escape the control directory:
/// path separators, backslashes, and `..` segments.
pub fn validate_safe_id(id: &str) -> Result<(), ErrorKind> {
    if id.is_empty() {
        return Err(ErrorKind::Parse("id must not be empty".into()));
    }
    if id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(ErrorKind::Parse(format!(
            "id {id:?} contains a path separator or '..'"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/validate_tests.rs"]
mod validate_tests;
