//! Basic functions.

/// Checks that `bytes` form well-formed UTF-8.
///
/// Single substitution point for accelerated validators; the core
/// never fabricates multi-byte sequences and validates on input only.
#[inline]
pub fn validate_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}
