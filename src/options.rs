//! Builder configuration.

use crate::translator::AttributeTranslator;
use std::sync::Arc;

/// Configuration shared by [`Builder`](crate::Builder) and
/// [`Parser`](crate::Parser).
#[derive(Clone, Debug)]
pub struct Options {
    /// Sort object index tables by key bytes on close.
    pub sort_attribute_names: bool,
    /// Reject objects containing the same key twice on close.
    pub check_attribute_uniqueness: bool,
    /// Emit arrays without an index table.
    pub build_unindexed_arrays: bool,
    /// Emit objects without an index table.
    pub build_unindexed_objects: bool,
    /// Sealed dictionary used to store repeated object keys as
    /// integer ids.
    pub attribute_translator: Option<Arc<AttributeTranslator>>,
}

impl Default for Options {
    #[inline]
    fn default() -> Options {
        Options {
            sort_attribute_names: true,
            check_attribute_uniqueness: false,
            build_unindexed_arrays: false,
            build_unindexed_objects: false,
            attribute_translator: None,
        }
    }
}
