//! The fixed set of module identifiers allowed to register.

use std::collections::BTreeSet;

/// Core modules of the host editor that exchange private APIs.
pub const CORE_MODULES: &[&str] = &[
    "@wordpress/data",
    "@wordpress/block-editor",
    "@wordpress/block-library",
    "@wordpress/blocks",
    "@wordpress/components",
    "@wordpress/core-data",
    "@wordpress/date",
    "@wordpress/edit-post",
    "@wordpress/edit-site",
    "@wordpress/edit-widgets",
    "@wordpress/rich-text",
];

/// Immutable set of module identifiers permitted to register.
///
/// Built once from configuration and never changed afterwards; the
/// registry only consults it when minting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    modules: BTreeSet<String>,
}

impl AllowList {
    /// The built-in list of core modules.
    pub fn core() -> Self {
        CORE_MODULES.iter().copied().collect()
    }

    /// Whether `module_id` may register.
    pub fn contains(&self, module_id: &str) -> bool {
        self.modules.contains(module_id)
    }

    /// Iterate identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    /// Number of allowed modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is allowed at all.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().map(Into::into).collect(),
        }
    }
}
