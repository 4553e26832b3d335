// SPDX-License-Identifier: AGPL-3.0-or-later
//! Settings store access
//!
//! The settings store supplies credentials, node addressing and the per-node
//! role/service assignment lists. It exposes two lookups: a plain key lookup
//! and an ordered lookup of every value tagged with a label family.

mod file;

pub use file::{FileSettings, FileSettingsBuilder, LabeledSetting};

use crate::error::Result;

/// Read-only view of the settings store
pub trait SettingsProvider: Send + Sync {
    /// Look up a single value by key
    ///
    /// Fails with [`crate::BootstrapError::ConfigMissing`] when the key is absent.
    fn get(&self, key: &str) -> Result<String>;

    /// All values whose label belongs to `family`, in store order
    fn list_by_label(&self, family: &str) -> Result<Vec<String>>;
}

/// Whether `label` belongs to the label family `family`
///
/// A label is in a family when it equals the family name or is
/// `<family>/<anything>`. `psn` therefore never matches `psn_roles`.
pub fn label_in_family(label: &str, family: &str) -> bool {
    match label.strip_prefix(family) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
