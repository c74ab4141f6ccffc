//! Selective restore allowlist.

use std::collections::HashMap;

/// Allowlist restricting which regular files are materialized.
///
/// An empty allowlist selects everything. Otherwise a file is selected when
/// its name is present as a key; the flag stored with it is carried along but
/// does not affect selection. Directories and links are never filtered.
///
/// # Example
///
/// ```rust
/// use pagerestore::FileSelection;
///
/// let all = FileSelection::all();
/// assert!(all.is_selected("base/1/1234"));
///
/// let only = FileSelection::from_names(["base/1/1234"]);
/// assert!(only.is_selected("base/1/1234"));
/// assert!(!only.is_selected("base/1/1235"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    files: HashMap<String, bool>,
}

impl FileSelection {
    /// Selects every file.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects exactly the given names.
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            files: names.into_iter().map(|n| (n.into(), true)).collect(),
        }
    }

    /// Builds the allowlist from a name to flag map.
    pub fn from_map(files: HashMap<String, bool>) -> Self {
        Self { files }
    }

    /// Returns true if the allowlist selects every file.
    pub fn is_all(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of listed names.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no names are listed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if the regular file `name` should be restored.
    pub fn is_selected(&self, name: &str) -> bool {
        self.is_all() || self.files.contains_key(name)
    }
}

impl<S: Into<String>> FromIterator<S> for FileSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}
