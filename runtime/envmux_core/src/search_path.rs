//! The shared module search path.

use std::path::{Path, PathBuf};

/// Ordered list of module-search roots, highest priority first.
///
/// Activations prepend their environment's root and remove exactly that
/// entry on deactivation, last-in first-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(entries: impl IntoIterator<Item = PathBuf>) -> Self {
        SearchPath {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, root: &Path) -> bool {
        self.entries.iter().any(|e| e == root)
    }

    /// Append a root at lowest priority.
    pub fn push(&mut self, root: PathBuf) {
        self.entries.push(root);
    }

    /// Insert a root at highest priority.
    pub fn prepend(&mut self, root: PathBuf) {
        self.entries.insert(0, root);
    }

    /// Remove the entry a matching [`SearchPath::prepend`] added.
    ///
    /// The entry is expected at the front. If code running under the
    /// activation reordered the list, the first occurrence is removed instead.
    /// Returns `false` when the root is gone altogether.
    pub fn remove_activated(&mut self, root: &Path) -> bool {
        if self.entries.first().is_some_and(|e| e == root) {
            self.entries.remove(0);
            return true;
        }
        match self.entries.iter().position(|e| e == root) {
            Some(index) => {
                tracing::warn!(
                    root = %root.display(),
                    index,
                    "activated root was not at the front of the search path"
                );
                self.entries.remove(index);
                true
            }
            None => {
                tracing::warn!(root = %root.display(), "activated root missing from search path");
                false
            }
        }
    }
}
