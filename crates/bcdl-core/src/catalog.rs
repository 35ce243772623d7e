//! Catalog store
//!
//! Deduplicated, discovery-ordered collection of releases. Both append paths
//! check uniqueness against the current contents.

use crate::snapshot::{AppendBuffer, Snapshot};
use crate::types::{Release, ReleaseId};
use indexmap::IndexMap;

/// Releases keyed by id, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: IndexMap<ReleaseId, Release>,
    shared: AppendBuffer<Release>,
}

impl Catalog {
    /// Create an empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every entry.
    ///
    /// The caller must clear the selection in the same handler.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.shared.restart();
    }

    /// Append `release` unless its id is already present.
    ///
    /// Returns `true` if it was inserted. An existing entry is never
    /// replaced or moved.
    pub fn upsert_one(&mut self, release: Release) -> bool {
        if self.entries.contains_key(&release.id) {
            return false;
        }
        self.shared.push(release.clone());
        self.entries.insert(release.id.clone(), release);
        true
    }

    /// Replace the contents with `releases`, first occurrence of each id wins.
    ///
    /// Returns the number of entries retained.
    pub fn replace_all(&mut self, releases: impl IntoIterator<Item = Release>) -> usize {
        self.reset();
        for release in releases {
            self.upsert_one(release);
        }
        self.entries.len()
    }

    /// Look up one release
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ReleaseId) -> Option<&Release> {
        self.entries.get(id)
    }

    /// Whether `id` is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ReleaseId) -> bool {
        self.entries.contains_key(id)
    }

    /// Releases in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Release> {
        self.entries.values()
    }

    /// Ids in catalog order
    pub fn ids(&self) -> impl Iterator<Item = &ReleaseId> {
        self.entries.keys()
    }

    /// Number of releases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the releases
    #[must_use]
    pub fn to_vec(&self) -> Vec<Release> {
        self.entries.values().cloned().collect()
    }

    /// Current contents, sharing storage with the catalog
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<Release> {
        self.shared.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AcquisitionStatus;

    fn release(id: &str, title: &str) -> Release {
        Release::new(id, title, AcquisitionStatus::Free)
    }

    fn ids(catalog: &Catalog) -> Vec<&str> {
        catalog.ids().map(ReleaseId::as_str).collect()
    }

    #[test]
    fn upsert_ignores_duplicate_and_keeps_original() {
        let mut catalog = Catalog::new();
        assert!(catalog.upsert_one(release("a", "first")));
        assert!(catalog.upsert_one(release("b", "b")));
        assert!(!catalog.upsert_one(release("a", "second")));

        assert_eq!(ids(&catalog), ["a", "b"]);
        assert_eq!(catalog.get(&"a".into()).unwrap().title, "first");
    }

    #[test]
    fn replace_all_dedups_first_wins() {
        let mut catalog = Catalog::new();
        catalog.upsert_one(release("z", "z"));

        let kept = catalog.replace_all([
            release("c", "c1"),
            release("a", "a"),
            release("c", "c2"),
        ]);

        assert_eq!(kept, 2);
        assert_eq!(ids(&catalog), ["c", "a"]);
        assert_eq!(catalog.get(&"c".into()).unwrap().title, "c1");
    }

    #[test]
    fn reset_empties() {
        let mut catalog = Catalog::new();
        catalog.upsert_one(release("a", "a"));
        catalog.reset();
        assert!(catalog.is_empty());
        assert!(!catalog.contains(&"a".into()));
    }

    #[test]
    fn snapshot_survives_later_mutation() {
        let mut catalog = Catalog::new();
        catalog.upsert_one(release("a", "a"));
        let before = catalog.snapshot();

        catalog.upsert_one(release("b", "b"));
        catalog.upsert_one(release("a", "again"));
        assert_eq!(before.len(), 1);
        assert_eq!(catalog.snapshot(), catalog.to_vec());

        catalog.replace_all([release("c", "c")]);
        assert_eq!(before.first().unwrap().title, "a");
        assert_eq!(catalog.snapshot(), vec![release("c", "c")]);
    }
}
