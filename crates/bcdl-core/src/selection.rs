//! Selection set
//!
//! Release ids the user picked for download.

use crate::catalog::Catalog;
use crate::types::{Release, ReleaseId};
use std::collections::HashSet;

/// User-chosen subset of the catalog
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: HashSet<ReleaseId>,
}

impl SelectionSet {
    /// Create an empty selection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deselect everything
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Flip membership of `id`, returning the new membership.
    ///
    /// Ids absent from the catalog are toggled as well; they are dropped when
    /// the work list is built.
    pub fn toggle(&mut self, id: &ReleaseId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    /// Replace the selection with the catalog ids matching `predicate`
    pub fn select_all_eligible<P>(&mut self, catalog: &Catalog, predicate: P)
    where
        P: Fn(&Release) -> bool,
    {
        self.ids = catalog
            .iter()
            .filter(|r| predicate(r))
            .map(|r| r.id.clone())
            .collect();
    }

    /// Drop ids no longer in `catalog`
    pub fn retain_in(&mut self, catalog: &Catalog) {
        self.ids.retain(|id| catalog.contains(id));
    }

    /// Selected ids present in `catalog`, in catalog order
    #[must_use]
    pub fn ordered_by(&self, catalog: &Catalog) -> Vec<ReleaseId> {
        if self.ids.is_empty() {
            return Vec::new();
        }
        catalog
            .ids()
            .filter(|id| self.ids.contains(*id))
            .cloned()
            .collect()
    }

    /// Whether `id` is selected
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ReleaseId) -> bool {
        self.ids.contains(id)
    }

    /// Number of selected ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if nothing is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AcquisitionStatus;

    fn catalog() -> Catalog {
        let mut c = Catalog::new();
        c.upsert_one(Release::new("free", "f", AcquisitionStatus::Free));
        c.upsert_one(Release::new("paid", "p", AcquisitionStatus::Paid));
        c.upsert_one(Release::new("nyp", "n", AcquisitionStatus::NameYourPrice));
        c
    }

    #[test]
    fn toggle_flips() {
        let mut sel = SelectionSet::new();
        let id = ReleaseId::from("free");
        assert!(sel.toggle(&id));
        assert!(sel.contains(&id));
        assert!(!sel.toggle(&id));
        assert!(sel.is_empty());
    }

    #[test]
    fn toggle_tolerates_unknown_id() {
        let mut sel = SelectionSet::new();
        assert!(sel.toggle(&"ghost".into()));
        assert_eq!(sel.len(), 1);
        assert!(sel.ordered_by(&catalog()).is_empty());
    }

    #[test]
    fn select_all_eligible_replaces() {
        let catalog = catalog();
        let mut sel = SelectionSet::new();
        sel.toggle(&"paid".into());
        sel.toggle(&"ghost".into());

        sel.select_all_eligible(&catalog, Release::is_eligible);

        assert_eq!(sel.len(), 2);
        assert_eq!(
            sel.ordered_by(&catalog),
            vec![ReleaseId::from("free"), ReleaseId::from("nyp")]
        );
    }

    #[test]
    fn retain_in_prunes_stale_ids() {
        let mut catalog = catalog();
        let mut sel = SelectionSet::new();
        sel.select_all_eligible(&catalog, |_| true);

        catalog.replace_all([Release::new("nyp", "n", AcquisitionStatus::NameYourPrice)]);
        sel.retain_in(&catalog);

        assert_eq!(sel.len(), 1);
        assert!(sel.contains(&"nyp".into()));
    }
}
