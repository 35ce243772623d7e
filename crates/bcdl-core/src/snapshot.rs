//! Cheap read-only views of append-only sequences
//!
//! An [`AppendBuffer`] hands out [`Snapshot`]s that share its storage and
//! remember the length at capture time. The buffer only ever pushes, so the
//! captured prefix never changes. Starting over swaps in fresh storage and
//! leaves older snapshots intact.

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Growable storage whose prefixes can be shared without copying
pub(crate) struct AppendBuffer<T> {
    items: Arc<RwLock<Vec<T>>>,
    len: usize,
}

impl<T> AppendBuffer<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        self.items.write().push(item);
        self.len += 1;
    }

    /// Drop everything; snapshots taken before keep their contents
    pub(crate) fn restart(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            items: Arc::clone(&self.items),
            len: self.len,
        }
    }
}

impl<T> Default for AppendBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for AppendBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::new(RwLock::new(self.items.read()[..self.len].to_vec())),
            len: self.len,
        }
    }
}

impl<T> fmt::Debug for AppendBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendBuffer").field("len", &self.len).finish()
    }
}

/// Immutable prefix of an [`AppendBuffer`], or an owned list
pub struct Snapshot<T> {
    items: Arc<RwLock<Vec<T>>>,
    len: usize,
}

impl<T> Snapshot<T> {
    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the items without copying them
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let items = self.items.read();
        f(&items[..self.len])
    }
}

impl<T: Clone> Snapshot<T> {
    /// Item at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.with(|items| items.get(index).cloned())
    }

    /// First item
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.get(0)
    }

    /// Last item
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Owned copy of the items
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.with(<[T]>::to_vec)
    }

    /// Iterate over owned copies of the items
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }
}

impl<T> From<Vec<T>> for Snapshot<T> {
    fn from(items: Vec<T>) -> Self {
        let len = items.len();
        Self {
            items: Arc::new(RwLock::new(items)),
            len,
        }
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            len: self.len,
        }
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Vec::new().into()
    }
}

impl<T: PartialEq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.items, &other.items) {
            return self.len == other.len;
        }
        self.with(|a| other.with(|b| a == b))
    }
}

impl<T: Eq> Eq for Snapshot<T> {}

impl<T: PartialEq> PartialEq<Vec<T>> for Snapshot<T> {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.with(|items| items == other.as_slice())
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|items| f.debug_list().entries(items).finish())
    }
}

impl<T: Serialize> Serialize for Snapshot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with(|items| items.serialize(serializer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_captured_prefix() {
        let mut buf = AppendBuffer::new();
        buf.push(1);
        buf.push(2);
        let early = buf.snapshot();
        buf.push(3);

        assert_eq!(early, vec![1, 2]);
        assert_eq!(buf.snapshot(), vec![1, 2, 3]);
        assert_eq!(early.last(), Some(2));
    }

    #[test]
    fn restart_leaves_old_snapshots_alone() {
        let mut buf = AppendBuffer::new();
        buf.push("a");
        let before = buf.snapshot();
        buf.restart();
        buf.push("b");

        assert_eq!(before, vec!["a"]);
        assert_eq!(buf.snapshot(), vec!["b"]);
        assert_ne!(before, buf.snapshot());
    }

    #[test]
    fn clone_does_not_share_storage() {
        let mut buf = AppendBuffer::new();
        buf.push(1);
        let mut copy = buf.clone();
        copy.push(2);

        assert_eq!(buf.snapshot().len(), 1);
        assert_eq!(copy.snapshot(), vec![1, 2]);
    }

    #[test]
    fn serializes_as_list() {
        let snap: Snapshot<u8> = vec![1, 2].into();
        assert_eq!(serde_json::to_string(&snap).unwrap(), "[1,2]");
        assert!(Snapshot::<u8>::default().is_empty());
    }
}
