use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// Identity-keyed visited set for walks over graphs that may contain cycles.
///
/// A guard is an immutable path: [`CycleGuard::with`] returns a new guard
/// that shares its ancestors with the original, so concurrent sibling
/// branches each extend their own copy and never observe one another's
/// visits.
pub struct CycleGuard<K> {
    head: Option<Arc<Visit<K>>>,
}

struct Visit<K> {
    key: K,
    parent: Option<Arc<Visit<K>>>,
}

impl<K> CycleGuard<K> {
    /// A guard that has visited nothing.
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Number of identities on this path.
    pub fn depth(&self) -> usize {
        self.visits().count()
    }

    fn visits(&self) -> impl Iterator<Item = &K> {
        std::iter::successors(self.head.as_deref(), |visit| visit.parent.as_deref())
            .map(|visit| &visit.key)
    }
}

impl<K: PartialEq> CycleGuard<K> {
    /// Whether `key` has been visited on this path.
    pub fn contains(&self, key: &K) -> bool {
        self.visits().any(|visited| visited == key)
    }

    /// A guard for a branch that additionally visits `key`.
    pub fn with(&self, key: K) -> Self {
        Self {
            head: Some(Arc::new(Visit {
                key,
                parent: self.head.clone(),
            })),
        }
    }
}

impl<K> Clone for CycleGuard<K> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<K> Default for CycleGuard<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug> Debug for CycleGuard<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.visits()).finish()
    }
}
