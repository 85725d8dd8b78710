use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::marker::PhantomData;

use super::handle::{HandleIndex, HandleLike};

/// `HandlePool` manages the manual creation and destruction of generation
/// counted handles. Freed indices are recycled lowest-first, with the slot's
/// version bumped so stale handles are rejected.
#[derive(Debug, Clone)]
pub struct HandlePool<H: HandleLike> {
    versions: Vec<HandleIndex>,
    frees: BinaryHeap<InverseHandleIndex>,
    _marker: PhantomData<H>,
}

impl<H: HandleLike> Default for HandlePool<H> {
    fn default() -> Self {
        HandlePool {
            versions: Vec::new(),
            frees: BinaryHeap::new(),
            _marker: PhantomData,
        }
    }
}

impl<H: HandleLike> HandlePool<H> {
    /// Creates a new and empty `HandlePool`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new and empty `HandlePool` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        HandlePool {
            versions: Vec::with_capacity(capacity),
            frees: BinaryHeap::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// Creates an unique handle.
    pub fn create(&mut self) -> H {
        if let Some(InverseHandleIndex(index)) = self.frees.pop() {
            // Bumps an even version back to odd, marking the slot alive again.
            self.versions[index as usize] += 1;
            H::new(index, self.versions[index as usize])
        } else {
            self.versions.push(1);
            H::new((self.versions.len() - 1) as HandleIndex, 1)
        }
    }

    /// Returns true if this `Handle` was created by this pool and has not been
    /// freed since.
    pub fn is_alive(&self, handle: H) -> bool {
        let index = handle.index() as usize;
        let version = handle.version();

        index < self.versions.len() && (version & 0x1 == 1) && self.versions[index] == version
    }

    /// Recycles the handle index, invalidating all outstanding copies of it.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.is_alive(handle) {
            false
        } else {
            self.versions[handle.index() as usize] += 1;
            self.frees.push(InverseHandleIndex(handle.index()));
            true
        }
    }

    /// Returns the total number of alive handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    /// Returns true if there are no alive handles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the alive handles.
    pub fn iter(&self) -> Iter<'_, H> {
        Iter {
            versions: &self.versions,
            index: 0,
            _marker: PhantomData,
        }
    }
}

// So the BinaryHeap pops the smallest free index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InverseHandleIndex(HandleIndex);

impl PartialOrd for InverseHandleIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InverseHandleIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

pub struct Iter<'a, H: HandleLike> {
    versions: &'a [HandleIndex],
    index: usize,
    _marker: PhantomData<H>,
}

impl<'a, H: HandleLike> Iterator for Iter<'a, H> {
    type Item = H;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.versions.len() {
            let v = self.versions[self.index];
            let i = self.index as HandleIndex;
            self.index += 1;

            if v & 0x1 == 1 {
                return Some(H::new(i, v));
            }
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::super::handle::Handle;
    use super::*;

    #[test]
    fn create_and_free() {
        let mut pool = HandlePool::<Handle>::new();
        let a = pool.create();
        let b = pool.create();

        assert!(pool.is_alive(a));
        assert!(pool.is_alive(b));
        assert_eq!(pool.len(), 2);

        assert!(pool.free(a));
        assert!(!pool.is_alive(a));
        assert!(!pool.free(a));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn reuse_bumps_version() {
        let mut pool = HandlePool::<Handle>::new();
        let a = pool.create();
        pool.free(a);

        let b = pool.create();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.version(), b.version());
        assert!(!pool.is_alive(a));
        assert!(pool.is_alive(b));
    }

    #[test]
    fn lowest_free_index_first() {
        let mut pool = HandlePool::<Handle>::new();
        let v: Vec<_> = (0..4).map(|_| pool.create()).collect();

        pool.free(v[2]);
        pool.free(v[0]);

        assert_eq!(pool.create().index(), 0);
        assert_eq!(pool.create().index(), 2);
    }

    #[test]
    fn iter_skips_freed() {
        let mut pool = HandlePool::<Handle>::new();
        let v: Vec<_> = (0..3).map(|_| pool.create()).collect();
        pool.free(v[1]);

        let alive: Vec<_> = pool.iter().map(|h: Handle| h.index()).collect();
        assert_eq!(alive, vec![0, 2]);
    }
}
