use super::handle::HandleLike;
use super::handle_pool::{self, HandlePool};

/// A named object collection backed by `HandlePool`, which is used to manage
/// the lifetimes of objects through strongly-typed handles.
#[derive(Debug, Clone)]
pub struct ObjectPool<H: HandleLike, T> {
    handles: HandlePool<H>,
    entries: Vec<Option<T>>,
}

impl<H: HandleLike, T> Default for ObjectPool<H, T> {
    fn default() -> Self {
        ObjectPool {
            handles: HandlePool::new(),
            entries: Vec::new(),
        }
    }
}

impl<H: HandleLike, T> ObjectPool<H, T> {
    /// Creates a new and empty `ObjectPool`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Stores the value, returning the handle that names it.
    pub fn create(&mut self, value: T) -> H {
        let handle = self.handles.create();

        if handle.index() as usize >= self.entries.len() {
            self.entries.push(Some(value));
        } else {
            self.entries[handle.index() as usize] = Some(value);
        }

        handle
    }

    /// Returns a reference to the value named by the handle, if alive.
    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        if self.handles.is_alive(handle) {
            self.entries[handle.index() as usize].as_ref()
        } else {
            None
        }
    }

    /// Returns a mutable reference to the value named by the handle, if alive.
    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if self.handles.is_alive(handle) {
            self.entries[handle.index() as usize].as_mut()
        } else {
            None
        }
    }

    /// Returns true if the handle names a live value.
    #[inline]
    pub fn is_alive(&self, handle: H) -> bool {
        self.handles.is_alive(handle)
    }

    /// Frees the value named by the handle, returning it if it was alive.
    pub fn free(&mut self, handle: H) -> Option<T> {
        if self.handles.free(handle) {
            self.entries[handle.index() as usize].take()
        } else {
            None
        }
    }

    /// Returns the total number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the pool holds no live values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns an iterator over the live handles.
    #[inline]
    pub fn keys(&self) -> handle_pool::Iter<'_, H> {
        self.handles.iter()
    }

    /// Returns an iterator over the live values.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|v| v.as_ref())
    }
}
