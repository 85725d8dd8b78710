use std::cmp::Ordering;
use std::fmt;

/// The size type of `Handle`'s internal index and version.
pub type HandleIndex = u32;

/// `Handle` is a unique resource identifier based on a continuous index and a
/// generation version. The version is bumped every time the index slot is
/// recycled, so a stale copy of a handle can never alias a newer resource that
/// happens to reuse its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: HandleIndex,
    version: HandleIndex,
}

impl Handle {
    /// Constructs a new `Handle`.
    #[inline]
    pub const fn new(index: HandleIndex, version: HandleIndex) -> Self {
        Handle { index, version }
    }

    /// Constructs a nil `Handle` that will never name a live resource.
    #[inline]
    pub const fn nil() -> Self {
        Handle {
            index: 0,
            version: 0,
        }
    }

    /// Returns true if this `Handle` might point to a live resource. Live
    /// versions are always odd.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.version & 0x1 == 1
    }

    /// Returns the index of this `Handle`.
    #[inline]
    pub fn index(&self) -> HandleIndex {
        self.index
    }

    /// Returns the version of this `Handle`.
    #[inline]
    pub fn version(&self) -> HandleIndex {
        self.version
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::nil()
    }
}

impl PartialOrd for Handle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Handle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then(self.version.cmp(&other.version))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}:{}]", self.index, self.version)
    }
}

/// A trait for the strongly-typed wrappers of `Handle`.
pub trait HandleLike:
    Copy + Clone + fmt::Debug + fmt::Display + PartialEq + Eq + std::hash::Hash + Default
{
    fn new(index: HandleIndex, version: HandleIndex) -> Self;
    fn index(&self) -> HandleIndex;
    fn version(&self) -> HandleIndex;
    fn is_valid(&self) -> bool;
}

impl HandleLike for Handle {
    #[inline]
    fn new(index: HandleIndex, version: HandleIndex) -> Self {
        Handle::new(index, version)
    }

    #[inline]
    fn index(&self) -> HandleIndex {
        self.index()
    }

    #[inline]
    fn version(&self) -> HandleIndex {
        self.version()
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.is_valid()
    }
}

/// Declares a strongly-typed wrapper around `Handle`, so handles of different
/// resource classes can not be mixed up silently.
#[macro_export]
macro_rules! impl_handle {
    ($name: ident) => {
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name($crate::utils::handle::Handle);

        impl $name {
            #[inline]
            pub const fn nil() -> Self {
                $name($crate::utils::handle::Handle::nil())
            }
        }

        impl $crate::utils::handle::HandleLike for $name {
            #[inline]
            fn new(
                index: $crate::utils::handle::HandleIndex,
                version: $crate::utils::handle::HandleIndex,
            ) -> Self {
                $name($crate::utils::handle::Handle::new(index, version))
            }

            #[inline]
            fn index(&self) -> $crate::utils::handle::HandleIndex {
                self.0.index()
            }

            #[inline]
            fn version(&self) -> $crate::utils::handle::HandleIndex {
                self.0.version()
            }

            #[inline]
            fn is_valid(&self) -> bool {
                self.0.is_valid()
            }
        }

        impl From<$name> for $crate::utils::handle::Handle {
            #[inline]
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic() {
        let h = Handle::new(2, 1);
        assert_eq!(h.index(), 2);
        assert_eq!(h.version(), 1);
        assert!(h.is_valid());
    }

    #[test]
    fn nil_is_never_valid() {
        assert!(!Handle::nil().is_valid());
        assert!(!Handle::default().is_valid());
    }

    #[test]
    fn container() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Handle::new(1, 1));
        set.insert(Handle::new(1, 3));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Handle::new(1, 1)));
    }
}
