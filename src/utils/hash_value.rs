use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::hash::hash64;

/// `HashValue` stores the 64-bit hash of a value instead of the value itself,
/// which makes cheap copyable keys out of strings and other unsized types.
pub struct HashValue<T: Hash + ?Sized>(u64, PhantomData<T>);

impl<T: Hash + ?Sized> HashValue<T> {
    /// Constructs a zeroed `HashValue` that compares unequal to every hashed
    /// value in practice.
    pub fn zero() -> Self {
        HashValue(0, PhantomData)
    }
}

impl<T: Hash + ?Sized> Clone for HashValue<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Hash + ?Sized> Copy for HashValue<T> {}

impl<T: Hash + ?Sized> PartialEq for HashValue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Hash + ?Sized> Eq for HashValue<T> {}

impl<T: Hash + ?Sized> Hash for HashValue<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T: Hash + ?Sized> fmt::Debug for HashValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HashValue({:#x})", self.0)
    }
}

impl<'a, T, F> From<&'a F> for HashValue<T>
where
    T: Hash + ?Sized,
    F: Borrow<T> + ?Sized,
{
    fn from(v: &'a F) -> Self {
        HashValue(hash64(v.borrow()), PhantomData)
    }
}

impl From<String> for HashValue<str> {
    fn from(v: String) -> Self {
        HashValue(hash64(v.as_str()), PhantomData)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_str() {
        let a: HashValue<str> = "hello".into();
        let b: HashValue<str> = String::from("hello").into();
        let c: HashValue<str> = "world".into();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, HashValue::zero());
    }

    #[test]
    fn as_map_key() {
        use crate::utils::hash::FastHashMap;

        let mut map = FastHashMap::default();
        map.insert(HashValue::<str>::from("color"), 3);
        assert_eq!(map.get(&"color".into()), Some(&3));
    }
}
