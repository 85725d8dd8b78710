//! Commonly used utilities: generation-counted handles, pools and fast hashing.

#[macro_use]
pub mod handle;
pub mod handle_pool;
pub mod hash;
pub mod hash_value;
pub mod object_pool;

pub mod prelude {
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::handle_pool::HandlePool;
    pub use super::hash::{FastHashMap, FastHashSet};
    pub use super::hash_value::HashValue;
    pub use super::object_pool::ObjectPool;
}
