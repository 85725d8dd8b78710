//! GPU resource management: lifetimes, attribute streams and textures.

pub mod attributes;
pub mod lifecycle;
pub mod textures;

pub use self::attributes::{AttributeBuffer, AttributeUsage};
pub use self::lifecycle::{GpuObject, RendererId, ResourceLifecycle};
pub use self::textures::TextureStore;
