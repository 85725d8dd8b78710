//! CPU-side texture storage, realized on first bind.

use crate::device::{Device, TextureHandle, TextureParams};
use crate::errors::{Error, Result};
use crate::utils::handle_pool::HandlePool;
use crate::utils::hash::FastHashMap;

use super::lifecycle::{GpuObject, RendererId, ResourceLifecycle};

#[derive(Debug)]
struct TextureEntry {
    params: TextureParams,
    data: Option<Vec<u8>>,
}

/// Owns the parameters and pixel bytes of every logical texture, and creates
/// the device objects lazily through the lifecycle protocol.
#[derive(Debug, Default)]
pub struct TextureStore {
    handles: HandlePool<TextureHandle>,
    entries: FastHashMap<TextureHandle, TextureEntry>,
}

impl TextureStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a texture and records this store as an owner.
    pub fn create(
        &mut self,
        lifecycle: &mut ResourceLifecycle,
        params: TextureParams,
        data: Option<Vec<u8>>,
    ) -> TextureHandle {
        let handle = self.handles.create();
        lifecycle.register(GpuObject::Texture(handle));
        lifecycle.use_object(GpuObject::Texture(handle));
        self.entries.insert(handle, TextureEntry { params, data });
        handle
    }

    /// Releases the store's ownership; the device object is freed at the next
    /// drain once no other owners remain.
    pub fn destroy(&mut self, lifecycle: &mut ResourceLifecycle, handle: TextureHandle) {
        if self.entries.remove(&handle).is_some() {
            self.handles.free(handle);
            lifecycle.unuse_object(GpuObject::Texture(handle));
        }
    }

    pub fn is_alive(&self, handle: TextureHandle) -> bool {
        self.handles.is_alive(handle)
    }

    /// Ensures the device object exists; only the first call per texture and
    /// renderer reaches the device.
    pub fn realize(
        &mut self,
        device: &mut dyn Device,
        lifecycle: &mut ResourceLifecycle,
        renderer: RendererId,
        handle: TextureHandle,
    ) -> Result<()> {
        if lifecycle.realize(GpuObject::Texture(handle), renderer) {
            let entry = self
                .entries
                .get(&handle)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;
            device.create_texture(handle, entry.params, entry.data.as_deref())?;
        }
        Ok(())
    }
}
