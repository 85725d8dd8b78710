//! CPU-side attribute storage and its upload policy.
//!
//! An `AttributeBuffer` owns the bytes of one vertex or index stream plus a
//! dirty range. `upload` turns that into the cheapest correct device
//! operation: the first touch allocates and uploads fully; afterwards static
//! buffers are always re-uploaded whole, while dynamic buffers send only the
//! recorded byte sub-range when one exists.

use crate::device::{BufferHandle, BufferHint, BufferKind, Device};
use crate::errors::{Error, Result};
use crate::utils::handle_pool::HandlePool;

use super::lifecycle::{GpuObject, RendererId, ResourceLifecycle};

/// The declared update frequency of an attribute stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeUsage {
    Static,
    Dynamic,
}

impl From<AttributeUsage> for BufferHint {
    fn from(v: AttributeUsage) -> Self {
        match v {
            AttributeUsage::Static => BufferHint::Static,
            AttributeUsage::Dynamic => BufferHint::Dynamic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DirtyRange {
    Clean,
    All,
    /// Byte range `[start, end)`.
    Bytes(usize, usize),
}

/// One vertex or index stream with CPU bytes, a device handle once realized,
/// and a dirty range driving the upload policy.
#[derive(Debug, Clone)]
pub struct AttributeBuffer {
    kind: BufferKind,
    usage: AttributeUsage,
    stride: usize,
    data: Vec<u8>,
    dirty: DirtyRange,
    handle: Option<BufferHandle>,
    realizer: Option<RendererId>,
}

impl AttributeBuffer {
    /// A vertex stream. `stride` is the byte size of one element.
    pub fn vertex(usage: AttributeUsage, stride: usize, data: Vec<u8>) -> Self {
        AttributeBuffer {
            kind: BufferKind::Vertex,
            usage,
            stride,
            data,
            dirty: DirtyRange::All,
            handle: None,
            realizer: None,
        }
    }

    /// An index stream. `stride` is the byte size of one index.
    pub fn index(usage: AttributeUsage, stride: usize, data: Vec<u8>) -> Self {
        AttributeBuffer {
            kind: BufferKind::Index,
            usage,
            stride,
            data,
            dirty: DirtyRange::All,
            handle: None,
            realizer: None,
        }
    }

    #[inline]
    pub fn usage(&self) -> AttributeUsage {
        self.usage
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of whole elements in the stream.
    #[inline]
    pub fn element_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// The device handle, once the buffer has been uploaded at least once.
    #[inline]
    pub fn handle(&self) -> Option<BufferHandle> {
        self.handle
    }

    /// Overwrites a byte range of the stream and widens the dirty range to
    /// cover it.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset + bytes.len();
        if end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        self.data[offset..end].copy_from_slice(bytes);
        self.dirty = match self.dirty {
            DirtyRange::Clean => DirtyRange::Bytes(offset, end),
            DirtyRange::All => DirtyRange::All,
            DirtyRange::Bytes(s, e) => DirtyRange::Bytes(s.min(offset), e.max(end)),
        };
        Ok(())
    }

    /// Replaces the whole stream. The next upload is unconditionally full.
    pub fn replace(&mut self, data: Vec<u8>) {
        self.data = data;
        self.dirty = DirtyRange::All;
    }

    /// Ensures the device buffer exists and is current, issuing at most one
    /// device operation, then clears the dirty range.
    pub fn upload(
        &mut self,
        device: &mut dyn Device,
        lifecycle: &mut ResourceLifecycle,
        handles: &mut HandlePool<BufferHandle>,
        renderer: RendererId,
    ) -> Result<BufferHandle> {
        if self.handle.is_some() && self.realizer != Some(renderer) {
            // The device object belongs to another renderer; its lifecycle
            // keeps that reference, this one starts from scratch.
            self.handle = None;
        }

        let handle = match self.handle {
            Some(v) => v,
            None => {
                let v = handles.create();
                lifecycle.register(GpuObject::Buffer(v));
                lifecycle.use_object(GpuObject::Buffer(v));
                self.handle = Some(v);
                self.realizer = Some(renderer);
                v
            }
        };

        if lifecycle.realize(GpuObject::Buffer(handle), renderer) {
            device.create_buffer(handle, self.kind, self.usage.into(), &self.data)?;
        } else {
            match (self.usage, self.dirty) {
                (_, DirtyRange::Clean) => {}
                (AttributeUsage::Dynamic, DirtyRange::Bytes(s, e)) => {
                    device.update_buffer(handle, s, &self.data[s..e])?;
                }
                // Static streams and un-ranged dynamic writes re-upload fully.
                _ => device.update_buffer(handle, 0, &self.data)?,
            }
        }

        self.dirty = DirtyRange::Clean;
        Ok(handle)
    }

    /// Drops this stream's ownership of the device buffer. Only the renderer
    /// that realized the buffer holds a reference to release.
    pub fn release(&mut self, lifecycle: &mut ResourceLifecycle, renderer: RendererId) {
        if let Some(v) = self.handle.take() {
            if self.realizer == Some(renderer) {
                lifecycle.unuse_object(GpuObject::Buffer(v));
            }
        }
        self.realizer = None;
    }
}
