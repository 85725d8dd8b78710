//! GPU resource lifetimes.
//!
//! Logical objects (geometry buffers, textures, compiled programs) and their
//! device-side backing objects have different lifetimes: several owners can
//! share one resource, a resource can lose its device object while the
//! logical object survives, and actual device deletion must never happen in
//! the middle of a frame. `ResourceLifecycle` is the single table that tracks
//! all three concerns:
//!
//! - `use_object` / `unuse_object` count the logical owners. The transition
//!   to zero automatically enqueues the resource for deletion.
//! - `realize` / `unrealize` track the device object. `realize` is
//!   idempotent: only the first call per resource reports that the backing
//!   object must actually be created.
//! - The pending-delete queue is drained explicitly, at the start of the
//!   next frame, never mid-frame.
//!
//! Misuse of the counting protocol is a programming bug, not a runtime
//! condition, and panics.

use log::info;

use crate::device::{BufferHandle, Device, ProgramHandle, TextureHandle};
use crate::utils::hash::FastHashMap;

/// The identity of a renderer instance. Device objects are only valid in the
/// renderer (context) that realized them.
pub type RendererId = u32;

/// A device-backed object of any class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuObject {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    Program(ProgramHandle),
}

impl From<BufferHandle> for GpuObject {
    fn from(v: BufferHandle) -> Self {
        GpuObject::Buffer(v)
    }
}

impl From<TextureHandle> for GpuObject {
    fn from(v: TextureHandle) -> Self {
        GpuObject::Texture(v)
    }
}

impl From<ProgramHandle> for GpuObject {
    fn from(v: ProgramHandle) -> Self {
        GpuObject::Program(v)
    }
}

#[derive(Debug, Default)]
struct Entry {
    users: u32,
    realized_by: Option<RendererId>,
    retired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    /// Free the device object only; the logical resource survives.
    Unrealize(GpuObject),
    /// Free the device object if any, then forget the resource.
    Retire(GpuObject),
}

/// See the module documentation.
#[derive(Debug, Default)]
pub struct ResourceLifecycle {
    entries: FastHashMap<GpuObject, Entry>,
    pending: Vec<Pending>,
}

impl ResourceLifecycle {
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts tracking a resource with zero users and no device object.
    pub fn register<T: Into<GpuObject>>(&mut self, obj: T) {
        self.entries.entry(obj.into()).or_default();
    }

    /// Starts tracking a resource whose device object already exists, e.g. a
    /// program compiled eagerly by the cache.
    pub fn register_realized<T: Into<GpuObject>>(&mut self, obj: T, renderer: RendererId) {
        let entry = self.entries.entry(obj.into()).or_default();
        entry.realized_by = Some(renderer);
    }

    /// Records one more owner of the resource. Re-using a resource that was
    /// queued for retirement cancels the retirement, so cached objects can be
    /// handed back out until the drain actually runs.
    pub fn use_object<T: Into<GpuObject>>(&mut self, obj: T) {
        let obj = obj.into();
        let entry = self
            .entries
            .get_mut(&obj)
            .unwrap_or_else(|| panic!("Using {:?} which was never registered.", obj));
        entry.users += 1;

        let resurrected = entry.retired;
        entry.retired = false;
        if resurrected {
            self.pending.retain(|p| *p != Pending::Retire(obj));
        }
    }

    /// Drops one owner. The transition to zero enqueues the resource into the
    /// pending-delete queue; dropping an owner that was never recorded
    /// panics.
    pub fn unuse_object<T: Into<GpuObject>>(&mut self, obj: T) {
        let obj = obj.into();
        let entry = self
            .entries
            .get_mut(&obj)
            .unwrap_or_else(|| panic!("Releasing {:?} which was never registered.", obj));

        assert!(
            entry.users > 0,
            "Releasing {:?} more times than it was used.",
            obj
        );

        entry.users -= 1;
        if entry.users == 0 && !entry.retired {
            entry.retired = true;
            self.pending.push(Pending::Retire(obj));
        }
    }

    /// The current owner count.
    pub fn users<T: Into<GpuObject>>(&self, obj: T) -> u32 {
        self.entries.get(&obj.into()).map_or(0, |v| v.users)
    }

    /// Claims the device object for `renderer`. Returns true exactly when the
    /// backing object must be created now; repeated calls from the same
    /// renderer are no-ops. Realizing a resource nobody owns, or one already
    /// realized by a different renderer, is fatal.
    pub fn realize<T: Into<GpuObject>>(&mut self, obj: T, renderer: RendererId) -> bool {
        let obj = obj.into();
        let entry = self
            .entries
            .get_mut(&obj)
            .unwrap_or_else(|| panic!("Realizing {:?} which was never registered.", obj));

        assert!(
            entry.users > 0,
            "Realizing {:?} with zero users; `use` it first.",
            obj
        );

        match entry.realized_by {
            Some(id) => {
                assert_eq!(
                    id, renderer,
                    "{:?} is already realized by renderer {}.",
                    obj, id
                );
                false
            }
            None => {
                entry.realized_by = Some(renderer);
                // An unrealize issued earlier this frame has not reached the
                // device yet; cancel it and keep the old backing object.
                let cancelled = self.pending.iter().position(|p| *p == Pending::Unrealize(obj));
                match cancelled {
                    Some(i) => {
                        self.pending.remove(i);
                        false
                    }
                    None => true,
                }
            }
        }
    }

    /// Returns true if the resource currently has a device object.
    pub fn is_realized<T: Into<GpuObject>>(&self, obj: T) -> bool {
        self.entries
            .get(&obj.into())
            .map_or(false, |v| v.realized_by.is_some())
    }

    /// Gives up the device object while keeping the logical resource alive.
    /// The actual device deletion is deferred to the next drain.
    pub fn unrealize<T: Into<GpuObject>>(&mut self, obj: T, renderer: RendererId) {
        let obj = obj.into();
        let entry = self
            .entries
            .get_mut(&obj)
            .unwrap_or_else(|| panic!("Unrealizing {:?} which was never registered.", obj));

        match entry.realized_by {
            Some(id) => {
                assert_eq!(
                    id, renderer,
                    "{:?} was realized by renderer {}, not {}.",
                    obj, id, renderer
                );
                entry.realized_by = None;
                self.pending.push(Pending::Unrealize(obj));
            }
            None => {}
        }
    }

    /// Frees a resource that is known to have no owners left. Destroying a
    /// resource still in use is fatal.
    pub fn destroy<T: Into<GpuObject>>(&mut self, obj: T) {
        let obj = obj.into();
        let entry = self
            .entries
            .get_mut(&obj)
            .unwrap_or_else(|| panic!("Destroying {:?} which was never registered.", obj));

        assert!(
            entry.users == 0,
            "Destroying {:?} while {} owner(s) remain.",
            obj,
            entry.users
        );

        if !entry.retired {
            entry.retired = true;
            self.pending.push(Pending::Retire(obj));
        }
    }

    /// The number of queued deletions.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Executes the queued deletions against the device and returns the
    /// resources that were fully retired, so dependent caches can evict them.
    pub fn drain(&mut self, device: &mut dyn Device) -> Vec<GpuObject> {
        let mut retired = Vec::new();

        for pending in self.pending.drain(..) {
            match pending {
                Pending::Unrealize(obj) => {
                    delete_device_object(device, obj);
                }
                Pending::Retire(obj) => {
                    if let Some(entry) = self.entries.remove(&obj) {
                        if entry.realized_by.is_some() {
                            delete_device_object(device, obj);
                        }
                    }
                    retired.push(obj);
                }
            }
        }

        if !retired.is_empty() {
            info!("Retired {} GPU resource(s).", retired.len());
        }

        retired
    }
}

fn delete_device_object(device: &mut dyn Device, obj: GpuObject) {
    match obj {
        GpuObject::Buffer(handle) => device.delete_buffer(handle),
        GpuObject::Texture(handle) => device.delete_texture(handle),
        GpuObject::Program(handle) => device.delete_program(handle),
    }
}
