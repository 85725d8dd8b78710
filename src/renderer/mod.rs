//! The frame renderer.
//!
//! `Renderer::render` runs the whole per-frame pipeline against its device:
//! drain deferred deletions, clear, traverse and cull the scene into a render
//! list, sort, then draw the opaque bucket front-to-back and the transparent
//! bucket back-to-front. Pipeline state is resolved per material through the
//! state-diff layer, programs and uniforms through the material binder, and
//! attribute streams through the upload policy.
//!
//! A frame is synchronous and single-threaded: `render` runs to completion on
//! the thread owning the device, and re-entering it is a contract violation.

pub mod list;

pub use self::list::{RenderItem, RenderList};

use std::sync::atomic::{AtomicU32, Ordering};

use log::info;

use crate::device::{BufferHandle, Device, DrawPrimitive};
use crate::errors::Result;
use crate::math::{Color, Matrix4};
use crate::res::{
    GpuObject, RendererId, ResourceLifecycle, TextureStore,
};
use crate::scene::{Camera, Geometry, Scene};
use crate::shading::{
    MaterialBinder, MaterialHandle, MaterialRegistry, ObjectMatrices, ProgramCache,
    TemplateRegistry,
};
use crate::utils::handle_pool::HandlePool;

static RENDERER_IDS: AtomicU32 = AtomicU32::new(1);

/// Where the renderer currently is inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Traversing,
    Sorting,
    DrawingOpaque,
    DrawingTransparent,
}

/// Construction-time configuration of a renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderSetup {
    /// Depth-sorts both buckets; with it off, traversal order is kept.
    pub sorting: bool,
    /// Clear color when the scene has no background of its own.
    pub clear_color: Option<Color>,
    pub clear_depth: Option<f32>,
    pub clear_stencil: Option<i32>,
}

impl Default for RenderSetup {
    fn default() -> Self {
        RenderSetup {
            sorting: true,
            clear_color: Some(Color::black()),
            clear_depth: Some(1.0),
            clear_stencil: None,
        }
    }
}

/// Counters of one rendered frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub primitives: u32,
}

/// See the module documentation.
pub struct Renderer<D: Device> {
    id: RendererId,
    device: D,
    setup: RenderSetup,
    templates: TemplateRegistry,
    lifecycle: ResourceLifecycle,
    programs: ProgramCache,
    textures: TextureStore,
    buffers: HandlePool<BufferHandle>,
    state: crate::device::StateDiff,
    binder: MaterialBinder,
    phase: FramePhase,
}

impl<D: Device> Renderer<D> {
    pub fn new(device: D, templates: TemplateRegistry, setup: RenderSetup) -> Self {
        let id = RENDERER_IDS.fetch_add(1, Ordering::Relaxed);
        info!("Renderer {} created.", id);

        Renderer {
            id,
            device,
            setup,
            templates,
            lifecycle: ResourceLifecycle::new(),
            programs: ProgramCache::new(),
            textures: TextureStore::new(),
            buffers: HandlePool::new(),
            state: crate::device::StateDiff::new(),
            binder: MaterialBinder::new(),
            phase: FramePhase::Idle,
        }
    }

    /// The identity materials are stamped with.
    #[inline]
    pub fn id(&self) -> RendererId {
        self.id
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Registers a texture with this renderer's lifecycle. The device object
    /// is created lazily, at the texture's first bind.
    pub fn create_texture(
        &mut self,
        params: crate::device::TextureParams,
        data: Option<Vec<u8>>,
    ) -> crate::device::TextureHandle {
        self.textures.create(&mut self.lifecycle, params, data)
    }

    /// Releases a texture; the device object is freed at the next frame's
    /// drain once no other owners remain.
    pub fn destroy_texture(&mut self, handle: crate::device::TextureHandle) {
        self.textures.destroy(&mut self.lifecycle, handle);
    }

    /// Frees a material, dropping its ownership of the compiled program and
    /// of every mapped texture. References stamped by another renderer are
    /// dropped without touching this renderer's lifecycle.
    pub fn destroy_material(&mut self, materials: &mut MaterialRegistry, handle: MaterialHandle) {
        if let Some(mut material) = materials.free(handle) {
            let owns_here = material.valid_for() == Some(self.id);
            if let Some(program) = material.program.take() {
                if owns_here {
                    self.lifecycle.unuse_object(GpuObject::Program(program));
                }
            }
            for texture in material.owned_textures.drain(..) {
                if owns_here {
                    self.lifecycle.unuse_object(GpuObject::Texture(texture));
                }
            }
        }
    }

    /// Releases every device buffer a geometry uploaded through this
    /// renderer.
    pub fn release_geometry(&mut self, geometry: &mut Geometry) {
        geometry.release(&mut self.lifecycle, self.id);
    }

    /// Renders one frame of `scene` through `camera`.
    pub fn render(
        &mut self,
        scene: &mut Scene,
        materials: &mut MaterialRegistry,
        camera: &Camera,
    ) -> Result<FrameStats> {
        assert_eq!(
            self.phase,
            FramePhase::Idle,
            "render() re-entered while a frame is in flight."
        );

        let result = self.render_frame(scene, materials, camera);
        self.phase = FramePhase::Idle;
        result
    }

    fn render_frame(
        &mut self,
        scene: &mut Scene,
        materials: &mut MaterialRegistry,
        camera: &Camera,
    ) -> Result<FrameStats> {
        // Frame entry: forget per-frame bindings, run deferred deletions and
        // drop cache entries of retired programs.
        self.binder.begin_frame();
        let retired = self.lifecycle.drain(&mut self.device);
        self.programs.evict(&retired);

        let color = scene.background.or(self.setup.clear_color);
        self.device
            .clear(color, self.setup.clear_depth, self.setup.clear_stencil);

        self.phase = FramePhase::Traversing;
        let mut render_list =
            RenderList::build(scene, materials, camera, self.setup.sorting);

        self.phase = FramePhase::Sorting;
        if self.setup.sorting {
            render_list.sort();
        }

        let view = camera.view_matrix();
        let mut stats = FrameStats::default();

        self.phase = FramePhase::DrawingOpaque;
        for index in 0..render_list.opaque.len() {
            let item = render_list.opaque[index];
            self.draw_item(scene, materials, camera, &view, &item, &mut stats)?;
        }

        self.phase = FramePhase::DrawingTransparent;
        for index in 0..render_list.transparent.len() {
            let item = render_list.transparent[index];
            self.draw_item(scene, materials, camera, &view, &item, &mut stats)?;
        }

        Ok(stats)
    }

    fn draw_item(
        &mut self,
        scene: &mut Scene,
        materials: &mut MaterialRegistry,
        camera: &Camera,
        view: &Matrix4<f32>,
        item: &RenderItem,
        stats: &mut FrameStats,
    ) -> Result<()> {
        let handle = scene.override_material.unwrap_or(item.material);

        let (kind, world) = match scene.graph.node(item.node) {
            Some(node) => (node.kind, *node.world_matrix()),
            None => return Ok(()),
        };

        let material = match materials.get_mut(handle) {
            Some(v) => v,
            None => return Ok(()),
        };

        // Pipeline state, state-diffed per axis.
        if let Some(op) = self.state.depth_test(material.depth_test) {
            self.device.set_state(op);
        }
        if let Some(op) = self.state.depth_write(material.depth_write) {
            self.device.set_state(op);
        }
        if let Some(op) = self.state.blend(material.resolved_blend()) {
            self.device.set_state(op);
        }
        if let Some(op) = self.state.polygon_offset(material.polygon_offset) {
            self.device.set_state(op);
        }
        for op in self
            .state
            .face_culling(material.double_sided(), material.flip_sided())
        {
            self.device.set_state(op);
        }

        let wireframe = material.wireframe;
        let line_width = material.line_width;

        let object = ObjectMatrices::new(world, *view);
        let program = match self.binder.bind(
            &mut self.device,
            &mut self.lifecycle,
            &mut self.programs,
            &self.templates,
            &mut self.textures,
            self.id,
            handle,
            material,
            camera,
            &scene.lights,
            scene.fog.as_ref(),
            &object,
        )? {
            Some(v) => v,
            // No usable program this frame; skip the drawable.
            None => return Ok(()),
        };

        // Attribute streams, uploaded lazily and bound by cached location.
        let node = match scene.graph.node_mut(item.node) {
            Some(v) => v,
            None => return Ok(()),
        };
        let geometry = match node.geometry.as_mut() {
            Some(v) => v,
            None => return Ok(()),
        };

        for (attribute, buffer) in geometry.attributes_mut() {
            let buffer_handle =
                buffer.upload(&mut self.device, &mut self.lifecycle, &mut self.buffers, self.id)?;

            let location = self
                .programs
                .get(program)
                .and_then(|v| v.attribute_location(attribute.name()));
            if let Some(location) = location {
                self.device
                    .bind_attribute(location, buffer_handle, attribute.components());
            }
        }

        let group = match geometry.groups.get_mut(item.group) {
            Some(v) => v,
            None => return Ok(()),
        };

        // Wireframe substitutes the line-index stream and draws lines.
        let (primitive, count, index_buffer) = if wireframe && group.line_indices.is_some() {
            let lines = group.line_indices.as_mut().unwrap_or_else(|| unreachable!());
            let buffer =
                lines.upload(&mut self.device, &mut self.lifecycle, &mut self.buffers, self.id)?;
            (DrawPrimitive::Lines, group.line_index_count(), buffer)
        } else {
            let buffer = group.indices.upload(
                &mut self.device,
                &mut self.lifecycle,
                &mut self.buffers,
                self.id,
            )?;
            (kind.primitive(), group.index_count(), buffer)
        };

        if primitive == DrawPrimitive::Lines {
            if let Some(op) = self.state.line_width(line_width) {
                self.device.set_state(op);
            }
        }

        self.device
            .draw_indexed(primitive, index_buffer, group.index_format, count);

        stats.draw_calls += 1;
        stats.primitives += primitive.assemble(count);

        Ok(())
    }
}
