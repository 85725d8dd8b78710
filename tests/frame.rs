//! End-to-end frame scenarios against the recording device.

use prism::device::headless::{DeviceCall, RecordingDevice};
use prism::device::{Blend, DrawPrimitive, IndexFormat, StateOp};
use prism::math::{Matrix4, Point3, Vector3};
use prism::prelude::*;
use prism::res::AttributeUsage;
use prism::scene::geometry::{pack_f32, pack_u16};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn triangle(with_lines: bool) -> Geometry {
    let mut geometry = Geometry::new();
    geometry.set_attribute(
        VertexAttribute::Position,
        AttributeBuffer::vertex(
            AttributeUsage::Static,
            12,
            pack_f32(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        ),
    );
    geometry.set_attribute(
        VertexAttribute::Uv,
        AttributeBuffer::vertex(AttributeUsage::Static, 8, pack_f32(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0])),
    );
    geometry.add_group(GeometryGroup {
        indices: AttributeBuffer::index(AttributeUsage::Static, 2, pack_u16(&[0, 1, 2])),
        line_indices: if with_lines {
            Some(AttributeBuffer::index(
                AttributeUsage::Static,
                2,
                pack_u16(&[0, 1, 1, 2, 2, 0]),
            ))
        } else {
            None
        },
        index_format: IndexFormat::U16,
        material_slot: 0,
    });
    geometry
}

struct Fixture {
    renderer: Renderer<RecordingDevice>,
    materials: MaterialRegistry,
    scene: Scene,
    camera: Camera,
}

impl Fixture {
    fn new() -> Self {
        init_logger();

        let templates = TemplateRegistry::standard();
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.look_at(
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );

        Fixture {
            renderer: Renderer::new(RecordingDevice::new(), templates, RenderSetup::default()),
            materials: MaterialRegistry::new(),
            scene: Scene::new(),
            camera,
        }
    }

    fn material(&mut self, shading: Shading) -> MaterialHandle {
        self.materials
            .create(Material::new(shading, self.renderer.templates()))
    }

    fn add_at(&mut self, material: MaterialHandle, z: f32) -> NodeId {
        let id = self.scene.add_mesh(triangle(false), material);
        self.scene
            .graph
            .node_mut(id)
            .unwrap()
            .set_local_matrix(Matrix4::from_translation(Vector3::new(0.0, 0.0, z)));
        id
    }

    fn render(&mut self) -> FrameStats {
        self.renderer
            .render(&mut self.scene, &mut self.materials, &self.camera)
            .unwrap()
    }

    fn calls(&self) -> &[DeviceCall] {
        &self.renderer.device().calls
    }

    fn clear_calls(&mut self) {
        self.renderer.device_mut().clear_calls();
    }
}

#[test]
fn opaque_draws_before_transparent_with_blend_toggled() {
    let mut fx = Fixture::new();

    let opaque = fx.material(Shading::Basic);
    let glass_handle = fx.material(Shading::Basic);
    fx.materials.get_mut(glass_handle).unwrap().transparent = true;

    // The transparent plane sits nearer the camera than the opaque cube, but
    // bucket order must still put the opaque draw first.
    fx.add_at(glass_handle, 5.0);
    fx.add_at(opaque, 0.0);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 2);

    let draws: Vec<usize> = fx
        .calls()
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, DeviceCall::DrawIndexed(..)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(draws.len(), 2);

    let blend_off = fx
        .calls()
        .iter()
        .position(|v| *v == DeviceCall::SetState(StateOp::Blend(None)))
        .expect("blending disabled before the opaque bucket");
    let blend_on = fx
        .calls()
        .iter()
        .position(|v| *v == DeviceCall::SetState(StateOp::Blend(Some(Blend::ALPHA))))
        .expect("alpha blending enabled for the transparent bucket");

    assert!(blend_off < draws[0]);
    assert!(draws[0] < blend_on && blend_on < draws[1]);
}

#[test]
fn wireframe_substitutes_the_line_index_stream() {
    let mut fx = Fixture::new();

    let handle = fx.material(Shading::Basic);
    {
        let material = fx.materials.get_mut(handle).unwrap();
        material.wireframe = true;
        material.line_width = 2.0;
    }

    fx.scene.add_mesh(triangle(true), handle);
    fx.render();

    let draw = fx
        .calls()
        .iter()
        .find_map(|v| match v {
            DeviceCall::DrawIndexed(primitive, _, format, count) => {
                Some((*primitive, *format, *count))
            }
            _ => None,
        })
        .expect("one draw expected");

    // Six line indices, drawn as lines.
    assert_eq!(draw, (DrawPrimitive::Lines, IndexFormat::U16, 6));
    assert!(fx
        .calls()
        .iter()
        .any(|v| *v == DeviceCall::SetState(StateOp::LineWidth(2.0))));
}

#[test]
fn programs_compile_once_per_content_key() {
    let mut fx = Fixture::new();
    let handle = fx.material(Shading::Lambert);
    fx.add_at(handle, 0.0);
    fx.add_at(handle, 2.0);

    fx.render();
    fx.render();

    let compiles = fx
        .renderer
        .device()
        .count(|v| matches!(v, DeviceCall::CreateProgram(_)));
    assert_eq!(compiles, 1);

    // A touch that leaves the feature set alone re-validates from the cache.
    fx.materials.get_mut(handle).unwrap().touch();
    fx.render();
    let compiles = fx
        .renderer
        .device()
        .count(|v| matches!(v, DeviceCall::CreateProgram(_)));
    assert_eq!(compiles, 1);

    // Changing the feature set is a new content key and a fresh compile.
    fx.materials.get_mut(handle).unwrap().set_vertex_colors(true);
    fx.render();
    let compiles = fx
        .renderer
        .device()
        .count(|v| matches!(v, DeviceCall::CreateProgram(_)));
    assert_eq!(compiles, 2);
}

#[test]
fn failed_compile_skips_the_material_but_not_the_frame() {
    let mut fx = Fixture::new();

    let broken = fx.material(Shading::Phong);
    let good = fx.material(Shading::Basic);
    // The broken drawable sits nearer the camera, so its compile is attempted
    // first.
    fx.add_at(broken, 2.0);
    fx.add_at(good, 0.0);

    fx.renderer.device_mut().fail_next_compile = true;
    let stats = fx.render();

    // The broken material is skipped; the other drawable still lands.
    assert_eq!(stats.draw_calls, 1);

    // No retry without an explicit touch.
    fx.clear_calls();
    let stats = fx.render();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::CreateProgram(_))),
        0
    );

    fx.materials.get_mut(broken).unwrap().touch();
    let stats = fx.render();
    assert_eq!(stats.draw_calls, 2);
}

#[test]
fn shared_state_issues_one_device_call_per_run() {
    let mut fx = Fixture::new();

    let handle = fx.material(Shading::Basic);
    fx.materials.get_mut(handle).unwrap().depth_test = false;

    for i in 0..10 {
        fx.add_at(handle, i as f32 * 0.1);
    }

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 10);

    let depth_ops = fx
        .renderer
        .device()
        .count(|v| matches!(v, DeviceCall::SetState(StateOp::DepthTest(_))));
    assert_eq!(depth_ops, 1);
}

#[test]
fn pipeline_state_persists_across_frames() {
    let mut fx = Fixture::new();
    let handle = fx.material(Shading::Basic);
    fx.add_at(handle, 0.0);

    fx.render();
    fx.clear_calls();
    fx.render();

    // Nothing changed between frames, so no state ops at all.
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::SetState(_))),
        0
    );
}

#[test]
fn buffers_upload_once_and_partial_updates_stay_partial() {
    let mut fx = Fixture::new();
    let handle = fx.material(Shading::Basic);
    let id = fx.add_at(handle, 0.0);

    fx.render();
    let creates = fx
        .renderer
        .device()
        .count(|v| matches!(v, DeviceCall::CreateBuffer(..)));
    // Position, uv and index streams.
    assert_eq!(creates, 3);

    // A clean second frame re-uploads nothing.
    fx.clear_calls();
    fx.render();
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::CreateBuffer(..) | DeviceCall::UpdateBuffer(..))),
        0
    );

    // Dynamic usage with a recorded range updates just that range.
    {
        let node = fx.scene.graph.node_mut(id).unwrap();
        let geometry = node.geometry.as_mut().unwrap();
        geometry.set_attribute(
            VertexAttribute::Position,
            AttributeBuffer::vertex(AttributeUsage::Dynamic, 12, pack_f32(&[0.0; 9])),
        );
    }
    fx.clear_calls();
    fx.render();

    {
        let node = fx.scene.graph.node_mut(id).unwrap();
        let geometry = node.geometry.as_mut().unwrap();
        let position = geometry.attribute_mut(VertexAttribute::Position).unwrap();
        position.write(12, &pack_f32(&[9.0, 9.0, 9.0])).unwrap();
    }
    fx.clear_calls();
    fx.render();

    let updates: Vec<(usize, usize)> = fx
        .calls()
        .iter()
        .filter_map(|v| match v {
            DeviceCall::UpdateBuffer(_, offset, len) => Some((*offset, *len)),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec![(12, 12)]);
}

#[test]
fn mapped_texture_survives_store_destroy() {
    let mut fx = Fixture::new();

    let texture = fx.renderer.create_texture(TextureParams::default(), None);
    let handle = fx.material(Shading::Basic);
    fx.materials
        .get_mut(handle)
        .unwrap()
        .set_map_diffuse(Some(texture));

    fx.add_at(handle, 0.0);
    fx.add_at(handle, 2.0);

    fx.render();
    fx.render();
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::CreateTexture(..))),
        1
    );

    // The material co-owns the texture, so dropping the store's reference
    // neither deletes the device object nor breaks the next frame.
    fx.renderer.destroy_texture(texture);
    let stats = fx.render();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::DeleteTexture(_))),
        0
    );

    // Unmapping releases the material's reference at bind time; the drain of
    // the frame after that deletes the texture.
    fx.materials.get_mut(handle).unwrap().set_map_diffuse(None);
    fx.render();
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::DeleteTexture(_))),
        0
    );

    fx.render();
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::DeleteTexture(_))),
        1
    );
}

#[test]
fn a_material_moves_between_renderers() {
    let mut fx = Fixture::new();
    let handle = fx.material(Shading::Basic);
    fx.add_at(handle, 0.0);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 1);

    // A second renderer compiles and uploads everything for itself; the
    // first renderer's references are left untouched.
    let mut second = Renderer::new(
        RecordingDevice::new(),
        TemplateRegistry::standard(),
        RenderSetup::default(),
    );
    let stats = second
        .render(&mut fx.scene, &mut fx.materials, &fx.camera)
        .unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(
        second
            .device()
            .count(|v| matches!(v, DeviceCall::CreateProgram(_))),
        1
    );
    assert_eq!(
        second
            .device()
            .count(|v| matches!(v, DeviceCall::CreateBuffer(..))),
        3
    );

    // Moving back restamps the material on the first renderer again.
    let stats = fx.render();
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn override_material_short_circuits_resolution() {
    let mut fx = Fixture::new();

    let phong = fx.material(Shading::Phong);
    let lambert = fx.material(Shading::Lambert);
    let plain = fx.material(Shading::Basic);

    fx.add_at(phong, 0.0);
    fx.add_at(lambert, 2.0);
    fx.scene.override_material = Some(plain);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 2);

    // Only the override's template is ever compiled.
    assert_eq!(
        fx.renderer
            .device()
            .count(|v| matches!(v, DeviceCall::CreateProgram(_))),
        1
    );
}

#[test]
fn invisible_and_culled_nodes_cost_nothing() {
    let mut fx = Fixture::new();
    let handle = fx.material(Shading::Basic);

    let hidden = fx.add_at(handle, 0.0);
    fx.scene.graph.node_mut(hidden).unwrap().visible = false;
    fx.add_at(handle, 500.0); // far outside the frustum

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.primitives, 0);
}

#[test]
fn frame_stats_count_assembled_primitives() {
    let mut fx = Fixture::new();
    let handle = fx.material(Shading::Basic);
    fx.add_at(handle, 0.0);
    fx.add_at(handle, 1.0);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 2);
    // One triangle per drawable.
    assert_eq!(stats.primitives, 2);
}

#[test]
fn renderer_returns_to_idle_after_each_frame() {
    let mut fx = Fixture::new();
    assert_eq!(fx.renderer.phase(), FramePhase::Idle);
    fx.render();
    assert_eq!(fx.renderer.phase(), FramePhase::Idle);
}
