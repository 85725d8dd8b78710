//! Render list construction: traversal, culling, classification and sorting.
//!
//! Render items are transient; the list is rebuilt from scratch every frame
//! and the only identity that persists across frames is the node's object id,
//! which serves as the stable sort tie-break.

use std::cmp::Ordering;

use crate::math::EuclideanSpace;
use crate::scene::{Camera, NodeId, Scene};
use crate::shading::{MaterialHandle, MaterialRegistry};

/// One draw of one submesh group.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem {
    pub node: NodeId,
    pub group: usize,
    pub material: MaterialHandle,
    /// Normalized view depth, used only as a sort key.
    pub z: f32,
    pub object_id: u64,
}

/// The classified output of one traversal.
#[derive(Debug, Default)]
pub struct RenderList {
    pub opaque: Vec<RenderItem>,
    pub transparent: Vec<RenderItem>,
}

impl RenderList {
    /// Walks the scene graph depth-first, updating world matrices along the
    /// way, and files every visible, in-frustum drawable into the opaque or
    /// transparent bucket. Invisible subtrees are skipped without cull tests.
    pub fn build(
        scene: &mut Scene,
        materials: &MaterialRegistry,
        camera: &Camera,
        with_depth: bool,
    ) -> RenderList {
        let frustum = camera.frustum();
        let projection_view = camera.projection_view();

        let mut list = RenderList::default();
        let mut stack = vec![scene.graph.root()];

        while let Some(id) = stack.pop() {
            let visible = match scene.graph.node(id) {
                Some(node) => node.visible,
                None => continue,
            };
            if !visible {
                continue;
            }

            scene.graph.update_matrix_world(id);

            let node = match scene.graph.node(id) {
                Some(v) => v,
                None => continue,
            };

            if node.is_drawable() && scene.graph.is_in_frustum(id, &frustum) {
                let node = scene.graph.node(id).unwrap_or_else(|| unreachable!());

                let z = if with_depth {
                    let p = node.world_position();
                    let v = projection_view * p.to_homogeneous();
                    if v.w.abs() > std::f32::EPSILON {
                        v.z / v.w
                    } else {
                        0.0
                    }
                } else {
                    0.0
                };

                let object_id = node.object_id();
                if let Some(geometry) = node.geometry.as_ref() {
                    for (index, group) in geometry.groups.iter().enumerate() {
                        let material = node
                            .materials
                            .get(group.material_slot)
                            .or_else(|| node.materials.first());

                        let material = match material {
                            Some(v) => *v,
                            None => continue,
                        };

                        let transparent = match materials.get(material) {
                            Some(v) => v.transparent,
                            // Dead material handle; nothing to draw with.
                            None => continue,
                        };

                        let item = RenderItem {
                            node: id,
                            group: index,
                            material,
                            z,
                            object_id,
                        };

                        if transparent {
                            list.transparent.push(item);
                        } else {
                            list.opaque.push(item);
                        }
                    }
                }
            }

            // Reverse push keeps left-to-right child order on the stack.
            let node = match scene.graph.node(id) {
                Some(v) => v,
                None => continue,
            };
            for &child in node.children().iter().rev() {
                stack.push(child);
            }
        }

        list
    }

    /// Sorts the buckets: opaque front-to-back, transparent back-to-front,
    /// ties broken by the persistent object identity, then by group index.
    pub fn sort(&mut self) {
        self.opaque.sort_by(|a, b| {
            a.z.partial_cmp(&b.z)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.object_id.cmp(&b.object_id))
                .then_with(|| a.group.cmp(&b.group))
        });

        self.transparent.sort_by(|a, b| {
            b.z.partial_cmp(&a.z)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.object_id.cmp(&b.object_id))
                .then_with(|| a.group.cmp(&b.group))
        });
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::IndexFormat;
    use crate::math::{Matrix4, Point3, Vector3};
    use crate::res::{AttributeBuffer, AttributeUsage};
    use crate::scene::geometry::{pack_f32, pack_u16};
    use crate::scene::{Geometry, GeometryGroup, Node, NodeKind, VertexAttribute};
    use crate::shading::{Material, Shading, TemplateRegistry};

    fn triangle() -> Geometry {
        let mut geometry = Geometry::new();
        geometry.set_attribute(
            VertexAttribute::Position,
            AttributeBuffer::vertex(
                AttributeUsage::Static,
                12,
                pack_f32(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            ),
        );
        geometry.add_group(GeometryGroup {
            indices: AttributeBuffer::index(AttributeUsage::Static, 2, pack_u16(&[0, 1, 2])),
            line_indices: None,
            index_format: IndexFormat::U16,
            material_slot: 0,
        });
        geometry
    }

    struct Env {
        scene: Scene,
        materials: MaterialRegistry,
        camera: Camera,
        opaque: MaterialHandle,
        transparent: MaterialHandle,
    }

    impl Env {
        fn new() -> Self {
            let templates = TemplateRegistry::standard();
            let mut materials = MaterialRegistry::new();

            let opaque = materials.create(Material::new(Shading::Basic, &templates));
            let mut glass = Material::new(Shading::Basic, &templates);
            glass.transparent = true;
            let transparent = materials.create(glass);

            let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
            camera.look_at(
                Point3::new(0.0, 0.0, 10.0),
                Point3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            );

            Env {
                scene: Scene::new(),
                materials,
                camera,
                opaque,
                transparent,
            }
        }

        fn add_at(&mut self, material: MaterialHandle, z: f32) -> NodeId {
            let id = self.scene.add_mesh(triangle(), material);
            self.scene
                .graph
                .node_mut(id)
                .unwrap()
                .set_local_matrix(Matrix4::from_translation(Vector3::new(0.0, 0.0, z)));
            id
        }

        fn build(&mut self) -> RenderList {
            RenderList::build(&mut self.scene, &self.materials, &self.camera, true)
        }
    }

    #[test]
    fn classifies_by_transparency() {
        let mut env = Env::new();
        env.add_at(env.opaque, 0.0);
        env.add_at(env.transparent, 0.0);

        let list = env.build();
        assert_eq!(list.opaque.len(), 1);
        assert_eq!(list.transparent.len(), 1);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut env = Env::new();
        env.add_at(env.opaque, 0.0);
        env.add_at(env.opaque, -2.0);

        let a = env.build();
        let b = env.build();

        assert_eq!(a.len(), b.len());
        let ids_a: Vec<_> = a.opaque.iter().map(|v| v.object_id).collect();
        let ids_b: Vec<_> = b.opaque.iter().map(|v| v.object_id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn invisible_subtrees_are_skipped() {
        let mut env = Env::new();
        let root = env.scene.graph.root();

        let mut group = Node::new(NodeKind::Group);
        group.visible = false;
        let group = env.scene.graph.add(root, group);

        // The child is individually visible, but its parent hides it.
        let mut child = Node::mesh(triangle(), env.opaque);
        child.cull_exempt = true;
        env.scene.graph.add(group, child);

        assert!(env.build().is_empty());
    }

    #[test]
    fn out_of_frustum_nodes_are_culled() {
        let mut env = Env::new();
        env.add_at(env.opaque, 1000.0);
        assert!(env.build().is_empty());

        let id = env.add_at(env.opaque, 1000.0);
        env.scene.graph.node_mut(id).unwrap().cull_exempt = true;
        assert_eq!(env.build().len(), 1);
    }

    #[test]
    fn opaque_sorted_front_to_back_transparent_back_to_front() {
        let mut env = Env::new();
        // Further from the camera first.
        let far = env.add_at(env.opaque, -5.0);
        let near = env.add_at(env.opaque, 5.0);
        let tfar = env.add_at(env.transparent, -5.0);
        let tnear = env.add_at(env.transparent, 5.0);

        let mut list = env.build();
        list.sort();

        let near_id = env.scene.graph.node(near).unwrap().object_id();
        let far_id = env.scene.graph.node(far).unwrap().object_id();
        assert_eq!(list.opaque[0].object_id, near_id);
        assert_eq!(list.opaque[1].object_id, far_id);

        let tnear_id = env.scene.graph.node(tnear).unwrap().object_id();
        let tfar_id = env.scene.graph.node(tfar).unwrap().object_id();
        assert_eq!(list.transparent[0].object_id, tfar_id);
        assert_eq!(list.transparent[1].object_id, tnear_id);
    }

    #[test]
    fn equal_depth_ties_break_on_object_id() {
        let mut env = Env::new();
        let a = env.add_at(env.opaque, 0.0);
        let b = env.add_at(env.opaque, 0.0);

        let mut list = env.build();
        list.sort();

        let ida = env.scene.graph.node(a).unwrap().object_id();
        let idb = env.scene.graph.node(b).unwrap().object_id();
        assert!(ida < idb);
        assert_eq!(list.opaque[0].object_id, ida);
        assert_eq!(list.opaque[1].object_id, idb);
    }
}
