//! The object graph: an arena of nodes forming a transform hierarchy.

use smallvec::SmallVec;

use crate::device::DrawPrimitive;
use crate::math::{Frustum, Matrix4, Point3, SquareMatrix};
use crate::shading::MaterialHandle;
use crate::utils::object_pool::ObjectPool;

use super::geometry::Geometry;

impl_handle!(NodeId);

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A pure transform with children, never drawn itself.
    Group,
    Mesh,
    SkinnedMesh,
    Sprite,
    Line,
    Points,
}

impl NodeKind {
    /// The primitive the node's geometry assembles into.
    pub fn primitive(self) -> DrawPrimitive {
        match self {
            NodeKind::Line => DrawPrimitive::Lines,
            NodeKind::Points => DrawPrimitive::Points,
            _ => DrawPrimitive::Triangles,
        }
    }
}

/// One node of the object graph.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub visible: bool,
    /// Skips the frustum test; the node is always considered in view.
    pub cull_exempt: bool,
    /// Radius of the bounding sphere around the node's world position.
    pub bounding_radius: f32,
    pub geometry: Option<Geometry>,
    /// Materials by submesh slot; a group falls back to slot 0.
    pub materials: SmallVec<[MaterialHandle; 2]>,

    local: Matrix4<f32>,
    world: Matrix4<f32>,
    object_id: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            visible: true,
            cull_exempt: false,
            bounding_radius: 1.0,
            geometry: None,
            materials: SmallVec::new(),
            local: Matrix4::identity(),
            world: Matrix4::identity(),
            object_id: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A drawable node with one geometry and one material.
    pub fn mesh(geometry: Geometry, material: MaterialHandle) -> Self {
        let mut node = Node::new(NodeKind::Mesh);
        node.geometry = Some(geometry);
        node.materials.push(material);
        node
    }

    #[inline]
    pub fn local_matrix(&self) -> &Matrix4<f32> {
        &self.local
    }

    pub fn set_local_matrix(&mut self, m: Matrix4<f32>) {
        self.local = m;
    }

    /// The world matrix computed by the last traversal.
    #[inline]
    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world
    }

    pub fn world_position(&self) -> Point3<f32> {
        Point3::new(self.world.w.x, self.world.w.y, self.world.w.z)
    }

    /// The persistent identity used as the sort tie-break.
    #[inline]
    pub fn object_id(&self) -> u64 {
        self.object_id
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// True if this node contributes draw items.
    pub fn is_drawable(&self) -> bool {
        self.kind != NodeKind::Group && self.geometry.is_some()
    }
}

/// The arena holding every node, rooted at a permanent group node.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: ObjectPool<NodeId, Node>,
    root: NodeId,
    next_object_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut nodes = ObjectPool::new();
        let mut root_node = Node::new(NodeKind::Group);
        root_node.object_id = 0;
        let root = nodes.create(root_node);

        SceneGraph {
            nodes,
            root,
            next_object_id: 1,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Inserts `node` as a child of `parent`. Panics if the parent is not
    /// alive.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        assert!(
            self.nodes.is_alive(parent),
            "Adding a child to dead node {}.",
            parent
        );

        node.parent = Some(parent);
        node.object_id = self.next_object_id;
        self.next_object_id += 1;

        let id = self.nodes.create(node);
        self.nodes
            .get_mut(parent)
            .unwrap_or_else(|| panic!("{} died during insertion.", parent))
            .children
            .push(id);
        id
    }

    /// Removes a node and its whole subtree. Geometry buffers are not
    /// released here; that stays the owner's call.
    pub fn remove(&mut self, id: NodeId) -> Vec<Node> {
        assert_ne!(id, self.root, "The root node can not be removed.");

        let mut removed = Vec::new();
        let node = match self.nodes.free(id) {
            Some(v) => v,
            None => return removed,
        };

        if let Some(parent) = node.parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|v| *v != id);
            }
        }

        let mut stack: Vec<NodeId> = node.children.clone();
        removed.push(node);

        while let Some(child) = stack.pop() {
            if let Some(v) = self.nodes.free(child) {
                stack.extend_from_slice(&v.children);
                removed.push(v);
            }
        }

        removed
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    #[inline]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.is_alive(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recomputes the node's world matrix from its parent's. The parent must
    /// already be up to date, which holds for any pre-order traversal.
    pub fn update_matrix_world(&mut self, id: NodeId) {
        let parent_world = self
            .nodes
            .get(id)
            .and_then(|v| v.parent)
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.world);

        if let Some(node) = self.nodes.get_mut(id) {
            node.world = match parent_world {
                Some(parent) => parent * node.local,
                None => node.local,
            };
        }
    }

    /// Recomputes world matrices of the whole subtree in pre-order.
    pub fn update_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(v) = stack.pop() {
            self.update_matrix_world(v);
            if let Some(node) = self.nodes.get(v) {
                stack.extend_from_slice(&node.children);
            }
        }
    }

    /// The frustum test against the node's bounding sphere at its world
    /// position. Cull-exempt nodes always pass.
    pub fn is_in_frustum(&self, id: NodeId, frustum: &Frustum) -> bool {
        match self.nodes.get(id) {
            Some(node) => {
                node.cull_exempt
                    || frustum.contains_sphere(node.world_position(), node.bounding_radius)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn world_matrices_compose_down_the_tree() {
        let mut graph = SceneGraph::new();

        let mut a = Node::new(NodeKind::Group);
        a.set_local_matrix(Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)));
        let a = graph.add(graph.root(), a);

        let mut b = Node::new(NodeKind::Mesh);
        b.set_local_matrix(Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0)));
        let b = graph.add(a, b);

        graph.update_subtree(graph.root());

        let p = graph.node(b).unwrap().world_position();
        assert_eq!(p, Point3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn object_ids_are_unique_and_persistent() {
        let mut graph = SceneGraph::new();
        let a = graph.add(graph.root(), Node::new(NodeKind::Mesh));
        let b = graph.add(graph.root(), Node::new(NodeKind::Mesh));

        let ida = graph.node(a).unwrap().object_id();
        let idb = graph.node(b).unwrap().object_id();
        assert_ne!(ida, idb);

        graph.remove(a);
        let c = graph.add(graph.root(), Node::new(NodeKind::Mesh));
        assert_ne!(graph.node(c).unwrap().object_id(), idb);
    }

    #[test]
    fn remove_takes_the_subtree() {
        let mut graph = SceneGraph::new();
        let a = graph.add(graph.root(), Node::new(NodeKind::Group));
        let b = graph.add(a, Node::new(NodeKind::Mesh));

        let removed = graph.remove(a);
        assert_eq!(removed.len(), 2);
        assert!(!graph.is_alive(a));
        assert!(!graph.is_alive(b));
        assert_eq!(graph.len(), 1);
    }
}
