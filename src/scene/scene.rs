//! The scene: an object graph plus the frame-global inputs of rendering.

use crate::math::Color;
use crate::shading::MaterialHandle;

use super::geometry::Geometry;
use super::light::Light;
use super::node::{Node, NodeId, SceneGraph};

/// The scene fog token, consumed opaquely by the binder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fog {
    Linear {
        color: [f32; 3],
        near: f32,
        far: f32,
    },
    Exp2 {
        color: [f32; 3],
        density: f32,
    },
}

impl Fog {
    pub fn color(&self) -> [f32; 3] {
        match self {
            Fog::Linear { color, .. } | Fog::Exp2 { color, .. } => *color,
        }
    }

    pub fn is_exp2(&self) -> bool {
        matches!(self, Fog::Exp2 { .. })
    }
}

/// See the module documentation.
#[derive(Debug)]
pub struct Scene {
    pub graph: SceneGraph,
    pub lights: Vec<Light>,
    /// Clear color of the frame; falls back to the renderer setup when none.
    pub background: Option<Color>,
    /// When set, every drawable of the frame is drawn with this material.
    pub override_material: Option<MaterialHandle>,
    pub fog: Option<Fog>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Scene {
            graph: SceneGraph::new(),
            lights: Vec::new(),
            background: None,
            override_material: None,
            fog: None,
        }
    }

    /// Adds a mesh node under the root.
    pub fn add_mesh(&mut self, geometry: Geometry, material: MaterialHandle) -> NodeId {
        let root = self.graph.root();
        self.graph.add(root, Node::mesh(geometry, material))
    }
}
