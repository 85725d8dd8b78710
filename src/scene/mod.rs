//! The retained scene: object graph, cameras, lights and frame-global state.

pub mod camera;
pub mod geometry;
pub mod light;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;

pub use self::camera::Camera;
pub use self::geometry::{Geometry, GeometryGroup, VertexAttribute};
pub use self::light::{Light, LightSource};
pub use self::node::{Node, NodeId, NodeKind, SceneGraph};
pub use self::scene::{Fog, Scene};
