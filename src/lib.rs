//! # Prism
//!
//! Prism is a retained-mode 3D scene renderer core. It converts a
//! hierarchical scene of transformable objects, cameras, lights and materials
//! into an ordered sequence of draw submissions against an abstract graphics
//! device, once per frame, while:
//!
//! - minimizing redundant pipeline-state changes through a state-diff layer,
//! - compiling and caching shader programs per material configuration,
//! - and managing GPU resource lifetimes safely across frames and across
//!   several renderer instances.
//!
//! The crate deliberately ships no graphics backend. The [`Device`] trait is
//! an imperative command sink that real backends implement; the bundled
//! headless and recording devices exist for tests and CI.
//!
//! ```
//! use prism::prelude::*;
//!
//! let templates = TemplateRegistry::standard();
//! let mut materials = MaterialRegistry::new();
//! let red = materials.create(Material::new(Shading::Basic, &templates));
//!
//! let mut scene = Scene::new();
//! let camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
//!
//! let mut renderer = Renderer::new(HeadlessDevice::new(), templates, RenderSetup::default());
//! let stats = renderer.render(&mut scene, &mut materials, &camera).unwrap();
//! assert_eq!(stats.draw_calls, 0);
//! # let _ = red;
//! ```

#[macro_use]
pub mod utils;

pub mod device;
pub mod errors;
pub mod math;
pub mod renderer;
pub mod res;
pub mod scene;
pub mod shading;

pub use crate::device::Device;
pub use crate::renderer::{FramePhase, FrameStats, RenderSetup, Renderer};

pub mod prelude {
    pub use crate::device::headless::{HeadlessDevice, RecordingDevice};
    pub use crate::device::{
        Blend, BufferHandle, Device, DrawPrimitive, IndexFormat, ProgramHandle, TextureHandle,
        TextureParams, UniformValue,
    };
    pub use crate::errors::{Error, Result};
    pub use crate::math::Color;
    pub use crate::renderer::{FramePhase, FrameStats, RenderSetup, Renderer};
    pub use crate::res::{AttributeBuffer, AttributeUsage, GpuObject, ResourceLifecycle};
    pub use crate::scene::{
        Camera, Fog, Geometry, GeometryGroup, Light, Node, NodeId, NodeKind, Scene, SceneGraph,
        VertexAttribute,
    };
    pub use crate::shading::{
        Material, MaterialHandle, MaterialRegistry, Shading, ShaderTemplate, TemplateRegistry,
    };
}
