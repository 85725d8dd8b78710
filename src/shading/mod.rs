//! Materials, shader templates, program caching and the bind step.

pub mod binder;
pub mod lights;
pub mod material;
pub mod program;
pub mod template;

pub use self::binder::{MaterialBinder, ObjectMatrices};
pub use self::lights::LightUniforms;
pub use self::material::{Material, MaterialHandle, MaterialRegistry, Shading};
pub use self::program::{CompiledProgram, ProgramCache, ProgramFeatures, ProgramKey};
pub use self::template::{ShaderTemplate, TemplateRegistry};
