//! The abstract graphics device every frame is submitted to.
//!
//! `Device` is an imperative command sink in the spirit of a GL context: it
//! owns no policy, performs no redundancy elimination and keeps no scene
//! knowledge. All of that lives above it, in the state-diff layer and the
//! frame renderer. Backends implement this trait; the crate ships a
//! [`HeadlessDevice`](headless::HeadlessDevice) that ignores everything and a
//! [`RecordingDevice`](headless::RecordingDevice) that remembers every call,
//! both of which are mainly useful for tests and CI.

pub mod headless;
pub mod state;

pub use self::state::{
    Blend, BlendFactor, CullFace, Equation, FrontFaceOrder, PipelineState, StateDiff, StateOp,
};

use crate::errors::Result;
use crate::math::{Color, Matrix3, Matrix4, Vector3};

impl_handle!(BufferHandle);
impl_handle!(TextureHandle);
impl_handle!(ProgramHandle);

/// What a buffer object stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Hint to the device about the expected update frequency of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferHint {
    /// Uploaded rarely; the device may place it in slow-to-write memory.
    Static,
    /// Updated repeatedly, possibly with partial writes.
    Dynamic,
}

/// The primitive assembly mode of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPrimitive {
    Triangles,
    Lines,
    Points,
}

impl DrawPrimitive {
    /// Returns the number of assembled primitives for an index count.
    #[inline]
    pub fn assemble(self, indices: u32) -> u32 {
        match self {
            DrawPrimitive::Triangles => indices / 3,
            DrawPrimitive::Lines => indices / 2,
            DrawPrimitive::Points => indices,
        }
    }
}

/// The element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub fn stride(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// The pixel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
}

/// The sampling filter of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// The addressing mode outside the `[0, 1]` texture coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Clamp,
    Repeat,
}

/// The immutable creation parameters of a texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureParams {
    pub format: TextureFormat,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub dimensions: (u32, u32),
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            format: TextureFormat::Rgba8,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Clamp,
            dimensions: (0, 0),
        }
    }
}

/// The type of a uniform, used for cheap validation ahead of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    I32,
    F32,
    Vector2,
    Vector3,
    Vector4,
    Matrix3,
    Matrix4,
    Texture,
}

impl UniformType {
    pub fn name(self) -> &'static str {
        match self {
            UniformType::I32 => "i32",
            UniformType::F32 => "f32",
            UniformType::Vector2 => "Vector2",
            UniformType::Vector3 => "Vector3",
            UniformType::Vector4 => "Vector4",
            UniformType::Matrix3 => "Matrix3",
            UniformType::Matrix4 => "Matrix4",
            UniformType::Texture => "Texture",
        }
    }
}

/// A typed uniform value, ready to be pushed to a program location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    I32(i32),
    F32(f32),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    Matrix3([[f32; 3]; 3]),
    Matrix4([[f32; 4]; 4]),
    Texture(TextureHandle),
}

impl UniformValue {
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::I32(_) => UniformType::I32,
            UniformValue::F32(_) => UniformType::F32,
            UniformValue::Vector2(_) => UniformType::Vector2,
            UniformValue::Vector3(_) => UniformType::Vector3,
            UniformValue::Vector4(_) => UniformType::Vector4,
            UniformValue::Matrix3(_) => UniformType::Matrix3,
            UniformValue::Matrix4(_) => UniformType::Matrix4,
            UniformValue::Texture(_) => UniformType::Texture,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::I32(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vector2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vector3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vector4(v)
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(v: Vector3<f32>) -> Self {
        UniformValue::Vector3(v.into())
    }
}

impl From<Matrix3<f32>> for UniformValue {
    fn from(v: Matrix3<f32>) -> Self {
        UniformValue::Matrix3(v.into())
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(v: Matrix4<f32>) -> Self {
        UniformValue::Matrix4(v.into())
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(v: TextureHandle) -> Self {
        UniformValue::Texture(v)
    }
}

/// The imperative command sink a frame is rendered into.
///
/// Handles are allocated by the caller; the device only associates backing
/// objects with them. A handle passed to `create_*` twice without an
/// intervening delete is a caller bug.
pub trait Device {
    /// Creates a buffer object and uploads `data` into it.
    fn create_buffer(
        &mut self,
        handle: BufferHandle,
        kind: BufferKind,
        hint: BufferHint,
        data: &[u8],
    ) -> Result<()>;

    /// Overwrites a byte range of an existing buffer object.
    fn update_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) -> Result<()>;

    /// Deletes a buffer object.
    fn delete_buffer(&mut self, handle: BufferHandle);

    /// Creates a texture object, optionally uploading pixel data.
    fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    /// Deletes a texture object.
    fn delete_texture(&mut self, handle: TextureHandle);

    /// Compiles and links a program from vertex and fragment sources. Returns
    /// `Error::ShaderCompile` or `Error::ProgramLink` with the full driver
    /// diagnostic on failure.
    fn create_program(&mut self, handle: ProgramHandle, vs: &str, fs: &str) -> Result<()>;

    /// Deletes a program object.
    fn delete_program(&mut self, handle: ProgramHandle);

    /// Resolves the location of a named uniform in a linked program.
    fn uniform_location(&mut self, handle: ProgramHandle, name: &str) -> Option<u32>;

    /// Resolves the location of a named vertex attribute in a linked program.
    fn attribute_location(&mut self, handle: ProgramHandle, name: &str) -> Option<u32>;

    /// Clears the frame target.
    fn clear(&mut self, color: Option<Color>, depth: Option<f32>, stencil: Option<i32>);

    /// Mutates one axis of the fixed-function pipeline state.
    fn set_state(&mut self, op: StateOp);

    /// Makes a program current.
    fn bind_program(&mut self, handle: ProgramHandle);

    /// Pushes a uniform value to a location of the current program.
    fn set_uniform(&mut self, location: u32, value: &UniformValue);

    /// Binds a texture object to a texture unit.
    fn bind_texture(&mut self, unit: u32, handle: TextureHandle);

    /// Sources a vertex attribute of the current program from a buffer.
    fn bind_attribute(&mut self, location: u32, buffer: BufferHandle, components: u8);

    /// Issues one indexed draw from the bound program and attributes.
    fn draw_indexed(
        &mut self,
        primitive: DrawPrimitive,
        indices: BufferHandle,
        format: IndexFormat,
        count: u32,
    );

    /// The number of texture units this device can bind simultaneously.
    fn max_texture_units(&self) -> u32 {
        8
    }
}
