//! Device implementations without a GPU behind them.
//!
//! `HeadlessDevice` swallows every command, which is enough to run the full
//! frame pipeline on machines without a graphics context. `RecordingDevice`
//! additionally remembers every call it receives, which is what the state-diff
//! and lifecycle assertions in the test suites are written against.

use crate::errors::{Error, Result, ShaderStage};
use crate::math::Color;
use crate::utils::hash::FastHashMap;

use super::{
    BufferHandle, BufferHint, BufferKind, Device, DrawPrimitive, IndexFormat, ProgramHandle,
    StateOp, TextureHandle, TextureParams, UniformValue,
};

/// A device that accepts and ignores everything.
#[derive(Debug, Default)]
pub struct HeadlessDevice {}

impl HeadlessDevice {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Device for HeadlessDevice {
    fn create_buffer(
        &mut self,
        _: BufferHandle,
        _: BufferKind,
        _: BufferHint,
        _: &[u8],
    ) -> Result<()> {
        Ok(())
    }

    fn update_buffer(&mut self, _: BufferHandle, _: usize, _: &[u8]) -> Result<()> {
        Ok(())
    }

    fn delete_buffer(&mut self, _: BufferHandle) {}

    fn create_texture(&mut self, _: TextureHandle, _: TextureParams, _: Option<&[u8]>) -> Result<()> {
        Ok(())
    }

    fn delete_texture(&mut self, _: TextureHandle) {}

    fn create_program(&mut self, _: ProgramHandle, _: &str, _: &str) -> Result<()> {
        Ok(())
    }

    fn delete_program(&mut self, _: ProgramHandle) {}

    fn uniform_location(&mut self, _: ProgramHandle, _: &str) -> Option<u32> {
        Some(0)
    }

    fn attribute_location(&mut self, _: ProgramHandle, _: &str) -> Option<u32> {
        Some(0)
    }

    fn clear(&mut self, _: Option<Color>, _: Option<f32>, _: Option<i32>) {}

    fn set_state(&mut self, _: StateOp) {}

    fn bind_program(&mut self, _: ProgramHandle) {}

    fn set_uniform(&mut self, _: u32, _: &UniformValue) {}

    fn bind_texture(&mut self, _: u32, _: TextureHandle) {}

    fn bind_attribute(&mut self, _: u32, _: BufferHandle, _: u8) {}

    fn draw_indexed(&mut self, _: DrawPrimitive, _: BufferHandle, _: IndexFormat, _: u32) {}
}

/// Every call a `RecordingDevice` receives, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(BufferHandle, BufferKind, BufferHint, usize),
    UpdateBuffer(BufferHandle, usize, usize),
    DeleteBuffer(BufferHandle),
    CreateTexture(TextureHandle, TextureParams),
    DeleteTexture(TextureHandle),
    CreateProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    Clear(Option<Color>, Option<f32>, Option<i32>),
    SetState(StateOp),
    BindProgram(ProgramHandle),
    SetUniform(u32, UniformValue),
    BindTexture(u32, TextureHandle),
    BindAttribute(u32, BufferHandle, u8),
    DrawIndexed(DrawPrimitive, BufferHandle, IndexFormat, u32),
}

/// A headless device that records its call stream.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub calls: Vec<DeviceCall>,
    /// Makes the next `create_program` fail with a vertex stage diagnostic.
    pub fail_next_compile: bool,
    /// Makes the next `create_program` fail at the link step.
    pub fail_next_link: bool,
    texture_units: u32,
    locations: FastHashMap<(ProgramHandle, String), u32>,
    next_location: FastHashMap<ProgramHandle, u32>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        RecordingDevice {
            texture_units: 8,
            ..Default::default()
        }
    }

    /// A recording device claiming the given number of texture units.
    pub fn with_texture_units(units: u32) -> Self {
        RecordingDevice {
            texture_units: units,
            ..Default::default()
        }
    }

    /// Forgets the recorded calls, keeping location bookkeeping intact.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// The number of recorded calls matching the predicate.
    pub fn count<F: Fn(&DeviceCall) -> bool>(&self, f: F) -> usize {
        self.calls.iter().filter(|v| f(v)).count()
    }

    fn location(&mut self, handle: ProgramHandle, name: &str) -> u32 {
        let key = (handle, name.to_string());
        if let Some(&v) = self.locations.get(&key) {
            return v;
        }

        let next = self.next_location.entry(handle).or_insert(0);
        let v = *next;
        *next += 1;
        self.locations.insert(key, v);
        v
    }
}

impl Device for RecordingDevice {
    fn create_buffer(
        &mut self,
        handle: BufferHandle,
        kind: BufferKind,
        hint: BufferHint,
        data: &[u8],
    ) -> Result<()> {
        self.calls
            .push(DeviceCall::CreateBuffer(handle, kind, hint, data.len()));
        Ok(())
    }

    fn update_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
        self.calls
            .push(DeviceCall::UpdateBuffer(handle, offset, data.len()));
        Ok(())
    }

    fn delete_buffer(&mut self, handle: BufferHandle) {
        self.calls.push(DeviceCall::DeleteBuffer(handle));
    }

    fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        _: Option<&[u8]>,
    ) -> Result<()> {
        self.calls.push(DeviceCall::CreateTexture(handle, params));
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        self.calls.push(DeviceCall::DeleteTexture(handle));
    }

    fn create_program(&mut self, handle: ProgramHandle, _: &str, _: &str) -> Result<()> {
        if self.fail_next_compile {
            self.fail_next_compile = false;
            return Err(Error::ShaderCompile(
                ShaderStage::Vertex,
                "0:1: 'float4' : undeclared identifier".to_string(),
            ));
        }

        if self.fail_next_link {
            self.fail_next_link = false;
            return Err(Error::ProgramLink(
                "varying v_uv not written by vertex shader".to_string(),
            ));
        }

        self.calls.push(DeviceCall::CreateProgram(handle));
        Ok(())
    }

    fn delete_program(&mut self, handle: ProgramHandle) {
        self.calls.push(DeviceCall::DeleteProgram(handle));
    }

    fn uniform_location(&mut self, handle: ProgramHandle, name: &str) -> Option<u32> {
        Some(self.location(handle, name))
    }

    fn attribute_location(&mut self, handle: ProgramHandle, name: &str) -> Option<u32> {
        Some(self.location(handle, name))
    }

    fn clear(&mut self, color: Option<Color>, depth: Option<f32>, stencil: Option<i32>) {
        self.calls.push(DeviceCall::Clear(color, depth, stencil));
    }

    fn set_state(&mut self, op: StateOp) {
        self.calls.push(DeviceCall::SetState(op));
    }

    fn bind_program(&mut self, handle: ProgramHandle) {
        self.calls.push(DeviceCall::BindProgram(handle));
    }

    fn set_uniform(&mut self, location: u32, value: &UniformValue) {
        self.calls.push(DeviceCall::SetUniform(location, *value));
    }

    fn bind_texture(&mut self, unit: u32, handle: TextureHandle) {
        self.calls.push(DeviceCall::BindTexture(unit, handle));
    }

    fn bind_attribute(&mut self, location: u32, buffer: BufferHandle, components: u8) {
        self.calls
            .push(DeviceCall::BindAttribute(location, buffer, components));
    }

    fn draw_indexed(
        &mut self,
        primitive: DrawPrimitive,
        indices: BufferHandle,
        format: IndexFormat,
        count: u32,
    ) {
        self.calls
            .push(DeviceCall::DrawIndexed(primitive, indices, format, count));
    }

    fn max_texture_units(&self) -> u32 {
        self.texture_units
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::HandleLike;

    #[test]
    fn locations_are_stable_per_program() {
        let mut device = RecordingDevice::new();
        let p = ProgramHandle::new(0, 1);

        let a = device.uniform_location(p, "color").unwrap();
        let b = device.uniform_location(p, "opacity").unwrap();
        assert_ne!(a, b);
        assert_eq!(device.uniform_location(p, "color"), Some(a));
    }

    #[test]
    fn compile_failure_is_one_shot() {
        let mut device = RecordingDevice::new();
        device.fail_next_compile = true;

        let p = ProgramHandle::new(0, 1);
        assert!(device.create_program(p, "", "").is_err());
        assert!(device.create_program(p, "", "").is_ok());
    }
}
