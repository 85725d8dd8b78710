//! Drawable geometry: named attribute streams plus indexed submesh groups.

use crate::device::IndexFormat;
use crate::res::{AttributeBuffer, RendererId, ResourceLifecycle};

/// The vertex attributes a geometry can carry. The names match the attribute
/// declarations of the shader templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    Uv,
    Uv2,
    Color,
}

impl VertexAttribute {
    pub fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "position",
            VertexAttribute::Normal => "normal",
            VertexAttribute::Uv => "uv",
            VertexAttribute::Uv2 => "uv2",
            VertexAttribute::Color => "color",
        }
    }

    /// The number of f32 components per element.
    pub fn components(self) -> u8 {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal | VertexAttribute::Color => 3,
            VertexAttribute::Uv | VertexAttribute::Uv2 => 2,
        }
    }
}

/// One indexed submesh of a geometry: a triangle index stream, an optional
/// line index stream for wireframe substitution, and a material slot.
#[derive(Debug, Clone)]
pub struct GeometryGroup {
    pub indices: AttributeBuffer,
    /// Substituted for `indices` when the material requests wireframe.
    pub line_indices: Option<AttributeBuffer>,
    pub index_format: IndexFormat,
    pub material_slot: usize,
}

impl GeometryGroup {
    pub fn index_count(&self) -> u32 {
        (self.indices.len() / self.index_format.stride()) as u32
    }

    pub fn line_index_count(&self) -> u32 {
        self.line_indices
            .as_ref()
            .map_or(0, |v| (v.len() / self.index_format.stride()) as u32)
    }
}

/// See the module documentation.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    attributes: Vec<(VertexAttribute, AttributeBuffer)>,
    pub groups: Vec<GeometryGroup>,
}

impl Geometry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets or replaces an attribute stream.
    pub fn set_attribute(&mut self, attribute: VertexAttribute, buffer: AttributeBuffer) {
        if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| *k == attribute) {
            entry.1 = buffer;
        } else {
            self.attributes.push((attribute, buffer));
        }
    }

    pub fn attribute(&self, attribute: VertexAttribute) -> Option<&AttributeBuffer> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == attribute)
            .map(|(_, v)| v)
    }

    pub fn attribute_mut(&mut self, attribute: VertexAttribute) -> Option<&mut AttributeBuffer> {
        self.attributes
            .iter_mut()
            .find(|(k, _)| *k == attribute)
            .map(|(_, v)| v)
    }

    pub fn attributes_mut(
        &mut self,
    ) -> impl Iterator<Item = (VertexAttribute, &mut AttributeBuffer)> {
        self.attributes.iter_mut().map(|(k, v)| (*k, v))
    }

    pub fn add_group(&mut self, group: GeometryGroup) {
        self.groups.push(group);
    }

    /// Releases the ownership of every device buffer this geometry uploaded
    /// through `renderer`.
    pub fn release(&mut self, lifecycle: &mut ResourceLifecycle, renderer: RendererId) {
        for (_, buffer) in &mut self.attributes {
            buffer.release(lifecycle, renderer);
        }
        for group in &mut self.groups {
            group.indices.release(lifecycle, renderer);
            if let Some(lines) = group.line_indices.as_mut() {
                lines.release(lifecycle, renderer);
            }
        }
    }
}

/// Packs a f32 slice into native-endian bytes for an attribute stream.
pub fn pack_f32(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_ne_bytes());
    }
    bytes
}

/// Packs a u16 index slice into native-endian bytes.
pub fn pack_u16(values: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for v in values {
        bytes.extend_from_slice(&v.to_ne_bytes());
    }
    bytes
}

/// Packs a u32 index slice into native-endian bytes.
pub fn pack_u32(values: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_ne_bytes());
    }
    bytes
}
