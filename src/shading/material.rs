//! Materials and their capability surface.
//!
//! A material is a template choice (the closed `Shading` enum), a set of
//! pipeline-state requests, and a bag of uniform values. It also carries the
//! compile bookkeeping: a dirty flag and a renderer-validity stamp. The
//! compiled program is valid only while the stamp matches the renderer that
//! produced it; a dirty flag or a stamp mismatch forces recompilation at the
//! next bind.
//!
//! The binder never asks "is this a Phong material"; it asks the capability
//! predicates (`needs_lights`, `needs_camera_position`, `needs_view_matrix`)
//! and pushes only what the material can consume.

use smallvec::SmallVec;

use crate::device::{Blend, ProgramHandle, TextureHandle, UniformValue};
use crate::errors::{Error, Result};
use crate::res::RendererId;
use crate::utils::object_pool::ObjectPool;

use super::program::ProgramFeatures;
use super::template::TemplateRegistry;

impl_handle!(MaterialHandle);

/// The registry every live material lives in, indexed by generation-counted
/// handles.
pub type MaterialRegistry = ObjectPool<MaterialHandle, Material>;

/// The closed set of shading models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Unlit, flat color or texture.
    Basic,
    /// Diffuse-only lighting.
    Lambert,
    /// Diffuse plus specular highlights.
    Phong,
    /// Metalness/roughness surface model.
    Standard,
    /// Unlit screen-facing quads.
    Sprite,
}

impl Shading {
    /// The shader template this model compiles from.
    pub fn template_name(self) -> &'static str {
        match self {
            Shading::Basic => "basic",
            Shading::Lambert => "lambert",
            Shading::Phong => "phong",
            Shading::Standard => "standard",
            Shading::Sprite => "sprite",
        }
    }
}

/// See the module documentation.
#[derive(Debug, Clone)]
pub struct Material {
    shading: Shading,

    // Pipeline-state requests, resolved by the frame renderer through the
    // state-diff layer.
    pub transparent: bool,
    pub blend: Option<Blend>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub polygon_offset: Option<(f32, f32)>,
    pub wireframe: bool,
    pub line_width: f32,

    double_sided: bool,
    flip_sided: bool,
    vertex_colors: bool,
    fog: bool,
    map_diffuse: Option<TextureHandle>,
    map_environment: Option<TextureHandle>,

    uniforms: Vec<(String, UniformValue)>,

    needs_update: bool,
    valid_for: Option<RendererId>,
    pub(crate) program: Option<ProgramHandle>,
    // Textures use-counted on the stamped renderer's lifecycle.
    pub(crate) owned_textures: SmallVec<[TextureHandle; 2]>,
}

impl Material {
    /// Creates a material of the given shading model, seeded with the
    /// template's default uniforms.
    pub fn new(shading: Shading, registry: &TemplateRegistry) -> Self {
        let uniforms = registry
            .get(shading.template_name())
            .map(|tpl| tpl.defaults.clone())
            .unwrap_or_default();

        Material {
            shading,
            transparent: false,
            blend: None,
            depth_test: true,
            depth_write: true,
            polygon_offset: None,
            wireframe: false,
            line_width: 1.0,
            double_sided: false,
            flip_sided: false,
            vertex_colors: false,
            fog: true,
            map_diffuse: None,
            map_environment: None,
            uniforms,
            needs_update: true,
            valid_for: None,
            program: None,
            owned_textures: SmallVec::new(),
        }
    }

    #[inline]
    pub fn shading(&self) -> Shading {
        self.shading
    }

    /// True while the material needs (re)compilation before its next bind.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Forces recompilation at the next bind.
    #[inline]
    pub fn touch(&mut self) {
        self.needs_update = true;
    }

    /// True if the compiled program is valid for `renderer` right now.
    pub fn is_valid_for(&self, renderer: RendererId) -> bool {
        !self.needs_update && self.valid_for == Some(renderer) && self.program.is_some()
    }

    pub(crate) fn stamp(&mut self, renderer: RendererId) {
        self.needs_update = false;
        self.valid_for = Some(renderer);
    }

    pub(crate) fn valid_for(&self) -> Option<RendererId> {
        self.valid_for
    }

    #[inline]
    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    #[inline]
    pub fn flip_sided(&self) -> bool {
        self.flip_sided
    }

    pub fn set_double_sided(&mut self, v: bool) {
        if self.double_sided != v {
            self.double_sided = v;
            self.needs_update = true;
        }
    }

    pub fn set_flip_sided(&mut self, v: bool) {
        self.flip_sided = v;
    }

    pub fn set_vertex_colors(&mut self, v: bool) {
        if self.vertex_colors != v {
            self.vertex_colors = v;
            self.needs_update = true;
        }
    }

    /// Whether this material reacts to scene fog at all.
    pub fn set_fog(&mut self, v: bool) {
        if self.fog != v {
            self.fog = v;
            self.needs_update = true;
        }
    }

    #[inline]
    pub fn map_diffuse(&self) -> Option<TextureHandle> {
        self.map_diffuse
    }

    /// Assigns, swaps or clears the diffuse texture. Any change dirties the
    /// material, so the binder re-settles texture ownership at the next bind.
    pub fn set_map_diffuse(&mut self, v: Option<TextureHandle>) {
        if self.map_diffuse != v {
            self.needs_update = true;
        }
        self.map_diffuse = v;
        match v {
            Some(handle) => self.insert_uniform("map", UniformValue::Texture(handle)),
            None => self.uniforms.retain(|(k, _)| k != "map"),
        }
    }

    #[inline]
    pub fn map_environment(&self) -> Option<TextureHandle> {
        self.map_environment
    }

    pub fn set_map_environment(&mut self, v: Option<TextureHandle>) {
        if self.map_environment != v {
            self.needs_update = true;
        }
        self.map_environment = v;
        match v {
            Some(handle) => self.insert_uniform("env_map", UniformValue::Texture(handle)),
            None => self.uniforms.retain(|(k, _)| k != "env_map"),
        }
    }

    /// Sets a uniform value. Replacing an existing value with a different
    /// type is rejected; template defaults fix each uniform's type.
    pub fn set_uniform<T: Into<UniformValue>>(&mut self, name: &str, value: T) -> Result<()> {
        let value = value.into();

        if let Some(entry) = self.uniforms.iter_mut().find(|(k, _)| k == name) {
            if entry.1.uniform_type() != value.uniform_type() {
                return Err(Error::UniformTypeMismatch(
                    name.to_string(),
                    entry.1.uniform_type().name(),
                ));
            }
            // Texture references are ownership-tracked by the binder.
            if matches!(value, UniformValue::Texture(_)) && entry.1 != value {
                self.needs_update = true;
            }
            entry.1 = value;
        } else {
            if matches!(value, UniformValue::Texture(_)) {
                self.needs_update = true;
            }
            self.uniforms.push((name.to_string(), value));
        }

        Ok(())
    }

    fn insert_uniform(&mut self, name: &str, value: UniformValue) {
        if let Some(entry) = self.uniforms.iter_mut().find(|(k, _)| k == name) {
            entry.1 = value;
        } else {
            self.uniforms.push((name.to_string(), value));
        }
    }

    /// The current uniform set, template defaults included.
    #[inline]
    pub fn uniforms(&self) -> &[(String, UniformValue)] {
        &self.uniforms
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.iter().map(|(k, _)| k.as_str())
    }

    // Capability predicates. The binder pushes a value only when the
    // material can consume it.

    /// Lit models consume the light uniform arrays.
    pub fn needs_lights(&self) -> bool {
        matches!(
            self.shading,
            Shading::Lambert | Shading::Phong | Shading::Standard
        )
    }

    /// Specular and reflective models need the camera position.
    pub fn needs_camera_position(&self) -> bool {
        matches!(self.shading, Shading::Phong | Shading::Standard)
            || self.map_environment.is_some()
    }

    /// Environment mapping needs the view matrix itself.
    pub fn needs_view_matrix(&self) -> bool {
        self.map_environment.is_some()
    }

    /// The blend configuration the renderer should apply: an explicit blend
    /// wins, otherwise transparency implies standard alpha blending.
    pub fn resolved_blend(&self) -> Option<Blend> {
        match (self.blend, self.transparent) {
            (Some(blend), _) => Some(blend),
            (None, true) => Some(Blend::ALPHA),
            (None, false) => None,
        }
    }

    /// Resolves the feature set for compilation against the current scene
    /// light census and fog token.
    pub fn features(&self, num_dir: u8, num_point: u8, scene_has_fog: bool, fog_exp2: bool) -> ProgramFeatures {
        let lit = self.needs_lights();
        let fogged = self.fog && scene_has_fog;

        ProgramFeatures {
            map_diffuse: self.map_diffuse.is_some(),
            map_environment: self.map_environment.is_some(),
            vertex_colors: self.vertex_colors,
            double_sided: self.double_sided,
            use_fog: fogged,
            fog_exp2: fogged && fog_exp2,
            num_dir_lights: if lit { num_dir } else { 0 },
            num_point_lights: if lit { num_point } else { 0 },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::Blend;
    use crate::utils::handle::HandleLike;

    fn basic() -> Material {
        Material::new(Shading::Basic, &TemplateRegistry::standard())
    }

    #[test]
    fn starts_dirty_with_template_defaults() {
        let m = basic();
        assert!(m.needs_update());
        assert!(m.uniforms().iter().any(|(k, _)| k == "color"));
    }

    #[test]
    fn stamp_and_touch() {
        let mut m = basic();
        m.program = Some(ProgramHandle::new(0, 1));
        m.stamp(1);

        assert!(m.is_valid_for(1));
        assert!(!m.is_valid_for(2));

        m.touch();
        assert!(!m.is_valid_for(1));
    }

    #[test]
    fn uniform_type_is_fixed_by_first_value() {
        let mut m = basic();
        assert!(m.set_uniform("opacity", 0.5f32).is_ok());
        assert!(m.set_uniform("opacity", [1.0f32, 0.0, 0.0]).is_err());
    }

    #[test]
    fn assigning_a_map_changes_the_feature_set() {
        let mut m = basic();
        m.stamp(1);

        m.set_map_diffuse(Some(TextureHandle::new(0, 1)));
        assert!(m.needs_update());
        assert!(m.features(0, 0, false, false).map_diffuse);
        assert!(m.uniforms().iter().any(|(k, _)| k == "map"));

        // Swapping the texture keeps the content key but still dirties, so
        // the binder re-settles texture ownership at the next bind.
        m.stamp(1);
        m.set_map_diffuse(Some(TextureHandle::new(1, 1)));
        assert!(m.needs_update());
        assert!(m.features(0, 0, false, false).map_diffuse);

        // Re-assigning the same handle is a no-op.
        m.stamp(1);
        m.set_map_diffuse(Some(TextureHandle::new(1, 1)));
        assert!(!m.needs_update());
    }

    #[test]
    fn capability_predicates() {
        let registry = TemplateRegistry::standard();

        let basic = Material::new(Shading::Basic, &registry);
        assert!(!basic.needs_lights());
        assert!(!basic.needs_camera_position());

        let phong = Material::new(Shading::Phong, &registry);
        assert!(phong.needs_lights());
        assert!(phong.needs_camera_position());
        assert!(!phong.needs_view_matrix());

        let mut reflective = Material::new(Shading::Basic, &registry);
        reflective.set_map_environment(Some(TextureHandle::new(0, 1)));
        assert!(reflective.needs_camera_position());
        assert!(reflective.needs_view_matrix());
    }

    #[test]
    fn transparency_implies_alpha_blend() {
        let mut m = basic();
        assert_eq!(m.resolved_blend(), None);

        m.transparent = true;
        assert_eq!(m.resolved_blend(), Some(Blend::ALPHA));

        m.blend = Some(Blend::ADDITIVE);
        assert_eq!(m.resolved_blend(), Some(Blend::ADDITIVE));
    }

    #[test]
    fn unlit_materials_compile_without_lights() {
        let m = basic();
        let features = m.features(3, 2, false, false);
        assert_eq!(features.num_dir_lights, 0);
        assert_eq!(features.num_point_lights, 0);
    }
}
