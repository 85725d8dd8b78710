//! The shader template library.
//!
//! A template is an immutable pair of vertex and fragment sources plus the
//! default uniform set materials start from. The engine never edits template
//! sources; the only transformation applied before compilation is prepending
//! the feature `#define` block derived from the material configuration.
//!
//! The registry is constructed explicitly and passed by reference wherever
//! programs are compiled. There is no global, lazily-initialized library.

use crate::device::UniformValue;
use crate::utils::hash::FastHashMap;
use crate::utils::hash_value::HashValue;

/// An immutable shader template.
#[derive(Debug, Clone)]
pub struct ShaderTemplate {
    pub vertex: String,
    pub fragment: String,
    pub defaults: Vec<(String, UniformValue)>,
}

impl ShaderTemplate {
    pub fn new<V: Into<String>, F: Into<String>>(vertex: V, fragment: F) -> Self {
        ShaderTemplate {
            vertex: vertex.into(),
            fragment: fragment.into(),
            defaults: Vec::new(),
        }
    }

    /// Adds a default uniform value materials of this template start with.
    pub fn with_default<T: Into<UniformValue>>(mut self, name: &str, value: T) -> Self {
        self.defaults.push((name.to_string(), value.into()));
        self
    }
}

/// An immutable, explicitly constructed name → template table.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: FastHashMap<HashValue<str>, ShaderTemplate>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a registry preloaded with the built-in surface templates.
    pub fn standard() -> Self {
        let mut registry = TemplateRegistry::new();

        registry.register(
            "basic",
            ShaderTemplate::new(BASIC_VS, BASIC_FS)
                .with_default("color", [1.0f32, 1.0, 1.0, 1.0])
                .with_default("opacity", 1.0f32),
        );

        registry.register(
            "lambert",
            ShaderTemplate::new(LAMBERT_VS, LAMBERT_FS)
                .with_default("color", [1.0f32, 1.0, 1.0, 1.0])
                .with_default("ambient", [0.1f32, 0.1, 0.1])
                .with_default("opacity", 1.0f32),
        );

        registry.register(
            "phong",
            ShaderTemplate::new(PHONG_VS, PHONG_FS)
                .with_default("color", [1.0f32, 1.0, 1.0, 1.0])
                .with_default("ambient", [0.1f32, 0.1, 0.1])
                .with_default("specular", [1.0f32, 1.0, 1.0])
                .with_default("shininess", 30.0f32)
                .with_default("opacity", 1.0f32),
        );

        registry.register(
            "standard",
            ShaderTemplate::new(STANDARD_VS, STANDARD_FS)
                .with_default("color", [1.0f32, 1.0, 1.0, 1.0])
                .with_default("metalness", 0.5f32)
                .with_default("roughness", 0.5f32)
                .with_default("opacity", 1.0f32),
        );

        registry.register(
            "sprite",
            ShaderTemplate::new(SPRITE_VS, SPRITE_FS)
                .with_default("color", [1.0f32, 1.0, 1.0, 1.0])
                .with_default("opacity", 1.0f32),
        );

        registry
    }

    pub fn register(&mut self, name: &str, template: ShaderTemplate) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&ShaderTemplate> {
        self.templates.get(&name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(&name.into())
    }
}

const BASIC_VS: &str = r#"
uniform mat4 projection_matrix;
uniform mat4 model_view_matrix;
attribute vec3 position;
attribute vec2 uv;
varying vec2 v_uv;
void main() {
    v_uv = uv;
    gl_Position = projection_matrix * model_view_matrix * vec4(position, 1.0);
}
"#;

const BASIC_FS: &str = r#"
uniform vec4 color;
uniform float opacity;
#ifdef USE_MAP
uniform sampler2D map;
#endif
varying vec2 v_uv;
void main() {
    vec4 c = color;
#ifdef USE_MAP
    c *= texture2D(map, v_uv);
#endif
    gl_FragColor = vec4(c.rgb, c.a * opacity);
}
"#;

const LAMBERT_VS: &str = r#"
uniform mat4 projection_matrix;
uniform mat4 model_view_matrix;
uniform mat3 normal_matrix;
attribute vec3 position;
attribute vec3 normal;
attribute vec2 uv;
varying vec3 v_normal;
varying vec2 v_uv;
void main() {
    v_normal = normalize(normal_matrix * normal);
    v_uv = uv;
    gl_Position = projection_matrix * model_view_matrix * vec4(position, 1.0);
}
"#;

const LAMBERT_FS: &str = r#"
uniform vec4 color;
uniform vec3 ambient;
uniform float opacity;
#if NUM_DIR_LIGHTS > 0
uniform vec3 dir_light_color[NUM_DIR_LIGHTS];
uniform vec3 dir_light_direction[NUM_DIR_LIGHTS];
#endif
varying vec3 v_normal;
varying vec2 v_uv;
void main() {
    vec3 diffuse = ambient;
#if NUM_DIR_LIGHTS > 0
    for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
        diffuse += dir_light_color[i] * max(dot(v_normal, -dir_light_direction[i]), 0.0);
    }
#endif
    gl_FragColor = vec4(color.rgb * diffuse, color.a * opacity);
}
"#;

const PHONG_VS: &str = LAMBERT_VS;

const PHONG_FS: &str = r#"
uniform vec4 color;
uniform vec3 ambient;
uniform vec3 specular;
uniform float shininess;
uniform float opacity;
uniform vec3 camera_position;
#if NUM_DIR_LIGHTS > 0
uniform vec3 dir_light_color[NUM_DIR_LIGHTS];
uniform vec3 dir_light_direction[NUM_DIR_LIGHTS];
#endif
varying vec3 v_normal;
varying vec2 v_uv;
void main() {
    vec3 acc = ambient;
#if NUM_DIR_LIGHTS > 0
    for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
        float d = max(dot(v_normal, -dir_light_direction[i]), 0.0);
        acc += dir_light_color[i] * (d + specular * pow(d, shininess));
    }
#endif
    gl_FragColor = vec4(color.rgb * acc, color.a * opacity);
}
"#;

const STANDARD_VS: &str = LAMBERT_VS;

const STANDARD_FS: &str = r#"
uniform vec4 color;
uniform float metalness;
uniform float roughness;
uniform float opacity;
varying vec3 v_normal;
varying vec2 v_uv;
void main() {
    // Placeholder shading model; real backends supply their own templates.
    gl_FragColor = vec4(color.rgb * (1.0 - roughness * 0.5), color.a * opacity);
}
"#;

const SPRITE_VS: &str = r#"
uniform mat4 projection_matrix;
uniform mat4 model_view_matrix;
attribute vec3 position;
attribute vec2 uv;
varying vec2 v_uv;
void main() {
    v_uv = uv;
    gl_Position = projection_matrix * model_view_matrix * vec4(position, 1.0);
}
"#;

const SPRITE_FS: &str = BASIC_FS;
