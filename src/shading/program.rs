//! Compile-on-demand program caching.
//!
//! Programs are cached under a content key: the template identity plus the
//! resolved feature set. Two materials that resolve to the same key share one
//! compiled program. Compilation failures are logged with the stage and the
//! full driver diagnostic and yield no program, so the caller skips drawing
//! that material for the frame instead of aborting it.

use std::fmt::Write;

use log::{error, info};

use crate::device::{Device, ProgramHandle};
use crate::errors::Error;
use crate::res::{RendererId, ResourceLifecycle};
use crate::utils::hash::FastHashMap;
use crate::utils::hash_value::HashValue;
use crate::utils::object_pool::ObjectPool;

use super::template::TemplateRegistry;

/// The highest number of lights of one kind a compiled program will address.
pub const MAX_DIR_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 8;

/// The uniforms every template may declare and the engine pushes itself.
pub const CORE_UNIFORMS: &[&str] = &[
    "projection_matrix",
    "view_matrix",
    "model_matrix",
    "model_view_matrix",
    "normal_matrix",
    "camera_position",
    "fog_color",
    "fog_near",
    "fog_far",
    "fog_density",
];

/// The vertex attributes a template may consume, with their component counts.
pub const VERTEX_ATTRIBUTES: &[(&str, u8)] = &[
    ("position", 3),
    ("normal", 3),
    ("uv", 2),
    ("uv2", 2),
    ("color", 3),
];

/// The resolved feature set of one material configuration. Together with the
/// template name this is the content key of the program cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramFeatures {
    pub map_diffuse: bool,
    pub map_environment: bool,
    pub vertex_colors: bool,
    pub double_sided: bool,
    pub use_fog: bool,
    pub fog_exp2: bool,
    pub num_dir_lights: u8,
    pub num_point_lights: u8,
}

impl ProgramFeatures {
    /// The `#define` block prepended to both template sources.
    pub fn defines(&self) -> String {
        let mut v = String::new();

        writeln!(v, "#define NUM_DIR_LIGHTS {}", self.num_dir_lights).unwrap();
        writeln!(v, "#define NUM_POINT_LIGHTS {}", self.num_point_lights).unwrap();

        if self.map_diffuse {
            v.push_str("#define USE_MAP\n");
        }
        if self.map_environment {
            v.push_str("#define USE_ENV_MAP\n");
        }
        if self.vertex_colors {
            v.push_str("#define USE_VERTEX_COLORS\n");
        }
        if self.double_sided {
            v.push_str("#define DOUBLE_SIDED\n");
        }
        if self.use_fog {
            v.push_str("#define USE_FOG\n");
            if self.fog_exp2 {
                v.push_str("#define FOG_EXP2\n");
            }
        }

        v
    }
}

/// The content key of a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub template: HashValue<str>,
    pub features: ProgramFeatures,
}

/// A linked program plus its one-time uniform and attribute location scan.
#[derive(Debug)]
pub struct CompiledProgram {
    pub key: ProgramKey,
    uniforms: FastHashMap<HashValue<str>, u32>,
    attributes: FastHashMap<HashValue<str>, u32>,
}

impl CompiledProgram {
    /// The cached location of a uniform, if the linked program declares it.
    #[inline]
    pub fn uniform_location<T: Into<HashValue<str>>>(&self, name: T) -> Option<u32> {
        self.uniforms.get(&name.into()).cloned()
    }

    /// The cached location of a vertex attribute.
    #[inline]
    pub fn attribute_location<T: Into<HashValue<str>>>(&self, name: T) -> Option<u32> {
        self.attributes.get(&name.into()).cloned()
    }
}

/// The content-keyed program cache.
#[derive(Debug, Default)]
pub struct ProgramCache {
    by_key: FastHashMap<ProgramKey, ProgramHandle>,
    programs: ObjectPool<ProgramHandle, CompiledProgram>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of live programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn get(&self, handle: ProgramHandle) -> Option<&CompiledProgram> {
        self.programs.get(handle)
    }

    /// Returns the cached program for the content key, compiling it first if
    /// needed. `extra_uniforms` extends the location scan beyond the core
    /// list, typically with the material's own uniform names. On compile or
    /// link failure the diagnostic is logged and `None` is returned.
    ///
    /// A template name that was never registered is a programming bug and
    /// panics.
    pub fn get_or_compile<'a, I>(
        &mut self,
        device: &mut dyn Device,
        lifecycle: &mut ResourceLifecycle,
        registry: &TemplateRegistry,
        renderer: RendererId,
        template: &str,
        features: ProgramFeatures,
        extra_uniforms: I,
    ) -> Option<ProgramHandle>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let key = ProgramKey {
            template: template.into(),
            features,
        };

        if let Some(&handle) = self.by_key.get(&key) {
            if self.programs.is_alive(handle) {
                return Some(handle);
            }
        }

        let tpl = registry
            .get(template)
            .unwrap_or_else(|| panic!("Shader template {:?} is not registered.", template));

        let defines = features.defines();
        let vs = format!("{}{}", defines, tpl.vertex);
        let fs = format!("{}{}", defines, tpl.fragment);

        let handle = self.programs.create(CompiledProgram {
            key,
            uniforms: FastHashMap::default(),
            attributes: FastHashMap::default(),
        });

        match device.create_program(handle, &vs, &fs) {
            Ok(()) => {}
            Err(Error::ShaderCompile(stage, log)) => {
                error!(
                    "Failed to compile the {} shader of template {:?}.\n{}",
                    stage, template, log
                );
                self.programs.free(handle);
                return None;
            }
            Err(Error::ProgramLink(log)) => {
                error!("Failed to link template {:?}.\n{}", template, log);
                self.programs.free(handle);
                return None;
            }
            Err(err) => {
                error!("Failed to create program for template {:?}: {}", template, err);
                self.programs.free(handle);
                return None;
            }
        }

        lifecycle.register_realized(handle, renderer);

        // One-time location scan, so per-frame pushes never ask the device.
        let mut uniforms = FastHashMap::default();
        for &name in CORE_UNIFORMS {
            if let Some(location) = device.uniform_location(handle, name) {
                uniforms.insert(name.into(), location);
            }
        }

        for i in 0..usize::from(features.num_dir_lights) {
            for name in &["dir_light_color", "dir_light_direction"] {
                let indexed = format!("{}[{}]", name, i);
                if let Some(location) = device.uniform_location(handle, &indexed) {
                    uniforms.insert(indexed.into(), location);
                }
            }
        }

        for i in 0..usize::from(features.num_point_lights) {
            for name in &["point_light_color", "point_light_position", "point_light_distance"] {
                let indexed = format!("{}[{}]", name, i);
                if let Some(location) = device.uniform_location(handle, &indexed) {
                    uniforms.insert(indexed.into(), location);
                }
            }
        }

        for name in extra_uniforms {
            if let Some(location) = device.uniform_location(handle, name) {
                uniforms.insert(name.into(), location);
            }
        }

        let mut attributes = FastHashMap::default();
        for &(name, _) in VERTEX_ATTRIBUTES {
            if let Some(location) = device.attribute_location(handle, name) {
                attributes.insert(name.into(), location);
            }
        }

        let program = self.programs.get_mut(handle).unwrap_or_else(|| {
            panic!("{} vanished from the cache during compilation.", handle)
        });
        program.uniforms = uniforms;
        program.attributes = attributes;

        self.by_key.insert(key, handle);
        info!("Compiled program {} for template {:?}.", handle, template);

        Some(handle)
    }

    /// Drops cache entries whose programs were retired by the lifecycle.
    pub fn evict(&mut self, retired: &[crate::res::GpuObject]) {
        for obj in retired {
            if let crate::res::GpuObject::Program(handle) = obj {
                self.by_key.retain(|_, v| v != handle);
                self.programs.free(*handle);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::headless::{DeviceCall, RecordingDevice};

    struct Env {
        device: RecordingDevice,
        lifecycle: ResourceLifecycle,
        registry: TemplateRegistry,
        cache: ProgramCache,
    }

    impl Env {
        fn new() -> Self {
            Env {
                device: RecordingDevice::new(),
                lifecycle: ResourceLifecycle::new(),
                registry: TemplateRegistry::standard(),
                cache: ProgramCache::new(),
            }
        }

        fn compile(&mut self, template: &str, features: ProgramFeatures) -> Option<ProgramHandle> {
            self.cache.get_or_compile(
                &mut self.device,
                &mut self.lifecycle,
                &self.registry,
                1,
                template,
                features,
                std::iter::empty(),
            )
        }
    }

    #[test]
    fn identical_keys_share_one_program() {
        let mut env = Env::new();
        let features = ProgramFeatures::default();

        let a = env.compile("basic", features).unwrap();
        let b = env.compile("basic", features).unwrap();

        assert_eq!(a, b);
        assert_eq!(env.device.count(|v| matches!(v, DeviceCall::CreateProgram(_))), 1);
    }

    #[test]
    fn different_features_compile_separately() {
        let mut env = Env::new();

        let plain = env.compile("basic", ProgramFeatures::default()).unwrap();
        let mapped = env
            .compile(
                "basic",
                ProgramFeatures {
                    map_diffuse: true,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_ne!(plain, mapped);
    }

    #[test]
    fn compile_failure_yields_none() {
        let mut env = Env::new();
        env.device.fail_next_compile = true;

        assert!(env.compile("basic", ProgramFeatures::default()).is_none());
        assert!(env.cache.is_empty());

        // A later attempt with the same key compiles cleanly.
        assert!(env.compile("basic", ProgramFeatures::default()).is_some());
    }

    #[test]
    #[should_panic]
    fn unknown_template_is_fatal() {
        let mut env = Env::new();
        env.compile("toon", ProgramFeatures::default());
    }

    #[test]
    fn defines_reflect_features() {
        let features = ProgramFeatures {
            map_diffuse: true,
            use_fog: true,
            fog_exp2: true,
            num_dir_lights: 2,
            ..Default::default()
        };

        let defines = features.defines();
        assert!(defines.contains("#define NUM_DIR_LIGHTS 2"));
        assert!(defines.contains("#define USE_MAP"));
        assert!(defines.contains("#define FOG_EXP2"));
        assert!(!defines.contains("USE_VERTEX_COLORS"));
    }

    #[test]
    fn eviction_forces_recompile() {
        let mut env = Env::new();
        let features = ProgramFeatures::default();
        let a = env.compile("basic", features).unwrap();

        env.cache.evict(&[crate::res::GpuObject::Program(a)]);
        assert!(env.cache.get(a).is_none());

        let b = env.compile("basic", features).unwrap();
        assert_ne!(a, b);
    }
}
