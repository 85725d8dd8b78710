//! The material bind step of the frame.
//!
//! `MaterialBinder::bind` settles everything between "this drawable uses that
//! material" and "the device is ready to draw": the recompile decision, the
//! program bind, and every uniform push. Redundant work is avoided with three
//! refresh flags derived from what actually changed since the previous
//! drawable: the program, the material, or the camera. Light uniforms are
//! rebuilt by the first lit material of the frame and reused afterwards.

use log::warn;
use smallvec::SmallVec;

use crate::device::{Device, ProgramHandle, TextureHandle, UniformValue};
use crate::errors::Result;
use crate::math::{Matrix, Matrix3, Matrix4, SquareMatrix};
use crate::res::{GpuObject, RendererId, ResourceLifecycle, TextureStore};
use crate::scene::{Camera, Fog, Light};

use super::lights::LightUniforms;
use super::material::{Material, MaterialHandle};
use super::program::{CompiledProgram, ProgramCache};
use super::template::TemplateRegistry;

/// The per-object matrices pushed with every draw.
#[derive(Debug, Clone, Copy)]
pub struct ObjectMatrices {
    pub model: Matrix4<f32>,
    pub model_view: Matrix4<f32>,
    pub normal: Matrix3<f32>,
}

impl ObjectMatrices {
    pub fn new(model: Matrix4<f32>, view: Matrix4<f32>) -> Self {
        let model_view = view * model;
        let upper = Matrix3::from_cols(
            model_view.x.truncate(),
            model_view.y.truncate(),
            model_view.z.truncate(),
        );
        let normal = upper
            .invert()
            .map(|v| v.transpose())
            .unwrap_or(upper);

        ObjectMatrices {
            model,
            model_view,
            normal,
        }
    }
}

/// See the module documentation.
#[derive(Debug, Default)]
pub struct MaterialBinder {
    current_program: Option<ProgramHandle>,
    current_material: Option<MaterialHandle>,
    current_camera: Option<u64>,
    lights: LightUniforms,
    lights_fresh: bool,
    unit_budget_warned: bool,
}

impl MaterialBinder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Forgets the previous frame's bindings and marks the light snapshot
    /// stale. Called once at frame entry.
    pub fn begin_frame(&mut self) {
        self.current_program = None;
        self.current_material = None;
        self.current_camera = None;
        self.lights_fresh = false;
    }

    /// Prepares the device to draw one object with `material`. Returns the
    /// program to draw with, or `None` when the material has no usable
    /// program this frame and the object must be skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn bind(
        &mut self,
        device: &mut dyn Device,
        lifecycle: &mut ResourceLifecycle,
        programs: &mut ProgramCache,
        templates: &TemplateRegistry,
        textures: &mut TextureStore,
        renderer: RendererId,
        handle: MaterialHandle,
        material: &mut Material,
        camera: &Camera,
        lights: &[Light],
        fog: Option<&Fog>,
        object: &ObjectMatrices,
    ) -> Result<Option<ProgramHandle>> {
        // Step 1: the recompile decision. One attempt per touch; a failed
        // compile stamps the material too, so it is skipped quietly until the
        // application dirties it again.
        if material.needs_update() || material.valid_for() != Some(renderer) {
            // References counted on another renderer's lifecycle are dropped
            // without a release; this lifecycle never registered them.
            let owns_here = material.valid_for() == Some(renderer);
            if let Some(old) = material.program.take() {
                if owns_here {
                    lifecycle.unuse_object(GpuObject::Program(old));
                }
            }
            for texture in material.owned_textures.drain(..) {
                if owns_here {
                    lifecycle.unuse_object(GpuObject::Texture(texture));
                }
            }

            let (num_dir, num_point) = LightUniforms::census(lights);
            let features = material.features(
                num_dir,
                num_point,
                fog.is_some(),
                fog.map_or(false, |v| v.is_exp2()),
            );

            let template = material.shading().template_name();
            let compiled = {
                let names: Vec<&str> = material.uniform_names().collect();
                programs.get_or_compile(
                    device,
                    lifecycle,
                    templates,
                    renderer,
                    template,
                    features,
                    names,
                )
            };

            if let Some(program) = compiled {
                lifecycle.use_object(GpuObject::Program(program));
                material.program = Some(program);
            }

            material.stamp(renderer);

            // The stamped renderer co-owns every mapped texture, so a store
            // destroy can not retire a texture a material still binds.
            let mut owned: SmallVec<[TextureHandle; 2]> = SmallVec::new();
            for (_, value) in material.uniforms() {
                if let UniformValue::Texture(texture) = value {
                    lifecycle.use_object(GpuObject::Texture(*texture));
                    owned.push(*texture);
                }
            }
            material.owned_textures = owned;
        }

        let handle_program = match material.program {
            Some(v) => v,
            None => return Ok(None),
        };

        // Step 2: refresh flags.
        let refresh_program = self.current_program != Some(handle_program);
        let refresh_material = refresh_program || self.current_material != Some(handle);
        let refresh_camera = self.current_camera != Some(camera.id());

        if refresh_program {
            device.bind_program(handle_program);
            self.current_program = Some(handle_program);
        }
        self.current_material = Some(handle);

        let program = programs
            .get(handle_program)
            .unwrap_or_else(|| panic!("{} missing from the program cache.", handle_program));

        // Step 3: camera-scoped uniforms. Uniform values are program state,
        // so they survive material switches on a shared program and need a
        // refresh only when the program or the camera changes.
        if refresh_program || refresh_camera {
            push(device, program, "projection_matrix", camera.projection_matrix());
            if material.needs_camera_position() {
                push(device, program, "camera_position", camera.position());
            }
            if material.needs_view_matrix() {
                push(device, program, "view_matrix", camera.view_matrix());
            }
            self.current_camera = Some(camera.id());
        }

        // Step 4: material-scoped uniforms and textures.
        if refresh_material {
            self.push_material(device, lifecycle, textures, renderer, program, material)?;

            if material.needs_lights() {
                if !self.lights_fresh {
                    self.lights.rebuild(lights);
                    self.lights_fresh = true;
                }
                self.push_lights(device, program);
            }

            if let Some(fog) = fog {
                self.push_fog(device, program, material, fog);
            }
        }

        // Step 5: per-object matrices, always.
        push(device, program, "model_matrix", object.model);
        push(device, program, "model_view_matrix", object.model_view);
        push(device, program, "normal_matrix", object.normal);

        Ok(Some(handle_program))
    }

    fn push_material(
        &mut self,
        device: &mut dyn Device,
        lifecycle: &mut ResourceLifecycle,
        textures: &mut TextureStore,
        renderer: RendererId,
        program: &CompiledProgram,
        material: &Material,
    ) -> Result<()> {
        let budget = device.max_texture_units();
        let mut unit = 0u32;

        for (name, value) in material.uniforms() {
            let location = match program.uniform_location(name.as_str()) {
                Some(v) => v,
                None => continue,
            };

            match value {
                UniformValue::Texture(texture) => {
                    textures.realize(device, lifecycle, renderer, *texture)?;

                    if unit >= budget && !self.unit_budget_warned {
                        self.unit_budget_warned = true;
                        warn!(
                            "Material wants more than {} texture unit(s); \
                             bindings beyond the budget may be ignored by the device.",
                            budget
                        );
                    }

                    device.set_uniform(location, &UniformValue::I32(unit as i32));
                    device.bind_texture(unit, *texture);
                    unit += 1;
                }
                other => device.set_uniform(location, other),
            }
        }

        Ok(())
    }

    fn push_lights(&self, device: &mut dyn Device, program: &CompiledProgram) {
        for (i, color) in self.lights.dir_colors.iter().enumerate() {
            push_indexed(device, program, "dir_light_color", i, *color);
            push_indexed(
                device,
                program,
                "dir_light_direction",
                i,
                self.lights.dir_directions[i],
            );
        }

        for (i, color) in self.lights.point_colors.iter().enumerate() {
            push_indexed(device, program, "point_light_color", i, *color);
            push_indexed(
                device,
                program,
                "point_light_position",
                i,
                self.lights.point_positions[i],
            );
            push_indexed(
                device,
                program,
                "point_light_distance",
                i,
                self.lights.point_distances[i],
            );
        }
    }

    fn push_fog(
        &self,
        device: &mut dyn Device,
        program: &CompiledProgram,
        material: &Material,
        fog: &Fog,
    ) {
        if !material.features(0, 0, true, fog.is_exp2()).use_fog {
            return;
        }

        push(device, program, "fog_color", fog.color());
        match fog {
            Fog::Linear { near, far, .. } => {
                push(device, program, "fog_near", *near);
                push(device, program, "fog_far", *far);
            }
            Fog::Exp2 { density, .. } => {
                push(device, program, "fog_density", *density);
            }
        }
    }
}

fn push<T: Into<UniformValue>>(
    device: &mut dyn Device,
    program: &CompiledProgram,
    name: &str,
    value: T,
) {
    if let Some(location) = program.uniform_location(name) {
        device.set_uniform(location, &value.into());
    }
}

fn push_indexed<T: Into<UniformValue>>(
    device: &mut dyn Device,
    program: &CompiledProgram,
    name: &str,
    index: usize,
    value: T,
) {
    let indexed = format!("{}[{}]", name, index);
    if let Some(location) = program.uniform_location(indexed.as_str()) {
        device.set_uniform(location, &value.into());
    }
}
