//! The per-frame light uniform snapshot.

use log::warn;
use smallvec::SmallVec;

use crate::math::InnerSpace;
use crate::scene::{Light, LightSource};

use super::program::{MAX_DIR_LIGHTS, MAX_POINT_LIGHTS};

/// The flattened uniform arrays of a scene's lights. Rebuilt at most once per
/// frame, by the first material that consumes lights; later consumers reuse
/// the snapshot.
#[derive(Debug, Default, Clone)]
pub struct LightUniforms {
    pub dir_colors: SmallVec<[[f32; 3]; MAX_DIR_LIGHTS]>,
    pub dir_directions: SmallVec<[[f32; 3]; MAX_DIR_LIGHTS]>,
    pub point_colors: SmallVec<[[f32; 3]; MAX_POINT_LIGHTS]>,
    pub point_positions: SmallVec<[[f32; 3]; MAX_POINT_LIGHTS]>,
    pub point_distances: SmallVec<[f32; MAX_POINT_LIGHTS]>,
}

impl LightUniforms {
    /// Counts the lights by kind, clamped to the per-kind maxima the shader
    /// templates can address.
    pub fn census(lights: &[Light]) -> (u8, u8) {
        let mut dirs = 0usize;
        let mut points = 0usize;

        for light in lights {
            match light.source {
                LightSource::Directional { .. } => dirs += 1,
                LightSource::Point { .. } => points += 1,
            }
        }

        if dirs > MAX_DIR_LIGHTS || points > MAX_POINT_LIGHTS {
            warn!(
                "Scene has {} directional and {} point light(s); \
                 only {}/{} are addressable and the rest are ignored.",
                dirs, points, MAX_DIR_LIGHTS, MAX_POINT_LIGHTS
            );
        }

        (
            dirs.min(MAX_DIR_LIGHTS) as u8,
            points.min(MAX_POINT_LIGHTS) as u8,
        )
    }

    /// Rebuilds the snapshot from the scene's lights.
    pub fn rebuild(&mut self, lights: &[Light]) {
        self.dir_colors.clear();
        self.dir_directions.clear();
        self.point_colors.clear();
        self.point_positions.clear();
        self.point_distances.clear();

        for light in lights {
            let color = [
                light.color[0] * light.intensity,
                light.color[1] * light.intensity,
                light.color[2] * light.intensity,
            ];

            match light.source {
                LightSource::Directional { direction } => {
                    if self.dir_colors.len() < MAX_DIR_LIGHTS {
                        self.dir_colors.push(color);
                        self.dir_directions.push(direction.normalize().into());
                    }
                }
                LightSource::Point { position, distance } => {
                    if self.point_colors.len() < MAX_POINT_LIGHTS {
                        self.point_colors.push(color);
                        self.point_positions.push(position.into());
                        self.point_distances.push(distance);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Point3, Vector3};

    #[test]
    fn census_counts_by_kind() {
        let lights = vec![
            Light::directional([1.0, 1.0, 1.0], 1.0, Vector3::new(0.0, -1.0, 0.0)),
            Light::point([1.0, 0.0, 0.0], 1.0, Point3::new(0.0, 2.0, 0.0), 10.0),
            Light::point([0.0, 1.0, 0.0], 1.0, Point3::new(2.0, 0.0, 0.0), 10.0),
        ];

        assert_eq!(LightUniforms::census(&lights), (1, 2));
    }

    #[test]
    fn rebuild_scales_by_intensity_and_normalizes() {
        let lights = vec![Light::directional(
            [1.0, 0.5, 0.0],
            2.0,
            Vector3::new(0.0, -2.0, 0.0),
        )];

        let mut uniforms = LightUniforms::default();
        uniforms.rebuild(&lights);

        assert_eq!(uniforms.dir_colors[0], [2.0, 1.0, 0.0]);
        assert_eq!(uniforms.dir_directions[0], [0.0, -1.0, 0.0]);
        assert!(uniforms.point_colors.is_empty());
    }

    #[test]
    fn rebuild_clamps_to_addressable_counts() {
        let lights: Vec<_> = (0..6)
            .map(|_| Light::directional([1.0, 1.0, 1.0], 1.0, Vector3::new(0.0, -1.0, 0.0)))
            .collect();

        let mut uniforms = LightUniforms::default();
        uniforms.rebuild(&lights);
        assert_eq!(uniforms.dir_colors.len(), MAX_DIR_LIGHTS);
    }
}
