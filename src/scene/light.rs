//! Scene lights.

use crate::math::{Point3, Vector3};

/// The kind-specific parameters of a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSource {
    Directional {
        direction: Vector3<f32>,
    },
    Point {
        position: Point3<f32>,
        /// The distance at which the light's contribution reaches zero.
        distance: f32,
    },
}

/// A light participating in the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: [f32; 3],
    pub intensity: f32,
    pub source: LightSource,
}

impl Light {
    pub fn directional(color: [f32; 3], intensity: f32, direction: Vector3<f32>) -> Self {
        Light {
            color,
            intensity,
            source: LightSource::Directional { direction },
        }
    }

    pub fn point(color: [f32; 3], intensity: f32, position: Point3<f32>, distance: f32) -> Self {
        Light {
            color,
            intensity,
            source: LightSource::Point { position, distance },
        }
    }
}
