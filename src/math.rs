//! The math primitives used across the crate. Most of the heavy lifting is
//! re-exported from `cgmath`; this module only adds the few renderer-specific
//! types it lacks.

pub use cgmath::prelude::*;
pub use cgmath::{
    ortho, perspective, Deg, Matrix3, Matrix4, PerspectiveFov, Point3, Rad, Vector2, Vector3,
    Vector4,
};

/// A RGBA color with each channel in the `[0.0, 1.0]` range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    #[inline]
    pub const fn black() -> Self {
        Color::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }

    /// Returns the color channels without alpha.
    #[inline]
    pub fn rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<Color> for [f32; 4] {
    fn from(v: Color) -> Self {
        [v.r, v.g, v.b, v.a]
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

/// A view frustum described by its six clipping planes, extracted from a
/// combined projection-view matrix.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    // (nx, ny, nz, d) with the normal pointing inwards.
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extracts the clipping planes from a projection-view matrix using the
    /// Gribb-Hartmann method.
    pub fn from_matrix(m: &Matrix4<f32>) -> Self {
        let row = |i: usize| Vector4::new(m.x[i], m.y[i], m.z[i], m.w[i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let mut planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ];

        for p in &mut planes {
            let len = p.truncate().magnitude();
            if len > std::f32::EPSILON {
                *p /= len;
            }
        }

        Frustum { planes }
    }

    /// Returns true if the sphere intersects the frustum volume.
    pub fn contains_sphere(&self, center: Point3<f32>, radius: f32) -> bool {
        let c = center.to_vec();
        self.planes
            .iter()
            .all(|p| p.truncate().dot(c) + p.w >= -radius)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn camera_matrix() -> Matrix4<f32> {
        perspective(Deg(60.0), 1.0, 0.1, 100.0)
    }

    #[test]
    fn sphere_in_front_of_camera() {
        // The view space camera looks down -Z.
        let frustum = Frustum::from_matrix(&camera_matrix());
        assert!(frustum.contains_sphere(Point3::new(0.0, 0.0, -10.0), 1.0));
    }

    #[test]
    fn sphere_behind_camera() {
        let frustum = Frustum::from_matrix(&camera_matrix());
        assert!(!frustum.contains_sphere(Point3::new(0.0, 0.0, 10.0), 1.0));
    }

    #[test]
    fn sphere_straddling_a_plane() {
        let frustum = Frustum::from_matrix(&camera_matrix());
        // Center beyond the far plane, radius reaching back inside.
        assert!(frustum.contains_sphere(Point3::new(0.0, 0.0, -104.0), 5.0));
    }

    #[test]
    fn color_roundtrip() {
        let c: [f32; 4] = Color::new(0.1, 0.2, 0.3, 1.0).into();
        assert_eq!(c, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(Color::white().rgb(), [1.0, 1.0, 1.0]);
    }
}
