//! Cameras: projection plus a world transform, with the derived matrices the
//! renderer consumes.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::math::{
    ortho, perspective, Deg, Frustum, Matrix4, Point3, SquareMatrix, Vector3,
};

static CAMERA_IDS: AtomicU64 = AtomicU64::new(1);

/// A camera with a unique identity, so the binder can detect camera switches
/// between draws.
#[derive(Debug, Clone)]
pub struct Camera {
    id: u64,
    projection: Matrix4<f32>,
    world: Matrix4<f32>,
}

impl Camera {
    /// A perspective camera. `fov` is the vertical field of view in degrees.
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Camera {
            id: CAMERA_IDS.fetch_add(1, Ordering::Relaxed),
            projection: perspective(Deg(fov), aspect, near, far),
            world: Matrix4::identity(),
        }
    }

    /// An orthographic camera.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Camera {
            id: CAMERA_IDS.fetch_add(1, Ordering::Relaxed),
            projection: ortho(left, right, bottom, top, near, far),
            world: Matrix4::identity(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_projection(&mut self, projection: Matrix4<f32>) {
        self.projection = projection;
    }

    pub fn set_world_matrix(&mut self, world: Matrix4<f32>) {
        self.world = world;
    }

    /// Places the camera at `eye`, looking at `target`.
    pub fn look_at(&mut self, eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
        let view = Matrix4::look_at_rh(eye, target, up);
        self.world = view.invert().unwrap_or_else(Matrix4::identity);
    }

    /// The camera's world-space position.
    pub fn position(&self) -> [f32; 3] {
        [self.world.w.x, self.world.w.y, self.world.w.z]
    }

    /// The view matrix, i.e. the inverse of the world transform.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.world.invert().unwrap_or_else(Matrix4::identity)
    }

    #[inline]
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    /// The combined projection-view matrix.
    pub fn projection_view(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }

    /// The view frustum in world space.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.projection_view())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identities_are_unique() {
        let a = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        let b = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn look_at_places_the_camera() {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.look_at(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );

        assert_eq!(camera.position(), [0.0, 0.0, 5.0]);

        // The origin sits 5 units down the view axis.
        let v = camera.view_matrix() * crate::math::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((v.z - (-5.0)).abs() < 1e-5);
    }

    #[test]
    fn frustum_follows_the_transform() {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.look_at(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );

        let frustum = camera.frustum();
        assert!(frustum.contains_sphere(Point3::new(0.0, 0.0, 0.0), 0.5));
        assert!(!frustum.contains_sphere(Point3::new(0.0, 0.0, 50.0), 0.5));
    }
}
