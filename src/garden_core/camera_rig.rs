use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3Def,
    pub look_target: Vec3Def,
}

/// Plain `[x, y, z]` on disk; `glam` is built without its serde feature.
pub type Vec3Def = [f32; 3];

impl CameraPose {
    pub fn new(position: Vec3, look_target: Vec3) -> Self {
        Self {
            position: position.to_array(),
            look_target: look_target.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn look_target(&self) -> Vec3 {
        Vec3::from_array(self.look_target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraEndpoints {
    pub start: CameraPose,
    pub end: CameraPose,
}

impl Default for CameraEndpoints {
    fn default() -> Self {
        Self {
            start: CameraPose::new(Vec3::new(0.0, 0.4, 2.0), Vec3::new(0.0, 0.1, 0.0)),
            end: CameraPose::new(Vec3::new(0.0, 2.2, 2.2), Vec3::ZERO),
        }
    }
}

/// Moves the camera along a straight line between two poses as the progress
/// scalar goes from 0 to 1.
#[derive(Debug, Clone)]
pub struct CameraRig {
    endpoints: CameraEndpoints,
    progress: f32,
}

impl CameraRig {
    pub fn new(endpoints: CameraEndpoints) -> Self {
        Self {
            endpoints,
            progress: 0.0,
        }
    }

    pub fn endpoints(&self) -> &CameraEndpoints {
        &self.endpoints
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = clamp_progress(progress);
    }

    pub fn pose(&self) -> CameraPose {
        self.pose_at(self.progress)
    }

    pub fn pose_at(&self, progress: f32) -> CameraPose {
        let p = clamp_progress(progress);
        let start = &self.endpoints.start;
        let end = &self.endpoints.end;
        CameraPose::new(
            start.position().lerp(end.position(), p),
            start.look_target().lerp(end.look_target(), p),
        )
    }
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 1.0)
}

/// Normalizes a raw scroll offset against `[0, range]`, the way a page scroll
/// position maps onto a scroll-triggered animation.
#[derive(Debug, Clone)]
pub struct ScrollTrack {
    offset: f32,
    range: f32,
}

impl ScrollTrack {
    pub fn new(range: f32) -> Self {
        Self {
            offset: 0.0,
            range: range.max(0.0),
        }
    }

    pub fn scroll_by(&mut self, delta: f32) -> f32 {
        if delta.is_finite() {
            self.offset = (self.offset + delta).clamp(0.0, self.range);
        }
        self.progress()
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.offset = clamp_progress(progress) * self.range;
    }

    pub fn progress(&self) -> f32 {
        if self.range <= f32::EPSILON {
            return 0.0;
        }
        clamp_progress(self.offset / self.range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lens {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Intersection with the ground plane `y = 0`, if the ray points at it.
    pub fn intersect_ground(&self) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = -self.origin.y / self.direction.y;
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        Some(self.origin + self.direction * t)
    }
}

/// Everything needed to project the scene or unproject a pointer.
#[derive(Debug, Clone, Copy)]
pub struct CameraView {
    pub pose: CameraPose,
    pub lens: Lens,
    pub aspect: f32,
}

impl CameraView {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.pose.position(), self.pose.look_target(), Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.lens.fov_y_degrees.to_radians(),
            self.aspect.max(1e-3),
            self.lens.near,
            self.lens.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let view_proj = self.view_projection();
        if view_proj.determinant().abs() < f32::EPSILON {
            return None;
        }
        let inverse = view_proj.inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        let direction = (far - near).normalize_or_zero();
        if direction == Vec3::ZERO || !near.is_finite() || !direction.is_finite() {
            return None;
        }
        Some(Ray {
            origin: near,
            direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraEndpoints, CameraPose, CameraRig, CameraView, Lens, ScrollTrack};
    use glam::{Vec2, Vec3};

    fn rig() -> CameraRig {
        CameraRig::new(CameraEndpoints::default())
    }

    #[test]
    fn endpoints_are_hit_exactly() {
        let rig = rig();
        let endpoints = CameraEndpoints::default();
        assert_eq!(rig.pose_at(0.0), endpoints.start);
        assert_eq!(rig.pose_at(1.0), endpoints.end);
    }

    #[test]
    fn progress_outside_unit_range_is_clamped() {
        let rig = rig();
        assert_eq!(rig.pose_at(-3.0), rig.pose_at(0.0));
        assert_eq!(rig.pose_at(7.5), rig.pose_at(1.0));
        assert_eq!(rig.pose_at(f32::NAN), rig.pose_at(0.0));

        let mut rig = rig;
        rig.set_progress(1.4);
        assert_eq!(rig.progress(), 1.0);
    }

    #[test]
    fn position_is_monotonic_between_endpoints() {
        let rig = rig();
        let start = rig.pose_at(0.0).position();
        let end = rig.pose_at(1.0).position();
        let direction = (end - start).signum();

        let mut previous = start;
        for step in 1..=100 {
            let current = rig.pose_at(step as f32 / 100.0).position();
            let delta = (current - previous) * direction;
            assert!(delta.x >= -1e-6 && delta.y >= -1e-6 && delta.z >= -1e-6);
            previous = current;
        }
    }

    #[test]
    fn scroll_track_normalizes_and_clamps() {
        let mut track = ScrollTrack::new(1000.0);
        assert_eq!(track.scroll_by(250.0), 0.25);
        assert_eq!(track.scroll_by(-900.0), 0.0);
        assert_eq!(track.scroll_by(5000.0), 1.0);
        track.set_progress(0.5);
        assert_eq!(track.progress(), 0.5);

        let mut empty = ScrollTrack::new(0.0);
        assert_eq!(empty.scroll_by(40.0), 0.0);
    }

    #[test]
    fn center_ray_hits_the_look_target() {
        let view = CameraView {
            pose: CameraPose::new(Vec3::new(0.0, 2.2, 2.2), Vec3::ZERO),
            lens: Lens::default(),
            aspect: 16.0 / 9.0,
        };
        let ray = view.ray_from_ndc(Vec2::ZERO).unwrap();
        let hit = ray.intersect_ground().unwrap();
        assert!(hit.length() < 1e-2, "hit {hit:?}");
    }

    #[test]
    fn ray_parallel_to_ground_misses() {
        let view = CameraView {
            pose: CameraPose::new(Vec3::new(0.0, 1.0, 5.0), Vec3::new(0.0, 1.0, 0.0)),
            lens: Lens::default(),
            aspect: 1.0,
        };
        let ray = view.ray_from_ndc(Vec2::ZERO).unwrap();
        assert!(ray.intersect_ground().is_none());
    }
}
