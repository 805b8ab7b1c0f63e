use crate::garden_core::placement::PlacedInstance;

/// Per-frame sway for placed instances. Reads the static wind parameters and
/// never writes back to them.
#[derive(Debug, Clone, Copy)]
pub struct InstanceAnimator {
    max_sway: f32,
}

impl InstanceAnimator {
    pub fn new(max_sway_degrees: f32) -> Self {
        Self {
            max_sway: max_sway_degrees.to_radians(),
        }
    }

    pub fn max_sway(&self) -> f32 {
        self.max_sway
    }

    /// Roll about the instance's facing axis, in radians. The phase is
    /// evaluated in f64; only the resulting angle is narrowed.
    pub fn sway(&self, elapsed: f64, instance: &PlacedInstance) -> f32 {
        let angle = elapsed * f64::from(instance.wind_speed) + f64::from(instance.wind_phase);
        angle.sin() as f32 * self.max_sway
    }

    pub fn animate<'a>(
        &'a self,
        elapsed: f64,
        instances: &'a [PlacedInstance],
    ) -> impl Iterator<Item = f32> + 'a {
        instances.iter().map(move |instance| self.sway(elapsed, instance))
    }
}

#[cfg(test)]
mod tests {
    use super::InstanceAnimator;
    use crate::garden_core::placement::PlacedInstance;
    use glam::Vec3;

    fn instance(phase: f32, speed: f32) -> PlacedInstance {
        PlacedInstance {
            position: Vec3::new(1.0, 0.0, 2.0),
            scale: Vec3::ONE,
            rotation_y: 0.5,
            wind_phase: phase,
            wind_speed: speed,
        }
    }

    #[test]
    fn sway_is_bounded_by_the_max_angle() {
        let animator = InstanceAnimator::new(3.0);
        let limit = 3.0_f32.to_radians() + 1e-6;
        let instances: Vec<_> = (0..50)
            .map(|i| instance(i as f32 * 0.37, 0.8 + i as f32 * 0.008))
            .collect();
        for step in 0..200 {
            let t = step as f64 * 0.05;
            for sway in animator.animate(t, &instances) {
                assert!(sway.abs() <= limit);
            }
        }
    }

    #[test]
    fn sway_follows_phase_and_speed() {
        let animator = InstanceAnimator::new(3.0);
        let a = instance(0.0, 1.0);
        assert_eq!(animator.sway(0.0, &a), 0.0);
        let peak = animator.sway(std::f64::consts::FRAC_PI_2, &a);
        assert!((peak - animator.max_sway()).abs() < 1e-6);

        let shifted = instance(std::f32::consts::FRAC_PI_2, 1.0);
        assert!((animator.sway(0.0, &shifted) - animator.max_sway()).abs() < 1e-6);
    }

    #[test]
    fn sway_stays_smooth_after_days_of_runtime() {
        let animator = InstanceAnimator::new(3.0);
        let a = instance(0.3, 1.0);
        let dt = 1.0 / 120.0;
        let mut t = 3.0 * 86_400.0;
        for _ in 0..20 {
            let now = animator.sway(t, &a);
            let next = animator.sway(t + dt, &a);
            let expected = (t + 0.3).cos() as f32 * animator.max_sway() * dt as f32;
            assert!(((next - now) - expected).abs() < 1e-5, "step at t={t}");
            t += dt;
        }
    }

    #[test]
    fn animating_leaves_static_attributes_alone() {
        let animator = InstanceAnimator::new(3.0);
        let instances = vec![instance(0.2, 1.1), instance(1.4, 0.9)];
        let before = instances.clone();
        let sways: Vec<f32> = animator.animate(4.2, &instances).collect();
        assert_eq!(sways.len(), 2);
        assert_eq!(instances, before);
    }
}
