// ABOUTME: Pointer ripple state owned by the frame driver.
// ABOUTME: An expanding ring that decays once per frame and drops out below epsilon.

use rain_core::RippleSettings;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Ripple {
    #[default]
    Inert,
    Active {
        /// Normalized position, origin top-left
        center: [f32; 2],
        strength: f32,
        /// Seconds since spawn
        age: f32,
    },
}

impl Ripple {
    /// Start a ripple at a normalized pointer position
    pub fn spawn(center: [f32; 2], settings: &RippleSettings) -> Self {
        if settings.strength < settings.epsilon {
            return Ripple::Inert;
        }
        Ripple::Active {
            center: [center[0].clamp(0.0, 1.0), center[1].clamp(0.0, 1.0)],
            strength: settings.strength,
            age: 0.0,
        }
    }

    /// One frame of decay
    pub fn advance(self, dt: f32, settings: &RippleSettings) -> Self {
        match self {
            Ripple::Inert => Ripple::Inert,
            Ripple::Active {
                center,
                strength,
                age,
            } => {
                let strength = strength * settings.decay;
                if strength < settings.epsilon {
                    tracing::debug!("Ripple faded out after {:.2}s", age + dt);
                    Ripple::Inert
                } else {
                    Ripple::Active {
                        center,
                        strength,
                        age: age + dt.max(0.0),
                    }
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Ripple::Active { .. })
    }

    pub fn strength(&self) -> f32 {
        match self {
            Ripple::Inert => 0.0,
            Ripple::Active { strength, .. } => *strength,
        }
    }

    /// Ring brightness at a normalized position. `aspect` (width / height)
    /// keeps the ring circular on non-square frames.
    pub fn intensity_at(&self, x: f32, y: f32, aspect: f32, settings: &RippleSettings) -> f32 {
        let Ripple::Active {
            center,
            strength,
            age,
        } = *self
        else {
            return 0.0;
        };
        let dx = (x - center[0]) * aspect;
        let dy = y - center[1];
        let distance = (dx * dx + dy * dy).sqrt();
        let radius = age * settings.speed;
        let d = (distance - radius) / settings.width;
        (strength * (-d * d).exp()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_decays_geometrically() {
        let settings = RippleSettings {
            decay: 0.9,
            epsilon: 1e-4,
            ..RippleSettings::default()
        };
        let s0 = settings.strength;
        let mut ripple = Ripple::spawn([0.5, 0.5], &settings);
        for n in 1..=30 {
            ripple = ripple.advance(1.0 / 60.0, &settings);
            let expected = s0 * settings.decay.powi(n);
            assert!((ripple.strength() - expected).abs() < 1e-5, "frame {n}");
        }
    }

    #[test]
    fn ripple_is_dropped_below_epsilon() {
        let settings = RippleSettings {
            strength: 1.0,
            decay: 0.5,
            epsilon: 0.1,
            ..RippleSettings::default()
        };
        let mut ripple = Ripple::spawn([0.2, 0.8], &settings);
        // 1.0 -> 0.5 -> 0.25 -> 0.125 -> 0.0625 (dropped)
        for _ in 0..3 {
            ripple = ripple.advance(0.016, &settings);
            assert!(ripple.is_active());
        }
        ripple = ripple.advance(0.016, &settings);
        assert_eq!(ripple, Ripple::Inert);
        assert_eq!(ripple.strength(), 0.0);
    }

    #[test]
    fn spawn_clamps_center() {
        let ripple = Ripple::spawn([-1.0, 3.0], &RippleSettings::default());
        match ripple {
            Ripple::Active { center, .. } => assert_eq!(center, [0.0, 1.0]),
            Ripple::Inert => panic!("expected active ripple"),
        }
    }

    #[test]
    fn ring_peaks_at_its_radius() {
        let settings = RippleSettings {
            decay: 0.99,
            speed: 0.5,
            width: 0.02,
            ..RippleSettings::default()
        };
        let mut ripple = Ripple::spawn([0.5, 0.5], &settings);
        for _ in 0..30 {
            ripple = ripple.advance(1.0 / 60.0, &settings);
        }
        // Age 0.5s -> radius 0.25
        let on_ring = ripple.intensity_at(0.75, 0.5, 1.0, &settings);
        let inside = ripple.intensity_at(0.55, 0.5, 1.0, &settings);
        let outside = ripple.intensity_at(0.95, 0.5, 1.0, &settings);
        assert!((on_ring - ripple.strength()).abs() < 1e-3);
        assert!(inside < 0.01 && outside < 0.01);
    }

    #[test]
    fn inert_ripple_contributes_nothing() {
        let settings = RippleSettings::default();
        assert_eq!(Ripple::Inert.intensity_at(0.5, 0.5, 1.0, &settings), 0.0);
        assert_eq!(Ripple::Inert.advance(1.0, &settings), Ripple::Inert);
    }
}
