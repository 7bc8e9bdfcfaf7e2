//! Autopilot: plays the game by stopping each layer near the one below

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::layer::Layer;
use crate::settings::Settings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Autopilot {
    pub enabled: bool,
    /// How far past the layer below the active layer travels before committing
    pub precision: f32,
}

impl Autopilot {
    pub fn new(settings: &Settings) -> Self {
        Self {
            enabled: settings.autopilot,
            precision: settings.autopilot_error,
        }
    }

    /// Pick the precision for the next layer.
    ///
    /// One jitter value is consumed from the session RNG per layer; the
    /// configured error is what the autopilot actually uses.
    pub fn redraw(&mut self, rng: &mut Pcg32, settings: &Settings) {
        let _jitter: f32 = rng.random_range(-0.5..0.5);
        self.enabled = settings.autopilot;
        self.precision = settings.autopilot_error;
    }

    /// Whether the active layer has reached its stop point
    pub fn should_stop(&self, top: &Layer, prev: &Layer, sign: f32) -> bool {
        let dir = top.direction;
        let at = dir.of(top.position);
        let target = dir.of(prev.position);
        if sign > 0.0 {
            at >= target + self.precision
        } else {
            at <= target - self.precision
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::layer::{Axis, BoxHandles};
    use crate::sim::physics::BodyHandle;
    use crate::sim::scene::NodeId;
    use glam::Vec3;
    use rand::SeedableRng;

    fn layer(x: f32) -> Layer {
        Layer {
            position: Vec3::new(x, 1.0, 0.0),
            width: 5.0,
            depth: 5.0,
            direction: Axis::X,
            handles: BoxHandles {
                node: NodeId(0),
                body: BodyHandle(0),
            },
            detached: false,
        }
    }

    #[test]
    fn test_redraw_uses_configured_error() {
        let settings = Settings {
            autopilot: true,
            autopilot_error: 0.25,
            ..Settings::default()
        };
        let mut pilot = Autopilot::default();
        let mut rng = Pcg32::seed_from_u64(7);
        pilot.redraw(&mut rng, &settings);
        assert!(pilot.enabled);
        assert_eq!(pilot.precision, 0.25);

        // Same again on the next draw
        pilot.redraw(&mut rng, &settings);
        assert_eq!(pilot.precision, 0.25);
    }

    #[test]
    fn test_stop_moving_right() {
        let pilot = Autopilot::default();
        let prev = layer(0.0);
        assert!(!pilot.should_stop(&layer(-3.0), &prev, 1.0));
        assert!(pilot.should_stop(&layer(0.0), &prev, 1.0));
        assert!(pilot.should_stop(&layer(0.4), &prev, 1.0));
    }

    #[test]
    fn test_stop_moving_left_with_precision() {
        let pilot = Autopilot {
            enabled: true,
            precision: 0.5,
        };
        let prev = layer(1.0);
        assert!(!pilot.should_stop(&layer(0.7), &prev, -1.0));
        assert!(pilot.should_stop(&layer(0.5), &prev, -1.0));
    }
}
