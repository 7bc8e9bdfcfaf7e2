//! Stack Tower - A stacking-tower arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tower cutting, autopilot, camera, game state)
//! - `renderer`: WebGPU rendering pipeline
//! - `settings`: Configuration surface (LocalStorage + URL overrides)
//! - `highscores`: Best-score table
//! - `audio`: Procedural Web Audio cues

pub mod audio;
pub mod highscores;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use highscores::HighScores;
pub use settings::{Settings, SettingsError};

/// Game configuration constants
pub mod consts {
    /// Fixed physics substep (120 Hz)
    pub const PHYSICS_DT: f32 = 1.0 / 120.0;
    /// Maximum physics substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Gravity (units/s²), pulls along -Y
    pub const GRAVITY: f32 = -10.0;

    /// Mass of a falling fragment with the original footprint
    pub const BASE_MASS: f32 = 5.0;
    /// Milliseconds a falling fragment lives before it is culled
    pub const FRAGMENT_LIFETIME_MS: f32 = 10_000.0;
    /// The active layer misses once it slides past this distance from the axis origin
    pub const SLIDE_BOUND: f32 = 11.0;

    /// Static ground slab under the tower
    pub const FLOOR_HALF_EXTENTS: [f32; 3] = [100.0, 1.0, 100.0];
    pub const FLOOR_Y: f32 = -1.0;

    /// Camera orbit
    pub const CAMERA_START: [f32; 3] = [20.0, 20.0, 20.0];
    pub const ORBIT_START_ANGLE: f32 = 45.0; // degrees
    pub const ORBIT_LENGTH: f32 = 10.0;
    pub const ORBIT_HEIGHT: f32 = 10.0;
    pub const ORBIT_SPEED: f32 = -0.05; // degrees per tick
    /// Camera climbs at this fraction of the tower height
    pub const ORBIT_HEIGHT_RATIO: f32 = 0.5;
    /// Exponential smoothing ratio for camera position (lookAt uses twice this)
    pub const LERP_RATIO: f32 = 0.1;

    /// Tall-tower camera band: the camera speeds up above the start and
    /// settles back down until the end
    pub const TALL_TOWER_START: usize = 35;
    pub const TALL_TOWER_END: usize = 45;

    /// Projection
    pub const FOV_Y_DEGREES: f32 = 45.0;
    pub const PERSPECTIVE_NEAR: f32 = 1.0;
    pub const PERSPECTIVE_FAR: f32 = 1200.0;
    pub const ORTHO_WIDTH: f32 = 200.0;
    pub const ORTHO_NEAR: f32 = 0.0;
    pub const ORTHO_FAR: f32 = 200.0;

    /// Fog
    pub const FOG_DENSITY: f32 = 0.016;
    pub const FOG_DECAY_PER_TICK: f32 = 0.000_06;
    pub const FOG_COLOR: [f32; 3] = [0.667, 0.667, 0.667]; // #AAAAAA
}

/// Convert HSL (hue in degrees, saturation/lightness in 0-1) to linear-ish RGB
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsl_primaries() {
        let red = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((red[0] - 1.0).abs() < 1e-5 && red[1].abs() < 1e-5 && red[2].abs() < 1e-5);

        let green = hsl_to_rgb(120.0, 1.0, 0.5);
        assert!((green[1] - 1.0).abs() < 1e-5 && green[0].abs() < 1e-5);

        // Grey has no chroma
        let grey = hsl_to_rgb(200.0, 0.0, 0.7);
        assert!(grey.iter().all(|c| (c - 0.7).abs() < 1e-5));
    }
}
