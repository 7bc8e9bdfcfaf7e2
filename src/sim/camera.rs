//! Orbit camera and fog controller
//!
//! The camera circles the tower, climbing with it, and eases toward its target
//! every tick. Tall towers get a faster orbit, a slight dip in height, and fog
//! that thins out so the whole stack stays visible.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::settings::Settings;

/// Camera projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        width: f32,
        height: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn new(orthographic: bool, aspect: f32) -> Self {
        let aspect = sanitize_aspect(aspect);
        if orthographic {
            Projection::Orthographic {
                width: ORTHO_WIDTH,
                height: ORTHO_WIDTH / aspect,
                near: ORTHO_NEAR,
                far: ORTHO_FAR,
            }
        } else {
            Projection::Perspective {
                fov_y_degrees: FOV_Y_DEGREES,
                aspect,
                near: PERSPECTIVE_NEAR,
                far: PERSPECTIVE_FAR,
            }
        }
    }

    /// Recompute aspect (perspective) or frustum top/bottom (orthographic)
    /// Unusable aspects (zero, negative, NaN) keep the current one
    pub fn resize(&mut self, aspect: f32) {
        if !is_valid_aspect(aspect) {
            return;
        }
        let new_aspect = aspect;
        match self {
            Projection::Perspective { aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic { width, height, .. } => *height = *width / new_aspect,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                width,
                height,
                near,
                far,
            } => Mat4::orthographic_rh(
                -width / 2.0,
                width / 2.0,
                -height / 2.0,
                height / 2.0,
                near,
                far,
            ),
        }
    }
}

fn is_valid_aspect(aspect: f32) -> bool {
    aspect.is_finite() && aspect > 0.0
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if is_valid_aspect(aspect) { aspect } else { 1.0 }
}

/// Camera height for a tower of `n` layers.
///
/// Linear ramp below the tall-tower band, an extra boost inside it paired
/// with a dip that stops growing at the band's end.
pub fn orbit_height_for(n: usize, box_height: f32) -> f32 {
    let nf = n as f32;
    let boost = if n + 1 > TALL_TOWER_START { nf * 0.4 } else { 0.0 };
    let dip = if n >= TALL_TOWER_START {
        (n.min(TALL_TOWER_END) - TALL_TOWER_START) as f32
    } else {
        0.0
    };
    ORBIT_HEIGHT + nf * box_height * ORBIT_HEIGHT_RATIO + boost - dip
}

/// Smoothed orbit camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRig {
    pub position: Vec3,
    pub target_position: Vec3,
    pub look_at_current: Vec3,
    pub look_at_target: Vec3,
    /// Degrees
    pub orbit_angle: f32,
    pub orbit_length: f32,
    pub orbit_speed: f32,
    pub projection: Projection,
}

impl CameraRig {
    pub fn new(settings: &Settings, aspect: f32) -> Self {
        let start = Vec3::from(CAMERA_START);
        Self {
            position: start,
            target_position: start,
            look_at_current: Vec3::ZERO,
            look_at_target: Vec3::ZERO,
            orbit_angle: ORBIT_START_ANGLE,
            orbit_length: ORBIT_LENGTH,
            orbit_speed: ORBIT_SPEED,
            projection: Projection::new(settings.orthographic, aspect),
        }
    }

    /// Back to the start framing, keeping the current aspect
    pub fn reset(&mut self, settings: &Settings) {
        let aspect = match self.projection {
            Projection::Perspective { aspect, .. } => aspect,
            Projection::Orthographic { width, height, .. } => width / height,
        };
        *self = Self::new(settings, aspect);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.projection.resize(width as f32 / height as f32);
    }

    /// Advance the orbit and ease toward the tower top (one tick)
    pub fn update(&mut self, stack_len: usize, top_y: f32, settings: &Settings) {
        let tall_bonus = if stack_len > TALL_TOWER_START {
            self.orbit_speed
        } else {
            0.0
        };
        self.orbit_angle += self.orbit_speed + tall_bonus;

        let angle = self.orbit_angle.to_radians();
        self.target_position = Vec3::new(
            angle.cos() * self.orbit_length,
            orbit_height_for(stack_len, settings.box_height),
            angle.sin() * self.orbit_length,
        );

        if settings.placement_mode {
            self.position = Vec3::new(0.0, settings.placement_mode_height, 0.0);
        }

        self.look_at_target = Vec3::new(0.0, top_y, 0.0);
        self.look_at_current = self
            .look_at_current
            .lerp(self.look_at_target, LERP_RATIO * 2.0);
        self.position = self.position.lerp(self.target_position, LERP_RATIO);
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.look_at_current - self.position;
        // Straight down (placement mode) needs a different up vector
        let up = if forward.normalize_or_zero().cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.look_at_current, up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }
}

/// Exponential fog that thins out on tall towers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub enabled: bool,
    pub density: f32,
    pub color: [f32; 3],
}

impl Fog {
    pub fn new(settings: &Settings) -> Self {
        Self {
            enabled: settings.fog,
            density: FOG_DENSITY,
            color: FOG_COLOR,
        }
    }

    pub fn reset(&mut self, settings: &Settings) {
        *self = Self::new(settings);
    }

    pub fn update(&mut self, stack_len: usize) {
        if !self.enabled || stack_len <= TALL_TOWER_START {
            return;
        }
        self.density = (self.density - FOG_DECAY_PER_TICK).max(0.0);
    }

    /// Density the renderer should use (0 when disabled)
    pub fn effective_density(&self) -> f32 {
        if self.enabled { self.density } else { 0.0 }
    }
}
