//! Tower layers, falling fragments, and the factory that pairs each box's
//! scene node with its physics body.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::physics::{BodyDesc, BodyHandle, PhysicsWorld};
use super::scene::{NodeGroup, NodeId, Scene, SceneNode};
use crate::consts::BASE_MASS;
use crate::hsl_to_rgb;
use crate::settings::Settings;

/// Horizontal axis a layer slides along and is cut on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    /// The perpendicular horizontal axis
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// Component of `v` along this axis
    #[inline]
    pub fn of(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Z => v.z,
        }
    }

    #[inline]
    pub fn set(self, v: &mut Vec3, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Z => v.z = value,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Z => "z",
        }
    }
}

/// The scene world and the physics world a box lives in
#[derive(Debug, Clone, Default)]
pub struct Stage<P> {
    pub scene: Scene,
    pub physics: P,
}

impl<P: PhysicsWorld> Stage<P> {
    pub fn new(physics: P) -> Self {
        Self {
            scene: Scene::new(),
            physics,
        }
    }
}

/// Visual node + physics body of one box (always created and moved together)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxHandles {
    pub node: NodeId,
    pub body: BodyHandle,
}

/// Request for a new box
#[derive(Debug, Clone, Copy)]
pub struct BoxSpec {
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
    /// Falls under gravity (fragments) instead of staying put (layers)
    pub dynamic: bool,
    /// Tower height when spawned, drives the colour ramp
    pub level: usize,
}

/// Fragment mass scales with footprint area; static boxes get 0
pub fn box_mass(width: f32, depth: f32, dynamic: bool, settings: &Settings) -> f32 {
    if !dynamic {
        return 0.0;
    }
    let reference = settings.original_box_size;
    BASE_MASS * (width / reference) * (depth / reference)
}

/// Warm hue ramp climbing with the tower
pub fn layer_color(level: usize) -> [f32; 3] {
    hsl_to_rgb(30.0 + level as f32 * 4.0, 1.0, 0.7)
}

/// Create the paired scene node and physics body for a box
pub fn spawn_box<P: PhysicsWorld>(
    stage: &mut Stage<P>,
    settings: &Settings,
    desc: BoxSpec,
) -> BoxHandles {
    let size = Vec3::new(desc.width, settings.box_height, desc.depth);

    let node = stage.scene.add(SceneNode::new(
        desc.position,
        size,
        layer_color(desc.level),
        NodeGroup::Main,
    ));
    let body = stage.physics.add_body(BodyDesc {
        position: desc.position,
        half_extents: size / 2.0,
        mass: box_mass(desc.width, desc.depth, desc.dynamic, settings),
    });

    BoxHandles { node, body }
}

/// One level of the tower
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
    pub direction: Axis,
    pub handles: BoxHandles,
    /// Set once a missed layer's node and body were handed over to a fragment
    pub detached: bool,
}

impl Layer {
    /// Footprint size along an axis (width for X, depth for Z)
    #[inline]
    pub fn extent(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.width,
            Axis::Z => self.depth,
        }
    }

    #[inline]
    pub fn set_extent(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.width = value,
            Axis::Z => self.depth = value,
        }
    }

    /// Position along the layer's own slide axis
    #[inline]
    pub fn slide_position(&self) -> f32 {
        self.direction.of(self.position)
    }
}

/// A falling piece cut off (or fully missed) from a layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
    pub handles: BoxHandles,
    /// Remaining milliseconds, set on the first physics tick that sees it
    pub lifetime: Option<f32>,
}

impl Fragment {
    pub fn is_expired(&self) -> bool {
        self.lifetime.is_some_and(|ms| ms <= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::RapierPhysics;

    #[test]
    fn test_axis_helpers() {
        assert_eq!(Axis::X.other(), Axis::Z);
        assert_eq!(Axis::Z.other(), Axis::X);

        let mut v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Axis::X.of(v), 1.0);
        assert_eq!(Axis::Z.of(v), 3.0);
        Axis::Z.set(&mut v, -4.0);
        assert_eq!(v, Vec3::new(1.0, 2.0, -4.0));
    }

    #[test]
    fn test_mass_scales_with_footprint() {
        let settings = Settings::default();
        assert_eq!(box_mass(5.0, 5.0, false, &settings), 0.0);
        assert!((box_mass(5.0, 5.0, true, &settings) - BASE_MASS).abs() < 1e-6);
        // Half width, full depth -> half mass
        assert!((box_mass(2.5, 5.0, true, &settings) - BASE_MASS / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_spawn_box_pairs_node_and_body() {
        let settings = Settings::default();
        let mut stage = Stage::new(RapierPhysics::new());
        let pos = Vec3::new(1.0, 3.0, -2.0);
        let handles = spawn_box(
            &mut stage,
            &settings,
            BoxSpec {
                position: pos,
                width: 4.0,
                depth: 2.0,
                dynamic: true,
                level: 3,
            },
        );

        let node = stage.scene.get(handles.node).unwrap();
        assert_eq!(node.position, pos);
        assert_eq!(node.size, Vec3::new(4.0, settings.box_height, 2.0));
        assert_eq!(node.group, NodeGroup::Main);

        let body = stage.physics.body(handles.body).unwrap();
        assert_eq!(body.position, pos);
        assert_eq!(body.half_extents, Vec3::new(2.0, settings.box_height / 2.0, 1.0));
        assert!(body.is_dynamic());
    }

    #[test]
    fn test_fragment_expiry() {
        let handles = BoxHandles {
            node: NodeId(0),
            body: BodyHandle(0),
        };
        let mut frag = Fragment {
            position: Vec3::ZERO,
            width: 1.0,
            depth: 1.0,
            handles,
            lifetime: None,
        };
        assert!(!frag.is_expired());
        frag.lifetime = Some(0.0);
        assert!(frag.is_expired());
    }
}
