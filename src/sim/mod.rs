//! Deterministic simulation module
//!
//! All gameplay logic lives here, free of rendering and platform code:
//! - Seeded RNG only
//! - Frame time comes in as a timestamp, physics substeps at a fixed rate
//! - Stable iteration order (scene nodes and bodies keyed by id)

pub mod autopilot;
pub mod camera;
pub mod layer;
pub mod physics;
pub mod scene;
pub mod stack;
pub mod state;
pub mod tick;

pub use autopilot::Autopilot;
pub use camera::{CameraRig, Fog, Projection, orbit_height_for};
pub use layer::{Axis, BoxHandles, BoxSpec, Fragment, Layer, Stage, box_mass, layer_color, spawn_box};
pub use physics::{BodyDesc, BodyHandle, BodyState, PhysicsWorld, Pose, RapierPhysics};
pub use scene::{NodeGroup, NodeId, Scene, SceneNode};
pub use stack::{CutOutcome, Tower, spiral_sign};
pub use state::{GameEvent, GamePhase, GameSession};
pub use tick::{TickInput, tick, update_physics};
