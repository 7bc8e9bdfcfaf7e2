//! Rigid-body physics seam
//!
//! The tower decides which bodies exist, their mass and shape, and when they
//! expire; integrating them is delegated to a `PhysicsWorld`. `RapierPhysics`
//! is the default engine, a thin owner of the rapier3d pipeline and sets.

use std::collections::BTreeMap;
use std::fmt;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{GRAVITY, MAX_SUBSTEPS, PHYSICS_DT};

/// Stable handle to a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Parameters for a new box body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec3,
    pub half_extents: Vec3,
    /// Zero means static (immovable)
    pub mass: f32,
}

/// World-space pose of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Capabilities the simulation needs from a physics engine
pub trait PhysicsWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;
    /// Returns false if the body was already gone
    fn remove_body(&mut self, handle: BodyHandle) -> bool;
    fn contains(&self, handle: BodyHandle) -> bool;
    fn set_position(&mut self, handle: BodyHandle, position: Vec3);
    /// Replace the collision box of a body
    fn set_half_extents(&mut self, handle: BodyHandle, half_extents: Vec3);
    fn pose(&self, handle: BodyHandle) -> Option<Pose>;
    /// Advance the world by `dt` seconds
    fn step(&mut self, dt: f32);
    /// Remove every body
    fn clear(&mut self);
    fn body_count(&self) -> usize;
}

const FRICTION: f32 = 0.6;
const RESTITUTION: f32 = 0.1;

/// Snapshot of one body, for inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub half_extents: Vec3,
    pub mass: f32,
}

impl BodyState {
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.mass > 0.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    rigid_body: RigidBodyHandle,
    half_extents: Vec3,
    mass: f32,
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_quat(r: &Rotation<Real>) -> Quat {
    let c = r.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

fn box_collider(half_extents: Vec3, mass: f32) -> Collider {
    let builder = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        .friction(FRICTION)
        .restitution(RESTITUTION);
    if mass > 0.0 {
        builder.mass(mass).build()
    } else {
        builder.build()
    }
}

/// Default engine backed by rapier3d, stepped at a fixed rate
pub struct RapierPhysics {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: BTreeMap<BodyHandle, Tracked>,
    next_id: u32,
    accumulator: f32,
}

impl fmt::Debug for RapierPhysics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapierPhysics")
            .field("gravity", &self.gravity.y)
            .field("bodies", &self.handles.len())
            .field("accumulator", &self.accumulator)
            .finish()
    }
}

impl Default for RapierPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierPhysics {
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };
        Self {
            gravity: vector![0.0, GRAVITY, 0.0],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles: BTreeMap::new(),
            next_id: 1,
            accumulator: 0.0,
        }
    }

    pub fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        let tracked = self.handles.get(&handle)?;
        let rb = self.bodies.get(tracked.rigid_body)?;
        Some(BodyState {
            position: to_vec3(rb.translation()),
            rotation: to_quat(rb.rotation()),
            velocity: to_vec3(rb.linvel()),
            half_extents: tracked.half_extents,
            mass: tracked.mass,
        })
    }

    fn substep(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}

impl PhysicsWorld for RapierPhysics {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let mass = desc.mass.max(0.0);
        let builder = if mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let rigid_body = self
            .bodies
            .insert(builder.translation(to_vector(desc.position)).build());
        self.colliders.insert_with_parent(
            box_collider(desc.half_extents, mass),
            rigid_body,
            &mut self.bodies,
        );

        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        self.handles.insert(
            handle,
            Tracked {
                rigid_body,
                half_extents: desc.half_extents,
                mass,
            },
        );
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(tracked) = self.handles.remove(&handle) else {
            return false;
        };
        self.bodies.remove(
            tracked.rigid_body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.handles.contains_key(&handle)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        let Some(tracked) = self.handles.get(&handle) else {
            return;
        };
        if let Some(rb) = self.bodies.get_mut(tracked.rigid_body) {
            rb.set_translation(to_vector(position), true);
        }
    }

    fn set_half_extents(&mut self, handle: BodyHandle, half_extents: Vec3) {
        let Some(tracked) = self.handles.get_mut(&handle) else {
            return;
        };
        let Some(rb) = self.bodies.get(tracked.rigid_body) else {
            return;
        };
        let old: Vec<ColliderHandle> = rb.colliders().to_vec();
        for collider in old {
            self.colliders
                .remove(collider, &mut self.islands, &mut self.bodies, true);
        }
        self.colliders.insert_with_parent(
            box_collider(half_extents, tracked.mass),
            tracked.rigid_body,
            &mut self.bodies,
        );
        tracked.half_extents = half_extents;
    }

    fn pose(&self, handle: BodyHandle) -> Option<Pose> {
        let tracked = self.handles.get(&handle)?;
        self.bodies.get(tracked.rigid_body).map(|rb| Pose {
            position: to_vec3(rb.translation()),
            rotation: to_quat(rb.rotation()),
        })
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= PHYSICS_DT && substeps < MAX_SUBSTEPS {
            self.substep();
            self.accumulator -= PHYSICS_DT;
            substeps += 1;
        }
        // Drop whatever a long frame left over instead of catching up next frame
        self.accumulator = self.accumulator.min(PHYSICS_DT);
    }

    fn clear(&mut self) {
        self.islands = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.ccd_solver = CCDSolver::new();
        self.handles.clear();
        self.accumulator = 0.0;
    }

    fn body_count(&self) -> usize {
        self.handles.len()
    }
}
