//! Game session and state machine
//!
//! Everything a run needs lives in [`GameSession`]: settings, the tower, the
//! scene and physics worlds, camera, fog, autopilot and the seeded RNG.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::autopilot::Autopilot;
use super::camera::{CameraRig, Fog};
use super::layer::{Axis, Stage};
use super::physics::{RapierPhysics, BodyDesc, BodyHandle, PhysicsWorld};
use super::scene::{NodeGroup, SceneNode};
use super::stack::{CutOutcome, Tower};
use crate::consts::*;
use crate::settings::Settings;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first click/tap
    NotStarted,
    /// Active layer sliding
    Playing,
    /// Last layer missed; waiting for reset
    Ended,
}

/// Events for the presentation layer (drained each frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Started,
    Placed { score: u32 },
    Missed { score: u32 },
    Reset,
}

/// Ground drawn over the floor body, never cleared
const GROUND_COLOR: [f32; 3] = [0.35, 0.35, 0.38];

/// A complete game session
#[derive(Debug, Clone)]
pub struct GameSession<P: PhysicsWorld = RapierPhysics> {
    pub settings: Settings,
    pub phase: GamePhase,
    pub tower: Tower,
    pub stage: Stage<P>,
    pub camera: CameraRig,
    pub fog: Fog,
    pub autopilot: Autopilot,
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    /// Timestamp (ms) of the previous tick, `None` right after a (re)start
    pub last_time: Option<f64>,
    pub floor: Option<BodyHandle>,
    events: Vec<GameEvent>,
}

impl GameSession<RapierPhysics> {
    /// Create a session with the built-in physics world
    pub fn new(settings: Settings, seed: u64) -> Self {
        Self::with_physics(settings, seed, RapierPhysics::new())
    }
}

impl<P: PhysicsWorld> GameSession<P> {
    pub fn with_physics(settings: Settings, seed: u64, physics: P) -> Self {
        let mut stage = Stage::new(physics);
        stage.scene.add(SceneNode::new(
            Vec3::new(0.0, FLOOR_Y, 0.0),
            Vec3::from(FLOOR_HALF_EXTENTS) * 2.0,
            GROUND_COLOR,
            NodeGroup::Environment,
        ));

        let mut session = Self {
            camera: CameraRig::new(&settings, 1.0),
            fog: Fog::new(&settings),
            autopilot: Autopilot::new(&settings),
            settings,
            phase: GamePhase::NotStarted,
            tower: Tower::new(),
            stage,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            last_time: None,
            floor: None,
            events: Vec::new(),
        };
        // Base layers are visible before the first click
        session.initialize();
        session
    }

    /// Click / tap / space
    pub fn primary_action(&mut self) {
        match self.phase {
            GamePhase::NotStarted => self.begin_session(),
            GamePhase::Playing => self.commit(),
            GamePhase::Ended => {}
        }
    }

    /// Restart from Playing or Ended
    pub fn reset(&mut self) {
        if self.phase == GamePhase::NotStarted {
            return;
        }
        self.initialize();
        self.phase = GamePhase::Playing;
        self.events.push(GameEvent::Reset);
        log::info!("Game reset");
    }

    pub fn begin_session(&mut self) {
        self.initialize();
        self.phase = GamePhase::Playing;
        self.events.push(GameEvent::Started);
        log::info!(
            "Game started (seed {}, autopilot {})",
            self.seed,
            self.autopilot.enabled
        );
    }

    /// Rebuild the world with the floor and two base layers
    pub fn initialize(&mut self) {
        self.tower.clear();
        self.stage.physics.clear();
        self.stage.scene.remove_group(NodeGroup::Main);

        let [hx, hy, hz] = FLOOR_HALF_EXTENTS;
        self.floor = Some(self.stage.physics.add_body(BodyDesc {
            position: Vec3::new(0.0, FLOOR_Y, 0.0),
            half_extents: Vec3::new(hx, hy, hz),
            mass: 0.0,
        }));

        let size = self.settings.original_box_size;
        let offset = self.settings.original_box_offset;
        self.tower
            .add_layer(&mut self.stage, &self.settings, 0.0, 0.0, size, size, Axis::Z);
        self.tower
            .add_layer(&mut self.stage, &self.settings, offset, 0.0, size, size, Axis::X);

        self.camera.reset(&self.settings);
        self.fog.reset(&self.settings);
        self.redraw_autopilot();
        self.last_time = None;
    }

    /// Commit the active layer
    pub fn commit(&mut self) {
        match self.tower.cut_and_advance(&mut self.stage, &self.settings) {
            CutOutcome::Placed { score, .. } => self.events.push(GameEvent::Placed { score }),
            CutOutcome::Missed { score } => self.end(score),
        }
    }

    /// The active layer slid out of reach: it all falls
    pub fn miss(&mut self) {
        let score = self.tower.collapse_top(&mut self.stage, &self.settings);
        self.end(score);
    }

    fn end(&mut self, score: u32) {
        self.phase = GamePhase::Ended;
        self.events.push(GameEvent::Missed { score });
    }

    /// Layers placed on top of the base pair
    pub fn score(&self) -> u32 {
        self.tower.len().saturating_sub(2) as u32
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn redraw_autopilot(&mut self) {
        self.autopilot.redraw(&mut self.rng, &self.settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(Settings::default(), 42)
    }

    #[test]
    fn test_new_session_shows_base_layers() {
        let s = session();
        assert_eq!(s.phase, GamePhase::NotStarted);
        assert_eq!(s.tower.len(), 2);
        assert_eq!(s.tower.layers[0].direction, Axis::Z);
        assert_eq!(s.tower.layers[1].direction, Axis::X);
        assert_eq!(s.tower.layers[1].position.x, -10.0);
        assert_eq!(s.stage.physics.body_count(), 3);
        assert_eq!(s.stage.scene.count_group(NodeGroup::Environment), 1);
    }

    #[test]
    fn test_primary_starts_then_commits() {
        let mut s = session();
        s.primary_action();
        assert_eq!(s.phase, GamePhase::Playing);
        assert_eq!(s.drain_events(), vec![GameEvent::Started]);

        // Slide the active layer right over the base and commit
        s.tower.slide_top(&mut s.stage, 10.0);
        s.primary_action();
        assert_eq!(s.drain_events(), vec![GameEvent::Placed { score: 1 }]);
        assert_eq!(s.tower.len(), 3);
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn test_miss_ends_and_primary_is_ignored() {
        let mut s = session();
        s.primary_action();
        s.drain_events();

        // Still at the spawn offset, 10 units off the base
        s.primary_action();
        assert_eq!(s.phase, GamePhase::Ended);
        assert_eq!(s.drain_events(), vec![GameEvent::Missed { score: 0 }]);

        s.primary_action();
        assert_eq!(s.phase, GamePhase::Ended);
        assert!(s.drain_events().is_empty());
        assert_eq!(s.tower.len(), 2);
    }

    #[test]
    fn test_ground_node_matches_floor_body() {
        let s = session();
        let floor = s.stage.physics.body(s.floor.unwrap()).unwrap();
        let ground = s
            .stage
            .scene
            .iter()
            .map(|(_, node)| node)
            .find(|node| node.group == NodeGroup::Environment)
            .unwrap();
        assert_eq!(ground.position, floor.position);
        assert_eq!(ground.size, floor.half_extents * 2.0);
        // Top of the ground is where fragments come to rest
        assert_eq!(ground.position.y + ground.size.y / 2.0, 0.0);
    }

    #[test]
    fn test_reset_ignored_before_start() {
        let mut s = session();
        s.reset();
        assert_eq!(s.phase, GamePhase::NotStarted);
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn test_reset_twice_gives_same_fresh_state() {
        let mut s = session();
        s.primary_action();
        for _ in 0..3 {
            let (top, prev) = s.tower.top_pair().unwrap();
            let amount = top.direction.of(prev.position) + 0.2 - top.slide_position();
            s.tower.slide_top(&mut s.stage, amount);
            s.primary_action();
        }
        assert_eq!(s.tower.len(), 5);
        assert_eq!(s.tower.overhangs.len(), 3);
        s.drain_events();
        s.miss();
        assert_eq!(s.phase, GamePhase::Ended);
        assert_eq!(s.drain_events(), vec![GameEvent::Missed { score: 3 }]);

        s.reset();
        let after_first = (
            s.tower.len(),
            s.tower.overhangs.len(),
            s.score(),
            s.stage.physics.body_count(),
            s.stage.scene.len(),
        );
        s.reset();
        let after_second = (
            s.tower.len(),
            s.tower.overhangs.len(),
            s.score(),
            s.stage.physics.body_count(),
            s.stage.scene.len(),
        );

        assert_eq!(after_first, after_second);
        assert_eq!(after_first, (2, 0, 0, 3, 3));
        assert_eq!(s.phase, GamePhase::Playing);
        assert!(s.last_time.is_none());
        assert_eq!(s.stage.scene.count_group(NodeGroup::Environment), 1);
    }
}
