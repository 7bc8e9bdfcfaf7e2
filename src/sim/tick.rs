//! Per-frame simulation tick
//!
//! Order inside a tick: queued input, active layer advance/commit, physics
//! step, fragment expiry and sync, camera, fog.

use super::layer::Stage;
use super::physics::PhysicsWorld;
use super::stack::{Tower, spiral_sign};
use super::state::{GamePhase, GameSession};
use crate::consts::*;

/// Input commands for a single tick (one-shot flags)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Start / commit (click, tap, space)
    pub primary: bool,
    /// Restart (R key, results screen)
    pub reset: bool,
}

impl TickInput {
    /// A tap or click; on the results screen of a finished run it restarts
    pub fn tap(phase: GamePhase, on_results: bool) -> Self {
        if on_results && phase == GamePhase::Ended {
            Self {
                reset: true,
                ..Default::default()
            }
        } else {
            Self {
                primary: true,
                ..Default::default()
            }
        }
    }

    /// Combine with input already queued this frame
    pub fn merge(&mut self, other: &TickInput) {
        self.primary |= other.primary;
        self.reset |= other.reset;
    }
}

/// Advance the session to `time_ms` (frame timestamp in milliseconds)
pub fn tick<P: PhysicsWorld>(session: &mut GameSession<P>, input: &TickInput, time_ms: f64) {
    if input.reset {
        session.reset();
    }
    if input.primary {
        session.primary_action();
    }

    if session.phase == GamePhase::NotStarted {
        return;
    }

    // The first tick after a (re)start only records the timestamp
    let Some(last) = session.last_time.replace(time_ms) else {
        return;
    };
    let elapsed = (time_ms - last).max(0.0) as f32;

    if session.phase == GamePhase::Playing {
        advance_active_layer(session, elapsed);
    }

    update_physics(&mut session.tower, &mut session.stage, elapsed);

    let stack_len = session.tower.len();
    let top_y = session.tower.top().map_or(0.0, |l| l.position.y);
    session.camera.update(stack_len, top_y, &session.settings);
    session.fog.update(stack_len);
}

/// Slide the active layer, or commit it when the autopilot says so
fn advance_active_layer<P: PhysicsWorld>(session: &mut GameSession<P>, elapsed_ms: f32) {
    let sign = spiral_sign(session.tower.len());
    let Some((top, prev)) = session.tower.top_pair() else {
        return;
    };
    let should_move = !session.autopilot.enabled || !session.autopilot.should_stop(top, prev, sign);

    if !should_move {
        session.commit();
        session.redraw_autopilot();
        return;
    }

    let amount = session.settings.speed * elapsed_ms * sign;
    session.tower.slide_top(&mut session.stage, amount);

    let Some(top) = session.tower.top() else {
        return;
    };
    let at = top.slide_position();
    if (sign > 0.0 && at > SLIDE_BOUND) || (sign < 0.0 && at < -SLIDE_BOUND) {
        session.miss();
    }
}

/// Step physics, age fragments, and copy their poses onto the scene
pub fn update_physics<P: PhysicsWorld>(tower: &mut Tower, stage: &mut Stage<P>, elapsed_ms: f32) {
    stage.physics.step(elapsed_ms / 1000.0);

    tower.overhangs.retain_mut(|frag| {
        let remaining = frag.lifetime.get_or_insert(FRAGMENT_LIFETIME_MS);
        *remaining -= elapsed_ms;

        if frag.is_expired() {
            stage.physics.remove_body(frag.handles.body);
            stage.scene.remove(frag.handles.node);
            log::trace!("Fragment {:?} expired", frag.handles.node);
            return false;
        }

        if let Some(pose) = stage.physics.pose(frag.handles.body) {
            frag.position = pose.position;
            stage
                .scene
                .set_pose(frag.handles.node, pose.position, pose.rotation);
        }
        true
    });
}
