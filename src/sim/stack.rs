//! The tower: settled layers, falling fragments, and the cut
//!
//! Committing the active layer keeps only the part that overlaps the layer
//! below. The cut-off remainder drops as a fragment and a new active layer
//! spawns one level up, offset on the perpendicular axis so it slides in from
//! the side.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::layer::{Axis, BoxSpec, Fragment, Layer, Stage, spawn_box};
use super::physics::PhysicsWorld;
use crate::settings::Settings;

/// Side a new layer spawns on, and the direction it slides.
///
/// Period 4: two layers come in from one side, two from the other, which
/// gives the tower its back-and-forth spiral.
#[inline]
pub fn spiral_sign(stack_len: usize) -> f32 {
    if stack_len % 4 < 2 { -1.0 } else { 1.0 }
}

/// What a commit did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutOutcome {
    /// The layer overlapped and a new active layer was added
    Placed {
        overlap: f32,
        overhang_size: f32,
        score: u32,
    },
    /// No overlap; the whole layer fell and the run is over
    Missed { score: u32 },
}

/// Settled/active layers in height order plus the live fragments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tower {
    pub layers: Vec<Layer>,
    pub overhangs: Vec<Fragment>,
}

impl Tower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Active layer and the one it must land on
    pub fn top_pair(&self) -> Option<(&Layer, &Layer)> {
        match self.layers.as_slice() {
            [.., prev, top] => Some((top, prev)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.overhangs.clear();
    }

    /// Append a static layer one level above the current top
    #[allow(clippy::too_many_arguments)]
    pub fn add_layer<P: PhysicsWorld>(
        &mut self,
        stage: &mut Stage<P>,
        settings: &Settings,
        x: f32,
        z: f32,
        width: f32,
        depth: f32,
        direction: Axis,
    ) {
        let y = settings.box_height * self.layers.len() as f32;
        let position = Vec3::new(x, y, z);
        let handles = spawn_box(
            stage,
            settings,
            BoxSpec {
                position,
                width,
                depth,
                dynamic: false,
                level: self.layers.len(),
            },
        );
        self.layers.push(Layer {
            position,
            width,
            depth,
            direction,
            handles,
            detached: false,
        });
    }

    /// Drop a dynamic fragment at the level of the current top layer
    pub fn add_overhang<P: PhysicsWorld>(
        &mut self,
        stage: &mut Stage<P>,
        settings: &Settings,
        x: f32,
        z: f32,
        width: f32,
        depth: f32,
    ) {
        let level = self.layers.len().saturating_sub(1);
        let position = Vec3::new(x, settings.box_height * level as f32, z);
        let handles = spawn_box(
            stage,
            settings,
            BoxSpec {
                position,
                width,
                depth,
                dynamic: true,
                level: self.layers.len(),
            },
        );
        self.overhangs.push(Fragment {
            position,
            width,
            depth,
            handles,
            lifetime: None,
        });
    }

    /// Move the active layer along its slide axis, keeping node and body in lockstep
    pub fn slide_top<P: PhysicsWorld>(&mut self, stage: &mut Stage<P>, amount: f32) {
        let Some(top) = self.layers.last_mut() else {
            return;
        };
        let dir = top.direction;
        let next = dir.of(top.position) + amount;
        dir.set(&mut top.position, next);
        move_layer(stage, top);
    }

    /// Commit the active layer: cut it to the overlap and add the next one
    pub fn cut_and_advance<P: PhysicsWorld>(
        &mut self,
        stage: &mut Stage<P>,
        settings: &Settings,
    ) -> CutOutcome {
        let Some((top, prev)) = self.top_pair() else {
            log::warn!("Commit with fewer than two layers");
            return CutOutcome::Missed { score: 0 };
        };

        let direction = top.direction;
        let size = top.extent(direction);
        let delta = direction.of(top.position) - direction.of(prev.position);
        let overhang_size = delta.abs();
        let overlap = size - overhang_size;

        if overlap <= 0.0 {
            return CutOutcome::Missed {
                score: self.collapse_top(stage, settings),
            };
        }

        let (top_position, width, depth) = {
            let Some(top) = self.layers.last_mut() else {
                return CutOutcome::Missed { score: 0 };
            };
            top.set_extent(direction, overlap);
            let shifted = direction.of(top.position) - delta / 2.0;
            direction.set(&mut top.position, shifted);

            move_layer(stage, top);
            let size = Vec3::new(top.width, settings.box_height, top.depth);
            if let Some(node) = stage.scene.get_mut(top.handles.node) {
                node.size = size;
            }
            stage.physics.set_half_extents(top.handles.body, size / 2.0);

            (top.position, top.width, top.depth)
        };

        if overhang_size > 0.0 {
            let shift = (overlap / 2.0 + overhang_size / 2.0) * delta.signum();
            let mut at = top_position;
            direction.set(&mut at, direction.of(top_position) + shift);
            let (w, d) = match direction {
                Axis::X => (overhang_size, depth),
                Axis::Z => (width, overhang_size),
            };
            self.add_overhang(stage, settings, at.x, at.z, w, d);
        }

        // Score counts placed layers before the new one goes on
        let score = (self.layers.len() - 1) as u32;

        let offset = settings.original_box_offset * spiral_sign(self.layers.len() + 1);
        let (next_x, next_z) = match direction {
            Axis::X => (top_position.x, offset),
            Axis::Z => (offset, top_position.z),
        };
        self.add_layer(
            stage,
            settings,
            next_x,
            next_z,
            width,
            depth,
            direction.other(),
        );

        log::debug!(
            "Placed layer {} along {}: overlap {:.3}, overhang {:.3}",
            score,
            direction.as_str(),
            overlap,
            overhang_size
        );

        CutOutcome::Placed {
            overlap,
            overhang_size,
            score,
        }
    }

    /// Turn the whole active layer into a fragment and report the final score
    pub fn collapse_top<P: PhysicsWorld>(&mut self, stage: &mut Stage<P>, settings: &Settings) -> u32 {
        let score = self.layers.len().saturating_sub(2) as u32;
        let Some(top) = self.layers.last() else {
            return score;
        };
        if top.detached {
            return score;
        }
        let (position, width, depth, handles) = (top.position, top.width, top.depth, top.handles);

        self.add_overhang(stage, settings, position.x, position.z, width, depth);
        stage.physics.remove_body(handles.body);
        stage.scene.remove(handles.node);
        if let Some(top) = self.layers.last_mut() {
            top.detached = true;
        }

        log::info!("Missed at height {}, final score {}", self.layers.len(), score);
        score
    }
}

fn move_layer<P: PhysicsWorld>(stage: &mut Stage<P>, layer: &Layer) {
    if let Some(node) = stage.scene.get_mut(layer.handles.node) {
        node.position = layer.position;
    }
    stage.physics.set_position(layer.handles.body, layer.position);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::RapierPhysics;

    fn base_tower(settings: &Settings) -> (Tower, Stage<RapierPhysics>) {
        let mut tower = Tower::new();
        let mut stage = Stage::new(RapierPhysics::new());
        let s = settings.original_box_size;
        tower.add_layer(&mut stage, settings, 0.0, 0.0, s, s, Axis::Z);
        tower.add_layer(&mut stage, settings, settings.original_box_offset, 0.0, s, s, Axis::X);
        (tower, stage)
    }

    /// Put the active layer at `delta` from the layer below along its axis
    fn place_top(tower: &mut Tower, stage: &mut Stage<RapierPhysics>, delta: f32) {
        let (top, prev) = tower.top_pair().unwrap();
        let dir = top.direction;
        let amount = dir.of(prev.position) + delta - dir.of(top.position);
        tower.slide_top(stage, amount);
    }

    #[test]
    fn test_spiral_sign_period_four() {
        let signs: Vec<f32> = (0..8).map(spiral_sign).collect();
        assert_eq!(signs, vec![-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_full_hit_spawns_no_fragment() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        place_top(&mut tower, &mut stage, 0.0);

        let outcome = tower.cut_and_advance(&mut stage, &settings);
        assert_eq!(
            outcome,
            CutOutcome::Placed {
                overlap: 5.0,
                overhang_size: 0.0,
                score: 1
            }
        );
        assert!(tower.overhangs.is_empty());
        let top = tower.top().unwrap();
        assert_eq!((top.width, top.depth), (5.0, 5.0));
        assert_eq!(tower.len(), 3);
    }

    #[test]
    fn test_partial_hit_cuts_and_drops_overhang() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        place_top(&mut tower, &mut stage, 3.0);

        let outcome = tower.cut_and_advance(&mut stage, &settings);
        assert!(matches!(outcome, CutOutcome::Placed { overlap, overhang_size, .. }
            if (overlap - 2.0).abs() < 1e-5 && (overhang_size - 3.0).abs() < 1e-5));

        let cut = &tower.layers[1];
        assert!((cut.width - 2.0).abs() < 1e-5);
        assert_eq!(cut.depth, 5.0);
        // Recentred over the overlap: 3 - 3/2
        assert!((cut.position.x - 1.5).abs() < 1e-5);

        assert_eq!(tower.overhangs.len(), 1);
        let frag = &tower.overhangs[0];
        assert!((frag.width - 3.0).abs() < 1e-5);
        assert_eq!(frag.depth, 5.0);
        // Sits just past the cut edge: 1.5 + (1 + 1.5)
        assert!((frag.position.x - 4.0).abs() < 1e-5);
        assert_eq!(frag.position.y, cut.position.y);

        // Scene node and physics body followed the cut
        let node = stage.scene.get(cut.handles.node).unwrap();
        assert!((node.size.x - 2.0).abs() < 1e-5);
        assert!((node.position.x - 1.5).abs() < 1e-5);
        let body = stage.physics.body(cut.handles.body).unwrap();
        assert!((body.half_extents.x - 1.0).abs() < 1e-5);
        assert!((body.position.x - 1.5).abs() < 1e-5);

        // Next layer has the cut size and slides on Z
        let next = tower.top().unwrap();
        assert_eq!(next.direction, Axis::Z);
        assert!((next.width - 2.0).abs() < 1e-5);
        assert!((next.position.x - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_negative_delta_drops_overhang_on_negative_side() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        place_top(&mut tower, &mut stage, -1.0);
        tower.cut_and_advance(&mut stage, &settings);

        let cut = &tower.layers[1];
        assert!((cut.position.x - (-0.5)).abs() < 1e-5);
        let frag = &tower.overhangs[0];
        assert!((frag.position.x - (-0.5 - 2.0 - 0.5)).abs() < 1e-5);
    }

    #[test]
    fn test_no_overlap_misses() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        place_top(&mut tower, &mut stage, 6.0);
        let top_handles = tower.top().unwrap().handles;

        let outcome = tower.cut_and_advance(&mut stage, &settings);
        assert_eq!(outcome, CutOutcome::Missed { score: 0 });
        assert_eq!(tower.len(), 2);
        assert!(tower.top().unwrap().detached);
        assert!(!stage.physics.contains(top_handles.body));
        assert!(!stage.scene.contains(top_handles.node));

        // The whole layer is falling now
        assert_eq!(tower.overhangs.len(), 1);
        assert_eq!(tower.overhangs[0].width, 5.0);
    }

    #[test]
    fn test_exact_edge_counts_as_miss() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        place_top(&mut tower, &mut stage, 5.0);
        assert!(matches!(
            tower.cut_and_advance(&mut stage, &settings),
            CutOutcome::Missed { .. }
        ));
    }

    #[test]
    fn test_layers_keep_height_and_alternate() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        for i in 0..12 {
            place_top(&mut tower, &mut stage, if i % 2 == 0 { 0.2 } else { -0.1 });
            assert!(matches!(
                tower.cut_and_advance(&mut stage, &settings),
                CutOutcome::Placed { .. }
            ));
        }

        for (i, layer) in tower.layers.iter().enumerate() {
            assert!((layer.position.y - i as f32 * settings.box_height).abs() < 1e-5);
            if i > 0 {
                assert_ne!(layer.direction, tower.layers[i - 1].direction);
            }
        }
    }

    #[test]
    fn test_new_layer_offset_follows_spiral() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        for _ in 0..8 {
            let len_before = tower.len();
            place_top(&mut tower, &mut stage, 0.0);
            tower.cut_and_advance(&mut stage, &settings);

            let top = tower.top().unwrap();
            let expected = settings.original_box_offset * spiral_sign(len_before + 1);
            assert!((top.slide_position() - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_collapse_twice_is_harmless() {
        let settings = Settings::default();
        let (mut tower, mut stage) = base_tower(&settings);
        tower.collapse_top(&mut stage, &settings);
        tower.collapse_top(&mut stage, &settings);
        assert_eq!(tower.overhangs.len(), 1);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn cut_splits_footprint_exactly(delta in -4.9f32..4.9) {
                let settings = Settings::default();
                let (mut tower, mut stage) = base_tower(&settings);
                place_top(&mut tower, &mut stage, delta);
                let before = tower.top().unwrap().width;

                let outcome = tower.cut_and_advance(&mut stage, &settings);
                let CutOutcome::Placed { overlap, overhang_size, .. } = outcome else {
                    return Err(TestCaseError::fail("expected a placement"));
                };
                prop_assert!((overlap + overhang_size - before).abs() < 1e-4);
                prop_assert!((tower.layers[1].width - overlap).abs() < 1e-4);
                if overhang_size > 0.0 {
                    prop_assert!((tower.overhangs[0].width - overhang_size).abs() < 1e-4);
                }
            }

            #[test]
            fn fragment_and_layer_share_the_cut_edge(delta in 0.1f32..4.9) {
                let settings = Settings::default();
                let (mut tower, mut stage) = base_tower(&settings);
                place_top(&mut tower, &mut stage, delta);
                tower.cut_and_advance(&mut stage, &settings);

                let cut = &tower.layers[1];
                let frag = &tower.overhangs[0];
                let cut_edge = cut.position.x + cut.width / 2.0;
                let frag_edge = frag.position.x - frag.width / 2.0;
                prop_assert!((cut_edge - frag_edge).abs() < 1e-4);
            }
        }
    }
}
