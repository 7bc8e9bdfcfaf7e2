//! Retained scene graph
//!
//! The simulation owns which box nodes exist and where they are; the renderer
//! only reads them. Nodes are tagged with a group so a reset can clear the
//! tower without touching the environment.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Stable handle to a scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Which part of the world a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeGroup {
    /// Tower layers and fragments (cleared on reset)
    Main,
    /// Ground, props, background (kept across resets)
    Environment,
}

/// A box drawn by the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub position: Vec3,
    pub rotation: Quat,
    /// Full box dimensions along x, y, z
    pub size: Vec3,
    pub color: [f32; 3],
    pub group: NodeGroup,
}

impl SceneNode {
    pub fn new(position: Vec3, size: Vec3, color: [f32; 3], group: NodeGroup) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            size,
            color,
            group,
        }
    }
}

/// All live nodes, iterated in creation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node; removing an unknown id is a no-op
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(&id)
    }

    /// Remove every node tagged with `group`, returning how many were dropped
    pub fn remove_group(&mut self, group: NodeGroup) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.group != group);
        before - self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Move a node to a pose (ignored for unknown ids)
    pub fn set_pose(&mut self, id: NodeId, position: Vec3, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = position;
            node.rotation = rotation;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn count_group(&self, group: NodeGroup) -> usize {
        self.nodes.values().filter(|n| n.group == group).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(group: NodeGroup) -> SceneNode {
        SceneNode::new(Vec3::ZERO, Vec3::ONE, [1.0; 3], group)
    }

    #[test]
    fn test_remove_group_keeps_environment() {
        let mut scene = Scene::new();
        let ground = scene.add(node(NodeGroup::Environment));
        scene.add(node(NodeGroup::Main));
        scene.add(node(NodeGroup::Main));

        assert_eq!(scene.remove_group(NodeGroup::Main), 2);
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(ground));
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add(node(NodeGroup::Main));
        scene.remove(a);
        let b = scene.add(node(NodeGroup::Main));
        assert_ne!(a, b);
        assert!(scene.remove(a).is_none());
    }

    #[test]
    fn test_set_pose() {
        let mut scene = Scene::new();
        let id = scene.add(node(NodeGroup::Main));
        let rot = Quat::from_rotation_y(0.5);
        scene.set_pose(id, Vec3::new(1.0, 2.0, 3.0), rot);

        let n = scene.get(id).unwrap();
        assert_eq!(n.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(n.rotation.abs_diff_eq(rot, 1e-6));
    }
}
