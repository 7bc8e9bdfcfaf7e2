//! Vertex and instance types for the box pipeline

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::sim::{Scene, SceneNode};

/// Cube corner with its face normal
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Unit cube centred on the origin: 4 vertices per face so normals stay flat
pub fn unit_cube() -> (Vec<Vertex>, Vec<u16>) {
    // (normal, tangent u, tangent v) with u x v == normal for CCW winding
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in FACES {
        let base = vertices.len() as u16;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = [
                0.5 * (n[0] + su * u[0] + sv * v[0]),
                0.5 * (n[1] + su * u[1] + sv * v[1]),
                0.5 * (n[2] + su * u[2] + sv * v[2]),
            ];
            vertices.push(Vertex::new(p, n));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// Per-box instance data
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceRaw {
    pub fn from_node(node: &SceneNode) -> Self {
        let model = Mat4::from_scale_rotation_translation(node.size, node.rotation, node.position);
        let [r, g, b] = node.color;
        Self {
            model: model.to_cols_array_2d(),
            color: [r, g, b, 1.0],
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// One instance per live scene node, in id order
pub fn scene_instances(scene: &Scene) -> Vec<InstanceRaw> {
    scene
        .iter()
        .map(|(_, node)| InstanceRaw::from_node(node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::NodeGroup;
    use glam::{Vec3, Vec4};

    #[test]
    fn test_unit_cube_shape() {
        let (vertices, indices) = unit_cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        for v in &vertices {
            assert!(v.position.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let (vertices, indices) = unit_cube();
        for tri in indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(vertices[tri[k] as usize].position));
            let normal = Vec3::from(vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_instance_places_and_scales_box() {
        let node = SceneNode::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 1.0, 2.0),
            [0.5, 0.25, 1.0],
            NodeGroup::Main,
        );
        let raw = InstanceRaw::from_node(&node);
        let model = Mat4::from_cols_array_2d(&raw.model);
        // +x/+y/+z corner of the unit cube
        let corner = model * Vec4::new(0.5, 0.5, 0.5, 1.0);
        assert!(corner.truncate().abs_diff_eq(Vec3::new(3.0, 2.5, 4.0), 1e-5));
        assert_eq!(raw.color, [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_scene_instances_follow_scene() {
        let mut scene = Scene::new();
        scene.add(SceneNode::new(Vec3::ZERO, Vec3::ONE, [1.0; 3], NodeGroup::Main));
        let id = scene.add(SceneNode::new(Vec3::ONE, Vec3::ONE, [1.0; 3], NodeGroup::Main));
        assert_eq!(scene_instances(&scene).len(), 2);
        scene.remove(id);
        assert_eq!(scene_instances(&scene).len(), 1);
    }
}
