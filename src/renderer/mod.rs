//! WebGPU rendering module
//!
//! Draws the scene graph as instanced, lit boxes with depth testing and fog.

pub mod pipeline;
pub mod vertex;

pub use pipeline::RenderState;
pub use vertex::{InstanceRaw, Vertex, scene_instances, unit_cube};
