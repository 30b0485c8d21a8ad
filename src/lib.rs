//! The simple raster vertex stage: its GLSL source, the host-side binding
//! contract, and a CPU evaluation of the transform.

pub mod model;
pub mod scene;
pub mod shader;

pub use model::{Mesh, Position, VertexAttributes, VertexInput, VertexStreams};
pub use scene::Camera;
pub use shader::{
    GlobalUbo, ShaderInterface, SimpleRasterShader, VertexOutput, VertexShader, SIMPLE_RASTER_VERT,
};
