pub mod vertex;
mod loader;

pub use vertex::{Position, VertexAttributes, VertexInput, VertexStreams};
pub use loader::Mesh;
