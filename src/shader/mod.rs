pub mod interface;
pub mod uniform;
#[cfg(test)]
mod tests;

pub use interface::ShaderInterface;
pub use uniform::GlobalUbo;

use std::borrow::Cow;

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec4};

use crate::model::{VertexInput, VertexStreams};

/// GLSL 460 source of the simple raster vertex shader.
pub const SIMPLE_RASTER_VERT: &str = include_str!("../../shaders/simple_raster.vert");

/// Entry point name of every stage compiled from GLSL.
pub const ENTRY_POINT: &str = "main";

/// Color written by every invocation.
pub const OUTPUT_COLOR: Vec4 = Vec4::ONE;

/// Module descriptor that hands the GLSL source to wgpu's GLSL front end.
pub fn shader_module_descriptor() -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some("Simple Raster Vertex Shader"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(SIMPLE_RASTER_VERT),
            stage: naga::ShaderStage::Vertex,
            defines: Default::default(),
        },
    }
}

/// A vertex stage evaluated on the CPU, one call per invocation.
pub trait VertexShader {
    type Output;

    fn exec(&self, input: &VertexInput) -> Self::Output;
}

/// What one invocation hands to the rasterizer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VertexOutput {
    /// Homogeneous clip-space position (`gl_Position`).
    pub clip_position: Vec4,
    /// Color at output location 0.
    pub color: Vec4,
}

/// CPU evaluation of `simple_raster.vert`.
#[derive(Debug, Clone)]
pub struct SimpleRasterShader {
    projection: Mat4,
    view: Mat4,
    clip_from_object: Mat4,
}

impl SimpleRasterShader {
    pub fn new(ubo: &GlobalUbo) -> Self {
        let projection = ubo.projection();
        let view = ubo.view();
        Self {
            projection,
            view,
            // Same association as `projection * view * vec4(p, 1.0)` in the source.
            clip_from_object: projection * view,
        }
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Runs one invocation per vertex, in stream order.
    pub fn run(&self, streams: &VertexStreams) -> Vec<VertexOutput> {
        streams.iter().map(|input| self.exec(&input)).collect()
    }

    /// Runs one invocation per index, the way an indexed draw fetches vertices.
    pub fn run_indexed(&self, streams: &VertexStreams, indices: &[u32]) -> Result<Vec<VertexOutput>> {
        indices
            .iter()
            .map(|&index| {
                streams
                    .fetch(index as usize)
                    .map(|input| self.exec(&input))
                    .ok_or_else(|| {
                        anyhow!(
                            "Index {} out of range for {} vertices",
                            index,
                            streams.len()
                        )
                    })
            })
            .collect()
    }
}

impl From<GlobalUbo> for SimpleRasterShader {
    fn from(ubo: GlobalUbo) -> Self {
        Self::new(&ubo)
    }
}

impl VertexShader for SimpleRasterShader {
    type Output = VertexOutput;

    fn exec(&self, input: &VertexInput) -> VertexOutput {
        VertexOutput {
            clip_position: self.clip_from_object * input.position.extend(1.0),
            color: OUTPUT_COLOR,
        }
    }
}
