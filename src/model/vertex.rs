use std::borrow::Cow;

use anyhow::{bail, ensure, Result};
use glam::{Vec2, Vec3};

/// Vertex buffer slot holding the tightly packed position stream.
pub const POSITION_SLOT: u32 = 0;
/// Vertex buffer slot holding the interleaved normal/tangent/uv stream.
pub const ATTRIBUTE_SLOT: u32 = 1;

/// Shader location and format of every vertex input the shader declares.
pub const ATTRIBUTE_CONTRACT: [(u32, wgpu::VertexFormat); 4] = [
    (0, wgpu::VertexFormat::Float32x3), // position
    (1, wgpu::VertexFormat::Float32x3), // normal
    (2, wgpu::VertexFormat::Float32x3), // tangent
    (3, wgpu::VertexFormat::Float32x2), // uv
];

/// Returns the format the contract expects at `location`, if any.
pub fn contract_format(location: u32) -> Option<wgpu::VertexFormat> {
    ATTRIBUTE_CONTRACT
        .iter()
        .find(|(l, _)| *l == location)
        .map(|(_, format)| *format)
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Position(pub [f32; 3]);

impl Position {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![
        0 => Float32x3,  // position
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Position>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self(v.to_array())
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexAttributes {
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexAttributes {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x3,  // normal
        2 => Float32x3,  // tangent
        3 => Float32x2,  // uv
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexAttributes>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Buffer layouts in slot order, ready for a render pipeline's `buffers` field.
pub fn buffer_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    [Position::desc(), VertexAttributes::desc()]
}

/// Everything one vertex-stage invocation reads from the vertex buffers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VertexInput {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
}

impl VertexInput {
    pub fn new(position: &Position, attributes: &VertexAttributes) -> Self {
        Self {
            position: Vec3::from_array(position.0),
            normal: Vec3::from_array(attributes.normal),
            tangent: Vec3::from_array(attributes.tangent),
            uv: Vec2::from_array(attributes.uv),
        }
    }
}

impl From<Vec3> for VertexInput {
    fn from(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// The two vertex streams of a draw, one element per vertex in each.
#[derive(Clone, Debug)]
pub struct VertexStreams<'a> {
    positions: Cow<'a, [Position]>,
    attributes: Cow<'a, [VertexAttributes]>,
}

impl<'a> VertexStreams<'a> {
    pub fn new(positions: &'a [Position], attributes: &'a [VertexAttributes]) -> Result<Self> {
        ensure!(
            positions.len() == attributes.len(),
            "Vertex stream length mismatch: {} positions, {} attribute records",
            positions.len(),
            attributes.len()
        );

        Ok(Self {
            positions: Cow::Borrowed(positions),
            attributes: Cow::Borrowed(attributes),
        })
    }

    /// Decodes raw vertex buffer contents. Buffers that are not suitably
    /// aligned for direct reinterpretation are copied.
    pub fn from_bytes(positions: &'a [u8], attributes: &'a [u8]) -> Result<Self> {
        let positions = decode_stream::<Position>(positions, "position")?;
        let attributes = decode_stream::<VertexAttributes>(attributes, "attribute")?;

        ensure!(
            positions.len() == attributes.len(),
            "Vertex stream length mismatch: {} positions, {} attribute records",
            positions.len(),
            attributes.len()
        );

        Ok(Self { positions, attributes })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn attributes(&self) -> &[VertexAttributes] {
        &self.attributes
    }

    /// Fetches the inputs of the vertex at `index`.
    pub fn fetch(&self, index: usize) -> Option<VertexInput> {
        let position = self.positions.get(index)?;
        let attributes = self.attributes.get(index)?;
        Some(VertexInput::new(position, attributes))
    }

    pub fn iter(&self) -> impl Iterator<Item = VertexInput> + '_ {
        self.positions
            .iter()
            .zip(self.attributes.iter())
            .map(|(p, a)| VertexInput::new(p, a))
    }
}

fn decode_stream<'a, T: bytemuck::Pod>(bytes: &'a [u8], what: &str) -> Result<Cow<'a, [T]>> {
    let stride = std::mem::size_of::<T>();
    if bytes.len() % stride != 0 {
        bail!(
            "Invalid {} buffer: {} bytes is not a multiple of the {}-byte stride",
            what,
            bytes.len(),
            stride
        );
    }

    match bytemuck::try_cast_slice::<u8, T>(bytes) {
        Ok(slice) => Ok(Cow::Borrowed(slice)),
        Err(_) => {
            log::debug!("Copying unaligned {} buffer of {} bytes", what, bytes.len());
            Ok(Cow::Owned(
                bytes.chunks_exact(stride).map(bytemuck::pod_read_unaligned).collect(),
            ))
        }
    }
}
