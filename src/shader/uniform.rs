use glam::Mat4;

/// Descriptor set (wgpu bind group) index of the global uniform block.
pub const GLOBAL_UBO_SET: u32 = 0;
/// Binding index of the global uniform block within its set.
pub const GLOBAL_UBO_BINDING: u32 = 0;
/// Block name of the global uniform block in the shader source.
pub const GLOBAL_UBO_NAME: &str = "GlobalUbo";

/// Per-draw uniform block read by every vertex invocation.
///
/// Laid out as the std140 block `GlobalUbo { mat4 projection; mat4 view; }`:
/// two column-major matrices, `view` starting at byte 64.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUbo {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
}

impl GlobalUbo {
    /// Member names and byte offsets, in declaration order.
    pub const MEMBERS: [(&'static str, u32); 2] = [
        ("projection", 0),
        ("view", 64),
    ];

    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn size() -> wgpu::BufferAddress {
        std::mem::size_of::<Self>() as wgpu::BufferAddress
    }

    /// Layout entry for the block at `GLOBAL_UBO_BINDING`, visible to the vertex stage.
    pub fn layout_entry() -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding: GLOBAL_UBO_BINDING,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(Self::size()),
            },
            count: None,
        }
    }
}

impl Default for GlobalUbo {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}
