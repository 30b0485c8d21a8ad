use std::fmt;

use anyhow::{anyhow, bail, ensure, Result};
use naga::{AddressSpace, Binding, BuiltIn, ShaderStage, TypeInner, VectorSize};

use crate::model::vertex::{contract_format, ATTRIBUTE_CONTRACT};
use super::uniform::{GlobalUbo, GLOBAL_UBO_BINDING, GLOBAL_UBO_NAME, GLOBAL_UBO_SET};
use super::ENTRY_POINT;

#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub name: Option<String>,
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputSlot {
    ClipPosition,
    Location {
        location: u32,
        format: wgpu::VertexFormat,
    },
    OtherBuiltIn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Mat4,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformMember {
    pub name: Option<String>,
    pub offset: u32,
    pub kind: MemberKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub block_name: Option<String>,
    pub instance_name: Option<String>,
    pub set: u32,
    pub binding: u32,
    pub members: Vec<UniformMember>,
    pub span: u32,
}

/// Interface of a vertex entry point as declared in its GLSL source.
#[derive(Debug, Clone)]
pub struct ShaderInterface {
    pub entry_point: String,
    pub stage: ShaderStage,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
    pub uniforms: Vec<UniformBlock>,
}

impl ShaderInterface {
    /// Parses and validates GLSL vertex shader source, then extracts its interface.
    pub fn reflect(source: &str) -> Result<Self> {
        let mut frontend = naga::front::glsl::Frontend::default();
        let options = naga::front::glsl::Options::from(ShaderStage::Vertex);
        let module = frontend
            .parse(&options, source)
            .map_err(|e| anyhow!("Failed to parse GLSL vertex shader: {:?}", e))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| anyhow!("Vertex shader failed validation: {:?}", e))?;

        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == ShaderStage::Vertex)
            .ok_or_else(|| anyhow!("Shader has no vertex entry point"))?;
        log::debug!("Reflecting vertex entry point '{}'", entry.name);

        let mut inputs = Vec::new();
        for arg in &entry.function.arguments {
            match &arg.binding {
                Some(Binding::Location { location, .. }) => {
                    let format = vertex_format(&module.types[arg.ty].inner).ok_or_else(|| {
                        anyhow!("Vertex input at location {} has an unsupported type", location)
                    })?;
                    inputs.push(InputSlot {
                        name: arg.name.clone(),
                        location: *location,
                        format,
                    });
                }
                Some(Binding::BuiltIn(built_in)) => {
                    log::debug!("Skipping built-in input {:?}", built_in);
                }
                None => bail!("Vertex input {:?} has no binding", arg.name),
            }
        }
        inputs.sort_by_key(|input| input.location);

        let mut outputs = Vec::new();
        if let Some(result) = &entry.function.result {
            match &result.binding {
                Some(binding) => outputs.push(output_slot(binding, &module.types[result.ty].inner)?),
                None => match &module.types[result.ty].inner {
                    TypeInner::Struct { members, .. } => {
                        for member in members {
                            if let Some(binding) = &member.binding {
                                outputs.push(output_slot(binding, &module.types[member.ty].inner)?);
                            }
                        }
                    }
                    _ => bail!("Vertex output has no binding"),
                },
            }
        }

        let mut uniforms = Vec::new();
        for (_, var) in module.global_variables.iter() {
            if var.space != AddressSpace::Uniform {
                continue;
            }
            let Some(resource) = &var.binding else {
                log::warn!("Uniform {:?} has no descriptor binding", var.name);
                continue;
            };

            let ty = &module.types[var.ty];
            let (members, span) = match &ty.inner {
                TypeInner::Struct { members, span } => {
                    let members = members
                        .iter()
                        .map(|member| UniformMember {
                            name: member.name.clone(),
                            offset: member.offset,
                            kind: member_kind(&module.types[member.ty].inner),
                        })
                        .collect();
                    (members, *span)
                }
                _ => bail!("Uniform {:?} is not a block", var.name),
            };

            uniforms.push(UniformBlock {
                block_name: ty.name.clone(),
                instance_name: var.name.clone(),
                set: resource.group,
                binding: resource.binding,
                members,
                span,
            });
        }

        Ok(Self {
            entry_point: entry.name.clone(),
            stage: entry.stage,
            inputs,
            outputs,
            uniforms,
        })
    }

    pub fn input(&self, location: u32) -> Option<&InputSlot> {
        self.inputs.iter().find(|input| input.location == location)
    }

    pub fn uniform(&self, set: u32, binding: u32) -> Option<&UniformBlock> {
        self.uniforms
            .iter()
            .find(|block| block.set == set && block.binding == binding)
    }

    /// Checks the reflected interface against the host-side binding contract.
    pub fn check_contract(&self) -> Result<()> {
        ensure!(
            self.stage == ShaderStage::Vertex,
            "Expected a vertex entry point, found {:?}",
            self.stage
        );
        ensure!(
            self.entry_point == ENTRY_POINT,
            "Entry point is '{}', expected '{}'",
            self.entry_point,
            ENTRY_POINT
        );

        for input in &self.inputs {
            let expected = contract_format(input.location).ok_or_else(|| {
                anyhow!("Unexpected vertex input at location {}", input.location)
            })?;
            ensure!(
                input.format == expected,
                "Vertex input at location {} is {:?}, expected {:?}",
                input.location,
                input.format,
                expected
            );
        }
        for (location, format) in ATTRIBUTE_CONTRACT {
            ensure!(
                self.input(location).is_some(),
                "Shader does not declare the {:?} vertex input at location {}",
                format,
                location
            );
        }

        ensure!(
            self.outputs.contains(&OutputSlot::ClipPosition),
            "Shader does not write the clip position"
        );
        ensure!(
            self.outputs.contains(&OutputSlot::Location {
                location: 0,
                format: wgpu::VertexFormat::Float32x4,
            }),
            "Shader does not write a vec4 color at output location 0"
        );

        let block = self.uniform(GLOBAL_UBO_SET, GLOBAL_UBO_BINDING).ok_or_else(|| {
            anyhow!(
                "No uniform block at set {} binding {}",
                GLOBAL_UBO_SET,
                GLOBAL_UBO_BINDING
            )
        })?;
        if let Some(name) = &block.block_name {
            ensure!(
                name == GLOBAL_UBO_NAME,
                "Uniform block at set {} binding {} is '{}', expected '{}'",
                block.set,
                block.binding,
                name,
                GLOBAL_UBO_NAME
            );
        }
        ensure!(
            block.members.len() == GlobalUbo::MEMBERS.len(),
            "{} has {} members, expected {}",
            GLOBAL_UBO_NAME,
            block.members.len(),
            GlobalUbo::MEMBERS.len()
        );
        for (member, (name, offset)) in block.members.iter().zip(GlobalUbo::MEMBERS) {
            if let Some(member_name) = &member.name {
                ensure!(
                    member_name == name,
                    "{} member '{}' found where '{}' was expected",
                    GLOBAL_UBO_NAME,
                    member_name,
                    name
                );
            }
            ensure!(member.kind == MemberKind::Mat4, "{}.{} is not a mat4", GLOBAL_UBO_NAME, name);
            ensure!(
                member.offset == offset,
                "{}.{} is at offset {}, expected {}",
                GLOBAL_UBO_NAME,
                name,
                member.offset,
                offset
            );
        }
        ensure!(
            block.span as u64 == GlobalUbo::size(),
            "{} spans {} bytes, expected {}",
            GLOBAL_UBO_NAME,
            block.span,
            GlobalUbo::size()
        );

        Ok(())
    }
}

impl fmt::Display for ShaderInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?} entry point '{}'", self.stage, self.entry_point)?;
        for input in &self.inputs {
            writeln!(
                f,
                "  in  location {} {:?} {}",
                input.location,
                input.format,
                input.name.as_deref().unwrap_or("")
            )?;
        }
        for output in &self.outputs {
            match output {
                OutputSlot::ClipPosition => writeln!(f, "  out clip position")?,
                OutputSlot::Location { location, format } => {
                    writeln!(f, "  out location {} {:?}", location, format)?
                }
                OutputSlot::OtherBuiltIn(name) => writeln!(f, "  out {}", name)?,
            }
        }
        for block in &self.uniforms {
            writeln!(
                f,
                "  uniform set {} binding {} {} ({} bytes)",
                block.set,
                block.binding,
                block.block_name.as_deref().unwrap_or("<anonymous>"),
                block.span
            )?;
            for member in &block.members {
                writeln!(
                    f,
                    "    +{:<4} {:?} {}",
                    member.offset,
                    member.kind,
                    member.name.as_deref().unwrap_or("")
                )?;
            }
        }
        Ok(())
    }
}

fn vertex_format(inner: &TypeInner) -> Option<wgpu::VertexFormat> {
    match *inner {
        TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => Some(wgpu::VertexFormat::Float32),
        TypeInner::Vector { size, scalar } if scalar == naga::Scalar::F32 => Some(match size {
            VectorSize::Bi => wgpu::VertexFormat::Float32x2,
            VectorSize::Tri => wgpu::VertexFormat::Float32x3,
            VectorSize::Quad => wgpu::VertexFormat::Float32x4,
        }),
        _ => None,
    }
}

fn member_kind(inner: &TypeInner) -> MemberKind {
    match *inner {
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar == naga::Scalar::F32 => MemberKind::Mat4,
        _ => MemberKind::Other,
    }
}

fn output_slot(binding: &Binding, inner: &TypeInner) -> Result<OutputSlot> {
    match binding {
        Binding::BuiltIn(BuiltIn::Position { .. }) => Ok(OutputSlot::ClipPosition),
        Binding::BuiltIn(other) => Ok(OutputSlot::OtherBuiltIn(format!("{:?}", other))),
        Binding::Location { location, .. } => {
            let format = vertex_format(inner).ok_or_else(|| {
                anyhow!("Vertex output at location {} has an unsupported type", location)
            })?;
            Ok(OutputSlot::Location {
                location: *location,
                format,
            })
        }
    }
}
