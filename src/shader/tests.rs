use super::*;
use super::interface::{MemberKind, OutputSlot};
use crate::model::{Position, VertexAttributes};
use approx::assert_relative_eq;
use glam::{Vec2, Vec3};

fn test_ubo() -> GlobalUbo {
    let projection = Mat4::perspective_lh(std::f32::consts::FRAC_PI_3, 1.5, 0.1, 100.0);
    let view = Mat4::look_at_lh(Vec3::new(2.0, 3.0, -5.0), Vec3::ZERO, Vec3::Y);
    GlobalUbo::new(projection, view)
}

fn assert_vec4_eq(actual: Vec4, expected: Vec4) {
    for i in 0..4 {
        assert_relative_eq!(actual[i], expected[i], epsilon = 1e-4, max_relative = 1e-5);
    }
}

#[test]
fn test_identity_transform() {
    let shader = SimpleRasterShader::new(&GlobalUbo::default());
    let out = shader.exec(&VertexInput::from(Vec3::new(1.0, 2.0, 3.0)));

    assert_eq!(out.clip_position, Vec4::new(1.0, 2.0, 3.0, 1.0));
    assert_eq!(out.color, Vec4::new(1.0, 1.0, 1.0, 1.0));
}

#[test]
fn test_matches_reference_product() {
    let ubo = test_ubo();
    let shader = SimpleRasterShader::new(&ubo);

    let points = [
        Vec3::new(0.5, -1.0, 2.0),
        Vec3::new(-3.0, 4.0, 1.0),
        Vec3::new(10.0, 0.0, -10.0),
    ];
    for p in points {
        let expected = ubo.projection() * (ubo.view() * p.extend(1.0));
        let out = shader.exec(&VertexInput::from(p));
        assert_vec4_eq(out.clip_position, expected);
    }
}

#[test]
fn test_origin_maps_to_fourth_column() {
    let ubo = test_ubo();
    let shader = SimpleRasterShader::new(&ubo);
    let out = shader.exec(&VertexInput::from(Vec3::ZERO));

    let clip_from_object = ubo.projection() * ubo.view();
    assert_eq!(out.clip_position, clip_from_object.w_axis);
}

#[test]
fn test_color_ignores_other_attributes() {
    let shader = SimpleRasterShader::new(&test_ubo());
    let p = Vec3::new(1.0, 1.0, 1.0);

    let plain = shader.exec(&VertexInput::from(p));
    let inputs = [
        VertexInput { position: p, normal: Vec3::ZERO, tangent: Vec3::ZERO, uv: Vec2::ZERO },
        VertexInput { position: p, normal: Vec3::Y, tangent: Vec3::X, uv: Vec2::new(0.3, 0.7) },
        VertexInput {
            position: p,
            normal: Vec3::splat(f32::NAN),
            tangent: Vec3::splat(f32::INFINITY),
            uv: Vec2::splat(-1e30),
        },
    ];
    for input in inputs {
        let out = shader.exec(&input);
        assert_eq!(out.color, Vec4::ONE);
        assert_eq!(out.clip_position, plain.clip_position);
    }
}

#[test]
fn test_nan_position_propagates() {
    let shader = SimpleRasterShader::new(&GlobalUbo::default());
    let out = shader.exec(&VertexInput::from(Vec3::new(f32::NAN, 2.0, 3.0)));

    assert!(out.clip_position.x.is_nan());
    assert_eq!(out.color, Vec4::ONE);

    let shader = SimpleRasterShader::new(&test_ubo());
    let out = shader.exec(&VertexInput::from(Vec3::new(0.0, f32::NAN, 0.0)));
    assert!(out.clip_position.is_nan());
    assert_eq!(out.color, Vec4::ONE);
}

#[test]
fn test_run_streams() {
    let positions = [
        Position([0.0, 0.0, 0.0]),
        Position([1.0, 0.0, 0.0]),
        Position([0.0, 1.0, 0.0]),
    ];
    let attributes = [VertexAttributes::default(); 3];
    let streams = VertexStreams::new(&positions, &attributes).unwrap();
    let ubo = GlobalUbo::new(Mat4::from_scale(Vec3::splat(2.0)), Mat4::IDENTITY);

    let outputs = SimpleRasterShader::from(ubo).run(&streams);
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[1].clip_position, Vec4::new(2.0, 0.0, 0.0, 1.0));
    assert_eq!(outputs[2].clip_position, Vec4::new(0.0, 2.0, 0.0, 1.0));
    assert!(outputs.iter().all(|o| o.color == Vec4::ONE));
}

#[test]
fn test_run_indexed() {
    let positions = [Position([1.0, 0.0, 0.0]), Position([0.0, 1.0, 0.0])];
    let attributes = [VertexAttributes::default(); 2];
    let streams = VertexStreams::new(&positions, &attributes).unwrap();
    let shader = SimpleRasterShader::new(&GlobalUbo::default());

    let outputs = shader.run_indexed(&streams, &[1, 0, 1]).unwrap();
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0].clip_position, Vec4::new(0.0, 1.0, 0.0, 1.0));
    assert_eq!(outputs[1].clip_position, Vec4::new(1.0, 0.0, 0.0, 1.0));
    assert_eq!(outputs[0], outputs[2]);

    let err = shader.run_indexed(&streams, &[0, 2]).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_shader_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SimpleRasterShader>();
    assert_send_sync::<GlobalUbo>();
}

#[test]
fn test_shader_module_descriptor() {
    let descriptor = shader_module_descriptor();
    assert!(descriptor.label.is_some());
    match descriptor.source {
        wgpu::ShaderSource::Glsl { shader, stage, .. } => {
            assert_eq!(stage, naga::ShaderStage::Vertex);
            assert!(shader.starts_with("#version 460"));
        }
        _ => panic!("expected GLSL source"),
    }
}

#[test_log::test]
fn test_reflect_shipped_shader() {
    let interface = ShaderInterface::reflect(SIMPLE_RASTER_VERT).unwrap();

    assert_eq!(interface.entry_point, ENTRY_POINT);
    assert_eq!(interface.stage, naga::ShaderStage::Vertex);

    let inputs: Vec<_> = interface
        .inputs
        .iter()
        .map(|input| (input.location, input.name.as_deref(), input.format))
        .collect();
    assert_eq!(
        inputs,
        vec![
            (0, Some("inPosition"), wgpu::VertexFormat::Float32x3),
            (1, Some("inNormal"), wgpu::VertexFormat::Float32x3),
            (2, Some("inTangent"), wgpu::VertexFormat::Float32x3),
            (3, Some("inUV"), wgpu::VertexFormat::Float32x2),
        ]
    );

    assert!(interface.outputs.contains(&OutputSlot::ClipPosition));
    assert!(interface.outputs.contains(&OutputSlot::Location {
        location: 0,
        format: wgpu::VertexFormat::Float32x4,
    }));

    let block = interface.uniform(0, 0).expect("GlobalUbo block");
    assert_eq!(block.block_name.as_deref(), Some("GlobalUbo"));
    assert_eq!(block.span, 128);
    let members: Vec<_> = block
        .members
        .iter()
        .map(|m| (m.name.as_deref(), m.offset, m.kind))
        .collect();
    assert_eq!(
        members,
        vec![
            (Some("projection"), 0, MemberKind::Mat4),
            (Some("view"), 64, MemberKind::Mat4),
        ]
    );
}

#[test_log::test]
fn test_shipped_shader_satisfies_contract() {
    let interface = ShaderInterface::reflect(SIMPLE_RASTER_VERT).unwrap();
    interface.check_contract().unwrap();
}

#[test]
fn test_interface_display() {
    let interface = ShaderInterface::reflect(SIMPLE_RASTER_VERT).unwrap();
    let text = interface.to_string();
    assert!(text.contains("entry point 'main'"));
    assert!(text.contains("uniform set 0 binding 0 GlobalUbo (128 bytes)"));
    assert!(text.contains("out clip position"));
}

#[test]
fn test_reflect_rejects_invalid_source() {
    let result = ShaderInterface::reflect("#version 460\nvoid main() { gl_Position = undefined_thing; }\n");
    assert!(result.is_err());
}

fn check_modified(from: &str, to: &str) -> anyhow::Result<()> {
    assert!(SIMPLE_RASTER_VERT.contains(from), "source does not contain {:?}", from);
    let source = SIMPLE_RASTER_VERT.replace(from, to);
    ShaderInterface::reflect(&source)?.check_contract()
}

#[test]
fn test_contract_rejects_wrong_binding() {
    let err = check_modified("set = 0, binding = 0", "set = 0, binding = 1").unwrap_err();
    assert!(err.to_string().contains("No uniform block"), "{}", err);
}

#[test]
fn test_contract_rejects_swapped_members() {
    let err = check_modified(
        "mat4 projection;\n    mat4 view;",
        "mat4 view;\n    mat4 projection;",
    )
    .unwrap_err();
    assert!(err.to_string().contains("'projection' was expected"), "{}", err);
}

#[test]
fn test_contract_rejects_mistyped_position() {
    let source = SIMPLE_RASTER_VERT
        .replace("in vec3 inPosition", "in vec2 inPosition")
        .replace("vec4(inPosition, 1.0)", "vec4(inPosition, 0.0, 1.0)");
    let err = ShaderInterface::reflect(&source).unwrap().check_contract().unwrap_err();
    assert!(err.to_string().contains("location 0"), "{}", err);
}

#[test]
fn test_contract_rejects_missing_tangent() {
    let err = check_modified("layout(location = 2) in vec3 inTangent;", "").unwrap_err();
    assert!(err.to_string().contains("location 2"), "{}", err);
}

#[test]
fn test_contract_rejects_mistyped_normal() {
    let err = check_modified("in vec3 inNormal", "in vec4 inNormal").unwrap_err();
    assert!(err.to_string().contains("location 1"), "{}", err);
}

#[test]
fn test_contract_rejects_mistyped_color() {
    let source = SIMPLE_RASTER_VERT
        .replace("out vec4 outColor", "out vec3 outColor")
        .replace("outColor = vec4(1.0)", "outColor = vec3(1.0)");
    let err = ShaderInterface::reflect(&source).unwrap().check_contract().unwrap_err();
    assert!(err.to_string().contains("color"), "{}", err);
}
