use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use simple_raster::{
    Camera, Mesh, Position, ShaderInterface, SimpleRasterShader, VertexAttributes, VertexStreams,
    SIMPLE_RASTER_VERT,
};

const DEFAULT_FOV_DEGREES: f32 = 50.0;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the shader interface and check it against the binding contract
    Reflect {
        /// GLSL vertex shader to reflect instead of the built-in one
        #[arg(long)]
        shader: Option<PathBuf>,
    },
    /// Run the vertex stage on the CPU and print each invocation's outputs
    Transform(TransformArgs),
}

#[derive(Args)]
struct TransformArgs {
    /// Wavefront OBJ mesh to transform
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Extra object-space position as x,y,z (repeatable)
    #[arg(long = "position", value_parser = parse_vec3, allow_hyphen_values = true)]
    positions: Vec<Vec3>,

    /// Camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, default_value = "0,0,-5", allow_hyphen_values = true)]
    eye: Vec3,

    /// Camera pitch,yaw,roll in radians
    #[arg(long, value_parser = parse_vec3, default_value = "0,0,0", allow_hyphen_values = true)]
    rotation: Vec3,

    /// Vertical field of view in degrees
    #[arg(long)]
    fov: Option<f32>,

    #[arg(long, default_value_t = 16.0 / 9.0)]
    aspect: f32,

    #[arg(long, default_value_t = 0.1)]
    near: f32,

    #[arg(long, default_value_t = 100.0)]
    far: f32,

    /// Orthographic projection spanning +-EXTENT vertically
    #[arg(long, value_name = "EXTENT")]
    orthographic: Option<f32>,
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let components = s
        .split(',')
        .map(|c| c.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid component in '{}': {}", s, e))?;

    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected three comma-separated values, got '{}'", s)),
    }
}

fn reflect(shader: Option<PathBuf>) -> Result<()> {
    let source = match &shader {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => SIMPLE_RASTER_VERT.to_string(),
    };

    let interface = ShaderInterface::reflect(&source)?;
    print!("{}", interface);
    interface.check_contract()?;
    println!("Binding contract satisfied");
    Ok(())
}

fn transform(args: TransformArgs) -> Result<()> {
    let mut camera = Camera::new();
    match args.orthographic {
        Some(extent) => {
            if args.fov.is_some() {
                log::warn!("Both --orthographic and --fov specified, ignoring --fov");
            }
            let half_width = extent * args.aspect;
            camera.set_orthographic_projection(
                -half_width,
                half_width,
                -extent,
                extent,
                args.near,
                args.far,
            )?;
        }
        None => {
            let fov = args.fov.unwrap_or(DEFAULT_FOV_DEGREES);
            camera.set_perspective_projection(fov.to_radians(), args.aspect, args.near, args.far)?;
        }
    }
    camera.set_view(args.eye, args.rotation);

    let mut positions = Vec::new();
    let mut attributes = Vec::new();
    if let Some(path) = &args.mesh {
        let mesh = Mesh::load(path)?;
        positions.extend(mesh.positions);
        attributes.extend(mesh.attributes);
    }
    for p in &args.positions {
        positions.push(Position::from(*p));
        attributes.push(VertexAttributes::default());
    }
    if positions.is_empty() {
        bail!("Nothing to transform, pass --mesh or --position");
    }

    let shader = SimpleRasterShader::new(&camera.uniform());
    let streams = VertexStreams::new(&positions, &attributes)?;
    log::debug!("Running {} vertex invocations", streams.len());

    for (i, out) in shader.run(&streams).iter().enumerate() {
        let c = out.clip_position;
        let color = out.color;
        println!(
            "{:>6}  clip [{:>11.5} {:>11.5} {:>11.5} {:>11.5}]  color [{} {} {} {}]",
            i, c.x, c.y, c.z, c.w, color.x, color.y, color.z, color.w
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Reflect { shader } => reflect(shader),
        Command::Transform(args) => transform(args),
    }
}
