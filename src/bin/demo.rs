use std::fs::File;
use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};
use log::info;
use softraster::{Pipeline, TextureUnit};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

/// The vertex shader ABI expects exactly five attribute floats per vertex
/// (`position.xyz`, `texcoord.uv`, per [`softraster::mesh::Mesh`]) and
/// writes a (u, v, world-space normal-less placeholder) varying set that
/// the fragment shader below reads back for texturing.
#[derive(Copy, Clone)]
struct Uniforms {
    mvp: Mat4,
}

fn vertex_shader(uniforms: &softraster::uniform::UniformBlock, attributes: &[f32], out_varyings: &mut [f32]) -> Vec4 {
    let raw: Uniforms = uniforms.as_ref();
    let position = Vec3::new(attributes[0], attributes[1], attributes[2]);
    out_varyings[0] = attributes[3];
    out_varyings[1] = attributes[4];
    raw.mvp * position.extend(1.0)
}

fn fragment_shader(_: &softraster::uniform::UniformBlock, textures: &TextureUnit, varyings: &[f32], ddx: &[f32], ddy: &[f32], _out_depth: &mut Option<f32>) -> Vec3 {
    let uv = Vec2::new(varyings[0], varyings[1]);
    let d_max = [ddx[0], ddy[0]].iter().map(|v| v.abs()).fold(0.0f32, f32::max);
    textures.lookup(0, d_max, uv).truncate()
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let mut args = std::env::args().skip(1);
    let obj_path = args.next().ok_or_else(|| anyhow!("usage: demo <mesh.obj> [texture.png]"))?;
    let texture_path = args.next();

    let mesh = softraster::mesh::load_obj(&obj_path)?;
    info!("loaded {} with {} indices", obj_path, mesh.indices.len());

    let width = 800u32;
    let height = 600u32;
    let mut pipeline = Pipeline::new(width, height);
    pipeline.set_varying_count(4); // one derivative group; u,v occupy lanes 0-1

    let vbo = pipeline.load_vbo(mesh.vertex_bytes());
    let ebo = pipeline.load_ebo(mesh.index_bytes());
    let vao = pipeline.bind_vao(ebo, vbo, 1, softraster::mesh::Mesh::ATTRIBUTE_STRIDE);

    let texture_path = texture_path.or_else(|| mesh.diffuse_texture_path.as_ref().map(|p| p.to_string_lossy().into_owned()));
    if let Some(path) = texture_path {
        let (rgba, tex_width, tex_height) = load_png(&path)?;
        let handle = pipeline.load_texture(&rgba, tex_width, tex_height, 4, 1);
        pipeline.bind_texture(0, handle);
    }

    let mut camera = softraster::camera::OrbitCamera::new(mesh.bounding_sphere.center, mesh.bounding_sphere.radius.max(1.0) * 2.5);

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("softraster demo")
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)?;

    let context = unsafe { softbuffer::Context::new(&window) }.map_err(|e| anyhow!("{e}"))?;
    let mut surface = unsafe { softbuffer::Surface::new(&context, &window) }.map_err(|e| anyhow!("{e}"))?;
    surface
        .resize(width.try_into().unwrap(), height.try_into().unwrap())
        .map_err(|e| anyhow!("{e}"))?;

    let start = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => *control_flow = ControlFlow::Exit,
            Event::MainEventsCleared => {
                camera.orbit(start.elapsed().as_secs_f32() * 0.3 - camera.yaw, 0.0);

                pipeline.clear_color();
                pipeline.clear_depth();
                pipeline.update_uniform(bytemuck_bytes(&Uniforms {
                    mvp: camera.view_projection(width as f32 / height as f32),
                }));

                pipeline.render(vao, &vertex_shader, &fragment_shader);

                let mut frame = vec![0u8; (width * height * 4) as usize];
                pipeline.render_copy(&mut frame);

                let mut buffer = surface.buffer_mut().unwrap();
                for (dst, src) in buffer.iter_mut().zip(frame.chunks_exact(4)) {
                    *dst = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
                }
                buffer.present().unwrap();
            }
            _ => {}
        }
    });
}

/// Decode a PNG into tightly packed RGBA8 bytes, the same decode path the
/// pipeline's own texture collaborator uses (`png::Decoder` + `next_frame`).
fn load_png(path: &str) -> Result<(Vec<u8>, u32, u32)> {
    let file = File::open(path)?;
    let decoder = png::Decoder::new(file);
    let mut reader = decoder.read_info()?;
    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut pixels)?;
    let (width, height) = (info.width, info.height);

    let rgba = match info.color_type {
        png::ColorType::Rgba => pixels,
        png::ColorType::Rgb => {
            let mut out = Vec::with_capacity((width * height * 4) as usize);
            for px in pixels.chunks_exact(3) {
                out.extend_from_slice(px);
                out.push(255);
            }
            out
        }
        other => return Err(anyhow!("unsupported PNG color type {other:?}")),
    };
    Ok((rgba, width, height))
}

fn bytemuck_bytes<T>(value: &T) -> &[u8] {
    unsafe { std::slice::from_raw_parts(value as *const T as *const u8, std::mem::size_of::<T>()) }
}
