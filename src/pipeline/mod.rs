mod vertex_stage;

use glam::{Vec2, Vec4};
use log::{debug, info};

use crate::catalog::Catalog;
use crate::clip::clip_triangle;
use crate::error::PipelineError;
use crate::fragment::process_quad;
use crate::pixel_format::PixelFormat;
use crate::raster::rasterize_triangle;
use crate::sampler::tex_lookup;
use crate::setup::{fan_triangles, viewport_transform};
use crate::shader::{FragmentShader, VertexShader, MAX_VARYINGS};
use crate::uniform::UniformBlock;
use crate::vram::Vram;

/// Number of texture-mapping unit slots. The original hardware model
/// fixes this at one; this port widens it to four so a draw can sample
/// more than a single bound texture, per §3's "small fixed number, at
/// least one" (see DESIGN.md OQ-3).
pub const TMU_COUNT: usize = 4;

/// The public render entry point. Owns the VRAM arena, the object
/// catalog, the process-wide uniform block and TMU bindings, and the
/// process-wide configuration flags (§4.8, §5).
pub struct Pipeline {
    vram: Vram,
    catalog: Catalog,
    uniforms: UniformBlock,
    tmus: [Option<u32>; TMU_COUNT],
    active_framebuffer: u32,
    varying_count: usize,
    depth_test: bool,
    early_depth_test: bool,
    face_culling: bool,
    perspective_correct: bool,
}

impl Pipeline {
    /// Create the pipeline, allocate its VRAM arena, and create the
    /// initial `width x height` RGBA8 framebuffer as the active target,
    /// cleared to the invariant defaults (§3 invariant 6). Mirrors the
    /// original hardware model's `s3d_init`, including its default
    /// flag values (all enabled).
    pub fn new(width: u32, height: u32) -> Self {
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let active_framebuffer = catalog.create_framebuffer(&mut vram, width, height, PixelFormat::Rgba8);

        let mut pipeline = Self {
            vram,
            catalog,
            uniforms: UniformBlock::new(),
            tmus: [None; TMU_COUNT],
            active_framebuffer,
            varying_count: 0,
            depth_test: true,
            early_depth_test: true,
            face_culling: true,
            perspective_correct: true,
        };
        pipeline.clear_color();
        pipeline.clear_depth();
        info!("pipeline initialized at {width}x{height}");
        pipeline
    }

    pub fn create_framebuffer(&mut self, width: u32, height: u32, format: PixelFormat) -> u32 {
        self.catalog.create_framebuffer(&mut self.vram, width, height, format)
    }

    pub fn set_active_framebuffer(&mut self, handle: u32) {
        self.active_framebuffer = handle;
    }

    /// Clear the active framebuffer's color region to all-zero bytes.
    pub fn clear_color(&mut self) {
        let fb = *self.catalog.framebuffer(self.active_framebuffer);
        self.vram.slice_mut(fb.color_offset, fb.color_size as usize).fill(0);
    }

    /// Clear the active framebuffer's depth region to 1.0 (far).
    pub fn clear_depth(&mut self) {
        let fb = *self.catalog.framebuffer(self.active_framebuffer);
        let far = 1.0f32.to_le_bytes();
        let depth = self.vram.slice_mut(fb.depth_offset, fb.depth_size() as usize);
        for cell in depth.chunks_exact_mut(4) {
            cell.copy_from_slice(&far);
        }
    }

    pub fn set_depth_test(&mut self, enable: bool) {
        self.depth_test = enable;
    }

    pub fn set_early_depth_test(&mut self, enable: bool) {
        self.early_depth_test = enable;
    }

    pub fn set_face_culling(&mut self, enable: bool) {
        self.face_culling = enable;
    }

    pub fn set_perspective_correct(&mut self, enable: bool) {
        self.perspective_correct = enable;
    }

    pub fn set_varying_count(&mut self, count: usize) {
        if count > MAX_VARYINGS {
            panic!(
                "{}",
                PipelineError::VaryingOverrun {
                    count,
                    max: MAX_VARYINGS,
                }
            );
        }
        self.varying_count = count;
    }

    pub fn load_vbo(&mut self, bytes: &[u8]) -> u32 {
        self.catalog.load_vbo(&mut self.vram, bytes)
    }

    pub fn load_ebo(&mut self, bytes: &[u8]) -> u32 {
        self.catalog.load_ebo(&mut self.vram, bytes)
    }

    pub fn bind_vao(&mut self, ebo: u32, vbo: u32, attribute_count: u32, attribute_stride: u32) -> u32 {
        self.catalog.bind_vao(ebo, vbo, attribute_count, attribute_stride)
    }

    pub fn load_texture(&mut self, bytes: &[u8], width: u32, height: u32, channels: u32, bytes_per_channel: u32) -> u32 {
        crate::texture::load_texture(&mut self.catalog, &mut self.vram, bytes, width, height, channels, bytes_per_channel)
    }

    /// Bind a texture handle to a TMU slot, or `0` to disable it.
    pub fn bind_texture(&mut self, tmu: usize, texture_handle: u32) {
        if tmu >= TMU_COUNT {
            panic!(
                "{}",
                PipelineError::InvalidTmu {
                    tmu,
                    count: TMU_COUNT,
                }
            );
        }
        self.tmus[tmu] = if texture_handle == 0 { None } else { Some(texture_handle) };
    }

    pub fn update_uniform(&mut self, bytes: &[u8]) {
        self.uniforms.update(bytes);
    }

    /// Sample a bound TMU. Returns `Vec4::ZERO` (alpha always zero, per
    /// §4.3) if the slot is disabled. Equivalent to what a fragment
    /// shader reaches via its [`TextureUnit`] argument during `render`,
    /// exposed standalone for callers that want to sample outside a draw.
    pub fn tex_lookup(&self, tmu: usize, d_max: f32, uv: Vec2) -> Vec4 {
        if tmu >= TMU_COUNT {
            panic!(
                "{}",
                PipelineError::InvalidTmu {
                    tmu,
                    count: TMU_COUNT,
                }
            );
        }
        match self.tmus[tmu] {
            None => Vec4::ZERO,
            Some(handle) => tex_lookup(&self.catalog, &self.vram, handle, d_max, uv).extend(0.0),
        }
    }

    /// Copy the active framebuffer's color region out to a caller-
    /// provided buffer. `destination.len()` must equal the framebuffer's
    /// color byte size exactly.
    pub fn render_copy(&self, destination: &mut [u8]) {
        let fb = self.catalog.framebuffer(self.active_framebuffer);
        assert_eq!(destination.len() as u64, fb.color_size, "render_copy destination size mismatch");
        destination.copy_from_slice(self.vram.read(fb.color_offset, fb.color_size as usize));
    }

    /// Resolve the VAO to its EBO/VBO, walk the index buffer three
    /// indices at a time, and drive each triangle through vertex stage
    /// -> clip -> setup -> raster -> fragment (§4.8).
    pub fn render(&mut self, vao_handle: u32, vs: &dyn VertexShader, fs: &dyn FragmentShader) {
        let vao = *self.catalog.vao(vao_handle);
        let vbo = *self.catalog.vbo(vao.vbo);
        let ebo = *self.catalog.ebo(vao.ebo);
        let fb = *self.catalog.framebuffer(self.active_framebuffer);

        let indices: Vec<u32> = {
            let index_bytes = self.vram.read(ebo.offset, ebo.size as usize);
            bytemuck_u32s(index_bytes).to_vec()
        };
        let triangle_count = indices.len() / 3;
        debug!("rendering VAO {vao_handle}: {triangle_count} triangles");

        for t in 0..triangle_count {
            let triangle_indices = [indices[t * 3], indices[t * 3 + 1], indices[t * 3 + 2]];
            let post_vs = vertex_stage::run_triangle(
                &self.vram,
                &vao,
                vbo.offset,
                triangle_indices,
                vs,
                &self.uniforms,
                self.varying_count,
            );

            let mut polygon = clip_triangle(post_vs[0], post_vs[1], post_vs[2], self.varying_count);
            if polygon.len() < 3 {
                continue;
            }

            viewport_transform(&mut polygon, fb.width, fb.height, self.varying_count, self.perspective_correct);

            for tri in fan_triangles(&polygon) {
                rasterize_triangle(&tri[0], &tri[1], &tri[2], self.face_culling, |v0, v1, v2, quad| {
                    process_quad(
                        &mut self.vram,
                        &fb,
                        &self.uniforms,
                        &self.catalog,
                        &self.tmus,
                        fs,
                        v0,
                        v1,
                        v2,
                        quad,
                        self.varying_count,
                        self.depth_test,
                        self.early_depth_test,
                        self.perspective_correct,
                    );
                });
            }
        }
    }
}

fn bytemuck_u32s(bytes: &[u8]) -> &[u32] {
    assert_eq!(bytes.len() % 4, 0);
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const u32, bytes.len() / 4) }
}
