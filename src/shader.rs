use glam::{Vec2, Vec4};

use crate::catalog::Catalog;
use crate::sampler::tex_lookup;
use crate::uniform::UniformBlock;
use crate::vram::Vram;

/// Maximum number of varying floats a post-VS vertex may carry (28 = 7
/// four-vectors). Varyings 0 and 1 are reserved by ABI convention as the
/// x/y consumed by screen-space derivative computation.
pub const MAX_VARYINGS: usize = 28;

/// A post-vertex-shader vertex: clip-space position, varyings, and
/// (once past viewport transform) an integer screen position.
#[derive(Debug, Clone, Copy)]
pub struct PostVsVertex {
    pub position: Vec4,
    pub varying: [f32; MAX_VARYINGS],
    pub screen: [i32; 2],
}

impl Default for PostVsVertex {
    fn default() -> Self {
        Self {
            position: Vec4::ZERO,
            varying: [0.0; MAX_VARYINGS],
            screen: [0, 0],
        }
    }
}

/// The vertex shader ABI: fixed callback, not dynamic code. `attributes`
/// is one vertex's worth of input floats (length `attribute_stride`);
/// the callee writes exactly `varying_count` floats and returns the
/// clip-space position.
pub trait VertexShader {
    fn run(&self, uniforms: &UniformBlock, attributes: &[f32], out_varyings: &mut [f32]) -> Vec4;
}

/// A read-only handle to the bound texture-mapping units, threaded into
/// the fragment callback so it can sample without owning the pipeline
/// (which is mutably borrowed by the renderer for the duration of the
/// draw). Mirrors the original hardware model's `s3d_tex_lookup`, which
/// a fragment shader calls directly against global engine state.
pub struct TextureUnit<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) vram: &'a Vram,
    pub(crate) tmus: &'a [Option<u32>],
}

impl<'a> TextureUnit<'a> {
    /// Sample TMU `tmu`. Returns `Vec4::ZERO` if nothing is bound there.
    pub fn lookup(&self, tmu: usize, d_max: f32, uv: Vec2) -> Vec4 {
        match self.tmus.get(tmu).copied().flatten() {
            None => Vec4::ZERO,
            Some(handle) => tex_lookup(self.catalog, self.vram, handle, d_max, uv).extend(0.0),
        }
    }
}

/// The fragment shader ABI. `ddx`/`ddy` each carry `varying_count / 4`
/// entries, one per reserved (x,y) varying pair. Returning `Some` in
/// `out_depth` overrides the interpolated depth for the late depth test.
pub trait FragmentShader {
    fn run(
        &self,
        uniforms: &UniformBlock,
        textures: &TextureUnit,
        varyings: &[f32],
        ddx: &[f32],
        ddy: &[f32],
        out_depth: &mut Option<f32>,
    ) -> glam::Vec3;
}

/// Adapts a plain closure to [`VertexShader`], for the common case of a
/// stateless shader with no captured resources beyond what it closes over.
impl<F> VertexShader for F
where
    F: Fn(&UniformBlock, &[f32], &mut [f32]) -> Vec4,
{
    fn run(&self, uniforms: &UniformBlock, attributes: &[f32], out_varyings: &mut [f32]) -> Vec4 {
        self(uniforms, attributes, out_varyings)
    }
}

impl<F> FragmentShader for F
where
    F: Fn(&UniformBlock, &TextureUnit, &[f32], &[f32], &[f32], &mut Option<f32>) -> glam::Vec3,
{
    fn run(
        &self,
        uniforms: &UniformBlock,
        textures: &TextureUnit,
        varyings: &[f32],
        ddx: &[f32],
        ddy: &[f32],
        out_depth: &mut Option<f32>,
    ) -> glam::Vec3 {
        self(uniforms, textures, varyings, ddx, ddy, out_depth)
    }
}
