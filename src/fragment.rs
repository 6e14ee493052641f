use crate::catalog::Catalog;
use crate::framebuffer::Framebuffer;
use crate::pixel_format::require_rgba8;
use crate::raster::Quad;
use crate::shader::{FragmentShader, PostVsVertex, TextureUnit};
use crate::uniform::UniformBlock;
use crate::vram::Vram;

fn depth_at(vram: &Vram, fb: &Framebuffer, x: i32, y: i32) -> f32 {
    let offset = fb.depth_offset + (y as u64 * fb.width as u64 + x as u64) * 4;
    f32::from_le_bytes(vram.read(offset, 4).try_into().unwrap())
}

fn set_depth(vram: &mut Vram, fb: &Framebuffer, x: i32, y: i32, z: f32) {
    let offset = fb.depth_offset + (y as u64 * fb.width as u64 + x as u64) * 4;
    vram.write(offset, &z.to_le_bytes());
}

/// Always-LESS depth comparison: writes through on pass. No Z masking.
fn z_test(vram: &mut Vram, fb: &Framebuffer, x: i32, y: i32, depth: f32) -> bool {
    if depth < depth_at(vram, fb, x, y) {
        set_depth(vram, fb, x, y, depth);
        true
    } else {
        false
    }
}

/// Packs as the little-endian u32 `0xAARRGGBB`, which lands in VRAM as
/// bytes `[B, G, R, A]` — the byte order the original hardware model
/// assigns backwards (it writes `(b<<24)|(g<<16)|(r<<8)|a` directly into
/// a native u32 array, landing `[A, R, G, B]` on a little-endian host);
/// this port follows the documented BGRA layout instead (DESIGN.md OQ-4).
fn write_pixel(vram: &mut Vram, fb: &Framebuffer, x: i32, y: i32, rgb: glam::Vec3) {
    let r = (rgb.x * 255.0).clamp(0.0, 255.0) as u32;
    let g = (rgb.y * 255.0).clamp(0.0, 255.0) as u32;
    let b = (rgb.z * 255.0).clamp(0.0, 255.0) as u32;
    let packed = (0xffu32 << 24) | (r << 16) | (g << 8) | b;
    let offset = fb.color_offset + (y as u64 * fb.width as u64 + x as u64) * 4;
    vram.write(offset, &packed.to_le_bytes());
}

/// Process one rasterized 2x2 quad: perspective-correct interpolation,
/// early/late depth testing, screen-space derivatives, the fragment
/// callback, and RGBA8 writeback (§4.7). Depth testing is skipped
/// entirely (every masked sample passes, depth buffer untouched) when
/// `depth_test` is false; `early_depth_test` only chooses which of the
/// two passes runs when it's true.
#[allow(clippy::too_many_arguments)]
pub fn process_quad(
    vram: &mut Vram,
    framebuffer: &Framebuffer,
    uniforms: &UniformBlock,
    catalog: &Catalog,
    tmus: &[Option<u32>],
    shader: &dyn FragmentShader,
    v0: &PostVsVertex,
    v1: &PostVsVertex,
    v2: &PostVsVertex,
    quad: Quad,
    varying_count: usize,
    depth_test: bool,
    early_depth_test: bool,
    perspective_correct: bool,
) {
    require_rgba8(framebuffer.format).expect("fragment writeback requires an RGBA8 framebuffer");

    let xx = [quad.x, quad.x + 1, quad.x, quad.x + 1];
    let yy = [quad.y, quad.y, quad.y + 1, quad.y + 1];
    let mut mask = quad.mask;

    let mut frag_depth = [0.0f32; 4];
    for i in 0..4 {
        let sum = (quad.edge_a[i] + quad.edge_b[i] + quad.edge_c[i]) as f32;
        frag_depth[i] = (v0.position.z * quad.edge_a[i] as f32
            + v1.position.z * quad.edge_b[i] as f32
            + v2.position.z * quad.edge_c[i] as f32)
            / sum;
    }

    if depth_test && early_depth_test {
        let mut any_accepted = false;
        for i in 0..4 {
            if mask[i] {
                any_accepted |= z_test(vram, framebuffer, xx[i], yy[i], frag_depth[i]);
            }
        }
        if !any_accepted {
            return;
        }
    }

    // Varyings interpolate for every sample, masked or not: unmasked
    // samples still feed the screen-space derivatives.
    let mut varying = [[0.0f32; crate::shader::MAX_VARYINGS]; 4];
    for i in 0..4 {
        let w = [v0.position.w, v1.position.w, v2.position.w];
        let bary = [quad.edge_a[i] as f32, quad.edge_b[i] as f32, quad.edge_c[i] as f32];
        // Perspective-correct: varyings already carry attr/w (from
        // viewport_transform), so dividing by interpolated 1/w undoes the
        // nonlinearity of screen-space interpolation. Disabled: varyings
        // were left undivided, so a plain barycentric average is affine.
        let weight = if perspective_correct {
            1.0 / (w[0] * bary[0] + w[1] * bary[1] + w[2] * bary[2])
        } else {
            1.0 / (bary[0] + bary[1] + bary[2])
        };
        for j in 0..varying_count {
            let attr = [v0.varying[j], v1.varying[j], v2.varying[j]];
            let sum = attr[0] * bary[0] + attr[1] * bary[1] + attr[2] * bary[2];
            varying[i][j] = sum * weight;
        }
    }

    let groups = varying_count / 4;
    let mut ddx = [[0.0f32; 8]; 2];
    let mut ddy = [[0.0f32; 8]; 2];
    for g in 0..groups {
        ddx[0][g] = varying[1][g * 4] - varying[0][g * 4];
        ddx[1][g] = varying[3][g * 4] - varying[2][g * 4];
        ddy[0][g] = varying[2][g * 4 + 1] - varying[0][g * 4 + 1];
        ddy[1][g] = varying[3][g * 4 + 1] - varying[1][g * 4 + 1];
    }

    let textures = TextureUnit { catalog, vram: &*vram, tmus };
    let mut frag_color = [glam::Vec3::ZERO; 4];
    for i in 0..4 {
        if mask[i] {
            let mut depth_override = None;
            frag_color[i] = shader.run(
                uniforms,
                &textures,
                &varying[i][..varying_count],
                &ddx[i % 2][..groups],
                &ddy[i / 2][..groups],
                &mut depth_override,
            );
            if let Some(z) = depth_override {
                frag_depth[i] = z;
            }
        }
    }

    if depth_test && !early_depth_test {
        for i in 0..4 {
            if mask[i] && !z_test(vram, framebuffer, xx[i], yy[i], frag_depth[i]) {
                mask[i] = false;
            }
        }
    }

    for i in 0..4 {
        if mask[i] {
            write_pixel(vram, framebuffer, xx[i], yy[i], frag_color[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::PixelFormat;
    use glam::Vec4;

    fn framebuffer(vram: &mut Vram, width: u32, height: u32) -> Framebuffer {
        let color_size = width as u64 * height as u64 * 4;
        let color_offset = vram.allocate(color_size);
        let depth_offset = vram.allocate(width as u64 * height as u64 * 4);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                set_depth(vram, &Framebuffer { color_offset, depth_offset, width, height, color_size, format: PixelFormat::Rgba8 }, x, y, 1.0);
            }
        }
        Framebuffer { color_offset, depth_offset, width, height, color_size, format: PixelFormat::Rgba8 }
    }

    fn full_quad(x: i32, y: i32) -> Quad {
        Quad {
            x,
            y,
            edge_a: [1, 1, 1, 1],
            edge_b: [1, 1, 1, 1],
            edge_c: [1, 1, 1, 1],
            mask: [true; 4],
        }
    }

    #[test]
    fn a_closer_fragment_passes_the_depth_test_and_writes_the_color() {
        let mut vram = Vram::new();
        let fb = framebuffer(&mut vram, 4, 4);
        let mut v0 = PostVsVertex::default();
        v0.position = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let v1 = v0;
        let v2 = v0;
        let uniforms = UniformBlock::new();
        let shader = |_: &UniformBlock, _: &TextureUnit, _: &[f32], _: &[f32], _: &[f32], _: &mut Option<f32>| glam::Vec3::new(1.0, 0.0, 0.0);
        let catalog = Catalog::new();
        let tmus: [Option<u32>; 0] = [];

        process_quad(&mut vram, &fb, &uniforms, &catalog, &tmus, &shader, &v0, &v1, &v2, full_quad(0, 0), 0, true, false, true);

        let offset = fb.color_offset;
        let packed = u32::from_le_bytes(vram.read(offset, 4).try_into().unwrap());
        assert_eq!((packed >> 24) & 0xff, 0xff); // alpha
        assert_eq!((packed >> 16) & 0xff, 255); // red channel
    }

    #[test]
    fn a_farther_fragment_fails_the_depth_test_and_does_not_write() {
        let mut vram = Vram::new();
        let fb = framebuffer(&mut vram, 4, 4);
        let mut v0 = PostVsVertex::default();
        v0.position = Vec4::new(0.0, 0.0, 2.0, 1.0); // farther than the cleared 1.0
        let v1 = v0;
        let v2 = v0;
        let uniforms = UniformBlock::new();
        let shader = |_: &UniformBlock, _: &TextureUnit, _: &[f32], _: &[f32], _: &[f32], _: &mut Option<f32>| glam::Vec3::new(1.0, 0.0, 0.0);
        let catalog = Catalog::new();
        let tmus: [Option<u32>; 0] = [];

        process_quad(&mut vram, &fb, &uniforms, &catalog, &tmus, &shader, &v0, &v1, &v2, full_quad(0, 0), 0, true, false, true);

        let offset = fb.color_offset;
        let packed = u32::from_le_bytes(vram.read(offset, 4).try_into().unwrap());
        assert_eq!(packed, 0);
    }

    #[test]
    fn disabling_depth_test_writes_a_farther_fragment_anyway() {
        let mut vram = Vram::new();
        let fb = framebuffer(&mut vram, 4, 4);
        let mut v0 = PostVsVertex::default();
        v0.position = Vec4::new(0.0, 0.0, 2.0, 1.0); // farther than the cleared 1.0
        let v1 = v0;
        let v2 = v0;
        let uniforms = UniformBlock::new();
        let shader = |_: &UniformBlock, _: &TextureUnit, _: &[f32], _: &[f32], _: &[f32], _: &mut Option<f32>| glam::Vec3::new(1.0, 0.0, 0.0);
        let catalog = Catalog::new();
        let tmus: [Option<u32>; 0] = [];

        process_quad(&mut vram, &fb, &uniforms, &catalog, &tmus, &shader, &v0, &v1, &v2, full_quad(0, 0), 0, false, false, true);

        let offset = fb.color_offset;
        let packed = u32::from_le_bytes(vram.read(offset, 4).try_into().unwrap());
        assert_eq!((packed >> 16) & 0xff, 255); // red channel, written despite failing depth
    }
}
