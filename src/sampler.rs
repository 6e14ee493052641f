use glam::Vec3;

use crate::catalog::{Catalog, Texture};
use crate::texture::mipmap_cell_offset;
use crate::vram::Vram;

/// Fetch a single RGB texel of packed level `level_factor`, clamping both
/// coordinates independently to the level's side (§4.3 step 5 — the
/// original only clamps `x`; see DESIGN.md OQ-2).
fn fetch_texel(vram: &Vram, texture: &Texture, level_factor: u32, x: i32, y: i32) -> Vec3 {
    let side = 1i32 << level_factor;
    let x = x.clamp(0, side - 1) as u32;
    let y = y.clamp(0, side - 1) as u32;
    let mut rgb = [0u8; 3];
    for channel in 0..3u32 {
        let cell = texture.offset + mipmap_cell_offset(texture.side, level_factor, channel, x, y);
        rgb[channel as usize] = vram.read(cell, 1)[0];
    }
    Vec3::new(rgb[0] as f32 / 255.0, rgb[1] as f32 / 255.0, rgb[2] as f32 / 255.0)
}

fn lerp(t: f32, b: Vec3, a: Vec3) -> Vec3 {
    a * t + b * (1.0 - t)
}

/// Bilinear, mip-selected texture lookup. `d_max` is the largest
/// screen-space derivative magnitude across the (u,v) varyings (§4.7);
/// `uv` is the (possibly out-of-[0,1]) texture coordinate.
pub fn tex_lookup(catalog: &Catalog, vram: &Vram, texture_handle: u32, d_max: f32, uv: glam::Vec2) -> Vec3 {
    let texture = catalog.texture(texture_handle);

    let d = (d_max * texture.side as f32).max(f32::MIN_POSITIVE);
    let mut level = d.log2().ceil() as i32;
    if level < 0 {
        level = 0;
    }
    if level > texture.mipmap_levels as i32 {
        level = texture.mipmap_levels as i32;
    }
    let level_factor = texture.mipmap_levels - level as u32;
    let level_side = 1u32 << level_factor;

    let u = (uv.x.abs()).fract();
    let v = (uv.y.abs()).fract();

    let texel_x = u * level_side as f32;
    let texel_y = v * level_side as f32;
    let x = texel_x as i32;
    let y = texel_y as i32;
    let frac_x = texel_x - x as f32;
    let frac_y = texel_y - y as f32;

    let ul = fetch_texel(vram, texture, level_factor, x, y);
    let ur = fetch_texel(vram, texture, level_factor, x + 1, y);
    let ll = fetch_texel(vram, texture, level_factor, x, y + 1);
    let lr = fetch_texel(vram, texture, level_factor, x + 1, y + 1);

    let upper = lerp(frac_x, ur, ul);
    let lower = lerp(frac_x, lr, ll);
    lerp(frac_y, lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::load_texture;

    #[test]
    fn sampling_a_constant_color_texture_returns_that_color_at_any_lod() {
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let rgb = vec![64u8, 128, 192, 64, 128, 192, 64, 128, 192, 64, 128, 192];
        let handle = load_texture(&mut catalog, &mut vram, &rgb, 2, 2, 3, 1);

        for d_max in [0.001, 0.1, 1.0, 10.0] {
            let sample = tex_lookup(&catalog, &vram, handle, d_max, glam::Vec2::new(0.5, 0.5));
            assert!((sample.x - 64.0 / 255.0).abs() < 0.01);
            assert!((sample.y - 128.0 / 255.0).abs() < 0.01);
            assert!((sample.z - 192.0 / 255.0).abs() < 0.01);
        }
    }

    #[test]
    fn coordinates_outside_zero_one_wrap_by_fract_of_abs() {
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let rgb = vec![255u8, 0, 0, 255, 0, 0, 255, 0, 0, 255, 0, 0];
        let handle = load_texture(&mut catalog, &mut vram, &rgb, 2, 2, 3, 1);

        let inside = tex_lookup(&catalog, &vram, handle, 1.0, glam::Vec2::new(0.5, 0.5));
        let wrapped = tex_lookup(&catalog, &vram, handle, 1.0, glam::Vec2::new(-1.5, 2.5));
        assert!((inside.x - wrapped.x).abs() < 0.01);
    }

    #[test]
    fn out_of_range_texel_coordinates_are_clamped_on_both_axes() {
        // A regression guard for OQ-2: fetching one step past the edge on
        // either axis must clamp, not read into a neighboring packed cell.
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let rgb = vec![10u8, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let handle = load_texture(&mut catalog, &mut vram, &rgb, 2, 2, 3, 1);
        let texture = *catalog.texture(handle);

        let at_edge = fetch_texel(&vram, &texture, 1, 1, 1);
        let past_edge = fetch_texel(&vram, &texture, 1, 5, 5);
        assert_eq!(at_edge, past_edge);
    }
}
