use log::info;

use crate::catalog::{Catalog, Texture};
use crate::error::PipelineError;
use crate::vram::Vram;

/// Stored texture sides are capped at this power of two (§3 invariant 4).
pub const MAX_TEXTURE_SIDE: u32 = 512;

/// Resample a tightly packed RGB image to a square of side `dst_side`
/// using a box (area) filter: each destination texel averages the source
/// pixels whose centers fall in its footprint.
fn resample_area_rgb(src: &[u8], src_w: u32, src_h: u32, dst_side: u32) -> Vec<u8> {
    let mut dst = vec![0u8; (dst_side * dst_side * 3) as usize];
    for dy in 0..dst_side {
        let y0 = dy * src_h / dst_side;
        let y1 = ((dy + 1) * src_h / dst_side).max(y0 + 1).min(src_h);
        for dx in 0..dst_side {
            let x0 = dx * src_w / dst_side;
            let x1 = ((dx + 1) * src_w / dst_side).max(x0 + 1).min(src_w);

            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let i = ((sy * src_w + sx) * 3) as usize;
                    sum[0] += src[i] as u32;
                    sum[1] += src[i + 1] as u32;
                    sum[2] += src[i + 2] as u32;
                    count += 1;
                }
            }
            let o = ((dy * dst_side + dx) * 3) as usize;
            dst[o] = (sum[0] / count) as u8;
            dst[o + 1] = (sum[1] / count) as u8;
            dst[o + 2] = (sum[2] / count) as u8;
        }
    }
    dst
}

/// Halve an RGB image (box filter over 2x2 blocks), used to derive each
/// coarser mip level from the one above it.
fn halve_rgb(src: &[u8], side: u32) -> Vec<u8> {
    let half = side / 2;
    let mut dst = vec![0u8; (half * half * 3) as usize];
    for y in 0..half {
        for x in 0..half {
            let mut sum = [0u32; 3];
            for (oy, ox) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let sx = x * 2 + ox;
                let sy = y * 2 + oy;
                let i = ((sy * side + sx) * 3) as usize;
                sum[0] += src[i] as u32;
                sum[1] += src[i + 1] as u32;
                sum[2] += src[i + 2] as u32;
            }
            let o = ((y * half + x) * 3) as usize;
            dst[o] = (sum[0] / 4) as u8;
            dst[o + 1] = (sum[1] / 4) as u8;
            dst[o + 2] = (sum[2] / 4) as u8;
        }
    }
    dst
}

/// Byte offset, within the `S x S` packed grid, of the 4-byte cell holding
/// `(channel, x, y)` of packed level `level_factor` (`s = 1 << level_factor`).
/// Channel 0 = R, 1 = G, 2 = B. See SPEC_FULL.md §4.2.
pub fn mipmap_cell_offset(stored_side: u32, level_factor: u32, channel: u32, x: u32, y: u32) -> u64 {
    // A 1x1 texture has no room for the quadrant layout below (it needs a
    // 2s x 2s grid to hold level_factor 0, but stored_side is 1): its
    // single texel's three channels sit in the first three bytes instead.
    if stored_side == 1 {
        debug_assert_eq!(level_factor, 0);
        return channel as u64;
    }
    let s = 1u32 << level_factor;
    debug_assert!(x < s && y < s);
    let (row, col) = match channel {
        0 => (y, s + x),     // red:   rows [0, s),  cols [s, 2s)
        1 => (s + y, x),     // green: rows [s, 2s), cols [0, s)
        2 => (s + y, s + x), // blue:  rows [s, 2s), cols [s, 2s)
        _ => unreachable!("only 3 color channels are packed"),
    };
    (row as u64 * stored_side as u64 + col as u64) * 4
}

/// Build the packed mipmap pyramid for a resampled `side x side` RGB base
/// image and write it to a fresh `side * side * 4` byte buffer. Levels
/// `0..=L-1` are stored (`L = log2(side)`); the full-resolution image
/// itself never fits the recursive packing and is not retained (see
/// DESIGN.md OQ-1).
fn build_mipmap_pyramid(base_rgb: &[u8], side: u32) -> Vec<u8> {
    let levels = side.trailing_zeros(); // L
    let mut grid = vec![0u8; (side as u64 * side as u64 * 4) as usize];

    // A 1x1 base image has no coarser level below it; store its one texel
    // directly and skip the halving loop (halve_rgb would divide by zero).
    if side == 1 {
        for channel in 0..3u32 {
            let cell = mipmap_cell_offset(side, 0, channel, 0, 0) as usize;
            grid[cell] = base_rgb[channel as usize];
        }
        return grid;
    }

    // Level L-1 (side/2) is derived from the base image; each coarser
    // level halves the one above it down to level 0 (a single texel).
    let mut current = halve_rgb(base_rgb, side);
    let mut current_side = side / 2;
    for level_factor in (0..levels).rev() {
        debug_assert_eq!(current_side, 1 << level_factor);
        for y in 0..current_side {
            for x in 0..current_side {
                let i = ((y * current_side + x) * 3) as usize;
                for channel in 0..3u32 {
                    let cell = mipmap_cell_offset(side, level_factor, channel, x, y) as usize;
                    grid[cell] = current[i + channel as usize];
                }
            }
        }
        if current_side > 1 {
            current = halve_rgb(&current, current_side);
            current_side /= 2;
        }
    }
    grid
}

fn next_pow2(n: u32) -> u32 {
    if n <= 1 {
        1
    } else {
        1u32 << (32 - (n - 1).leading_zeros())
    }
}

/// Upload an image as a texture: resample it to a power-of-two square
/// (capped at [`MAX_TEXTURE_SIDE`]) and build its mipmap pyramid. RGBA
/// input is accepted by dropping the alpha byte and proceeding as RGB.
/// Only 8 bits per channel is supported.
pub fn load_texture(
    catalog: &mut Catalog,
    vram: &mut Vram,
    bytes: &[u8],
    width: u32,
    height: u32,
    channels: u32,
    bytes_per_channel: u32,
) -> u32 {
    if bytes_per_channel != 1 {
        panic!(
            "{}",
            PipelineError::UnsupportedChannelDepth {
                bits: bytes_per_channel * 8,
            }
        );
    }

    let rgb: Vec<u8> = match channels {
        3 => bytes.to_vec(),
        4 => {
            let mut out = Vec::with_capacity((width * height * 3) as usize);
            for px in bytes.chunks_exact(4) {
                out.extend_from_slice(&px[..3]);
            }
            out
        }
        other => panic!("{}", PipelineError::UnsupportedChannelCount { channels: other }),
    };

    let side = next_pow2(width.max(height)).min(MAX_TEXTURE_SIDE);
    let resampled = resample_area_rgb(&rgb, width, height, side);
    let pyramid = build_mipmap_pyramid(&resampled, side);

    let offset = vram.upload(&pyramid);
    let mipmap_levels = side.trailing_zeros().saturating_sub(1);
    let handle = catalog.push_texture(Texture {
        offset,
        side,
        mipmap_levels,
    });
    info!("loaded {width}x{height} texture, resampled to {side}x{side}, handle {handle}");
    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_pow2_clamps_to_the_minimum_covering_power() {
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(4), 4);
        assert_eq!(next_pow2(5), 8);
        assert_eq!(next_pow2(257), 512);
    }

    #[test]
    fn loading_a_1x1_texture_does_not_panic_and_keeps_its_color() {
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let handle = load_texture(&mut catalog, &mut vram, &[10u8, 20, 30], 1, 1, 3, 1);

        let texture = *catalog.texture(handle);
        assert_eq!(texture.side, 1);
        assert_eq!(texture.mipmap_levels, 0);

        let cell = texture.offset + mipmap_cell_offset(texture.side, 0, 0, 0, 0);
        assert_eq!(vram.read(cell, 1), [10]);
    }

    #[test]
    fn mipmap_cell_offsets_tile_without_overlap_within_a_level() {
        let side = 8;
        let mut seen = std::collections::HashSet::new();
        for level_factor in 0..3 {
            let s = 1u32 << level_factor;
            for channel in 0..3 {
                for y in 0..s {
                    for x in 0..s {
                        let off = mipmap_cell_offset(side, level_factor, channel, x, y);
                        assert!(seen.insert(off), "cell reused: level {level_factor} channel {channel} ({x},{y})");
                    }
                }
            }
        }
    }

    #[test]
    fn constant_color_texture_round_trips_through_every_mip_level() {
        let side = 16u32;
        let base = vec![200u8; (side * side * 3) as usize];
        let grid = build_mipmap_pyramid(&base, side);
        let levels = side.trailing_zeros();
        for level_factor in 0..levels {
            for channel in 0..3u32 {
                let off = mipmap_cell_offset(side, level_factor, channel, 0, 0) as usize;
                assert_eq!(grid[off], 200, "level_factor {level_factor} channel {channel}");
            }
        }
    }

    #[test]
    fn rgba_upload_drops_alpha_and_matches_rgb_upload() {
        let mut vram_rgb = Vram::new();
        let mut catalog_rgb = Catalog::new();
        let rgb = vec![10u8, 20, 30, 10, 20, 30, 10, 20, 30, 10, 20, 30];
        let h_rgb = load_texture(&mut catalog_rgb, &mut vram_rgb, &rgb, 2, 2, 3, 1);

        let mut vram_rgba = Vram::new();
        let mut catalog_rgba = Catalog::new();
        let rgba = vec![10u8, 20, 30, 255, 10, 20, 30, 255, 10, 20, 30, 255, 10, 20, 30, 255];
        let h_rgba = load_texture(&mut catalog_rgba, &mut vram_rgba, &rgba, 2, 2, 4, 1);

        assert_eq!(catalog_rgb.texture(h_rgb).side, catalog_rgba.texture(h_rgba).side);
    }
}
