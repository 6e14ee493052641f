use glam::Vec4;

use crate::shader::PostVsVertex;

/// The seven homogeneous half-space clipping planes, in the order the
/// original hardware evaluates them. `(nx, ny, nz, nw, w_bias)`.
const CLIPPING_EDGES: [(f32, f32, f32, f32, f32); 7] = [
    (-1.0, 0.0, 0.0, 1.0, 0.0), // x <= +w
    (1.0, 0.0, 0.0, 1.0, 0.0),  // x >= -w
    (0.0, -1.0, 0.0, 1.0, 0.0), // y <= +w
    (0.0, 1.0, 0.0, 1.0, 0.0),  // y >= -w
    (0.0, 0.0, 1.0, 0.0, 0.0),  // z >= 0
    (0.0, 0.0, 1.0, 1.0, 0.0),  // z >= -w
    (0.0, 0.0, 0.0, 1.0, 0.1),  // w >= epsilon
];

/// Maximum vertices a clipped triangle can carry (3 plus one per plane).
pub const MAX_CLIPPED_VERTICES: usize = 9;

fn dot_w_bias(v: Vec4, edge: (f32, f32, f32, f32, f32), w_bias: f32) -> f32 {
    let (nx, ny, nz, nw, _) = edge;
    v.x * nx + v.y * ny + v.z * nz + (v.w + w_bias) * nw
}

fn is_inside(edge: (f32, f32, f32, f32, f32), vertex: Vec4, w_bias: f32) -> bool {
    dot_w_bias(vertex, edge, w_bias) > 0.0
}

/// Linearly interpolate position and active varyings between `v1` (the
/// "previous" vertex, outside-reference) and `v0`, landing exactly on the
/// clipping plane.
fn intersect(
    edge: (f32, f32, f32, f32, f32),
    v0: &PostVsVertex,
    v1: &PostVsVertex,
    w_bias: f32,
    varying_count: usize,
) -> PostVsVertex {
    let dp = dot_w_bias(v0.position, edge, w_bias);
    let dp_prev = dot_w_bias(v1.position, edge, w_bias);
    let factor = dp_prev / (dp_prev - dp);

    let mut result = PostVsVertex::default();
    result.position = v1.position.lerp(v0.position, factor);
    for i in 0..varying_count {
        result.varying[i] = v1.varying[i] + (v0.varying[i] - v1.varying[i]) * factor;
    }
    result
}

/// Clip a triangle against all seven planes via Sutherland-Hodgman,
/// returning the surviving polygon (possibly empty, up to
/// [`MAX_CLIPPED_VERTICES`] vertices). Varyings are interpolated in clip
/// space, before perspective divide.
pub fn clip_triangle(v0: PostVsVertex, v1: PostVsVertex, v2: PostVsVertex, varying_count: usize) -> Vec<PostVsVertex> {
    let mut polygon = vec![v0, v1, v2];

    for &edge in &CLIPPING_EDGES {
        if polygon.is_empty() {
            break;
        }
        let w_bias = edge.4;
        let input = polygon;
        let mut output = Vec::with_capacity(MAX_CLIPPED_VERTICES);

        let mut reference = input[input.len() - 1];
        for &current in &input {
            let current_inside = is_inside(edge, current.position, w_bias);
            let reference_inside = is_inside(edge, reference.position, w_bias);
            if current_inside {
                if !reference_inside {
                    output.push(intersect(edge, &current, &reference, w_bias, varying_count));
                }
                output.push(current);
            } else if reference_inside {
                output.push(intersect(edge, &current, &reference, w_bias, varying_count));
            }
            reference = current;
        }
        polygon = output;
    }

    polygon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32, w: f32) -> PostVsVertex {
        let mut v = PostVsVertex::default();
        v.position = Vec4::new(x, y, z, w);
        v
    }

    #[test]
    fn a_triangle_fully_inside_the_frustum_survives_unclipped() {
        let out = clip_triangle(
            vertex(-0.5, -0.5, 0.5, 1.0),
            vertex(0.5, -0.5, 0.5, 1.0),
            vertex(0.0, 0.5, 0.5, 1.0),
            0,
        );
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn a_triangle_fully_outside_one_plane_is_culled_to_nothing() {
        let out = clip_triangle(
            vertex(2.0, 2.0, 0.5, 1.0),
            vertex(3.0, 2.0, 0.5, 1.0),
            vertex(2.5, 3.0, 0.5, 1.0),
            0,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn clipping_against_a_single_plane_adds_exactly_one_vertex() {
        // Straddles x = +w: one vertex outside, two inside.
        let out = clip_triangle(
            vertex(-0.5, -0.5, 0.5, 1.0),
            vertex(0.5, -0.5, 0.5, 1.0),
            vertex(2.0, 0.5, 0.5, 1.0),
            0,
        );
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn varyings_interpolate_linearly_at_the_clip_intersection() {
        let mut a = vertex(-0.5, 0.0, 0.5, 1.0);
        a.varying[0] = 0.0;
        let mut b = vertex(2.0, 0.0, 0.5, 1.0);
        b.varying[0] = 1.0;
        let c = vertex(-0.5, 1.0, 0.5, 1.0);

        let out = clip_triangle(a, b, c, 1);
        assert!(out.iter().any(|v| v.varying[0] > 0.0 && v.varying[0] < 1.0));
    }
}
