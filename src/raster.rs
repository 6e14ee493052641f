use log::warn;

use crate::error::PipelineError;
use crate::shader::PostVsVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ScanRightForLeftEdge,
    SweepRight,
    SteppedRightDown,
    ScanLeftForRightEdge,
    ScanRightForRightEdge,
    SweepLeft,
    SteppedLeftDown,
    ScanLeftForLeftEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Outside,
    Inside,
    LeftEdge,
    RightEdge,
}

#[derive(Clone, Copy)]
enum Step {
    Left,
    Right,
    Down,
}

/// One step of the serpentine 2x2-quad scan state machine. Four
/// `(state, condition)` combinations can never occur in a correctly
/// formed triangle scan and panic if reached, mirroring the original
/// hardware model's `assert(0)`.
fn transition(state: State, cond: Condition) -> (Step, bool, State) {
    use Condition::*;
    use State::*;
    match (state, cond) {
        (ScanRightForLeftEdge, Outside) => (Step::Right, false, ScanRightForLeftEdge),
        (ScanRightForLeftEdge, Inside) => (Step::Right, true, SweepRight),
        (ScanRightForLeftEdge, LeftEdge) => (Step::Right, true, ScanRightForLeftEdge),
        (ScanRightForLeftEdge, RightEdge) => (Step::Down, false, SteppedRightDown),

        (SweepRight, Outside) => (Step::Down, false, SteppedRightDown),
        (SweepRight, Inside) => (Step::Right, true, SweepRight),
        (SweepRight, LeftEdge) => (Step::Right, true, SweepRight),
        (SweepRight, RightEdge) => (Step::Down, false, SteppedRightDown),

        (SteppedRightDown, Outside) => (Step::Left, false, ScanLeftForRightEdge),
        (SteppedRightDown, Inside) => (Step::Right, false, ScanRightForRightEdge),
        (SteppedRightDown, LeftEdge) => panic!(
            "{}",
            PipelineError::ImpossibleTransition {
                state: "SteppedRightDown",
                condition: "LeftEdge",
            }
        ),
        (SteppedRightDown, RightEdge) => (Step::Left, false, ScanLeftForRightEdge),

        (ScanLeftForRightEdge, Outside) => (Step::Left, false, ScanLeftForRightEdge),
        (ScanLeftForRightEdge, Inside) => (Step::Left, true, SweepLeft),
        (ScanLeftForRightEdge, LeftEdge) => (Step::Right, false, ScanRightForLeftEdge),
        (ScanLeftForRightEdge, RightEdge) => panic!(
            "{}",
            PipelineError::ImpossibleTransition {
                state: "ScanLeftForRightEdge",
                condition: "RightEdge",
            }
        ),

        (ScanRightForRightEdge, Outside) => (Step::Left, false, SweepLeft),
        (ScanRightForRightEdge, Inside) => (Step::Right, false, ScanRightForRightEdge),
        (ScanRightForRightEdge, LeftEdge) => panic!(
            "{}",
            PipelineError::ImpossibleTransition {
                state: "ScanRightForRightEdge",
                condition: "LeftEdge",
            }
        ),
        (ScanRightForRightEdge, RightEdge) => (Step::Left, true, SweepLeft),

        (SweepLeft, Outside) => (Step::Down, false, SteppedLeftDown),
        (SweepLeft, Inside) => (Step::Left, true, SweepLeft),
        (SweepLeft, LeftEdge) => (Step::Down, true, SteppedLeftDown),
        (SweepLeft, RightEdge) => (Step::Left, true, SweepLeft),

        (SteppedLeftDown, Outside) => (Step::Right, false, ScanRightForLeftEdge),
        (SteppedLeftDown, Inside) => (Step::Left, false, ScanLeftForLeftEdge),
        (SteppedLeftDown, LeftEdge) => (Step::Right, false, ScanRightForLeftEdge),
        (SteppedLeftDown, RightEdge) => panic!(
            "{}",
            PipelineError::ImpossibleTransition {
                state: "SteppedLeftDown",
                condition: "RightEdge",
            }
        ),

        (ScanLeftForLeftEdge, Outside) => (Step::Right, false, SweepRight),
        (ScanLeftForLeftEdge, Inside) => (Step::Left, false, ScanLeftForLeftEdge),
        (ScanLeftForLeftEdge, LeftEdge) => (Step::Right, true, ScanRightForLeftEdge),
        (ScanLeftForLeftEdge, RightEdge) => (Step::Left, false, ScanLeftForLeftEdge),
    }
}

/// A rasterized 2x2 pixel quad: top-left origin, the three edge functions
/// at each of the four samples (`[top-left, top-right, bottom-left,
/// bottom-right]`), and which samples fall inside the triangle.
pub struct Quad {
    pub x: i32,
    pub y: i32,
    pub edge_a: [i32; 4],
    pub edge_b: [i32; 4],
    pub edge_c: [i32; 4],
    pub mask: [bool; 4],
}

/// Walk a screen-space triangle's padded bounding box in 2x2 quads via
/// the serpentine state machine, invoking `emit` for every quad with at
/// least one sample inside. Degenerate triangles (all three x, or all
/// three y, screen coordinates equal) are always skipped. Back-facing
/// triangles (signed area <= 0) are culled only when `face_culling` is
/// enabled; otherwise the second and third vertices are swapped to
/// restore positive area and the triangle is rasterized regardless of
/// winding (§3 test E).
///
/// `emit` receives the three vertices in the order the edge functions
/// were built against (`v0` first; `v1`/`v2` swapped if culling was
/// bypassed), so callers can index `[v0, v1, v2]` consistently with
/// `edge_a`/`edge_b`/`edge_c`.
pub fn rasterize_triangle<'a>(
    v0: &'a PostVsVertex,
    v1: &'a PostVsVertex,
    v2: &'a PostVsVertex,
    face_culling: bool,
    mut emit: impl FnMut(&'a PostVsVertex, &'a PostVsVertex, &'a PostVsVertex, Quad),
) {
    let [x0, y0] = v0.screen;
    let [mut x1, mut y1] = v1.screen;
    let [mut x2, mut y2] = v2.screen;

    if x0 == x1 && x1 == x2 {
        return;
    }
    if y0 == y1 && y1 == y2 {
        return;
    }

    let initial_step_b = (y0 - y1, x1 - x0);
    let area = (x2 - x1) * initial_step_b.0 + (y2 - y1) * initial_step_b.1;
    let (v1, v2) = if area <= 0 {
        if face_culling {
            return;
        }
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut y1, &mut y2);
        (v2, v1)
    } else {
        (v1, v2)
    };

    let step_b = (y0 - y1, x1 - x0);

    let left_edge = (x0.min(x1).min(x2) - 2) / 2 * 2;
    let right_edge = (x0.max(x1).max(x2) + 2) / 2 * 2;
    let upper_edge = y0.min(y1).min(y2) / 2 * 2;
    let lower_edge = (y0.max(y1).max(y2) + 2) / 2 * 2;

    let step_a = (y2 - y0, x0 - x2);
    let step_c = (y1 - y2, x2 - x1);

    let mut x = left_edge;
    let mut y = upper_edge;
    let mut state = State::ScanRightForLeftEdge;

    let width = ((right_edge - left_edge).max(1)) as u64;
    let height = ((lower_edge - upper_edge).max(1)) as u64;
    let iteration_cap = width * height;
    let mut iterations: u64 = 0;

    loop {
        let edge_a0 = (x - x0) * step_a.0 + (y - y0) * step_a.1;
        let edge_b0 = (x - x1) * step_b.0 + (y - y1) * step_b.1;
        let edge_c0 = (x - x2) * step_c.0 + (y - y2) * step_c.1;

        let edge_a = [edge_a0, edge_a0 + step_a.0, edge_a0 + step_a.1, edge_a0 + step_a.0 + step_a.1];
        let edge_b = [edge_b0, edge_b0 + step_b.0, edge_b0 + step_b.1, edge_b0 + step_b.0 + step_b.1];
        let edge_c = [edge_c0, edge_c0 + step_c.0, edge_c0 + step_c.1, edge_c0 + step_c.0 + step_c.1];

        let mut mask = [false; 4];
        for i in 0..4 {
            mask[i] = edge_a[i] >= 0 && edge_b[i] >= 0 && edge_c[i] >= 0;
        }
        let any_inside = mask.iter().any(|&m| m);

        let cond = if any_inside {
            Condition::Inside
        } else if x == left_edge {
            Condition::LeftEdge
        } else if x == right_edge {
            Condition::RightEdge
        } else {
            Condition::Outside
        };

        let (step_dir, pixel_valid, next_state) = transition(state, cond);

        if any_inside && pixel_valid {
            emit(v0, v1, v2, Quad { x, y, edge_a, edge_b, edge_c, mask });
        }

        match step_dir {
            Step::Down => y += 2,
            Step::Left => x -= 2,
            Step::Right => x += 2,
        }

        if y == lower_edge {
            break;
        }
        state = next_state;

        iterations += 1;
        if iterations > iteration_cap {
            warn!("rasterizer iteration cap exceeded for triangle at ({x0},{y0}) ({x1},{y1}) ({x2},{y2}), aborting");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn vertex_at(x: i32, y: i32) -> PostVsVertex {
        let mut v = PostVsVertex::default();
        v.position = Vec4::new(x as f32, y as f32, 0.0, 1.0);
        v.screen = [x, y];
        v
    }

    #[test]
    fn a_front_facing_triangle_in_screen_space_emits_quads() {
        let v0 = vertex_at(10, 10);
        let v1 = vertex_at(30, 10);
        let v2 = vertex_at(10, 30);
        let mut count = 0;
        rasterize_triangle(&v0, &v1, &v2, true, |_, _, _, _| count += 1);
        assert!(count > 0);
    }

    #[test]
    fn a_backfacing_triangle_is_culled_when_face_culling_is_enabled() {
        let v0 = vertex_at(10, 10);
        let v1 = vertex_at(10, 30);
        let v2 = vertex_at(30, 10);
        let mut count = 0;
        rasterize_triangle(&v0, &v1, &v2, true, |_, _, _, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn a_backfacing_triangle_still_renders_when_face_culling_is_disabled() {
        let v0 = vertex_at(10, 10);
        let v1 = vertex_at(10, 30);
        let v2 = vertex_at(30, 10);
        let mut count = 0;
        rasterize_triangle(&v0, &v1, &v2, false, |_, _, _, _| count += 1);
        assert!(count > 0);
    }

    #[test]
    fn a_degenerate_triangle_with_collinear_vertices_emits_nothing() {
        let v0 = vertex_at(10, 10);
        let v1 = vertex_at(20, 10);
        let v2 = vertex_at(30, 10);
        let mut count = 0;
        rasterize_triangle(&v0, &v1, &v2, true, |_, _, _, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn emitted_quads_always_carry_at_least_one_inside_sample() {
        let v0 = vertex_at(0, 0);
        let v1 = vertex_at(40, 0);
        let v2 = vertex_at(0, 40);
        rasterize_triangle(&v0, &v1, &v2, true, |_, _, _, quad| {
            assert!(quad.mask.iter().any(|&m| m));
        });
    }
}
