use crate::catalog::VertexArray;
use crate::shader::{PostVsVertex, VertexShader};
use crate::uniform::UniformBlock;
use crate::vram::Vram;

/// Run the vertex shader over one triangle's three indices, reading
/// attributes straight out of VRAM at `attribute_stride * index` and
/// collecting the three post-VS vertices the clipper expects (§4's
/// vertex stage driver).
pub fn run_triangle(
    vram: &Vram,
    vao: &VertexArray,
    vbo_offset: u64,
    indices: [u32; 3],
    shader: &dyn VertexShader,
    uniforms: &UniformBlock,
    varying_count: usize,
) -> [PostVsVertex; 3] {
    let stride = vao.attribute_stride as usize;
    std::array::from_fn(|i| {
        let index = indices[i] as usize;
        let byte_offset = vbo_offset + (stride * index * 4) as u64;
        let attributes = vram.read(byte_offset, stride * 4);
        let attributes: &[f32] = bytemuck_floats(attributes);

        let mut vertex = PostVsVertex::default();
        vertex.position = shader.run(uniforms, attributes, &mut vertex.varying[..varying_count]);
        vertex
    })
}

fn bytemuck_floats(bytes: &[u8]) -> &[f32] {
    assert_eq!(bytes.len() % 4, 0);
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const f32, bytes.len() / 4) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn the_vertex_shader_runs_once_per_index_reading_the_right_attribute_slice() {
        let mut vram = Vram::new();
        // Two vertices, 2 floats each: [0,1] and [2,3].
        let vbo_offset = vram.upload(bytemuck_bytes(&[0.0, 1.0, 2.0, 3.0]));
        let vao = VertexArray { ebo: 0, vbo: 0, attribute_count: 1, attribute_stride: 2 };
        let uniforms = UniformBlock::new();
        let shader = |_: &UniformBlock, attrs: &[f32], _out: &mut [f32]| Vec4::new(attrs[0], attrs[1], 0.0, 1.0);

        let verts = run_triangle(&vram, &vao, vbo_offset, [1, 0, 1], &shader, &uniforms, 0);

        assert_eq!(verts[0].position, Vec4::new(2.0, 3.0, 0.0, 1.0));
        assert_eq!(verts[1].position, Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(verts[2].position, Vec4::new(2.0, 3.0, 0.0, 1.0));
    }

    fn bytemuck_bytes(floats: &[f32]) -> &[u8] {
        unsafe { std::slice::from_raw_parts(floats.as_ptr() as *const u8, std::mem::size_of_val(floats)) }
    }
}
