use log::info;

use crate::error::PipelineError;
use crate::framebuffer::Framebuffer;
use crate::pixel_format::PixelFormat;
use crate::vram::Vram;

/// `(offset, byte size)`.
#[derive(Debug, Clone, Copy)]
pub struct VertexBuffer {
    pub offset: u64,
    pub size: u64,
}

/// `(offset, byte size)`, 32-bit indices in triangle-list order.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuffer {
    pub offset: u64,
    pub size: u64,
}

/// `(index buffer handle, vertex buffer handle, attribute count, attribute
/// stride in floats)`.
#[derive(Debug, Clone, Copy)]
pub struct VertexArray {
    pub ebo: u32,
    pub vbo: u32,
    pub attribute_count: u32,
    pub attribute_stride: u32,
}

/// `(offset, width, height, mipmap level count)`. `mipmap_levels` is the
/// maximum valid LOD index `L - 1`, not the level count `L` — see
/// SPEC_FULL.md §4.2 and DESIGN.md OQ-1.
#[derive(Debug, Clone, Copy)]
pub struct Texture {
    pub offset: u64,
    pub side: u32,
    pub mipmap_levels: u32,
}

/// Registries of vertex buffers, index buffers, vertex-array bindings,
/// framebuffers and textures. Handles are indices into these, 0-indexed
/// except textures (1-indexed so 0 means "no texture").
pub struct Catalog {
    pub vbos: Vec<VertexBuffer>,
    pub ebos: Vec<IndexBuffer>,
    pub vaos: Vec<VertexArray>,
    pub framebuffers: Vec<Framebuffer>,
    pub textures: Vec<Texture>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            vbos: Vec::new(),
            ebos: Vec::new(),
            vaos: Vec::new(),
            framebuffers: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn load_vbo(&mut self, vram: &mut Vram, bytes: &[u8]) -> u32 {
        let offset = vram.upload(bytes);
        let handle = self.vbos.len() as u32;
        self.vbos.push(VertexBuffer {
            offset,
            size: bytes.len() as u64,
        });
        info!("loaded {} byte VBO to handle {handle} (at 0x{offset:08x})", bytes.len());
        handle
    }

    pub fn load_ebo(&mut self, vram: &mut Vram, bytes: &[u8]) -> u32 {
        let offset = vram.upload(bytes);
        let handle = self.ebos.len() as u32;
        self.ebos.push(IndexBuffer {
            offset,
            size: bytes.len() as u64,
        });
        info!("loaded {} byte EBO to handle {handle} (at 0x{offset:08x})", bytes.len());
        handle
    }

    pub fn bind_vao(&mut self, ebo: u32, vbo: u32, attribute_count: u32, attribute_stride: u32) -> u32 {
        let handle = self.vaos.len() as u32;
        self.vaos.push(VertexArray {
            ebo,
            vbo,
            attribute_count,
            attribute_stride,
        });
        info!("bound EBO {ebo} / VBO {vbo} to VAO handle {handle}");
        handle
    }

    pub fn create_framebuffer(&mut self, vram: &mut Vram, width: u32, height: u32, format: PixelFormat) -> u32 {
        let color_size = width as u64 * height as u64 * format.bytes_per_pixel() as u64;
        let color_offset = vram.allocate(color_size);
        let depth_offset = vram.allocate(width as u64 * height as u64 * 4);
        let handle = self.framebuffers.len() as u32;
        self.framebuffers.push(Framebuffer {
            color_offset,
            depth_offset,
            width,
            height,
            color_size,
            format,
        });
        info!("created {width}x{height} framebuffer with handle {handle} (color at 0x{color_offset:08x})");
        handle
    }

    pub fn push_texture(&mut self, texture: Texture) -> u32 {
        let handle = self.textures.len() as u32;
        self.textures.push(texture);
        handle + 1
    }

    pub fn vbo(&self, handle: u32) -> &VertexBuffer {
        self.vbos
            .get(handle as usize)
            .unwrap_or_else(|| panic!("{}", PipelineError::InvalidHandle { kind: "VBO", handle }))
    }

    pub fn ebo(&self, handle: u32) -> &IndexBuffer {
        self.ebos
            .get(handle as usize)
            .unwrap_or_else(|| panic!("{}", PipelineError::InvalidHandle { kind: "EBO", handle }))
    }

    pub fn vao(&self, handle: u32) -> &VertexArray {
        self.vaos
            .get(handle as usize)
            .unwrap_or_else(|| panic!("{}", PipelineError::InvalidHandle { kind: "VAO", handle }))
    }

    pub fn framebuffer(&self, handle: u32) -> &Framebuffer {
        self.framebuffers
            .get(handle as usize)
            .unwrap_or_else(|| panic!("{}", PipelineError::InvalidHandle { kind: "framebuffer", handle }))
    }

    /// Textures are 1-indexed; handle 0 is reserved for "no texture" and
    /// must never reach this lookup.
    pub fn texture(&self, handle: u32) -> &Texture {
        self.textures
            .get(handle as usize - 1)
            .unwrap_or_else(|| panic!("{}", PipelineError::InvalidHandle { kind: "texture", handle }))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textures_are_one_indexed() {
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let handle = catalog.push_texture(Texture {
            offset: vram.allocate(4),
            side: 1,
            mipmap_levels: 0,
        });
        assert_eq!(handle, 1);
        assert_eq!(catalog.texture(1).side, 1);
    }

    #[test]
    fn vbos_and_ebos_are_zero_indexed() {
        let mut vram = Vram::new();
        let mut catalog = Catalog::new();
        let vbo = catalog.load_vbo(&mut vram, &[1, 2, 3, 4]);
        assert_eq!(vbo, 0);
        assert_eq!(catalog.vbo(0).size, 4);
    }
}
