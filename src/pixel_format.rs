use crate::error::PipelineError;

/// Color buffer pixel formats a framebuffer may be created with. Depth is
/// always 32-bit float and is not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Rgb16F,
    Rgba16F,
    Rgb32F,
    Rgba32F,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb16F => 6,
            PixelFormat::Rgba16F => 8,
            PixelFormat::Rgb32F => 12,
            PixelFormat::Rgba32F => 16,
        }
    }

    pub fn channel_count(self) -> u32 {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Rgb16F | PixelFormat::Rgb32F => 3,
            PixelFormat::Rgba8 | PixelFormat::Rgba16F | PixelFormat::Rgba32F => 4,
        }
    }
}

/// Only RGBA8 writeback is implemented by the fragment stage (§4.7 of the
/// design — the writeback step packs 8:8:8:8). Other formats are accepted
/// at framebuffer creation so their byte-size accounting matches the
/// invariant, but rendering into them is a contract violation.
pub fn require_rgba8(format: PixelFormat) -> Result<(), PipelineError> {
    match format {
        PixelFormat::Rgba8 => Ok(()),
        _ => Err(PipelineError::UnsupportedChannelCount {
            channels: format.channel_count(),
        }),
    }
}
