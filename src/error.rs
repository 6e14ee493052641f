use thiserror::Error;

/// Diagnostics for programmer-contract violations. The pipeline never
/// recovers from these: every call site that constructs one immediately
/// panics with it formatted into the message.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("VRAM arena exhausted: {requested} bytes requested, {remaining} remaining")]
    ArenaExhausted { requested: u64, remaining: u64 },

    #[error("invalid {kind} handle {handle}")]
    InvalidHandle { kind: &'static str, handle: u32 },

    #[error("unsupported pixel format byte depth: {bits} bits per channel (only 8 is supported)")]
    UnsupportedChannelDepth { bits: u32 },

    #[error("unsupported channel count {channels} (expected 3 or 4)")]
    UnsupportedChannelCount { channels: u32 },

    #[error("uniform block overrun: {size} bytes written, capacity is {capacity}")]
    UniformOverrun { size: usize, capacity: usize },

    #[error("varying count {count} exceeds the maximum of {max}")]
    VaryingOverrun { count: usize, max: usize },

    #[error("impossible rasterizer transition: state {state:?}, condition {condition:?}")]
    ImpossibleTransition { state: &'static str, condition: &'static str },

    #[error("TMU index {tmu} out of range (there are {count} TMUs)")]
    InvalidTmu { tmu: usize, count: usize },
}
