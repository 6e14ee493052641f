use crate::error::PipelineError;

/// Process-wide byte array written wholesale by the caller and read by the
/// vertex and fragment callbacks.
pub const UNIFORM_SIZE: usize = 4 * 128;

pub struct UniformBlock {
    bytes: [u8; UNIFORM_SIZE],
}

impl UniformBlock {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; UNIFORM_SIZE],
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        if data.len() > UNIFORM_SIZE {
            panic!(
                "{}",
                PipelineError::UniformOverrun {
                    size: data.len(),
                    capacity: UNIFORM_SIZE,
                }
            );
        }
        self.bytes[..data.len()].copy_from_slice(data);
        self.bytes[data.len()..].fill(0);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reinterpret the first `N` bytes of the block as `T`. Callers agree
    /// on the layout out-of-band with whoever called `update`.
    pub fn as_ref<T: Copy>(&self) -> T {
        assert!(std::mem::size_of::<T>() <= UNIFORM_SIZE);
        unsafe { std::ptr::read_unaligned(self.bytes.as_ptr() as *const T) }
    }
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self::new()
    }
}
