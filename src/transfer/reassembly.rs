//! Host-side image reassembly
//!
//! The receiving end of [`ChunkEmitter`](super::ChunkEmitter): notification
//! payloads are appended in arrival order until `N` bytes have been received,
//! at which point the image is complete and the assembler starts over for the
//! next capture. Bytes beyond `N` in the final notification are dropped.

/// State of the image being assembled
#[derive(Debug, PartialEq, Eq)]
pub enum Assembly<'a, const N: usize> {
    /// More bytes are expected
    Partial {
        /// Bytes received so far
        received: usize,
    },
    /// The image is complete; the assembler has been reset
    Complete(&'a [u8; N]),
}

/// Collects chunks of one `N`-byte image
#[derive(Debug, Clone)]
pub struct ImageAssembler<const N: usize> {
    data: [u8; N],
    received: usize,
}

impl<const N: usize> Default for ImageAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ImageAssembler<N> {
    /// Empty assembler
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            received: 0,
        }
    }

    /// Append one notification payload
    pub fn push(&mut self, chunk: &[u8]) -> Assembly<'_, N> {
        let take = chunk.len().min(N - self.received);
        self.data[self.received..self.received + take].copy_from_slice(&chunk[..take]);
        self.received += take;

        if self.received < N {
            return Assembly::Partial {
                received: self.received,
            };
        }

        self.received = 0;
        Assembly::Complete(&self.data)
    }

    /// Bytes received for the current image
    #[must_use]
    pub const fn received(&self) -> usize {
        self.received
    }

    /// Discard a partially received image
    pub fn reset(&mut self) {
        self.received = 0;
    }
}

/// Undo the camera pixel remap: int8 tensor byte back to a `0..=255` intensity
#[must_use]
pub const fn restore_pixel(byte: u8) -> u8 {
    byte.wrapping_add(128)
}
