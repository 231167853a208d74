//! Capture chunks and the append-only buffer that holds them

/// Opaque fragment emitted by the device while recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureChunk {
    data: Vec<u8>,
}

impl CaptureChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Ordered, append-only collection of chunks for one recording cycle
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<CaptureChunk>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks carry nothing and are skipped.
    pub fn push(&mut self, chunk: CaptureChunk) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    /// Drop everything without consuming it
    pub fn discard(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Concatenate the chunks in arrival order, leaving the buffer empty
    pub fn take_bytes(&mut self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks.drain(..) {
            bytes.extend_from_slice(chunk.data());
        }
        self.total_bytes = 0;
        bytes
    }
}
