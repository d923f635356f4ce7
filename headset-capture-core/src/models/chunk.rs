use std::ops::Deref;
use std::sync::Arc;

/// One device read worth of raw PCM bytes.
///
/// Immutable once built. Clones share the same storage, so the worker can
/// enqueue a chunk and hand the same bytes to a delivery callback without
/// copying twice.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PcmChunk {
    bytes: Arc<[u8]>,
}

impl PcmChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Copy `bytes` into a new chunk.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
        }
    }

    /// The "no data yet" chunk.
    pub fn empty() -> Self {
        Self {
            bytes: Arc::from(&[][..]),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl Default for PcmChunk {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for PcmChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for PcmChunk {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for PcmChunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl std::fmt::Debug for PcmChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmChunk").field("len", &self.len()).finish()
    }
}

/// Concatenate chunks into one contiguous buffer, preserving order.
pub fn concat_chunks(chunks: &[PcmChunk]) -> Vec<u8> {
    let total = chunks.iter().map(PcmChunk::len).sum();
    let mut data = Vec::with_capacity(total);
    for chunk in chunks {
        data.extend_from_slice(chunk);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let chunk = PcmChunk::new(vec![1, 2, 3]);
        let clone = chunk.clone();
        assert_eq!(chunk.as_bytes().as_ptr(), clone.as_bytes().as_ptr());
    }

    #[test]
    fn empty_chunk() {
        let chunk = PcmChunk::empty();
        assert!(chunk.is_empty());
        assert_eq!(chunk, PcmChunk::default());
    }

    #[test]
    fn concat_preserves_order() {
        let chunks = [PcmChunk::new(vec![1, 2]), PcmChunk::empty(), PcmChunk::new(vec![3])];
        assert_eq!(concat_chunks(&chunks), vec![1, 2, 3]);
        assert!(concat_chunks(&[]).is_empty());
    }
}
