/// Cache key of a chunk: its exact contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey(pub Vec<u32>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub key: ChunkKey,
}

impl Chunk {
    pub fn ids(&self) -> &[u32] {
        &self.key.0
    }
}

/// Splits `ids` into contiguous, order-preserving chunks of at most `size` elements.
/// A `size` of zero is treated as one.
pub fn chunk_ids(ids: &[u32], size: usize) -> Vec<Chunk> {
    ids.chunks(size.max(1))
        .enumerate()
        .map(|(index, slice)| Chunk {
            index,
            key: ChunkKey(slice.to_vec()),
        })
        .collect()
}
