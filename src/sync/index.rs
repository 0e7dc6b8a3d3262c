//! Two-level lookup from weak hash to candidate blocks.

use std::collections::HashMap;

use crate::sync::types::{ChunkChecksum, ChunkChecksums};

const BUCKETS: usize = 256;

/// Index over a signature's checksums.
///
/// The first level is a 256-way sieve on the low byte of the weak hash, so
/// most probes miss without touching a hash map. Each occupied bucket maps
/// the full weak hash to its candidate blocks, sorted by strong hash and
/// then block index.
pub struct ChecksumIndex<'a> {
    block_count: usize,
    buckets: Vec<Option<HashMap<u32, Vec<&'a ChunkChecksum>>>>,
}

impl<'a> ChecksumIndex<'a> {
    pub fn new(signature: &'a ChunkChecksums) -> Self {
        let mut buckets: Vec<Option<HashMap<u32, Vec<&'a ChunkChecksum>>>> =
            (0..BUCKETS).map(|_| None).collect();

        for chunk in &signature.checksums {
            let bucket =
                buckets[(chunk.weak_hash & 0xff) as usize].get_or_insert_with(HashMap::new);
            bucket.entry(chunk.weak_hash).or_default().push(chunk);
        }

        for bucket in buckets.iter_mut().flatten() {
            for candidates in bucket.values_mut() {
                candidates.sort_by(|a, b| {
                    a.strong_hash
                        .cmp(&b.strong_hash)
                        .then(a.block_index.cmp(&b.block_index))
                });
            }
        }

        tracing::debug!(blocks = signature.checksums.len(), "built checksum index");

        Self {
            block_count: signature.checksums.len(),
            buckets,
        }
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Candidates sharing the full weak hash, or `None` on a miss.
    pub fn find_weak(&self, weak: u32) -> Option<&[&'a ChunkChecksum]> {
        self.buckets[(weak & 0xff) as usize]
            .as_ref()?
            .get(&weak)
            .map(Vec::as_slice)
    }

    /// The sub-slice of `candidates` whose strong hash equals `strong`.
    ///
    /// `candidates` must come from [`find_weak`](Self::find_weak). Several
    /// entries remain when the destination holds duplicate blocks; the sort
    /// order puts the smallest block index first.
    pub fn find_strong<'b>(
        &self,
        candidates: &'b [&'a ChunkChecksum],
        strong: &[u8],
    ) -> &'b [&'a ChunkChecksum] {
        let start = candidates.partition_point(|c| c.strong_hash.as_slice() < strong);
        let mut end = start;
        while end < candidates.len() && candidates[end].strong_hash == strong {
            end += 1;
        }
        &candidates[start..end]
    }
}
