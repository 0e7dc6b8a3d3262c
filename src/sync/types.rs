//! Wire types exchanged between the signing and patching sides.
//!
//! Everything here is immutable once built and lives for a single sync
//! cycle. Serialization uses bincode with fixed-width integers, so the two
//! sides only need to agree on field order.

use serde::{Deserialize, Serialize};

/// Checksums for a single destination block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChecksum {
    /// Block position in the destination file, dense from 0.
    pub block_index: u32,
    /// Bytes covered; only the last block may be shorter than the
    /// configured block size.
    pub block_size: u64,
    /// Rolling checksum of the block.
    pub weak_hash: u32,
    /// Strong digest of the block; length fixed by the configured hasher.
    pub strong_hash: Vec<u8>,
}

/// Complete signature of the destination file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChecksums {
    /// Per-block checksums in read order.
    pub checksums: Vec<ChunkChecksum>,
    /// Block size used to produce the signature; matching must reuse it.
    pub config_block_size: u64,
    /// Digest of the whole destination file.
    pub file_hash: Vec<u8>,
    /// Destination modification time in UTC nanoseconds, stamped by the
    /// orchestrator; zero for bare `sign` output.
    pub mod_time: i64,
}

impl ChunkChecksums {
    pub fn is_empty(&self) -> bool {
        self.checksums.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.checksums.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize signature")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

/// One confirmed occurrence of a destination block inside the source:
/// source bytes `[comparison_offset, comparison_offset + block_size)` equal
/// destination block `block_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMatchResult {
    pub block_index: u32,
    pub block_size: u64,
    pub comparison_offset: u64,
}

/// A run of destination blocks appearing verbatim in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundBlockSpan {
    pub start_index: u32,
    pub end_index: u32,
    /// Source offset the run was found at.
    pub match_offset: u64,
    /// Configured block size the indices refer to.
    pub block_size: u64,
}

impl FoundBlockSpan {
    /// Number of blocks in the run.
    pub fn block_count(&self) -> u64 {
        u64::from(self.end_index - self.start_index) + 1
    }
}

/// An inclusive byte range of the source absent from every found span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingBlockSpan {
    pub start_offset: u64,
    pub end_offset: u64,
}

impl MissingBlockSpan {
    /// Number of bytes covered, endpoints inclusive.
    pub fn len(&self) -> u64 {
        self.end_offset - self.start_offset + 1
    }
}

/// The patch plan: found and missing spans which, walked in offset order,
/// tile the source exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatcherBlockSpan {
    pub found: Vec<FoundBlockSpan>,
    pub missing: Vec<MissingBlockSpan>,
    /// Source modification time in UTC nanoseconds, stamped by the
    /// orchestrator; zero for bare `delta` output.
    pub mod_time: i64,
}

impl PatcherBlockSpan {
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize patch plan")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_serialization_round_trip() {
        let signature = ChunkChecksums {
            checksums: vec![
                ChunkChecksum {
                    block_index: 0,
                    block_size: 4,
                    weak_hash: 0x0102_0304,
                    strong_hash: vec![0xaa; 16],
                },
                ChunkChecksum {
                    block_index: 1,
                    block_size: 2,
                    weak_hash: 7,
                    strong_hash: vec![0xbb; 16],
                },
            ],
            config_block_size: 4,
            file_hash: vec![0xcc; 16],
            mod_time: 1_700_000_000_000_000_000,
        };

        let restored = ChunkChecksums::from_bytes(&signature.to_bytes()).unwrap();
        assert_eq!(restored, signature);
    }

    #[test]
    fn test_plan_serialization_round_trip() {
        let plan = PatcherBlockSpan {
            found: vec![FoundBlockSpan {
                start_index: 0,
                end_index: 2,
                match_offset: 3,
                block_size: 4,
            }],
            missing: vec![
                MissingBlockSpan {
                    start_offset: 0,
                    end_offset: 2,
                },
                MissingBlockSpan {
                    start_offset: 15,
                    end_offset: 25,
                },
            ],
            mod_time: 0,
        };

        let restored = PatcherBlockSpan::from_bytes(&plan.to_bytes()).unwrap();
        assert_eq!(restored, plan);
    }

    #[test]
    fn test_span_geometry() {
        let found = FoundBlockSpan {
            start_index: 2,
            end_index: 4,
            match_offset: 8,
            block_size: 4,
        };
        assert_eq!(found.block_count(), 3);

        let missing = MissingBlockSpan {
            start_offset: 10,
            end_offset: 10,
        };
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        assert!(ChunkChecksums::from_bytes(&[0xff]).is_err());
    }
}
