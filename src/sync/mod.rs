//! Core delta synchronization: wire types, the signature index, match
//! merging and the sign/delta/patch engine.

pub mod engine;
pub mod index;
pub mod merge;
pub mod types;

pub use engine::BlockSync;
pub use index::ChecksumIndex;
pub use merge::{BlockSpan, MatchMerger};
pub use types::{
    BlockMatchResult, ChunkChecksum, ChunkChecksums, FoundBlockSpan, MissingBlockSpan,
    PatcherBlockSpan,
};
