//! Rsync-style differential file synchronization.
//!
//! `blocksync` keeps a local destination file in step with a remote
//! reference source while transferring only what is missing. The flow has
//! three phases:
//!
//! 1. **Sign** the destination: fixed-size blocks, each fingerprinted with
//!    a rolling weak checksum and a strong digest.
//! 2. **Delta** the source against the signature: a byte-by-byte scan with
//!    the rolling checksum finds every block already present locally;
//!    adjacent hits merge into runs, and the gaps between them become the
//!    missing byte ranges.
//! 3. **Patch**: replay the plan, copying found runs out of the local file
//!    and fetching only the missing ranges from the source.
//!
//! The core is synchronous and transparent to errors. The optional
//! [`SyncNode`] orchestrator adds background signing, freshness checks and
//! atomic replacement of the local file on top of it.
//!
//! ```
//! use std::io::Cursor;
//!
//! use blocksync::{BlockSync, Config, ReadSeekerRequester};
//!
//! let local = b"The qwik brown fox jumped 0v3r the lazy".to_vec();
//! let reference = b"The quick brown fox jumped over the lazy dog".to_vec();
//! let size = reference.len() as u64;
//!
//! let config = Config::new()
//!     .block_size(4)
//!     .max_request_block_size(16)
//!     .requester(Box::new(ReadSeekerRequester::new(Cursor::new(reference.clone()))))
//!     .size_fn(move || Ok(size));
//!
//! let mut engine = BlockSync::new(config)?;
//!
//! let signature = engine.sign(Cursor::new(local.clone()))?;
//! let plan = engine.delta(Cursor::new(reference.clone()), &signature)?;
//!
//! let mut output = Vec::new();
//! engine.patch(Cursor::new(local), &plan, &mut output)?;
//! assert_eq!(output, reference);
//! # Ok::<(), blocksync::SyncError>(())
//! ```

pub mod config;
pub mod error;
pub mod hash;
mod ioutil;
pub mod node;
pub mod sync;
pub mod transfer;

pub use config::{Config, ConfigError};
pub use error::{SyncError, SyncResult};
pub use hash::rolling::RollingChecksum;
pub use hash::strong::{
    blake3_factory, md5_factory, sha256_factory, StrongHasher, StrongHasherFactory,
};
pub use node::SyncNode;
pub use sync::engine::BlockSync;
pub use sync::types::{
    ChunkChecksum, ChunkChecksums, FoundBlockSpan, MissingBlockSpan, PatcherBlockSpan,
};
pub use transfer::accessor::{FileAccessor, LocalFileAccessor, ReadSeeker};
pub use transfer::requester::{BlockRequester, ReadSeekerRequester};
