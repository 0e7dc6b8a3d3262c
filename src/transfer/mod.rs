//! External transfer contracts: byte-range fetching from the source and
//! file access on the local replica.

pub mod accessor;
pub mod requester;

pub use accessor::{FileAccessor, LocalFileAccessor, ReadSeeker};
pub use requester::{BlockRequester, ReadSeekerRequester};
