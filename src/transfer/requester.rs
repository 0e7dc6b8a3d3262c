//! Byte-range fetching from the reference source.

use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;

use crate::ioutil::read_full;

/// Synchronous byte-range requests against the reference source.
///
/// Implementations are free to fetch however they like (direct file read,
/// HTTP range request, RPC); the engine only relies on the range contract.
pub trait BlockRequester: Send {
    /// Fetch the inclusive byte range `[start_offset, end_offset]`.
    ///
    /// The returned length is `end_offset - start_offset + 1` except when
    /// the range runs past the end of the source.
    fn request(&mut self, start_offset: u64, end_offset: u64) -> io::Result<Bytes>;
}

/// In-process requester over anything readable and seekable.
pub struct ReadSeekerRequester<R> {
    reader: R,
}

impl<R: Read + Seek> ReadSeekerRequester<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Seek + Send> BlockRequester for ReadSeekerRequester<R> {
    fn request(&mut self, start_offset: u64, end_offset: u64) -> io::Result<Bytes> {
        let length = (end_offset - start_offset + 1) as usize;
        let mut buffer = vec![0u8; length];

        self.reader.seek(SeekFrom::Start(start_offset))?;
        let n = read_full(&mut self.reader, &mut buffer)?;
        buffer.truncate(n);

        Ok(Bytes::from(buffer))
    }
}
