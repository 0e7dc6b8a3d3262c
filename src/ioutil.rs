//! Small I/O helpers shared by the engine and the transfer implementations.

use std::io::{ErrorKind, Read};

/// Read until `buffer` is full or the reader reaches end of input.
///
/// Unlike [`Read::read_exact`], end of input is not an error here: the
/// number of bytes actually read is returned and the caller decides what a
/// short fill means.
pub(crate) fn read_full<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most one byte per call.
    struct Trickle<R>(R);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_fills_across_short_reads() {
        let mut reader = Trickle(Cursor::new(b"abcdef".to_vec()));
        let mut buffer = [0u8; 4];

        let n = read_full(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buffer, b"abcd");
    }

    #[test]
    fn test_short_fill_at_end_of_input() {
        let mut reader = Cursor::new(b"ab".to_vec());
        let mut buffer = [0u8; 4];

        let n = read_full(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buffer[..n], b"ab");
    }

    #[test]
    fn test_empty_input() {
        let mut reader = Cursor::new(Vec::new());
        let mut buffer = [0u8; 4];

        let n = read_full(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 0);
    }
}
