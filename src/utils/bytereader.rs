use std::io::{ErrorKind, Read, Seek, SeekFrom};
use crate::utils::error::{PngError, PngResult};

/// Big-endian byte reader over a seekable stream.
///
/// The stream length is measured once at construction so that every read can be
/// checked against the bytes actually left before anything is allocated.
#[derive(Debug)]
pub struct ByteReader<R: Read + Seek> {
    reader: R,
    position: u64,
    length: u64,
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new(mut reader: R) -> PngResult<Self> {
        let position = reader.stream_position()?;
        let length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(position))?;

        Ok(ByteReader {
            reader,
            position,
            length,
        })
    }

    /// Returns number of bytes left in the stream.
    pub fn bytes_left(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    /// Current offset from the start of the stream.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn ensure(&self, n: u64) -> PngResult<()> {
        let available = self.bytes_left();

        if n > available {
            return Err(PngError::TruncatedInput { needed: n, available });
        }

        Ok(())
    }

    /// Fills `buf` completely.
    ///
    /// # Errors
    /// - `PngError::TruncatedInput` if fewer than `buf.len()` bytes remain
    /// - `PngError::IoError` if the underlying reader fails
    pub fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
        self.ensure(buf.len() as u64)?;

        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            // The stream shrank underneath us.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(PngError::TruncatedInput {
                needed: buf.len() as u64,
                available: 0,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_array<const N: usize>(&mut self) -> PngResult<[u8; N]> {
        let mut bytes = [0u8; N];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> PngResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> PngResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads `n` bytes into a new vector. The length is checked before the
    /// vector is allocated.
    pub fn read_bytes(&mut self, n: usize) -> PngResult<Vec<u8>> {
        self.ensure(n as u64)?;

        let mut bytes = vec![0; n];
        self.read_exact(&mut bytes)?;

        Ok(bytes)
    }
}
