use bstr::ByteSlice;
use nom::Parser;

use crate::Error;

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// Read-only view over the bytes of a file, or some range of it.
///
/// Every access to the file content goes through this type, which makes sure
/// that the requested range lies within the buffer. Offsets are relative to
/// the start of the buffer, while [`Buffer::base_offset`] tells where the
/// buffer starts within the whole file, which is used for reporting absolute
/// file offsets.
#[derive(Clone, Copy, Debug)]
pub struct Buffer<'a> {
    data: &'a [u8],
    base_offset: u64,
}

impl<'a> Buffer<'a> {
    /// Creates a buffer that starts at offset 0 of the file.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base_offset(data, 0)
    }

    /// Creates a buffer whose first byte is located at `base_offset` within
    /// the file.
    pub fn with_base_offset(data: &'a [u8], base_offset: u64) -> Self {
        Self { data, base_offset }
    }

    /// Size of the buffer in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the first byte of the buffer within the file.
    #[inline]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Converts an offset relative to this buffer into a file offset.
    #[inline]
    pub fn absolute(&self, offset: u64) -> u64 {
        self.base_offset.saturating_add(offset)
    }

    /// Returns the `length` bytes starting at `offset`.
    ///
    /// Fails with [`Error::OutOfRange`] if any of those bytes are outside
    /// the buffer.
    pub fn read(&self, offset: u64, length: u64) -> Result<&'a [u8], Error> {
        let out_of_range =
            || Error::OutOfRange { offset, length, size: self.len() };

        let end = offset
            .checked_add(length)
            .filter(|end| *end <= self.len())
            .ok_or_else(out_of_range)?;

        // At this point both `offset` and `end` are lower or equal than the
        // buffer's length, so they fit in an `usize`.
        self.data.get(offset as usize..end as usize).ok_or_else(out_of_range)
    }

    /// Same as [`Buffer::read`], but the offset is computed as `base + delta`.
    pub fn offset_read(
        &self,
        base: u64,
        delta: u64,
        length: u64,
    ) -> Result<&'a [u8], Error> {
        let offset = base.checked_add(delta).ok_or(Error::OutOfRange {
            offset: base,
            length: delta.saturating_add(length),
            size: self.len(),
        })?;
        self.read(offset, length)
    }

    /// Returns a new buffer covering `length` bytes starting at `offset`.
    ///
    /// The new buffer borrows the same underlying bytes, its base offset is
    /// the absolute file offset of `offset`.
    pub fn sub_buffer(
        &self,
        offset: u64,
        length: u64,
    ) -> Result<Buffer<'a>, Error> {
        let data = self.read(offset, length)?;
        Ok(Buffer::with_base_offset(data, self.absolute(offset)))
    }

    /// Reads the byte at `offset`.
    pub fn read_u8(&self, offset: u64) -> Result<u8, Error> {
        self.read(offset, 1).map(|bytes| bytes[0])
    }

    /// Reads a NUL-terminated string starting at `offset`. The returned
    /// slice doesn't include the NUL character, which must be present
    /// within the buffer.
    pub fn read_cstr(&self, offset: u64) -> Result<&'a [u8], Error> {
        let tail = self.read(offset, self.len().saturating_sub(offset))?;
        let nul = tail.find_byte(0).ok_or(Error::OutOfRange {
            offset,
            length: tail.len() as u64 + 1,
            size: self.len(),
        })?;
        Ok(&tail[..nul])
    }

    /// Runs a `nom` parser over the `length` bytes starting at `offset`.
    ///
    /// The range is checked before running the parser, and the parser can
    /// only see the bytes in that range. If the parser fails because it
    /// needs more bytes the result is [`Error::OutOfRange`].
    pub(crate) fn decode<O, P>(
        &self,
        offset: u64,
        length: u64,
        mut parser: P,
    ) -> Result<O, Error>
    where
        P: Parser<&'a [u8], O, NomError<'a>>,
    {
        let data = self.read(offset, length)?;
        parser
            .parse(data)
            .map(|(_, output)| output)
            .map_err(|_| Error::OutOfRange {
                offset,
                length,
                size: self.len(),
            })
    }
}
