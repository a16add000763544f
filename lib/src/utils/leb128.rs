use crate::{Buffer, Error};

/// Reads a [ULEB128][1] value starting at `offset` in `buffer`.
///
/// Returns the value and the offset of the first byte after it.
///
/// Notice however that this function returns a `u64`, so it's able to parse
/// numbers up to 2^64-1. When parsing larger numbers it fails with
/// [`Error::MalformedVarint`], even if they are valid ULEB128. If the value
/// is not terminated before the end of the buffer the result is
/// [`Error::OutOfRange`].
///
/// [1]: https://en.wikipedia.org/wiki/LEB128
pub fn read_uleb128(
    buffer: &Buffer,
    offset: u64,
) -> Result<(u64, u64), Error> {
    let mut val: u64 = 0;
    let mut shift: u32 = 0;
    let mut pos = offset;

    loop {
        // Read one byte of data.
        let byte = buffer.read_u8(pos)?;
        pos += 1;

        // Use all the bits, except the most significant one.
        let b = (byte & 0x7f) as u64;

        val |= b.checked_shl(shift).ok_or(Error::MalformedVarint {
            offset: buffer.absolute(offset),
        })?;

        // Break if the most significant bit is zero.
        if byte & 0x80 == 0 {
            break;
        }

        shift += 7;
    }

    Ok((val, pos))
}

/// Reads a [SLEB128][1] value starting at `offset` in `buffer`.
///
/// Returns the value and the offset of the first byte after it.
///
/// Notice however that this function returns an `i64`, so it's able to parse
/// numbers from -2^63 to 2^63-1. When parsing numbers out of that range it
/// fails, even if they are valid SLEB128.
///
/// [1]: https://en.wikipedia.org/wiki/LEB128
pub fn read_sleb128(
    buffer: &Buffer,
    offset: u64,
) -> Result<(i64, u64), Error> {
    let mut val: i64 = 0;
    let mut shift: u32 = 0;
    let mut pos = offset;
    let mut byte: u8;

    loop {
        byte = buffer.read_u8(pos)?;
        pos += 1;

        // Use all the bits, except the most significant one.
        let b = (byte & 0x7f) as i64;

        val |= b.checked_shl(shift).ok_or(Error::MalformedVarint {
            offset: buffer.absolute(offset),
        })?;

        shift += 7;

        // Break if the most significant bit is zero.
        if byte & 0x80 == 0 {
            break;
        }
    }

    // Sign-extend the value if the sign bit of the last group is set.
    if shift < i64::BITS && (byte & 0x40) != 0 {
        val |= !0 << shift;
    }

    Ok((val, pos))
}
