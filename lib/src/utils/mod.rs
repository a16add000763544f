use bstr::ByteSlice;
use itertools::Itertools;
use serde::Serializer;

pub mod leb128;

/// Returns the bytes that precede the first NUL in `bytes`, or all of them
/// if there's no NUL.
pub(crate) fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.find_byte(0) {
        Some(nul) => &bytes[..nul],
        None => bytes,
    }
}

/// Serializes a byte string as an UTF-8 string, replacing invalid UTF-8
/// sequences with U+FFFD.
pub(crate) fn bytes_as_str<B, S>(
    bytes: &B,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    B: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&bytes.as_ref().to_str_lossy())
}

/// Same as [`bytes_as_str`] but for optional byte strings.
pub(crate) fn opt_bytes_as_str<B, S>(
    bytes: &Option<B>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    B: AsRef<[u8]>,
    S: Serializer,
{
    match bytes {
        Some(bytes) => {
            serializer.serialize_some(&bytes.as_ref().to_str_lossy())
        }
        None => serializer.serialize_none(),
    }
}

/// Serializes a NUL-padded string up to its first NUL.
pub(crate) fn cstr_as_str<B, S>(
    bytes: &B,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    B: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&until_nul(bytes.as_ref()).to_str_lossy())
}

/// Serializes bytes as a string of hex digits.
pub(crate) fn bytes_as_hex<B, S>(
    bytes: &B,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    B: AsRef<[u8]>,
    S: Serializer,
{
    let hex = bytes.as_ref().iter().map(|b| format!("{b:02x}")).join("");
    serializer.serialize_str(&hex)
}

/// Same as [`bytes_as_hex`] but for optional bytes.
pub(crate) fn opt_bytes_as_hex<B, S>(
    bytes: &Option<B>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    B: AsRef<[u8]>,
    S: Serializer,
{
    match bytes {
        Some(bytes) => bytes_as_hex(bytes, serializer),
        None => serializer.serialize_none(),
    }
}
