use serde::Serialize;
use thiserror::Error;

/// Errors returned while parsing a Mach-O file.
///
/// Any of these errors is fatal for the image being parsed. When the image
/// is a member of a fat binary the error is stored in that member's slot
/// and the rest of the members are still parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// A read of `length` bytes at `offset` falls outside a buffer of
    /// `size` bytes.
    #[error("out of range read: {length} bytes at offset {offset:#x} (buffer size {size:#x})")]
    OutOfRange {
        /// Offset of the read, relative to the buffer being read.
        offset: u64,
        /// Number of bytes requested.
        length: u64,
        /// Size of the buffer.
        size: u64,
    },

    /// The magic number is not one of the known Mach-O or fat magics.
    #[error("unsupported format: unknown magic {magic:#010x}")]
    UnsupportedFormat {
        /// The magic number, as read in big-endian byte order.
        magic: u32,
    },

    /// A load command extends beyond the end of the file.
    #[error("truncated load command at offset {offset:#x}")]
    TruncatedCommand {
        /// Absolute file offset of the command.
        offset: u64,
    },

    /// A load command is smaller than the minimum size of its structure.
    #[error("invalid size {size} for load command {cmd:#x} (minimum {min})")]
    InvalidCommandSize {
        /// Type of the load command.
        cmd: u32,
        /// Declared size.
        size: u32,
        /// Minimum size for the command type.
        min: u32,
    },

    /// A load command declares more trailing records than its size can
    /// hold.
    #[error("incorrect size {size} for load command {cmd:#x} (expected at least {expected})")]
    IncorrectCommandSize {
        /// Type of the load command.
        cmd: u32,
        /// Declared size.
        size: u32,
        /// Size needed for holding the declared records.
        expected: u64,
    },

    /// An opcode references a segment that doesn't exist.
    #[error("segment index {index} out of range ({count} segments)")]
    SegmentIndexOutOfRange {
        /// The segment index found in the opcode.
        index: u8,
        /// Number of segments in the image.
        count: usize,
    },

    /// Unknown opcode found in a bind, weak bind or lazy bind stream.
    #[error("unknown bind opcode {opcode:#04x} at offset {offset:#x}")]
    UnknownBindOpcode {
        /// The opcode (upper 4 bits).
        opcode: u8,
        /// Absolute file offset of the opcode.
        offset: u64,
    },

    /// Unknown opcode found in a rebase stream.
    #[error("unknown rebase opcode {opcode:#04x} at offset {offset:#x}")]
    UnknownRebaseOpcode {
        /// The opcode (upper 4 bits).
        opcode: u8,
        /// Absolute file offset of the opcode.
        offset: u64,
    },

    /// A ULEB128 or SLEB128 value doesn't fit in 64 bits.
    #[error("malformed LEB128 value at offset {offset:#x}")]
    MalformedVarint {
        /// Absolute file offset where the value starts.
        offset: u64,
    },

    /// A fat binary is nested inside other fat binaries deeper than allowed.
    #[error("fat binaries nested too deep (depth {depth})")]
    NestingTooDeep {
        /// Nesting depth at which the fat binary was found.
        depth: usize,
    },

    /// The export trie is deeper than allowed.
    #[error("export trie too deep (depth {depth})")]
    ExportTrieTooDeep {
        /// Depth of the node that exceeded the limit.
        depth: usize,
    },

    /// A dynamic linker region produces more records than allowed.
    #[error("too many records in dynamic linker region (limit {limit})")]
    TooManyRecords {
        /// The maximum number of records per region.
        limit: usize,
    },
}
