//! Decoders for the regions referenced by `LC_DYLD_INFO` and
//! `LC_DYLD_INFO_ONLY`.
//!
//! The rebase and bind regions are streams of opcodes that drive a small
//! state machine, every time the machine executes one of the `DO_*` opcodes
//! it produces a record with the current state. The export region is a
//! prefix tree where each terminal node is an exported symbol.

use std::collections::HashSet;

use bstr::BString;
#[cfg(feature = "logging")]
use log::error;

use crate::macho::*;
use crate::utils::leb128::{read_sleb128, read_uleb128};
use crate::{Buffer, Error, ParserConfig};

/// Mach-O rebase opcode constants
const REBASE_OPCODE_MASK: u8 = 0xF0;
const REBASE_IMMEDIATE_MASK: u8 = 0x0F;
const REBASE_OPCODE_DONE: u8 = 0x00;
const REBASE_OPCODE_SET_TYPE_IMM: u8 = 0x10;
const REBASE_OPCODE_SET_SEGMENT_AND_OFFSET_ULEB: u8 = 0x20;
const REBASE_OPCODE_ADD_ADDR_ULEB: u8 = 0x30;
const REBASE_OPCODE_ADD_ADDR_IMM_SCALED: u8 = 0x40;
const REBASE_OPCODE_DO_REBASE_IMM_TIMES: u8 = 0x50;
const REBASE_OPCODE_DO_REBASE_ULEB_TIMES: u8 = 0x60;
const REBASE_OPCODE_DO_REBASE_ADD_ADDR_ULEB: u8 = 0x70;
const REBASE_OPCODE_DO_REBASE_ULEB_TIMES_SKIPPING_ULEB: u8 = 0x80;

/// Mach-O import opcode constants
const BIND_OPCODE_MASK: u8 = 0xF0;
const BIND_IMMEDIATE_MASK: u8 = 0x0F;
const BIND_OPCODE_DONE: u8 = 0x00;
const BIND_OPCODE_SET_DYLIB_ORDINAL_IMM: u8 = 0x10;
const BIND_OPCODE_SET_DYLIB_ORDINAL_ULEB: u8 = 0x20;
const BIND_OPCODE_SET_DYLIB_SPECIAL_IMM: u8 = 0x30;
const BIND_OPCODE_SET_SYMBOL_TRAILING_FLAGS_IMM: u8 = 0x40;
const BIND_OPCODE_SET_TYPE_IMM: u8 = 0x50;
const BIND_OPCODE_SET_ADDEND_SLEB: u8 = 0x60;
const BIND_OPCODE_SET_SEGMENT_AND_OFFSET_ULEB: u8 = 0x70;
const BIND_OPCODE_ADD_ADDR_ULEB: u8 = 0x80;
const BIND_OPCODE_DO_BIND: u8 = 0x90;
const BIND_OPCODE_DO_BIND_ADD_ADDR_ULEB: u8 = 0xA0;
const BIND_OPCODE_DO_BIND_ADD_ADDR_IMM_SCALED: u8 = 0xB0;
const BIND_OPCODE_DO_BIND_ULEB_TIMES_SKIPPING_ULEB: u8 = 0xC0;

/// Mach-O export flag constants
pub(crate) const EXPORT_SYMBOL_FLAGS_WEAK_DEFINITION: u64 = 0x00000004;
pub(crate) const EXPORT_SYMBOL_FLAGS_REEXPORT: u64 = 0x00000008;
pub(crate) const EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER: u64 = 0x00000010;

/// State of the bind and rebase interpreters.
#[derive(Default)]
struct State<'a> {
    library_ordinal: i64,
    bind_type: u8,
    symbol: Option<&'a [u8]>,
    symbol_flags: u8,
    addend: i64,
    address: u64,
}

/// Accumulates the records produced by an interpreter, making sure that
/// there are no more than `limit` of them.
struct Records<'a> {
    kind: BindKind,
    pointer_size: u8,
    limit: usize,
    records: Vec<BindRecord<'a>>,
}

impl<'a> Records<'a> {
    fn new(kind: BindKind, pointer_size: u8, limit: usize) -> Self {
        Self { kind, pointer_size, limit, records: Vec::new() }
    }

    /// Fails if adding `n` records would exceed the limit.
    fn reserve(&self, n: u64) -> Result<(), Error> {
        let total = (self.records.len() as u64).saturating_add(n);
        if total > self.limit as u64 {
            return Err(Error::TooManyRecords { limit: self.limit });
        }
        Ok(())
    }

    /// Adds a record with the current state of the interpreter. `offset`
    /// is the file offset of the opcode producing the record.
    fn push(&mut self, state: &State<'a>, offset: u64) -> Result<(), Error> {
        self.reserve(1)?;
        self.records.push(BindRecord {
            kind: self.kind,
            address: state.address,
            bind_type: state.bind_type,
            symbol: state.symbol,
            symbol_flags: state.symbol_flags,
            addend: state.addend,
            library_ordinal: state.library_ordinal,
            offset,
            pointer_size: self.pointer_size,
        });
        Ok(())
    }
}

/// A node in the export trie waiting to be visited. The node's name is
/// the first `prefix_len` bytes of the name shared by all pending nodes,
/// followed by `label`.
struct ExportNode<'a> {
    offset: u64,
    prefix_len: usize,
    label: &'a [u8],
    depth: usize,
}

impl<'a> MachOFile<'a> {
    /// Decodes all the regions described by the `LC_DYLD_INFO` command, if
    /// the file has one.
    ///
    /// Regions with a zero offset or size are ignored. All regions are
    /// decoded even if some of them fail, but in that case the error for
    /// the first failing region is returned.
    pub(super) fn parse_dyld_info(
        &mut self,
        buffer: &Buffer<'a>,
        config: &ParserConfig,
    ) -> Result<(), Error> {
        let info = match self.dyld_info {
            Some(info) => info,
            None => return Ok(()),
        };

        let mut first_error = None;

        let rebases = decode_region(
            buffer,
            info.rebase_off,
            info.rebase_size,
            &mut first_error,
            |region| self.rebase_opcodes(region, config),
        );

        let binds = decode_region(
            buffer,
            info.bind_off,
            info.bind_size,
            &mut first_error,
            |region| self.bind_opcodes(region, BindKind::Bind, config),
        );

        let weak_binds = decode_region(
            buffer,
            info.weak_bind_off,
            info.weak_bind_size,
            &mut first_error,
            |region| self.bind_opcodes(region, BindKind::WeakBind, config),
        );

        let lazy_binds = decode_region(
            buffer,
            info.lazy_bind_off,
            info.lazy_bind_size,
            &mut first_error,
            |region| self.bind_opcodes(region, BindKind::LazyBind, config),
        );

        let exports = decode_region(
            buffer,
            info.export_off,
            info.export_size,
            &mut first_error,
            |region| self.export_trie(region, config),
        );

        if let Some(err) = first_error {
            return Err(err);
        }

        self.rebases = rebases;
        self.binds = binds;
        self.weak_binds = weak_binds;
        self.lazy_binds = lazy_binds;
        self.exports = exports;

        Ok(())
    }

    /// Returns the segment with the given index, as used by the
    /// `SET_SEGMENT_AND_OFFSET_ULEB` opcodes.
    fn segment_by_index(&self, index: u8) -> Result<&Segment<'a>, Error> {
        self.segments.get(usize::from(index)).ok_or(
            Error::SegmentIndexOutOfRange {
                index,
                count: self.segments.len(),
            },
        )
    }

    /// Runs the bind opcodes in `region`, which can be the bind, weak bind
    /// or lazy bind region.
    ///
    /// In the lazy bind region `DONE` separates the opcodes for each
    /// symbol, so the whole region is processed. In the other regions
    /// `DONE` marks the end of the opcodes.
    pub(super) fn bind_opcodes(
        &self,
        region: &Buffer<'a>,
        kind: BindKind,
        config: &ParserConfig,
    ) -> Result<Vec<BindRecord<'a>>, Error> {
        let pointer_size = self.pointer_size();
        let ptr = u64::from(pointer_size);

        let mut state = State::default();
        let mut records =
            Records::new(kind, pointer_size, config.max_region_records);

        let mut pos = 0;

        while pos < region.len() {
            let opcode_offset = region.absolute(pos);
            let byte = region.read_u8(pos)?;
            pos += 1;

            let opcode = byte & BIND_OPCODE_MASK;
            let immediate = byte & BIND_IMMEDIATE_MASK;

            match opcode {
                BIND_OPCODE_DONE => {
                    if kind != BindKind::LazyBind {
                        break;
                    }
                }
                BIND_OPCODE_SET_DYLIB_ORDINAL_IMM => {
                    state.library_ordinal = immediate.into();
                }
                BIND_OPCODE_SET_DYLIB_ORDINAL_ULEB => {
                    let (ordinal, next) = read_uleb128(region, pos)?;
                    state.library_ordinal = ordinal as i64;
                    pos = next;
                }
                BIND_OPCODE_SET_DYLIB_SPECIAL_IMM => {
                    // The immediate is a negative number in 4 bits, the
                    // opcode bits are used for extending the sign.
                    state.library_ordinal = if immediate == 0 {
                        0
                    } else {
                        (BIND_OPCODE_MASK | immediate) as i8 as i64
                    };
                }
                BIND_OPCODE_SET_SYMBOL_TRAILING_FLAGS_IMM => {
                    let symbol = region.read_cstr(pos)?;
                    pos += symbol.len() as u64 + 1;
                    state.symbol = Some(symbol);
                    state.symbol_flags = immediate;
                }
                BIND_OPCODE_SET_TYPE_IMM => {
                    state.bind_type = immediate;
                }
                BIND_OPCODE_SET_ADDEND_SLEB => {
                    let (addend, next) = read_sleb128(region, pos)?;
                    state.addend = addend;
                    pos = next;
                }
                BIND_OPCODE_SET_SEGMENT_AND_OFFSET_ULEB => {
                    let segment = self.segment_by_index(immediate)?;
                    let (offset, next) = read_uleb128(region, pos)?;
                    state.address = segment.vmaddr.wrapping_add(offset);
                    pos = next;
                }
                BIND_OPCODE_ADD_ADDR_ULEB => {
                    let (delta, next) = read_uleb128(region, pos)?;
                    state.address = state.address.wrapping_add(delta);
                    pos = next;
                }
                BIND_OPCODE_DO_BIND => {
                    records.push(&state, opcode_offset)?;
                    state.address = state.address.wrapping_add(ptr);
                }
                BIND_OPCODE_DO_BIND_ADD_ADDR_ULEB => {
                    let (delta, next) = read_uleb128(region, pos)?;
                    pos = next;
                    records.push(&state, opcode_offset)?;
                    state.address =
                        state.address.wrapping_add(ptr).wrapping_add(delta);
                }
                BIND_OPCODE_DO_BIND_ADD_ADDR_IMM_SCALED => {
                    records.push(&state, opcode_offset)?;
                    state.address = state
                        .address
                        .wrapping_add(ptr)
                        .wrapping_add(u64::from(immediate) * ptr);
                }
                BIND_OPCODE_DO_BIND_ULEB_TIMES_SKIPPING_ULEB => {
                    let (count, next) = read_uleb128(region, pos)?;
                    let (skip, next) = read_uleb128(region, next)?;
                    pos = next;
                    // Check the count in advance, it comes from the file
                    // and can be arbitrarily large.
                    records.reserve(count)?;
                    for _ in 0..count {
                        records.push(&state, opcode_offset)?;
                        state.address = state
                            .address
                            .wrapping_add(ptr)
                            .wrapping_add(skip);
                    }
                }
                _ => {
                    return Err(Error::UnknownBindOpcode {
                        opcode,
                        offset: opcode_offset,
                    })
                }
            }
        }

        Ok(records.records)
    }

    /// Runs the rebase opcodes in `region`.
    pub(super) fn rebase_opcodes(
        &self,
        region: &Buffer<'a>,
        config: &ParserConfig,
    ) -> Result<Vec<BindRecord<'a>>, Error> {
        let pointer_size = self.pointer_size();
        let ptr = u64::from(pointer_size);

        let mut state = State::default();
        let mut records = Records::new(
            BindKind::Rebase,
            pointer_size,
            config.max_region_records,
        );

        let mut pos = 0;

        while pos < region.len() {
            let opcode_offset = region.absolute(pos);
            let byte = region.read_u8(pos)?;
            pos += 1;

            let opcode = byte & REBASE_OPCODE_MASK;
            let immediate = byte & REBASE_IMMEDIATE_MASK;

            match opcode {
                REBASE_OPCODE_DONE => break,
                REBASE_OPCODE_SET_TYPE_IMM => {
                    state.bind_type = immediate;
                }
                REBASE_OPCODE_SET_SEGMENT_AND_OFFSET_ULEB => {
                    let segment = self.segment_by_index(immediate)?;
                    let (offset, next) = read_uleb128(region, pos)?;
                    state.address = segment.vmaddr.wrapping_add(offset);
                    pos = next;
                }
                REBASE_OPCODE_ADD_ADDR_ULEB => {
                    let (delta, next) = read_uleb128(region, pos)?;
                    state.address = state.address.wrapping_add(delta);
                    pos = next;
                }
                REBASE_OPCODE_ADD_ADDR_IMM_SCALED => {
                    state.address = state
                        .address
                        .wrapping_add(u64::from(immediate) * ptr);
                }
                REBASE_OPCODE_DO_REBASE_IMM_TIMES => {
                    records.reserve(immediate.into())?;
                    for _ in 0..immediate {
                        records.push(&state, opcode_offset)?;
                        state.address = state.address.wrapping_add(ptr);
                    }
                }
                REBASE_OPCODE_DO_REBASE_ULEB_TIMES => {
                    let (count, next) = read_uleb128(region, pos)?;
                    pos = next;
                    records.reserve(count)?;
                    for _ in 0..count {
                        records.push(&state, opcode_offset)?;
                        state.address = state.address.wrapping_add(ptr);
                    }
                }
                REBASE_OPCODE_DO_REBASE_ADD_ADDR_ULEB => {
                    let (delta, next) = read_uleb128(region, pos)?;
                    pos = next;
                    records.push(&state, opcode_offset)?;
                    state.address =
                        state.address.wrapping_add(ptr).wrapping_add(delta);
                }
                REBASE_OPCODE_DO_REBASE_ULEB_TIMES_SKIPPING_ULEB => {
                    let (count, next) = read_uleb128(region, pos)?;
                    let (skip, next) = read_uleb128(region, next)?;
                    pos = next;
                    records.reserve(count)?;
                    for _ in 0..count {
                        records.push(&state, opcode_offset)?;
                        state.address = state
                            .address
                            .wrapping_add(ptr)
                            .wrapping_add(skip);
                    }
                }
                _ => {
                    return Err(Error::UnknownRebaseOpcode {
                        opcode,
                        offset: opcode_offset,
                    })
                }
            }
        }

        Ok(records.records)
    }

    /// Walks the export trie in `region`.
    ///
    /// Each node starts with the size of its terminal information, which
    /// is zero for non-terminal nodes. The terminal information is
    /// followed by the number of children (one byte), and for each child a
    /// NUL-terminated label and the offset of the child node within the
    /// region.
    ///
    /// Symbols are returned in depth-first order, children are visited in
    /// the same order they appear in their parent.
    pub(super) fn export_trie(
        &self,
        region: &Buffer<'a>,
        config: &ParserConfig,
    ) -> Result<Vec<ExportRecord<'a>>, Error> {
        let image_base = self.image_base();

        let mut exports = Vec::new();
        let mut visited = HashSet::<u64>::new();
        let mut prefix = BString::default();
        let mut stack = vec![ExportNode {
            offset: 0,
            prefix_len: 0,
            label: &[],
            depth: 0,
        }];

        while let Some(node) = stack.pop() {
            if node.depth > config.max_export_depth {
                return Err(Error::ExportTrieTooDeep { depth: node.depth });
            }

            // If node was already visited, continue without processing it.
            if !visited.insert(node.offset) {
                continue;
            }

            // Nodes are visited depth-first, so the first `prefix_len`
            // bytes of `prefix` are still the name of this node's parent.
            prefix.truncate(node.prefix_len);
            prefix.extend_from_slice(node.label);

            let (terminal_size, terminal_start) =
                read_uleb128(region, node.offset)?;

            if terminal_size > 0 {
                if exports.len() >= config.max_region_records {
                    return Err(Error::TooManyRecords {
                        limit: config.max_region_records,
                    });
                }
                let terminal =
                    region.sub_buffer(terminal_start, terminal_size)?;
                exports.push(export_record(
                    &terminal,
                    prefix.clone(),
                    image_base,
                )?);
            }

            // The terminal information was validated above, so this can't
            // overflow.
            let mut pos = terminal_start + terminal_size;

            let child_count = region.read_u8(pos)?;
            pos += 1;

            let mut children = Vec::with_capacity(child_count.into());

            for _ in 0..child_count {
                let label = region.read_cstr(pos)?;
                let (offset, next) =
                    read_uleb128(region, pos + label.len() as u64 + 1)?;
                pos = next;

                if visited.contains(&offset) {
                    continue;
                }

                children.push(ExportNode {
                    offset,
                    prefix_len: prefix.len(),
                    label,
                    depth: node.depth + 1,
                });
            }

            // Children are pushed in reverse order so that the first one is
            // the next to be visited.
            stack.extend(children.into_iter().rev());
        }

        Ok(exports)
    }
}

/// Decodes the region at `offset` of size `size` with the given decoder,
/// but only if both the offset and size are non-zero.
///
/// If the region can't be decoded the error is stored in `first_error`,
/// unless it already contains some previous error, and the result is an
/// empty vector.
fn decode_region<'a, T>(
    buffer: &Buffer<'a>,
    offset: u32,
    size: u32,
    first_error: &mut Option<Error>,
    decoder: impl FnOnce(&Buffer<'a>) -> Result<Vec<T>, Error>,
) -> Vec<T> {
    if u64::from(offset) * u64::from(size) == 0 {
        return Vec::new();
    }

    match buffer
        .sub_buffer(offset.into(), size.into())
        .and_then(|region| decoder(&region))
    {
        Ok(records) => records,
        Err(err) => {
            #[cfg(feature = "logging")]
            error!(
                "Error parsing dyld info region at offset {:#x}: {}",
                buffer.absolute(offset.into()),
                err
            );
            first_error.get_or_insert(err);
            Vec::new()
        }
    }
}

/// Decodes the terminal information of a node in the export trie.
fn export_record<'a>(
    terminal: &Buffer<'a>,
    name: BString,
    image_base: u64,
) -> Result<ExportRecord<'a>, Error> {
    let (flags, pos) = read_uleb128(terminal, 0)?;

    if flags & EXPORT_SYMBOL_FLAGS_REEXPORT != 0 {
        let (ordinal, pos) = read_uleb128(terminal, pos)?;
        let import_name = terminal.read_cstr(pos)?;
        return Ok(ExportRecord {
            name,
            flags,
            offset: 0,
            address: image_base,
            kind: ExportKind::Reexport { ordinal, import_name },
        });
    }

    let (offset, pos) = read_uleb128(terminal, pos)?;

    let kind = if flags & EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER != 0 {
        let (resolver_offset, _) = read_uleb128(terminal, pos)?;
        ExportKind::StubAndResolver { resolver_offset }
    } else {
        ExportKind::Regular
    };

    Ok(ExportRecord {
        name,
        flags,
        offset,
        address: image_base.wrapping_add(offset),
        kind,
    })
}
