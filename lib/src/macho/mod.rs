//! Data model produced by the Mach-O parser.
//!
//! Every type in this module is created while parsing and is read-only
//! afterwards. Types that reference strings or blobs from the file borrow
//! them from the input data, so the parsed model can't outlive the bytes
//! it was produced from.

use std::collections::BTreeMap;
use std::fmt;

use bstr::BString;
use nom::number::Endianness;
use serde::Serialize;

use crate::utils::{
    bytes_as_hex, bytes_as_str, cstr_as_str, opt_bytes_as_hex,
    opt_bytes_as_str, until_nul,
};
use crate::{Buffer, Error, ParserConfig};

mod dyld;
mod parser;
mod symtab;
mod thread;

#[cfg(test)]
mod tests;

pub use thread::ThreadFlavor;

/// Parses a Mach-O file with the default configuration.
///
/// The data can be either a single-architecture Mach-O file or a fat
/// binary. See [`Parser`] for parsing with a different configuration.
pub fn parse(data: &[u8]) -> Result<MachO<'_>, Error> {
    Parser::new().parse(data)
}

/// Parses Mach-O files with a custom configuration.
///
/// ```
/// let config = machofile::ParserConfig {
///     max_fat_depth: 2,
///     ..Default::default()
/// };
///
/// let result = machofile::Parser::new()
///     .config(config)
///     .base_offset(0x1000)
///     .parse(&[0x00, 0x01, 0x02, 0x03]);
///
/// assert!(result.is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Parser {
    config: ParserConfig,
    base_offset: u64,
}

impl Parser {
    /// Creates a new parser with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration used by the parser.
    pub fn config(&mut self, config: ParserConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Sets the file offset where the data passed to [`Parser::parse`]
    /// starts. This is useful when the data is only a part of some larger
    /// file, all the offsets reported by the parser will be relative to the
    /// start of that file.
    pub fn base_offset(&mut self, base_offset: u64) -> &mut Self {
        self.base_offset = base_offset;
        self
    }

    /// Parses a Mach-O file.
    pub fn parse<'a>(&self, data: &'a [u8]) -> Result<MachO<'a>, Error> {
        parser::parse_image(
            Buffer::with_base_offset(data, self.base_offset),
            &self.config,
            0,
        )
    }
}

/// Represents a Mach-O file. It can represent both a multi-architecture
/// binary (a.k.a. fat binary) or a single-architecture binary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachO<'a> {
    /// A single-architecture Mach-O file.
    Single(MachOFile<'a>),
    /// A fat binary containing one Mach-O file per architecture.
    Fat(FatMachO<'a>),
}

impl<'a> MachO<'a> {
    /// Returns true if this is a fat binary.
    pub fn is_fat(&self) -> bool {
        matches!(self, MachO::Fat(_))
    }

    /// Returns the single-architecture file, or `None` if this is a fat
    /// binary.
    pub fn as_file(&self) -> Option<&MachOFile<'a>> {
        match self {
            MachO::Single(file) => Some(file),
            MachO::Fat(_) => None,
        }
    }

    /// Returns the fat binary, or `None` if this is a single-architecture
    /// file.
    pub fn as_fat(&self) -> Option<&FatMachO<'a>> {
        match self {
            MachO::Single(_) => None,
            MachO::Fat(fat) => Some(fat),
        }
    }

    /// Returns all the single-architecture files that were parsed
    /// successfully, in the order they appear in the file. Files inside
    /// nested fat binaries are included too.
    pub fn files(&self) -> Vec<&MachOFile<'a>> {
        let mut files = Vec::new();
        let mut queue = vec![self];

        while let Some(macho) = queue.pop() {
            match macho {
                MachO::Single(file) => files.push(file),
                MachO::Fat(fat) => queue.extend(
                    fat.members
                        .iter()
                        .rev()
                        .filter_map(|member| member.image.as_ref().ok()),
                ),
            }
        }

        files
    }
}

/// A fat binary.
///
/// The fat header and the architecture descriptors are always stored in
/// big-endian byte order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatMachO<'a> {
    /// Magic number, as read in big-endian byte order.
    pub magic: u32,
    /// True if the descriptors are `fat_arch_64` structures.
    pub is_64_bits: bool,
    /// Offset of the fat header within the file.
    pub base_offset: u64,
    /// One entry per architecture descriptor, in the same order they
    /// appear in the file.
    pub members: Vec<FatMember<'a>>,
}

/// A member of a fat binary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatMember<'a> {
    /// The architecture descriptor for this member.
    pub arch: FatArch,
    /// The result of parsing the member. A member that can't be parsed
    /// doesn't prevent the parsing of the remaining members.
    pub image: Result<MachO<'a>, Error>,
}

/// Architecture descriptor in a fat binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FatArch {
    /// CPU type.
    pub cputype: u32,
    /// CPU subtype.
    pub cpusubtype: u32,
    /// Offset of the member within the fat binary.
    pub offset: u64,
    /// Size of the member.
    pub size: u64,
    /// Alignment of the member, as a power of two.
    pub align: u32,
    /// Only present in `fat_arch_64` descriptors.
    pub reserved: Option<u32>,
}

/// Byte order of a Mach-O file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Little-endian.
    #[default]
    Little,
    /// Big-endian.
    Big,
}

impl ByteOrder {
    /// Byte order of the host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

impl From<ByteOrder> for Endianness {
    fn from(byte_order: ByteOrder) -> Self {
        match byte_order {
            ByteOrder::Little => Endianness::Little,
            ByteOrder::Big => Endianness::Big,
        }
    }
}

/// The `mach_header` or `mach_header_64` structure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MachOHeader {
    /// Magic number, as read in big-endian byte order.
    pub magic: u32,
    /// CPU type.
    pub cputype: u32,
    /// CPU subtype.
    pub cpusubtype: u32,
    /// Type of file (executable, dynamic library, etc).
    pub filetype: u32,
    /// Number of load commands.
    pub ncmds: u32,
    /// Size of all the load commands.
    pub sizeofcmds: u32,
    /// Flags.
    pub flags: u32,
    /// Only set in 64-bits binaries.
    pub reserved: Option<u32>,
}

/// Summary of a load command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadCommand {
    /// Type of the command.
    pub cmd: u32,
    /// Size of the command, including the `cmd` and `cmdsize` fields.
    pub cmdsize: u32,
    /// Offset of the command within the file.
    pub offset: u64,
}

/// A `LC_SEGMENT` or `LC_SEGMENT_64` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment<'a> {
    /// Segment name, without the trailing NUL characters.
    #[serde(serialize_with = "bytes_as_str")]
    pub segname: &'a [u8],
    /// Virtual address of the segment.
    pub vmaddr: u64,
    /// Size of the segment in memory.
    pub vmsize: u64,
    /// Offset of the segment within the file.
    pub fileoff: u64,
    /// Size of the segment in the file.
    pub filesize: u64,
    /// Maximum VM protection.
    pub maxprot: u32,
    /// Initial VM protection.
    pub initprot: u32,
    /// Number of sections in the segment.
    pub nsects: u32,
    /// Flags.
    pub flags: u32,
    /// Sections in the segment.
    pub sections: Vec<Section<'a>>,
}

/// A `section` or `section_64` structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section<'a> {
    /// Section name, without the trailing NUL characters.
    #[serde(serialize_with = "bytes_as_str")]
    pub sectname: &'a [u8],
    /// Name of the segment the section belongs to.
    #[serde(serialize_with = "bytes_as_str")]
    pub segname: &'a [u8],
    /// Virtual address of the section.
    pub addr: u64,
    /// Size of the section.
    pub size: u64,
    /// Offset of the section within the file.
    pub offset: u32,
    /// Alignment of the section, as a power of two.
    pub align: u32,
    /// Offset of the relocation entries.
    pub reloff: u32,
    /// Number of relocation entries.
    pub nreloc: u32,
    /// Flags.
    pub flags: u32,
    /// Reserved.
    pub reserved1: u32,
    /// Reserved.
    pub reserved2: u32,
    /// Only present in `section_64` structures.
    pub reserved3: Option<u32>,
}

/// Kind of reference to a dynamic library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DylibKind {
    /// `LC_ID_DYLIB`, the install name of the library itself.
    Id,
    /// `LC_LOAD_DYLIB`.
    Load,
    /// `LC_LOAD_WEAK_DYLIB`.
    LoadWeak,
    /// `LC_REEXPORT_DYLIB`.
    Reexport,
    /// `LC_LAZY_LOAD_DYLIB`.
    LazyLoad,
}

/// A version number packed in 32 bits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    /// The version as it appears in the file.
    pub raw: u32,
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl Version {
    /// Decodes a dynamic library version. Each of the three components is
    /// taken from a different byte, the most significant byte is ignored.
    pub fn from_dylib(raw: u32) -> Self {
        Self {
            raw,
            major: (raw >> 16) & 0xff,
            minor: (raw >> 8) & 0xff,
            patch: raw & 0xff,
        }
    }

    /// Decodes a version encoded as `xxxx.yy.zz`, as used by the build
    /// version and minimum version commands.
    pub fn from_packed(raw: u32) -> Self {
        Self {
            raw,
            major: raw >> 16,
            minor: (raw >> 8) & 0xff,
            patch: raw & 0xff,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A reference to a dynamic library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dylib<'a> {
    /// The command that referenced the library.
    pub kind: DylibKind,
    /// All the bytes that follow the fixed part of the command. Usually
    /// this is the install name followed by some NUL padding, see
    /// [`Dylib::install_name`].
    #[serde(serialize_with = "cstr_as_str")]
    pub name: &'a [u8],
    /// Build timestamp.
    pub timestamp: u32,
    /// Current version of the library.
    pub current_version: Version,
    /// Compatibility version of the library.
    pub compatibility_version: Version,
}

impl<'a> Dylib<'a> {
    /// Install name up to the first NUL character.
    pub fn install_name(&self) -> &'a [u8] {
        until_nul(self.name)
    }
}

/// A `LC_RPATH` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rpath<'a> {
    /// Type of the command.
    pub cmd: u32,
    /// All the bytes that follow the fixed part of the command.
    #[serde(serialize_with = "cstr_as_str")]
    pub path: &'a [u8],
}

impl<'a> Rpath<'a> {
    /// Path up to the first NUL character.
    pub fn path(&self) -> &'a [u8] {
        until_nul(self.path)
    }
}

/// The `LC_DYLD_INFO` and `LC_DYLD_INFO_ONLY` commands. Each pair of fields
/// describe a region of the file with information for the dynamic linker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct DyldInfo {
    pub rebase_off: u32,
    pub rebase_size: u32,
    pub bind_off: u32,
    pub bind_size: u32,
    pub weak_bind_off: u32,
    pub weak_bind_size: u32,
    pub lazy_bind_off: u32,
    pub lazy_bind_size: u32,
    pub export_off: u32,
    pub export_size: u32,
}

/// Region a [`BindRecord`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindKind {
    /// Rebase region.
    Rebase,
    /// Bind region.
    Bind,
    /// Weak bind region.
    WeakBind,
    /// Lazy bind region.
    LazyBind,
}

/// A record produced by the rebase or bind opcode interpreters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindRecord<'a> {
    /// Region the record comes from.
    pub kind: BindKind,
    /// Virtual address of the pointer.
    pub address: u64,
    /// Type of the binding or rebase (pointer, text absolute, etc).
    pub bind_type: u8,
    /// Name of the symbol. Rebase records don't have symbols.
    #[serde(serialize_with = "opt_bytes_as_str")]
    pub symbol: Option<&'a [u8]>,
    /// Flags associated to the symbol.
    pub symbol_flags: u8,
    /// Value added to the symbol's address.
    pub addend: i64,
    /// Ordinal of the library where the symbol is defined. Zero and
    /// negative values have special meanings.
    pub library_ordinal: i64,
    /// Offset within the file of the opcode that produced the record.
    pub offset: u64,
    /// Size of a pointer in the image (4 or 8).
    pub pointer_size: u8,
}

/// Kind of exported symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind<'a> {
    /// Symbol defined in the image.
    Regular,
    /// Symbol re-exported from another library.
    Reexport {
        /// Ordinal of the library the symbol is re-exported from.
        ordinal: u64,
        /// Name of the symbol in that library. Empty when the symbol has
        /// the same name.
        #[serde(serialize_with = "bytes_as_str")]
        import_name: &'a [u8],
    },
    /// Symbol with a stub and a resolver function.
    StubAndResolver {
        /// Offset of the resolver function.
        resolver_offset: u64,
    },
}

/// A symbol found in the export trie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord<'a> {
    /// Symbol name.
    #[serde(serialize_with = "bytes_as_str")]
    pub name: BString,
    /// Flags.
    pub flags: u64,
    /// Offset of the symbol relative to the image base. Zero for re-exports.
    pub offset: u64,
    /// Virtual address of the symbol.
    pub address: u64,
    /// Kind of export.
    pub kind: ExportKind<'a>,
}

impl ExportRecord<'_> {
    /// True if the symbol is a weak definition.
    pub fn is_weak_definition(&self) -> bool {
        self.flags & dyld::EXPORT_SYMBOL_FLAGS_WEAK_DEFINITION != 0
    }
}

/// A `LC_THREAD` or `LC_UNIXTHREAD` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadCommand<'a> {
    /// Type of the command.
    pub cmd: u32,
    /// The thread states, in the order they appear in the command.
    pub states: Vec<ThreadState<'a>>,
    /// The initial instruction pointer, for the CPU types where it's
    /// known how to obtain it from the thread state.
    pub entry_point: Option<u64>,
}

/// A thread state. The layout of the registers depends on the CPU type and
/// the flavor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadState<'a> {
    /// Flavor of the thread state.
    pub flavor: u32,
    /// Size of the state in 32-bits words.
    pub count: u32,
    /// Raw content of the registers.
    #[serde(serialize_with = "bytes_as_hex")]
    pub state: &'a [u8],
}

/// A `LC_SYMTAB` command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Symtab {
    /// Offset of the symbol table.
    pub symoff: u32,
    /// Number of symbols.
    pub nsyms: u32,
    /// Offset of the string table.
    pub stroff: u32,
    /// Size of the string table.
    pub strsize: u32,
}

/// An entry in the symbol table (`nlist` or `nlist_64`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol<'a> {
    /// Name of the symbol. `None` if `n_strx` is outside the string table.
    #[serde(serialize_with = "opt_bytes_as_str")]
    pub name: Option<&'a [u8]>,
    /// Index of the name in the string table.
    pub n_strx: u32,
    /// Type flag.
    pub n_type: u8,
    /// Section number, or zero if the symbol is not in any section.
    pub n_sect: u8,
    /// Additional information about the symbol.
    pub n_desc: u16,
    /// Value of the symbol, usually an address.
    pub n_value: u64,
}

/// A `LC_DYSYMTAB` command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Dysymtab {
    pub ilocalsym: u32,
    pub nlocalsym: u32,
    pub iextdefsym: u32,
    pub nextdefsym: u32,
    pub iundefsym: u32,
    pub nundefsym: u32,
    pub tocoff: u32,
    pub ntoc: u32,
    pub modtaboff: u32,
    pub nmodtab: u32,
    pub extrefsymoff: u32,
    pub nextrefsyms: u32,
    pub indirectsymoff: u32,
    pub nindirectsyms: u32,
    pub extreloff: u32,
    pub nextrel: u32,
    pub locreloff: u32,
    pub nlocrel: u32,
}

/// A `LC_MAIN` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    /// Offset of the entry point within the `__TEXT` segment.
    pub entryoff: u64,
    /// Initial stack size, if not zero.
    pub stacksize: u64,
}

/// The version in a `LC_SOURCE_VERSION` command, packed as
/// `a.b.c.d.e` with 24 bits for `a` and 10 bits for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceVersion(pub u64);

impl fmt::Display for SourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = 0x3ff;
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.0 >> 40,
            (self.0 >> 30) & mask,
            (self.0 >> 20) & mask,
            (self.0 >> 10) & mask,
            self.0 & mask
        )
    }
}

/// A `LC_BUILD_VERSION` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildVersion {
    /// Target platform.
    pub platform: u32,
    /// Minimum OS version.
    pub minos: Version,
    /// SDK version.
    pub sdk: Version,
    /// Tools used for building the image.
    pub tools: Vec<BuildTool>,
}

/// A tool in a `LC_BUILD_VERSION` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildTool {
    /// Tool identifier (clang, swift, ld).
    pub tool: u32,
    /// Version of the tool.
    pub version: Version,
}

/// A `LC_VERSION_MIN_*` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinVersion {
    /// Type of the command, which determines the platform.
    pub cmd: u32,
    /// Minimum OS version.
    pub version: Version,
    /// SDK version.
    pub sdk: Version,
}

/// A single-architecture Mach-O file.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MachOFile<'a> {
    pub(crate) base_offset: u64,
    pub(crate) byte_order: ByteOrder,
    pub(crate) needs_swap: bool,
    pub(crate) is_32_bits: bool,
    pub(crate) header: MachOHeader,
    pub(crate) commands: Vec<LoadCommand>,
    pub(crate) segments: Vec<Segment<'a>>,
    #[serde(skip)]
    pub(crate) segment_map: BTreeMap<u64, (u64, u64)>,
    pub(crate) dylibs: Vec<Dylib<'a>>,
    pub(crate) rpaths: Vec<Rpath<'a>>,
    pub(crate) dyld_info: Option<DyldInfo>,
    pub(crate) rebases: Vec<BindRecord<'a>>,
    pub(crate) binds: Vec<BindRecord<'a>>,
    pub(crate) weak_binds: Vec<BindRecord<'a>>,
    pub(crate) lazy_binds: Vec<BindRecord<'a>>,
    pub(crate) exports: Vec<ExportRecord<'a>>,
    pub(crate) threads: Vec<ThreadCommand<'a>>,
    pub(crate) symtab: Option<Symtab>,
    pub(crate) symbols: Vec<Symbol<'a>>,
    pub(crate) dysymtab: Option<Dysymtab>,
    #[serde(serialize_with = "opt_bytes_as_hex")]
    pub(crate) uuid: Option<&'a [u8]>,
    pub(crate) entry_point: Option<EntryPoint>,
    #[serde(serialize_with = "opt_bytes_as_str")]
    pub(crate) dynamic_linker: Option<&'a [u8]>,
    pub(crate) source_version: Option<SourceVersion>,
    pub(crate) build_version: Option<BuildVersion>,
    pub(crate) min_version: Option<MinVersion>,
}

impl<'a> MachOFile<'a> {
    /// Offset of the file within the outermost file. Non-zero for members
    /// of fat binaries.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Byte order of the file.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// True if the byte order of the file is not the one of the host.
    pub fn needs_swap(&self) -> bool {
        self.needs_swap
    }

    /// True for 32-bits files.
    pub fn is_32_bits(&self) -> bool {
        self.is_32_bits
    }

    /// Size of a pointer in bytes.
    pub fn pointer_size(&self) -> u8 {
        if self.is_32_bits {
            4
        } else {
            8
        }
    }

    /// The Mach-O header.
    pub fn header(&self) -> &MachOHeader {
        &self.header
    }

    /// All the load commands, in the order they appear in the file.
    pub fn commands(&self) -> &[LoadCommand] {
        self.commands.as_slice()
    }

    /// Segments, in the order they appear in the file.
    pub fn segments(&self) -> &[Segment<'a>] {
        self.segments.as_slice()
    }

    /// Maps the file offset of each segment to its virtual address and
    /// virtual size.
    pub fn segment_map(&self) -> &BTreeMap<u64, (u64, u64)> {
        &self.segment_map
    }

    /// References to dynamic libraries, in the order they appear in the
    /// file.
    pub fn dylibs(&self) -> &[Dylib<'a>] {
        self.dylibs.as_slice()
    }

    /// Run paths.
    pub fn rpaths(&self) -> &[Rpath<'a>] {
        self.rpaths.as_slice()
    }

    /// The `LC_DYLD_INFO` or `LC_DYLD_INFO_ONLY` command, if any.
    pub fn dyld_info(&self) -> Option<&DyldInfo> {
        self.dyld_info.as_ref()
    }

    /// Records from the rebase region.
    pub fn rebases(&self) -> &[BindRecord<'a>] {
        self.rebases.as_slice()
    }

    /// Records from the bind region.
    pub fn binds(&self) -> &[BindRecord<'a>] {
        self.binds.as_slice()
    }

    /// Records from the weak bind region.
    pub fn weak_binds(&self) -> &[BindRecord<'a>] {
        self.weak_binds.as_slice()
    }

    /// Records from the lazy bind region.
    pub fn lazy_binds(&self) -> &[BindRecord<'a>] {
        self.lazy_binds.as_slice()
    }

    /// Exported symbols.
    pub fn exports(&self) -> &[ExportRecord<'a>] {
        self.exports.as_slice()
    }

    /// `LC_THREAD` and `LC_UNIXTHREAD` commands.
    pub fn threads(&self) -> &[ThreadCommand<'a>] {
        self.threads.as_slice()
    }

    /// The `LC_SYMTAB` command, if any.
    pub fn symtab(&self) -> Option<&Symtab> {
        self.symtab.as_ref()
    }

    /// Entries in the symbol table.
    pub fn symbols(&self) -> &[Symbol<'a>] {
        self.symbols.as_slice()
    }

    /// The `LC_DYSYMTAB` command, if any.
    pub fn dysymtab(&self) -> Option<&Dysymtab> {
        self.dysymtab.as_ref()
    }

    /// The 16 bytes in the `LC_UUID` command.
    pub fn uuid(&self) -> Option<&'a [u8]> {
        self.uuid
    }

    /// The `LC_MAIN` command, if any.
    pub fn entry_point(&self) -> Option<&EntryPoint> {
        self.entry_point.as_ref()
    }

    /// Path of the dynamic linker.
    pub fn dynamic_linker(&self) -> Option<&'a [u8]> {
        self.dynamic_linker
    }

    /// The `LC_SOURCE_VERSION` command, if any.
    pub fn source_version(&self) -> Option<SourceVersion> {
        self.source_version
    }

    /// The `LC_BUILD_VERSION` command, if any.
    pub fn build_version(&self) -> Option<&BuildVersion> {
        self.build_version.as_ref()
    }

    /// The `LC_VERSION_MIN_*` command, if any.
    pub fn min_version(&self) -> Option<&MinVersion> {
        self.min_version.as_ref()
    }

    /// Virtual address where the image expects to be loaded. This is the
    /// address of the `__TEXT` segment or, if there's no such segment, the
    /// address of the first segment that maps the start of the file.
    pub fn image_base(&self) -> u64 {
        self.segments
            .iter()
            .find(|segment| segment.segname == b"__TEXT")
            .or_else(|| {
                self.segments.iter().find(|segment| {
                    segment.fileoff == 0 && segment.filesize > 0
                })
            })
            .map(|segment| segment.vmaddr)
            .unwrap_or(0)
    }

    /// Converts a relative virtual address (RVA) to file offset.
    pub fn rva_to_offset(&self, rva: u64) -> Option<u64> {
        for segment in &self.segments {
            let start = segment.vmaddr;
            let Some(end) = segment.vmaddr.checked_add(segment.vmsize) else {
                continue;
            };
            if rva >= start && rva < end {
                return segment.fileoff.checked_add(rva.checked_sub(start)?);
            }
        }
        None
    }

    /// File offset of the entry point, either from the `LC_MAIN` command
    /// or from the instruction pointer in a `LC_UNIXTHREAD` command.
    pub fn entry_point_offset(&self) -> Option<u64> {
        if let Some(entry_point) = &self.entry_point {
            return Some(entry_point.entryoff);
        }
        self.threads
            .iter()
            .find_map(|thread| thread.entry_point)
            .and_then(|rva| self.rva_to_offset(rva))
    }

    #[inline]
    pub(crate) fn endianness(&self) -> Endianness {
        self.byte_order.into()
    }
}
