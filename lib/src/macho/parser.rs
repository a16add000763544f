use bstr::ByteSlice;
#[cfg(feature = "logging")]
use log::{debug, error};
use nom::bytes::complete::take;
use nom::combinator::{cond, map};
use nom::multi::count;
use nom::number::complete::{be_u32, u32, u64};
use nom::number::Endianness;
use nom::sequence::tuple;
use nom::IResult;

use crate::macho::*;
use crate::{Buffer, Error, ParserConfig};

/// Mach-O magic constants
pub(crate) const MH_MAGIC: u32 = 0xfeedface;
pub(crate) const MH_CIGAM: u32 = 0xcefaedfe;
pub(crate) const MH_MAGIC_64: u32 = 0xfeedfacf;
pub(crate) const MH_CIGAM_64: u32 = 0xcffaedfe;

/// Mach-O FAT magic constants
pub(crate) const FAT_MAGIC: u32 = 0xcafebabe;
pub(crate) const FAT_CIGAM: u32 = 0xbebafeca;
pub(crate) const FAT_MAGIC_64: u32 = 0xcafebabf;
pub(crate) const FAT_CIGAM_64: u32 = 0xbfbafeca;

/// Mach-O dynamic linker constant
const LC_REQ_DYLD: u32 = 0x80000000;

/// Mach-O load commands
pub(crate) const LC_SEGMENT: u32 = 0x00000001;
pub(crate) const LC_SYMTAB: u32 = 0x00000002;
pub(crate) const LC_THREAD: u32 = 0x00000004;
pub(crate) const LC_UNIXTHREAD: u32 = 0x00000005;
pub(crate) const LC_DYSYMTAB: u32 = 0x0000000b;
pub(crate) const LC_LOAD_DYLIB: u32 = 0x0000000c;
pub(crate) const LC_ID_DYLIB: u32 = 0x0000000d;
pub(crate) const LC_LOAD_DYLINKER: u32 = 0x0000000e;
pub(crate) const LC_ID_DYLINKER: u32 = 0x0000000f;
pub(crate) const LC_LOAD_WEAK_DYLIB: u32 = 0x18 | LC_REQ_DYLD;
pub(crate) const LC_SEGMENT_64: u32 = 0x00000019;
pub(crate) const LC_UUID: u32 = 0x0000001b;
pub(crate) const LC_RPATH: u32 = 0x1c | LC_REQ_DYLD;
pub(crate) const LC_REEXPORT_DYLIB: u32 = 0x1f | LC_REQ_DYLD;
pub(crate) const LC_LAZY_LOAD_DYLIB: u32 = 0x00000020;
pub(crate) const LC_DYLD_INFO: u32 = 0x00000022;
pub(crate) const LC_DYLD_INFO_ONLY: u32 = 0x22 | LC_REQ_DYLD;
pub(crate) const LC_VERSION_MIN_MACOSX: u32 = 0x00000024;
pub(crate) const LC_VERSION_MIN_IPHONEOS: u32 = 0x00000025;
pub(crate) const LC_DYLD_ENVIRONMENT: u32 = 0x00000027;
pub(crate) const LC_MAIN: u32 = 0x28 | LC_REQ_DYLD;
pub(crate) const LC_SOURCE_VERSION: u32 = 0x0000002a;
pub(crate) const LC_VERSION_MIN_TVOS: u32 = 0x0000002f;
pub(crate) const LC_VERSION_MIN_WATCHOS: u32 = 0x00000030;
pub(crate) const LC_BUILD_VERSION: u32 = 0x00000032;

/// Size of the structures with a fixed size, including the `cmd` and
/// `cmdsize` fields in the case of load commands.
const MACH_HEADER_SIZE: u64 = 28;
const MACH_HEADER_64_SIZE: u64 = 32;
const FAT_HEADER_SIZE: u64 = 8;
const FAT_ARCH_SIZE: u64 = 20;
const FAT_ARCH_64_SIZE: u64 = 32;
const LOAD_COMMAND_SIZE: u32 = 8;
const SEGMENT_COMMAND_SIZE: u32 = 56;
const SEGMENT_COMMAND_64_SIZE: u32 = 72;
const SECTION_SIZE: u64 = 68;
const SECTION_64_SIZE: u64 = 80;
const DYLIB_COMMAND_SIZE: u32 = 24;
const RPATH_COMMAND_SIZE: u32 = 12;
const DYLD_INFO_COMMAND_SIZE: u32 = 48;
const SYMTAB_COMMAND_SIZE: u32 = 24;
const DYSYMTAB_COMMAND_SIZE: u32 = 80;
const UUID_COMMAND_SIZE: u32 = 24;
const ENTRY_POINT_COMMAND_SIZE: u32 = 24;
const DYLINKER_COMMAND_SIZE: u32 = 12;
const SOURCE_VERSION_COMMAND_SIZE: u32 = 16;
const BUILD_VERSION_COMMAND_SIZE: u32 = 24;
const BUILD_TOOL_SIZE: u64 = 8;
const VERSION_MIN_COMMAND_SIZE: u32 = 16;

/// Parses the Mach-O file or fat binary contained in `buffer`.
///
/// `depth` is the number of fat binaries that contain this one.
pub(crate) fn parse_image<'a>(
    buffer: Buffer<'a>,
    config: &ParserConfig,
    depth: usize,
) -> Result<MachO<'a>, Error> {
    // The magic is read in big-endian, and then compared with both the
    // magic and its byte-swapped version.
    let magic = buffer.decode(0, 4, be_u32)?;

    match magic {
        FAT_MAGIC | FAT_CIGAM | FAT_MAGIC_64 | FAT_CIGAM_64 => {
            if depth >= config.max_fat_depth {
                return Err(Error::NestingTooDeep { depth });
            }
            parse_fat(buffer, magic, config, depth).map(MachO::Fat)
        }
        MH_MAGIC | MH_CIGAM | MH_MAGIC_64 | MH_CIGAM_64 => {
            MachOFile::parse(buffer, magic, config).map(MachO::Single)
        }
        _ => Err(Error::UnsupportedFormat { magic }),
    }
}

/// Parses a fat binary.
fn parse_fat<'a>(
    buffer: Buffer<'a>,
    magic: u32,
    config: &ParserConfig,
    depth: usize,
) -> Result<FatMachO<'a>, Error> {
    let is_64_bits = matches!(magic, FAT_MAGIC_64 | FAT_CIGAM_64);

    // The fat header and the `fat_arch` structures are always big-endian,
    // no matter which form of the magic was found.
    let nfat_arch = buffer.decode(4, 4, be_u32)?;

    let arch_size = if is_64_bits { FAT_ARCH_64_SIZE } else { FAT_ARCH_SIZE };

    // The whole table must be inside the file before any of the members is
    // parsed, this puts an upper bound on `nfat_arch`.
    let archs = buffer.decode(
        FAT_HEADER_SIZE,
        u64::from(nfat_arch) * arch_size,
        count(fat_arch(is_64_bits), nfat_arch as usize),
    )?;

    // Errors that occur while parsing individual Mach-O files are not
    // propagated. If the fat file is truncated, for example, some of the
    // members may be parsed while the rest can't.
    let members = archs
        .into_iter()
        .map(|arch| {
            let image = buffer
                .sub_buffer(arch.offset, arch.size)
                .and_then(|member| parse_image(member, config, depth + 1));

            #[cfg(feature = "logging")]
            if let Err(err) = &image {
                error!(
                    "Error parsing fat member at offset {:#x}: {}",
                    buffer.absolute(arch.offset),
                    err
                );
            }

            FatMember { arch, image }
        })
        .collect();

    Ok(FatMachO {
        magic,
        is_64_bits,
        base_offset: buffer.base_offset(),
        members,
    })
}

/// Parser for a `fat_arch` or `fat_arch_64` structure.
fn fat_arch<'a>(
    is_64_bits: bool,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], FatArch> {
    map(
        tuple((
            be_u32,                                   // cputype
            be_u32,                                   // cpusubtype
            uint(Endianness::Big, !is_64_bits),       // offset
            uint(Endianness::Big, !is_64_bits),       // size
            be_u32,                                   // align
            cond(is_64_bits, be_u32),                 // reserved
        )),
        |(cputype, cpusubtype, offset, size, align, reserved)| FatArch {
            cputype,
            cpusubtype,
            offset,
            size,
            align,
            reserved,
        },
    )
}

impl<'a> MachOFile<'a> {
    /// Parses a single-architecture Mach-O file. `magic` must be one of the
    /// Mach-O magic numbers.
    fn parse(
        buffer: Buffer<'a>,
        magic: u32,
        config: &ParserConfig,
    ) -> Result<Self, Error> {
        let byte_order = match magic {
            MH_MAGIC | MH_MAGIC_64 => ByteOrder::Big,
            _ => ByteOrder::Little,
        };

        let is_32_bits = matches!(magic, MH_MAGIC | MH_CIGAM);

        let header_size =
            if is_32_bits { MACH_HEADER_SIZE } else { MACH_HEADER_64_SIZE };

        let endianness = byte_order.into();

        let header = buffer.decode(
            4,
            header_size - 4,
            map(
                tuple((
                    u32(endianness),                   // cputype
                    u32(endianness),                   // cpusubtype
                    u32(endianness),                   // filetype
                    u32(endianness),                   // ncmds
                    u32(endianness),                   // sizeofcmds
                    u32(endianness),                   // flags
                    cond(!is_32_bits, u32(endianness)), // reserved
                )),
                |(
                    cputype,
                    cpusubtype,
                    filetype,
                    ncmds,
                    sizeofcmds,
                    flags,
                    reserved,
                )| MachOHeader {
                    magic,
                    cputype,
                    cpusubtype,
                    filetype,
                    ncmds,
                    sizeofcmds,
                    flags,
                    reserved,
                },
            ),
        )?;

        let mut macho = MachOFile {
            base_offset: buffer.base_offset(),
            byte_order,
            needs_swap: byte_order != ByteOrder::native(),
            is_32_bits,
            header,
            ..Default::default()
        };

        macho.parse_commands(&buffer, header_size)?;

        // These regions may reference segments by index, so they are
        // decoded once all the commands are known.
        macho.parse_dyld_info(&buffer, config)?;
        macho.parse_symbols(&buffer)?;

        Ok(macho)
    }

    /// Walks the load commands that follow the header.
    fn parse_commands(
        &mut self,
        buffer: &Buffer<'a>,
        header_size: u64,
    ) -> Result<(), Error> {
        let endianness = self.endianness();
        let mut cursor = header_size;

        for _ in 0..self.header.ncmds {
            let offset = buffer.absolute(cursor);
            let truncated = move |_| Error::TruncatedCommand { offset };

            let (cmd, cmdsize) = buffer
                .decode(
                    cursor,
                    LOAD_COMMAND_SIZE.into(),
                    tuple((u32(endianness), u32(endianness))),
                )
                .map_err(truncated)?;

            if cmdsize < LOAD_COMMAND_SIZE {
                return Err(Error::InvalidCommandSize {
                    cmd,
                    size: cmdsize,
                    min: LOAD_COMMAND_SIZE,
                });
            }

            // `cmdsize` includes the `cmd` and `cmdsize` fields, so the
            // command buffer starts at the command itself.
            let command =
                buffer.sub_buffer(cursor, cmdsize.into()).map_err(truncated)?;

            self.commands.push(LoadCommand { cmd, cmdsize, offset });
            self.parse_command(cmd, cmdsize, &command)?;

            cursor = cursor
                .checked_add(cmdsize.into())
                .ok_or(Error::TruncatedCommand { offset })?;
        }

        Ok(())
    }

    /// Decodes a load command. `command` contains the whole command,
    /// including the `cmd` and `cmdsize` fields.
    fn parse_command(
        &mut self,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<(), Error> {
        match cmd {
            LC_SEGMENT | LC_SEGMENT_64 => {
                let segment = self.segment_command(cmd, cmdsize, command)?;
                // If two segments have the same offset the last one wins.
                self.segment_map.insert(
                    segment.fileoff,
                    (segment.vmaddr, segment.vmsize),
                );
                self.segments.push(segment);
            }
            LC_ID_DYLIB => {
                self.dylibs.push(self.dylib_command(
                    DylibKind::Id,
                    cmd,
                    cmdsize,
                    command,
                )?);
            }
            LC_LOAD_DYLIB => {
                self.dylibs.push(self.dylib_command(
                    DylibKind::Load,
                    cmd,
                    cmdsize,
                    command,
                )?);
            }
            LC_LOAD_WEAK_DYLIB => {
                self.dylibs.push(self.dylib_command(
                    DylibKind::LoadWeak,
                    cmd,
                    cmdsize,
                    command,
                )?);
            }
            LC_REEXPORT_DYLIB => {
                self.dylibs.push(self.dylib_command(
                    DylibKind::Reexport,
                    cmd,
                    cmdsize,
                    command,
                )?);
            }
            LC_LAZY_LOAD_DYLIB => {
                self.dylibs.push(self.dylib_command(
                    DylibKind::LazyLoad,
                    cmd,
                    cmdsize,
                    command,
                )?);
            }
            LC_RPATH => {
                check_size(cmd, cmdsize, RPATH_COMMAND_SIZE)?;
                let path = command.read(
                    RPATH_COMMAND_SIZE.into(),
                    (cmdsize - RPATH_COMMAND_SIZE).into(),
                )?;
                self.rpaths.push(Rpath { cmd, path });
            }
            LC_DYLD_INFO | LC_DYLD_INFO_ONLY => {
                self.dyld_info =
                    Some(self.dyld_info_command(cmd, cmdsize, command)?);
            }
            LC_THREAD | LC_UNIXTHREAD => {
                let thread = self.thread_command(cmd, command)?;
                self.threads.push(thread);
            }
            LC_SYMTAB => {
                self.symtab =
                    Some(self.symtab_command(cmd, cmdsize, command)?);
            }
            LC_DYSYMTAB => {
                self.dysymtab =
                    Some(self.dysymtab_command(cmd, cmdsize, command)?);
            }
            LC_UUID => {
                check_size(cmd, cmdsize, UUID_COMMAND_SIZE)?;
                self.uuid = Some(command.read(8, 16)?);
            }
            LC_MAIN => {
                check_size(cmd, cmdsize, ENTRY_POINT_COMMAND_SIZE)?;
                let endianness = self.endianness();
                self.entry_point = Some(command.decode(
                    8,
                    16,
                    map(
                        tuple((
                            u64(endianness), // entryoff
                            u64(endianness), // stacksize
                        )),
                        |(entryoff, stacksize)| EntryPoint {
                            entryoff,
                            stacksize,
                        },
                    ),
                )?);
            }
            LC_ID_DYLINKER | LC_LOAD_DYLINKER | LC_DYLD_ENVIRONMENT => {
                check_size(cmd, cmdsize, DYLINKER_COMMAND_SIZE)?;
                let name = command.read(
                    DYLINKER_COMMAND_SIZE.into(),
                    (cmdsize - DYLINKER_COMMAND_SIZE).into(),
                )?;
                self.dynamic_linker =
                    Some(name.trim_end_with(|c| c == '\0'));
            }
            LC_SOURCE_VERSION => {
                check_size(cmd, cmdsize, SOURCE_VERSION_COMMAND_SIZE)?;
                let version = command.decode(8, 8, u64(self.endianness()))?;
                self.source_version = Some(SourceVersion(version));
            }
            LC_BUILD_VERSION => {
                self.build_version =
                    Some(self.build_version_command(cmd, cmdsize, command)?);
            }
            LC_VERSION_MIN_MACOSX
            | LC_VERSION_MIN_IPHONEOS
            | LC_VERSION_MIN_TVOS
            | LC_VERSION_MIN_WATCHOS => {
                check_size(cmd, cmdsize, VERSION_MIN_COMMAND_SIZE)?;
                let endianness = self.endianness();
                self.min_version = Some(command.decode(
                    8,
                    8,
                    map(
                        tuple((
                            u32(endianness), // version
                            u32(endianness), // sdk
                        )),
                        |(version, sdk)| MinVersion {
                            cmd,
                            version: Version::from_packed(version),
                            sdk: Version::from_packed(sdk),
                        },
                    ),
                )?);
            }
            _ => {
                #[cfg(feature = "logging")]
                debug!(
                    "Skipping load command {:#x} at offset {:#x}",
                    cmd,
                    command.base_offset()
                );
            }
        }

        Ok(())
    }

    /// Decodes a `LC_SEGMENT` or `LC_SEGMENT_64` command together with its
    /// sections.
    fn segment_command(
        &self,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<Segment<'a>, Error> {
        // The layout depends on the command type, not on the header.
        let is_32_bits = cmd == LC_SEGMENT;

        let (header_size, section_size) = if is_32_bits {
            (SEGMENT_COMMAND_SIZE, SECTION_SIZE)
        } else {
            (SEGMENT_COMMAND_64_SIZE, SECTION_64_SIZE)
        };

        check_size(cmd, cmdsize, header_size)?;

        let endianness = self.endianness();
        let header_size = u64::from(header_size);

        let mut segment = command.decode(
            8,
            header_size - 8,
            map(
                tuple((
                    name(),                           // segname
                    uint(endianness, is_32_bits),     // vmaddr
                    uint(endianness, is_32_bits),     // vmsize
                    uint(endianness, is_32_bits),     // fileoff
                    uint(endianness, is_32_bits),     // filesize
                    u32(endianness),                  // maxprot
                    u32(endianness),                  // initprot
                    u32(endianness),                  // nsects
                    u32(endianness),                  // flags
                )),
                |(
                    segname,
                    vmaddr,
                    vmsize,
                    fileoff,
                    filesize,
                    maxprot,
                    initprot,
                    nsects,
                    flags,
                )| Segment {
                    segname,
                    vmaddr,
                    vmsize,
                    fileoff,
                    filesize,
                    maxprot,
                    initprot,
                    nsects,
                    flags,
                    sections: Vec::new(),
                },
            ),
        )?;

        // The sections follow the segment header inside the same command,
        // `cmdsize` must be large enough for all of them.
        let expected = header_size + u64::from(segment.nsects) * section_size;

        if u64::from(cmdsize) < expected {
            return Err(Error::IncorrectCommandSize {
                cmd,
                size: cmdsize,
                expected,
            });
        }

        segment.sections = (0..u64::from(segment.nsects))
            .map(|i| {
                command.decode(
                    header_size + i * section_size,
                    section_size,
                    section(endianness, is_32_bits),
                )
            })
            .collect::<Result<_, _>>()?;

        Ok(segment)
    }

    /// Decodes any of the commands that reference a dynamic library.
    fn dylib_command(
        &self,
        kind: DylibKind,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<Dylib<'a>, Error> {
        check_size(cmd, cmdsize, DYLIB_COMMAND_SIZE)?;

        let endianness = self.endianness();

        let (timestamp, current_version, compatibility_version) = command
            .decode(
                12,
                12,
                tuple((
                    u32(endianness), // timestamp
                    u32(endianness), // current_version
                    u32(endianness), // compatibility_version
                )),
            )?;

        // The name is everything after the fixed part of the command. The
        // `offset` field that precedes the timestamp is ignored.
        let name = command.read(
            DYLIB_COMMAND_SIZE.into(),
            (cmdsize - DYLIB_COMMAND_SIZE).into(),
        )?;

        Ok(Dylib {
            kind,
            name,
            timestamp,
            current_version: Version::from_dylib(current_version),
            compatibility_version: Version::from_dylib(compatibility_version),
        })
    }

    /// Decodes a `LC_DYLD_INFO` or `LC_DYLD_INFO_ONLY` command.
    fn dyld_info_command(
        &self,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<DyldInfo, Error> {
        check_size(cmd, cmdsize, DYLD_INFO_COMMAND_SIZE)?;

        let endianness = self.endianness();

        command.decode(
            8,
            40,
            map(
                tuple((
                    u32(endianness), // rebase_off
                    u32(endianness), // rebase_size
                    u32(endianness), // bind_off
                    u32(endianness), // bind_size
                    u32(endianness), // weak_bind_off
                    u32(endianness), // weak_bind_size
                    u32(endianness), // lazy_bind_off
                    u32(endianness), // lazy_bind_size
                    u32(endianness), // export_off
                    u32(endianness), // export_size
                )),
                |(
                    rebase_off,
                    rebase_size,
                    bind_off,
                    bind_size,
                    weak_bind_off,
                    weak_bind_size,
                    lazy_bind_off,
                    lazy_bind_size,
                    export_off,
                    export_size,
                )| DyldInfo {
                    rebase_off,
                    rebase_size,
                    bind_off,
                    bind_size,
                    weak_bind_off,
                    weak_bind_size,
                    lazy_bind_off,
                    lazy_bind_size,
                    export_off,
                    export_size,
                },
            ),
        )
    }

    /// Decodes a `LC_SYMTAB` command. The symbols themselves are decoded
    /// after all commands are parsed.
    fn symtab_command(
        &self,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<Symtab, Error> {
        check_size(cmd, cmdsize, SYMTAB_COMMAND_SIZE)?;

        let endianness = self.endianness();

        command.decode(
            8,
            16,
            map(
                tuple((
                    u32(endianness), // symoff
                    u32(endianness), // nsyms
                    u32(endianness), // stroff
                    u32(endianness), // strsize
                )),
                |(symoff, nsyms, stroff, strsize)| Symtab {
                    symoff,
                    nsyms,
                    stroff,
                    strsize,
                },
            ),
        )
    }

    /// Decodes a `LC_DYSYMTAB` command.
    fn dysymtab_command(
        &self,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<Dysymtab, Error> {
        check_size(cmd, cmdsize, DYSYMTAB_COMMAND_SIZE)?;

        let endianness = self.endianness();

        command.decode(
            8,
            72,
            map(
                tuple((
                    u32(endianness), // ilocalsym
                    u32(endianness), // nlocalsym
                    u32(endianness), // iextdefsym
                    u32(endianness), // nextdefsym
                    u32(endianness), // iundefsym
                    u32(endianness), // nundefsym
                    u32(endianness), // tocoff
                    u32(endianness), // ntoc
                    u32(endianness), // modtaboff
                    u32(endianness), // nmodtab
                    u32(endianness), // extrefsymoff
                    u32(endianness), // nextrefsyms
                    u32(endianness), // indirectsymoff
                    u32(endianness), // nindirectsyms
                    u32(endianness), // extreloff
                    u32(endianness), // nextrel
                    u32(endianness), // locreloff
                    u32(endianness), // nlocrel
                )),
                |(
                    ilocalsym,
                    nlocalsym,
                    iextdefsym,
                    nextdefsym,
                    iundefsym,
                    nundefsym,
                    tocoff,
                    ntoc,
                    modtaboff,
                    nmodtab,
                    extrefsymoff,
                    nextrefsyms,
                    indirectsymoff,
                    nindirectsyms,
                    extreloff,
                    nextrel,
                    locreloff,
                    nlocrel,
                )| Dysymtab {
                    ilocalsym,
                    nlocalsym,
                    iextdefsym,
                    nextdefsym,
                    iundefsym,
                    nundefsym,
                    tocoff,
                    ntoc,
                    modtaboff,
                    nmodtab,
                    extrefsymoff,
                    nextrefsyms,
                    indirectsymoff,
                    nindirectsyms,
                    extreloff,
                    nextrel,
                    locreloff,
                    nlocrel,
                },
            ),
        )
    }

    /// Decodes a `LC_BUILD_VERSION` command and its tool entries.
    fn build_version_command(
        &self,
        cmd: u32,
        cmdsize: u32,
        command: &Buffer<'a>,
    ) -> Result<BuildVersion, Error> {
        check_size(cmd, cmdsize, BUILD_VERSION_COMMAND_SIZE)?;

        let endianness = self.endianness();

        let (platform, minos, sdk, ntools) = command.decode(
            8,
            16,
            tuple((
                u32(endianness), // platform
                u32(endianness), // minos
                u32(endianness), // sdk
                u32(endianness), // ntools
            )),
        )?;

        let tools_size = u64::from(ntools) * BUILD_TOOL_SIZE;
        let expected = u64::from(BUILD_VERSION_COMMAND_SIZE) + tools_size;

        if u64::from(cmdsize) < expected {
            return Err(Error::IncorrectCommandSize {
                cmd,
                size: cmdsize,
                expected,
            });
        }

        let tools = command.decode(
            BUILD_VERSION_COMMAND_SIZE.into(),
            tools_size,
            count(
                map(
                    tuple((
                        u32(endianness), // tool
                        u32(endianness), // version
                    )),
                    |(tool, version)| BuildTool {
                        tool,
                        version: Version::from_packed(version),
                    },
                ),
                ntools as usize,
            ),
        )?;

        Ok(BuildVersion {
            platform,
            minos: Version::from_packed(minos),
            sdk: Version::from_packed(sdk),
            tools,
        })
    }
}

/// Fails with [`Error::InvalidCommandSize`] if `cmdsize` is lower than the
/// size of the fixed part of the command.
fn check_size(cmd: u32, cmdsize: u32, min: u32) -> Result<(), Error> {
    if cmdsize < min {
        return Err(Error::InvalidCommandSize { cmd, size: cmdsize, min });
    }
    Ok(())
}

/// Parser for a section in a `LC_SEGMENT` or `LC_SEGMENT_64` command.
fn section<'a>(
    endianness: Endianness,
    is_32_bits: bool,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Section<'a>> {
    map(
        tuple((
            name(),                              // sectname
            name(),                              // segname
            uint(endianness, is_32_bits),        // addr
            uint(endianness, is_32_bits),        // size
            u32(endianness),                     // offset
            u32(endianness),                     // align
            u32(endianness),                     // reloff
            u32(endianness),                     // nreloc
            u32(endianness),                     // flags
            u32(endianness),                     // reserved1
            u32(endianness),                     // reserved2
            cond(!is_32_bits, u32(endianness)),  // reserved3
        )),
        |(
            sectname,
            segname,
            addr,
            size,
            offset,
            align,
            reloff,
            nreloc,
            flags,
            reserved1,
            reserved2,
            reserved3,
        )| Section {
            sectname,
            segname,
            addr,
            size,
            offset,
            align,
            reloff,
            nreloc,
            flags,
            reserved1,
            reserved2,
            reserved3,
        },
    )
}

/// Parser for the 16-bytes names of segments and sections. Trailing NUL
/// characters are removed.
fn name<'a>() -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], &'a [u8]> {
    map(take(16_usize), |name: &'a [u8]| name.trim_end_with(|c| c == '\0'))
}

/// Parser that reads a 32-bits or 64-bits unsigned integer, the result is
/// always an `u64`.
pub(crate) fn uint<'a>(
    endianness: Endianness,
    is_32_bits: bool,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], u64> {
    move |input: &'a [u8]| {
        if is_32_bits {
            let (remainder, i) = u32(endianness)(input)?;
            Ok((remainder, i as u64))
        } else {
            u64(endianness)(input)
        }
    }
}
