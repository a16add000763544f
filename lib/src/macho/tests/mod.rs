use pretty_assertions::assert_eq;

use crate::macho::parser::*;
use crate::{
    BindKind, ByteOrder, DylibKind, Error, ExportKind, MachO, MachOFile,
    Parser, ParserConfig,
};

/// Offset where the data appended with [`Builder::data`] starts.
const DATA_OFFSET: u32 = 0x400;

/// Builds Mach-O images for testing.
struct Builder {
    byte_order: ByteOrder,
    is_32_bits: bool,
    cputype: u32,
    ncmds: Option<u32>,
    commands: Vec<Vec<u8>>,
    data: Vec<u8>,
}

impl Builder {
    /// A 64-bits little-endian x86_64 image.
    fn new() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            is_32_bits: false,
            cputype: 0x01000007,
            ncmds: None,
            commands: Vec::new(),
            data: Vec::new(),
        }
    }

    fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    fn is_32_bits(mut self, yes: bool) -> Self {
        self.is_32_bits = yes;
        self
    }

    fn cputype(mut self, cputype: u32) -> Self {
        self.cputype = cputype;
        self
    }

    /// Overrides the number of commands declared in the header.
    fn ncmds(mut self, ncmds: u32) -> Self {
        self.ncmds = Some(ncmds);
        self
    }

    fn u32(&self, value: u32) -> [u8; 4] {
        match self.byte_order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    fn u64(&self, value: u64) -> [u8; 8] {
        match self.byte_order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    /// Encodes a 32-bits or 64-bits integer, depending on the image type.
    fn uint(&self, value: u64) -> Vec<u8> {
        if self.is_32_bits {
            self.u32(value as u32).to_vec()
        } else {
            self.u64(value).to_vec()
        }
    }

    /// Adds a command with the given body. The `cmd` and `cmdsize` fields
    /// are prepended to the body.
    fn command(self, cmd: u32, body: &[u8]) -> Self {
        let size = (body.len() + 8) as u32;
        self.raw_command(cmd, size, body)
    }

    /// Same as [`Builder::command`] but with an arbitrary `cmdsize`.
    fn raw_command(mut self, cmd: u32, cmdsize: u32, body: &[u8]) -> Self {
        let mut command = Vec::new();
        command.extend(self.u32(cmd));
        command.extend(self.u32(cmdsize));
        command.extend(body);
        self.commands.push(command);
        self
    }

    fn segment(
        self,
        name: &str,
        vmaddr: u64,
        vmsize: u64,
        fileoff: u64,
        filesize: u64,
    ) -> Self {
        let (cmd, body) =
            self.segment_body(name, vmaddr, vmsize, fileoff, filesize, 0);
        self.command(cmd, &body)
    }

    fn segment_body(
        &self,
        name: &str,
        vmaddr: u64,
        vmsize: u64,
        fileoff: u64,
        filesize: u64,
        nsects: u32,
    ) -> (u32, Vec<u8>) {
        let mut body = name16(name).to_vec();
        body.extend(self.uint(vmaddr));
        body.extend(self.uint(vmsize));
        body.extend(self.uint(fileoff));
        body.extend(self.uint(filesize));
        body.extend(self.u32(7)); // maxprot
        body.extend(self.u32(5)); // initprot
        body.extend(self.u32(nsects));
        body.extend(self.u32(0)); // flags
        let cmd = if self.is_32_bits { LC_SEGMENT } else { LC_SEGMENT_64 };
        (cmd, body)
    }

    fn dylib(self, cmd: u32, name: &str, current_version: u32) -> Self {
        let mut body = Vec::new();
        body.extend(self.u32(24)); // offset
        body.extend(self.u32(0)); // timestamp
        body.extend(self.u32(current_version));
        body.extend(self.u32(0x10000)); // compatibility_version
        body.extend(name.as_bytes());
        body.push(0);
        while (body.len() + 8) % 8 != 0 {
            body.push(0);
        }
        self.command(cmd, &body)
    }

    /// Adds a `LC_DYLD_INFO_ONLY` command. Each pair is the offset and
    /// size of the rebase, bind, weak bind, lazy bind and export regions.
    fn dyld_info(self, regions: [(u32, u32); 5]) -> Self {
        let mut body = Vec::new();
        for (offset, size) in regions {
            body.extend(self.u32(offset));
            body.extend(self.u32(size));
        }
        self.command(LC_DYLD_INFO_ONLY, &body)
    }

    /// Appends bytes after the commands. Returns their offset and size.
    fn data(&mut self, bytes: &[u8]) -> (u32, u32) {
        let offset = DATA_OFFSET + self.data.len() as u32;
        self.data.extend(bytes);
        (offset, bytes.len() as u32)
    }

    fn build(&self) -> Vec<u8> {
        let magic: u32 =
            if self.is_32_bits { MH_MAGIC } else { MH_MAGIC_64 };

        let sizeofcmds: usize = self.commands.iter().map(Vec::len).sum();
        let ncmds = self.ncmds.unwrap_or(self.commands.len() as u32);

        let mut image = Vec::new();
        image.extend(self.u32(magic));
        image.extend(self.u32(self.cputype));
        image.extend(self.u32(3)); // cpusubtype
        image.extend(self.u32(2)); // filetype
        image.extend(self.u32(ncmds));
        image.extend(self.u32(sizeofcmds as u32));
        image.extend(self.u32(0)); // flags
        if !self.is_32_bits {
            image.extend(self.u32(0)); // reserved
        }

        for command in &self.commands {
            image.extend(command);
        }

        if !self.data.is_empty() {
            assert!(image.len() <= DATA_OFFSET as usize);
            image.resize(DATA_OFFSET as usize, 0);
            image.extend(&self.data);
        }

        image
    }
}

fn name16(name: &str) -> [u8; 16] {
    let mut bytes = [0; 16];
    bytes[..name.len()].copy_from_slice(name.as_bytes());
    bytes
}

/// Builds a fat binary where each member starts at a multiple of 0x100.
fn fat(is_64_bits: bool, members: &[(u32, &[u8])]) -> Vec<u8> {
    let magic: u32 = if is_64_bits { FAT_MAGIC_64 } else { FAT_MAGIC };

    let mut table = Vec::new();
    let mut offset = 0x100_usize;
    let mut offsets = Vec::new();

    table.extend(magic.to_be_bytes());
    table.extend((members.len() as u32).to_be_bytes());

    for (cputype, data) in members {
        table.extend(cputype.to_be_bytes());
        table.extend(3_u32.to_be_bytes());
        if is_64_bits {
            table.extend((offset as u64).to_be_bytes());
            table.extend((data.len() as u64).to_be_bytes());
        } else {
            table.extend((offset as u32).to_be_bytes());
            table.extend((data.len() as u32).to_be_bytes());
        }
        table.extend(8_u32.to_be_bytes());
        if is_64_bits {
            table.extend(0_u32.to_be_bytes());
        }
        offsets.push(offset);
        offset = (offset + data.len() + 0xff) & !0xff;
    }

    let mut fat = table;

    for ((_, data), offset) in members.iter().zip(offsets) {
        fat.resize(offset, 0);
        fat.extend(*data);
    }

    fat
}

/// Image with a single segment at virtual address 0x1000 and the given
/// bind region.
fn with_bind_region(stream: &[u8], lazy: bool) -> (Vec<u8>, u32) {
    let mut builder = Builder::new();
    let (offset, size) = builder.data(stream);

    let regions = if lazy {
        [(0, 0), (0, 0), (0, 0), (offset, size), (0, 0)]
    } else {
        [(0, 0), (offset, size), (0, 0), (0, 0), (0, 0)]
    };

    let image = builder
        .segment("__DATA", 0x1000, 0x1000, 0, 0)
        .dyld_info(regions)
        .build();

    (image, offset)
}

fn with_rebase_region(stream: &[u8]) -> (Vec<u8>, u32) {
    let mut builder = Builder::new();
    let (offset, size) = builder.data(stream);

    let image = builder
        .segment("__DATA", 0x1000, 0x1000, 0, 0)
        .dyld_info([(offset, size), (0, 0), (0, 0), (0, 0), (0, 0)])
        .build();

    (image, offset)
}

/// Image with a `__TEXT` segment at 0x100000000 and the given export trie.
fn with_export_trie(trie: &[u8]) -> Vec<u8> {
    let mut builder = Builder::new();
    let (offset, size) = builder.data(trie);

    builder
        .segment("__TEXT", 0x100000000, 0x1000, 0, 0x1000)
        .dyld_info([(0, 0), (0, 0), (0, 0), (0, 0), (offset, size)])
        .build()
}

fn single<'a>(result: &'a Result<MachO<'a>, Error>) -> &'a MachOFile<'a> {
    result.as_ref().unwrap().as_file().unwrap()
}

#[test]
fn magic_detection() {
    assert_eq!(
        crate::parse(&[]),
        Err(Error::OutOfRange { offset: 0, length: 4, size: 0 })
    );

    assert_eq!(
        crate::parse(b"\x7fELF\x02\x01\x01\x00"),
        Err(Error::UnsupportedFormat { magic: 0x7f454c46 })
    );

    // A valid magic followed by a truncated header.
    assert_eq!(
        crate::parse(&[0xcf, 0xfa, 0xed, 0xfe, 0x07, 0x00]),
        Err(Error::OutOfRange { offset: 4, length: 28, size: 6 })
    );
}

#[test]
fn byte_order() {
    let little = Builder::new().build();
    let big = Builder::new().byte_order(ByteOrder::Big).build();
    let little_32 = Builder::new().is_32_bits(true).build();
    let big_32 =
        Builder::new().is_32_bits(true).byte_order(ByteOrder::Big).build();

    for (data, byte_order, is_32_bits) in [
        (&little, ByteOrder::Little, false),
        (&big, ByteOrder::Big, false),
        (&little_32, ByteOrder::Little, true),
        (&big_32, ByteOrder::Big, true),
    ] {
        let result = crate::parse(data);
        let file = single(&result);
        assert_eq!(file.byte_order(), byte_order);
        assert_eq!(file.needs_swap(), byte_order != ByteOrder::native());
        assert_eq!(file.is_32_bits(), is_32_bits);
        assert_eq!(file.header().cputype, 0x01000007);
        assert_eq!(file.header().ncmds, 0);
    }
}

#[test]
fn big_endian_segments() {
    let image = Builder::new()
        .is_32_bits(true)
        .byte_order(ByteOrder::Big)
        .cputype(0x12)
        .segment("__TEXT", 0x1000, 0x2000, 0, 0x2000)
        .segment("__DATA", 0x3000, 0x1000, 0x2000, 0x1000)
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    assert_eq!(file.segments().len(), 2);
    assert_eq!(file.segments()[1].segname, b"__DATA");
    assert_eq!(file.segments()[1].vmaddr, 0x3000);
    assert_eq!(file.segments()[1].fileoff, 0x2000);
    assert_eq!(file.segments()[1].maxprot, 7);
    assert_eq!(file.segment_map()[&0x2000], (0x3000, 0x1000));
    assert_eq!(file.rva_to_offset(0x3010), Some(0x2010));
}

#[test]
fn rva_with_overflowing_segment() {
    let image = Builder::new()
        .segment("__BAD", 0xffff_ffff_ffff_f000, 0x2000, 0, 0)
        .segment("__TEXT", 0x1000, 0x1000, 0x400, 0x1000)
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    assert_eq!(file.rva_to_offset(0x1010), Some(0x410));
    assert_eq!(file.rva_to_offset(0xffff_ffff_ffff_f010), None);
}

#[test]
fn incorrect_number_of_sections() {
    let builder = Builder::new();
    // The segment declares 3 sections but there's room for none.
    let (cmd, body) =
        builder.segment_body("__TEXT", 0x1000, 0x1000, 0, 0, 3);
    let image = builder.command(cmd, &body).build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::IncorrectCommandSize {
            cmd: LC_SEGMENT_64,
            size: 72,
            expected: 72 + 3 * 80,
        })
    );
}

#[test]
fn command_sizes() {
    let image = Builder::new().raw_command(0x12345, 4, &[]).build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::InvalidCommandSize { cmd: 0x12345, size: 4, min: 8 })
    );

    let image = Builder::new().command(LC_UUID, &[0; 8]).build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::InvalidCommandSize { cmd: LC_UUID, size: 16, min: 24 })
    );

    // The header declares two commands, but there's only one.
    let image = Builder::new().command(LC_UUID, &[0; 16]).ncmds(2).build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::TruncatedCommand { offset: 32 + 24 })
    );

    // The command says it's larger than the rest of the file.
    let image = Builder::new().raw_command(LC_UUID, 64, &[0; 16]).build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::TruncatedCommand { offset: 32 })
    );
}

#[test]
fn unknown_commands() {
    let image = Builder::new()
        .command(0x12345, &[0xaa; 8])
        .command(LC_UUID, &[0x11; 16])
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    assert_eq!(file.commands().len(), 2);
    assert_eq!(file.commands()[0].cmd, 0x12345);
    assert_eq!(file.commands()[0].cmdsize, 16);
    assert_eq!(file.commands()[1].offset, 32 + 16);
    assert_eq!(file.uuid(), Some(&[0x11; 16][..]));
}

#[test]
fn dylibs() {
    let image = Builder::new()
        .dylib(LC_ID_DYLIB, "@rpath/libfoo.dylib", 0x00010203)
        .dylib(LC_LOAD_DYLIB, "/usr/lib/libc++.1.dylib", 0x04b00100)
        .dylib(LC_LOAD_WEAK_DYLIB, "/usr/lib/libweak.dylib", 0)
        .dylib(LC_REEXPORT_DYLIB, "/usr/lib/libre.dylib", 0)
        .dylib(LC_LAZY_LOAD_DYLIB, "/usr/lib/liblazy.dylib", 0)
        .command(LC_RPATH, b"\x0c\0\0\0@loader_path/../Frameworks\0\0\0\0")
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    let kinds: Vec<DylibKind> =
        file.dylibs().iter().map(|dylib| dylib.kind).collect();

    assert_eq!(
        kinds,
        [
            DylibKind::Id,
            DylibKind::Load,
            DylibKind::LoadWeak,
            DylibKind::Reexport,
            DylibKind::LazyLoad,
        ]
    );

    let id = &file.dylibs()[0];
    assert_eq!(id.install_name(), b"@rpath/libfoo.dylib");
    assert_eq!(id.current_version.major, 1);
    assert_eq!(id.current_version.minor, 2);
    assert_eq!(id.current_version.patch, 3);

    // Only the lowest byte of the major version is used.
    let libcxx = &file.dylibs()[1];
    assert_eq!(libcxx.current_version.raw, 0x04b00100);
    assert_eq!(libcxx.current_version.to_string(), "176.1.0");

    assert_eq!(file.rpaths().len(), 1);
    assert_eq!(file.rpaths()[0].path(), b"@loader_path/../Frameworks");
}

#[test]
fn min_version() {
    let builder = Builder::new();
    let mut body = builder.u32(0x000a0e00).to_vec();
    body.extend(builder.u32(0x000a0e04));
    let image = builder.command(LC_VERSION_MIN_MACOSX, &body).build();

    let result = crate::parse(&image);
    let min_version = single(&result).min_version().unwrap();

    assert_eq!(min_version.cmd, LC_VERSION_MIN_MACOSX);
    assert_eq!(min_version.version.to_string(), "10.14.0");
    assert_eq!(min_version.sdk.to_string(), "10.14.4");
}

#[test]
fn build_version_tools() {
    let builder = Builder::new();
    let mut body = Vec::new();
    body.extend(builder.u32(1)); // platform
    body.extend(builder.u32(0x000b0000)); // minos
    body.extend(builder.u32(0x000b0000)); // sdk
    body.extend(builder.u32(2)); // ntools
    let image = builder.command(LC_BUILD_VERSION, &body).build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::IncorrectCommandSize {
            cmd: LC_BUILD_VERSION,
            size: 24,
            expected: 40,
        })
    );
}

#[test]
fn x86_64_thread() {
    let builder = Builder::new();

    let mut body = Vec::new();
    body.extend(builder.u32(4)); // x86_THREAD_STATE64
    body.extend(builder.u32(42));
    for i in 0..21 {
        // rip is the 17th register.
        let value = if i == 16 { 0x100000f00 } else { i };
        body.extend(builder.u64(value));
    }

    let image = builder
        .segment("__TEXT", 0x100000000, 0x1000, 0, 0x1000)
        .command(LC_UNIXTHREAD, &body)
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    assert_eq!(file.threads().len(), 1);

    let thread = &file.threads()[0];
    assert_eq!(thread.cmd, LC_UNIXTHREAD);
    assert_eq!(thread.states.len(), 1);
    assert_eq!(thread.states[0].flavor, 4);
    assert_eq!(thread.states[0].state.len(), 168);
    assert_eq!(thread.entry_point, Some(0x100000f00));
    assert!(file.entry_point().is_none());
    assert_eq!(file.entry_point_offset(), Some(0xf00));
}

#[test]
fn thread_states() {
    let builder = Builder::new().cputype(0x12);

    // Two states for an unknown CPU type, the second one is truncated.
    let mut body = Vec::new();
    body.extend(builder.u32(1));
    body.extend(builder.u32(2));
    body.extend([0xaa_u8; 8]);
    body.extend(builder.u32(7));
    body.extend(builder.u32(0));

    let image = builder.command(LC_THREAD, &body).build();
    let result = crate::parse(&image);
    let thread = &single(&result).threads()[0];

    assert_eq!(thread.states.len(), 2);
    assert_eq!(thread.states[0].state, &[0xaa; 8]);
    assert_eq!(thread.states[1].flavor, 7);
    assert!(thread.states[1].state.is_empty());
    assert_eq!(thread.entry_point, None);

    // The count says there are 16 words, but there are only 2.
    let builder = Builder::new();
    let mut body = Vec::new();
    body.extend(builder.u32(4));
    body.extend(builder.u32(16));
    body.extend([0_u8; 8]);

    let image = builder.command(LC_UNIXTHREAD, &body).build();

    assert!(matches!(crate::parse(&image), Err(Error::OutOfRange { .. })));
}

#[test]
fn bind_done() {
    let stream = [
        0x70, 0x10, // SET_SEGMENT_AND_OFFSET_ULEB (segment 0, offset 0x10)
        0x11, // SET_DYLIB_ORDINAL_IMM (1)
        0x40, b'_', b'f', b'o', b'o', 0x00, // SET_SYMBOL_TRAILING_FLAGS_IMM
        0x90, // DO_BIND
        0x00, // DONE
        0x90, // DO_BIND
    ];

    let (image, offset) = with_bind_region(&stream, false);
    let result = crate::parse(&image);
    let file = single(&result);

    assert_eq!(file.binds().len(), 1);

    let bind = &file.binds()[0];
    assert_eq!(bind.kind, BindKind::Bind);
    assert_eq!(bind.address, 0x1010);
    assert_eq!(bind.symbol, Some(&b"_foo"[..]));
    assert_eq!(bind.library_ordinal, 1);
    assert_eq!(bind.offset, u64::from(offset) + 9);
    assert_eq!(bind.pointer_size, 8);

    // In the lazy bind region DONE doesn't stop the interpreter.
    let (image, _) = with_bind_region(&stream, true);
    let result = crate::parse(&image);
    let file = single(&result);

    assert!(file.binds().is_empty());
    assert_eq!(file.lazy_binds().len(), 2);
    assert_eq!(file.lazy_binds()[0].kind, BindKind::LazyBind);
    assert_eq!(file.lazy_binds()[0].address, 0x1010);
    assert_eq!(file.lazy_binds()[1].address, 0x1018);
}

#[test]
fn bind_special_ordinals() {
    let stream = [
        0x70, 0x00, // SET_SEGMENT_AND_OFFSET_ULEB
        0x40, b'_', b'a', 0x00, // SET_SYMBOL_TRAILING_FLAGS_IMM
        0x30, 0x90, // SET_DYLIB_SPECIAL_IMM (0), DO_BIND
        0x3f, 0x90, // SET_DYLIB_SPECIAL_IMM (-1), DO_BIND
        0x3e, 0x90, // SET_DYLIB_SPECIAL_IMM (-2), DO_BIND
        0x00,
    ];

    let (image, _) = with_bind_region(&stream, false);
    let result = crate::parse(&image);

    let ordinals: Vec<i64> = single(&result)
        .binds()
        .iter()
        .map(|bind| bind.library_ordinal)
        .collect();

    assert_eq!(ordinals, [0, -1, -2]);
}

#[test]
fn bind_opcodes() {
    let stream = [
        0x20, 0xac, 0x02, // SET_DYLIB_ORDINAL_ULEB (300)
        0x51, // SET_TYPE_IMM (1)
        0x60, 0x78, // SET_ADDEND_SLEB (-8)
        0x41, b'_', b'w', 0x00, // SET_SYMBOL_TRAILING_FLAGS_IMM (1)
        0x70, 0x00, // SET_SEGMENT_AND_OFFSET_ULEB (segment 0, offset 0)
        0x80, 0x20, // ADD_ADDR_ULEB (0x20)
        0xa0, 0x10, // DO_BIND_ADD_ADDR_ULEB (0x10)
        0xb2, // DO_BIND_ADD_ADDR_IMM_SCALED (2)
        0xc0, 0x02, 0x08, // DO_BIND_ULEB_TIMES_SKIPPING_ULEB (2, 8)
        0x00,
    ];

    // The stream is used as a weak bind region. The bind and export
    // regions have a zero size or offset, so they are ignored.
    let mut builder = Builder::new();
    let (offset, size) = builder.data(&stream);

    let image = builder
        .segment("__DATA", 0x1000, 0x1000, 0, 0)
        .dyld_info([(0, 0), (offset, 0), (offset, size), (0, 0), (0, size)])
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    let addresses: Vec<u64> =
        file.weak_binds().iter().map(|bind| bind.address).collect();

    assert_eq!(addresses, [0x1020, 0x1038, 0x1050, 0x1060]);

    for bind in file.weak_binds() {
        assert_eq!(bind.kind, BindKind::WeakBind);
        assert_eq!(bind.library_ordinal, 300);
        assert_eq!(bind.bind_type, 1);
        assert_eq!(bind.addend, -8);
        assert_eq!(bind.symbol, Some(&b"_w"[..]));
        assert_eq!(bind.symbol_flags, 1);
    }

    // Both records produced by the last opcode have the same offset.
    assert_eq!(file.weak_binds()[2].offset, u64::from(offset) + 17);
    assert_eq!(file.weak_binds()[3].offset, u64::from(offset) + 17);

    assert!(file.binds().is_empty());
    assert!(file.exports().is_empty());
}

#[test]
fn bind_errors() {
    let (image, offset) = with_bind_region(&[0x11, 0xd0], false);

    assert_eq!(
        crate::parse(&image),
        Err(Error::UnknownBindOpcode {
            opcode: 0xd0,
            offset: u64::from(offset) + 1,
        })
    );

    let (image, _) = with_bind_region(&[0x75, 0x00, 0x90], false);

    assert_eq!(
        crate::parse(&image),
        Err(Error::SegmentIndexOutOfRange { index: 5, count: 1 })
    );

    // Unterminated symbol name.
    let (image, _) = with_bind_region(&[0x40, b'_', b'x'], false);

    assert!(matches!(crate::parse(&image), Err(Error::OutOfRange { .. })));

    // ULEB128 value that doesn't fit in 64 bits.
    let mut stream = vec![0x20];
    stream.extend([0x80_u8; 10]);
    stream.push(0x01);

    let (image, offset) = with_bind_region(&stream, false);

    assert_eq!(
        crate::parse(&image),
        Err(Error::MalformedVarint { offset: u64::from(offset) + 1 })
    );
}

#[test]
fn rebase_opcodes() {
    let stream = [
        0x11, // SET_TYPE_IMM (1)
        0x20, 0x00, // SET_SEGMENT_AND_OFFSET_ULEB (segment 0, offset 0)
        0x53, // DO_REBASE_IMM_TIMES (3)
        0x30, 0x10, // ADD_ADDR_ULEB (0x10)
        0x41, // ADD_ADDR_IMM_SCALED (1)
        0x60, 0x02, // DO_REBASE_ULEB_TIMES (2)
        0x70, 0x08, // DO_REBASE_ADD_ADDR_ULEB (8)
        0x80, 0x02, 0x08, // DO_REBASE_ULEB_TIMES_SKIPPING_ULEB (2, 8)
        0x00, // DONE
        0x51, // DO_REBASE_IMM_TIMES (1)
    ];

    let (image, offset) = with_rebase_region(&stream);
    let result = crate::parse(&image);
    let file = single(&result);

    let addresses: Vec<u64> =
        file.rebases().iter().map(|rebase| rebase.address).collect();

    assert_eq!(
        addresses,
        [0x1000, 0x1008, 0x1010, 0x1030, 0x1038, 0x1040, 0x1050, 0x1060]
    );

    let rebase = &file.rebases()[0];
    assert_eq!(rebase.kind, BindKind::Rebase);
    assert_eq!(rebase.bind_type, 1);
    assert_eq!(rebase.symbol, None);
    assert_eq!(rebase.offset, u64::from(offset) + 3);
    assert_eq!(file.rebases()[7].offset, u64::from(offset) + 11);
}

#[test]
fn rebase_32_bits() {
    let mut builder = Builder::new().is_32_bits(true).cputype(7);
    let (offset, size) = builder.data(&[0x20, 0x00, 0x52, 0x00]);

    let image = builder
        .segment("__DATA", 0x2000, 0x1000, 0, 0)
        .dyld_info([(offset, size), (0, 0), (0, 0), (0, 0), (0, 0)])
        .build();

    let result = crate::parse(&image);
    let file = single(&result);

    let addresses: Vec<(u64, u8)> = file
        .rebases()
        .iter()
        .map(|rebase| (rebase.address, rebase.pointer_size))
        .collect();

    assert_eq!(addresses, [(0x2000, 4), (0x2004, 4)]);
}

#[test]
fn rebase_errors() {
    let (image, offset) = with_rebase_region(&[0x11, 0x90]);

    assert_eq!(
        crate::parse(&image),
        Err(Error::UnknownRebaseOpcode {
            opcode: 0x90,
            offset: u64::from(offset) + 1,
        })
    );

    // DO_REBASE_ULEB_TIMES with a huge count fails without producing any
    // record.
    let (image, _) =
        with_rebase_region(&[0x20, 0x00, 0x60, 0xff, 0xff, 0xff, 0xff, 0x0f]);

    assert_eq!(
        crate::parse(&image),
        Err(Error::TooManyRecords { limit: 1 << 20 })
    );

    let (image, _) = with_rebase_region(&[0x20, 0x00, 0x60, 0x03]);

    let config = ParserConfig { max_region_records: 2, ..Default::default() };

    assert_eq!(
        Parser::new().config(config).parse(&image),
        Err(Error::TooManyRecords { limit: 2 })
    );
}

#[test]
fn first_region_error() {
    let mut builder = Builder::new();
    let (rebase_offset, rebase_size) = builder.data(&[0x90]);
    let (bind_offset, bind_size) = builder.data(&[0xd0]);

    let image = builder
        .segment("__DATA", 0x1000, 0x1000, 0, 0)
        .dyld_info([
            (rebase_offset, rebase_size),
            (bind_offset, bind_size),
            (0, 0),
            (0, 0),
            (0x10000, 4),
        ])
        .build();

    assert_eq!(
        crate::parse(&image),
        Err(Error::UnknownRebaseOpcode {
            opcode: 0x90,
            offset: u64::from(rebase_offset),
        })
    );

    // Only the export region is outside the file.
    let image = Builder::new()
        .dyld_info([(0, 0), (0, 0), (0, 0), (0, 0), (0x10000, 4)])
        .build();

    assert!(matches!(
        crate::parse(&image),
        Err(Error::OutOfRange { offset: 0x10000, length: 4, .. })
    ));
}

#[test]
fn segments_after_dyld_info() {
    let mut builder = Builder::new();
    let (offset, size) = builder.data(&[0x70, 0x08, 0x90, 0x00]);

    // Segments are resolved after all commands are known.
    let image = builder
        .dyld_info([(0, 0), (offset, size), (0, 0), (0, 0), (0, 0)])
        .segment("__DATA", 0x4000, 0x1000, 0, 0)
        .build();

    let result = crate::parse(&image);

    assert_eq!(single(&result).binds()[0].address, 0x4008);
}

#[test]
fn export_kinds() {
    let trie = [
        // root
        0x00, 0x03, //
        b'_', b'm', b'a', b'i', b'n', 0x00, 17, //
        b'_', b'r', 0x00, 22, //
        b'_', b's', 0x00, 29, //
        // _main: weak definition at offset 0x400
        0x03, 0x04, 0x80, 0x08, 0x00, //
        // _r: re-exported from library 2 as _b
        0x05, 0x08, 0x02, b'_', b'b', 0x00, 0x00, //
        // _s: stub at 0x100 with resolver at 0x200
        0x05, 0x10, 0x80, 0x02, 0x80, 0x04, 0x00,
    ];

    let image = with_export_trie(&trie);
    let result = crate::parse(&image);
    let exports = single(&result).exports();

    assert_eq!(exports.len(), 3);

    assert_eq!(exports[0].name, "_main");
    assert_eq!(exports[0].offset, 0x400);
    assert_eq!(exports[0].address, 0x100000400);
    assert_eq!(exports[0].kind, ExportKind::Regular);
    assert!(exports[0].is_weak_definition());

    assert_eq!(exports[1].name, "_r");
    assert_eq!(exports[1].offset, 0);
    assert_eq!(exports[1].address, 0x100000000);
    assert_eq!(
        exports[1].kind,
        ExportKind::Reexport { ordinal: 2, import_name: b"_b" }
    );
    assert!(!exports[1].is_weak_definition());

    assert_eq!(exports[2].name, "_s");
    assert_eq!(exports[2].offset, 0x100);
    assert_eq!(exports[2].address, 0x100000100);
    assert_eq!(
        exports[2].kind,
        ExportKind::StubAndResolver { resolver_offset: 0x200 }
    );
}

#[test]
fn export_order() {
    let trie = [
        // root: children "b" and "a", in that order
        0x00, 0x02, b'b', 0x00, 8, b'a', 0x00, 12, //
        // "b"
        0x02, 0x00, 0x10, 0x00, //
        // "a", with a child "x"
        0x02, 0x00, 0x20, 0x01, b'x', 0x00, 19, //
        // "ax"
        0x02, 0x00, 0x30, 0x00,
    ];

    let image = with_export_trie(&trie);
    let result = crate::parse(&image);

    let names: Vec<String> = single(&result)
        .exports()
        .iter()
        .map(|export| export.name.to_string())
        .collect();

    assert_eq!(names, ["b", "a", "ax"]);
}

#[test]
fn export_cycles() {
    // The root is a terminal node with a child that points to the root.
    let trie = [0x02, 0x00, 0x00, 0x01, b'x', 0x00, 0x00];

    let image = with_export_trie(&trie);
    let result = crate::parse(&image);
    let exports = single(&result).exports();

    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].name, "");
    assert_eq!(exports[0].address, 0x100000000);
}

#[test]
fn export_depth() {
    // A chain of nodes, each one the only child of the previous one.
    let mut trie = Vec::new();
    for i in 0..4_u8 {
        trie.extend([0x00, 0x01, b'a', 0x00, 5 * (i + 1)]);
    }
    trie.extend([0x02, 0x00, 0x00, 0x00]);

    let image = with_export_trie(&trie);

    let result = crate::parse(&image);
    assert_eq!(single(&result).exports()[0].name, "aaaa");

    let config = ParserConfig { max_export_depth: 2, ..Default::default() };

    assert_eq!(
        Parser::new().config(config).parse(&image),
        Err(Error::ExportTrieTooDeep { depth: 3 })
    );
}

#[test]
fn export_limit() {
    // Two terminal nodes.
    let trie = [
        0x02, 0x00, 0x00, 0x01, b'x', 0x00, 7, //
        0x02, 0x00, 0x01, 0x00,
    ];

    let image = with_export_trie(&trie);

    let config = ParserConfig { max_region_records: 1, ..Default::default() };

    assert_eq!(
        Parser::new().config(config).parse(&image),
        Err(Error::TooManyRecords { limit: 1 })
    );
}

#[test]
fn export_large_terminal() {
    // The terminal size (130) takes two bytes.
    let mut trie = vec![0x82, 0x01, 0x00, 0x10];
    trie.resize(2 + 130, 0xcc);
    // One child at offset 137.
    trie.extend([0x01, b'x', 0x00, 0x89, 0x01]);
    trie.extend([0x02, 0x00, 0x20, 0x00]);

    let image = with_export_trie(&trie);
    let result = crate::parse(&image);
    let exports = single(&result).exports();

    assert_eq!(exports.len(), 2);
    assert_eq!(exports[0].name, "");
    assert_eq!(exports[0].offset, 0x10);
    assert_eq!(exports[1].name, "x");
    assert_eq!(exports[1].offset, 0x20);
}

#[test]
fn export_long_labels() {
    // Encodes `value` as a ULEB128 padded to three bytes.
    let uleb = |value: u32| {
        [
            0x80 | (value & 0x7f) as u8,
            0x80 | ((value >> 7) & 0x7f) as u8,
            (value >> 14) as u8,
        ]
    };

    const LABEL_LEN: usize = 16384;
    const CHAIN_LEN: u32 = 127;
    const NODE_SIZE: u32 = 2 + 254 * 2 + 1 + 3;

    // The root has a single child with a long label.
    let mut trie = vec![0x00, 0x01];
    trie.extend(std::iter::repeat(b'A').take(LABEL_LEN));
    trie.push(0x00);

    let first = trie.len() as u32 + 3;
    trie.extend(uleb(first));

    // A chain of nodes with 255 children each. All the children except the
    // last one point back to the root.
    for i in 0..CHAIN_LEN {
        trie.extend([0x00, 0xff]);
        for _ in 0..254 {
            trie.extend([0x00, 0x00]);
        }
        trie.push(0x00);
        trie.extend(uleb(first + (i + 1) * NODE_SIZE));
    }

    assert_eq!(trie.len() as u32, first + CHAIN_LEN * NODE_SIZE);

    // The last node in the chain is a terminal.
    trie.extend([0x02, 0x00, 0x30, 0x00]);

    let image = with_export_trie(&trie);
    let result = crate::parse(&image);
    let exports = single(&result).exports();

    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].name.len(), LABEL_LEN);
    assert!(exports[0].name.iter().all(|c| *c == b'A'));
    assert_eq!(exports[0].offset, 0x30);

    // Nodes shared by many parents are reported once.
    let trie = [
        // root: two children pointing to the same node
        0x00, 0x02, b'a', 0x00, 8, b'b', 0x00, 8, //
        0x02, 0x00, 0x40, 0x00,
    ];

    let image = with_export_trie(&trie);
    let result = crate::parse(&image);
    let names: Vec<String> = single(&result)
        .exports()
        .iter()
        .map(|export| export.name.to_string())
        .collect();

    assert_eq!(names, ["a"]);
}

#[test]
fn symbol_names() {
    let mut builder = Builder::new();

    let mut nlist = Vec::new();
    for (strx, value) in [(1_u32, 0x1000_u64), (0x100, 0x2000)] {
        nlist.extend(builder.u32(strx));
        nlist.extend([0x0f_u8, 0x01]);
        nlist.extend(0_u16.to_le_bytes());
        nlist.extend(builder.u64(value));
    }

    let (symoff, _) = builder.data(&nlist);
    let (stroff, strsize) = builder.data(b"\0_start\0");

    let mut body = Vec::new();
    body.extend(builder.u32(symoff));
    body.extend(builder.u32(2));
    body.extend(builder.u32(stroff));
    body.extend(builder.u32(strsize));

    let image = builder.command(LC_SYMTAB, &body).build();
    let result = crate::parse(&image);
    let symbols = single(&result).symbols();

    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0].name, Some(&b"_start"[..]));
    assert_eq!(symbols[0].n_type, 0x0f);
    assert_eq!(symbols[0].n_sect, 1);
    assert_eq!(symbols[0].n_value, 0x1000);
    // The index is outside the string table.
    assert_eq!(symbols[1].name, None);
    assert_eq!(symbols[1].n_strx, 0x100);

    // The symbol table is outside the file.
    let builder = Builder::new();
    let mut body = Vec::new();
    body.extend(builder.u32(0x10000));
    body.extend(builder.u32(1));
    body.extend(builder.u32(0));
    body.extend(builder.u32(0));

    let image = builder.command(LC_SYMTAB, &body).build();

    assert!(matches!(crate::parse(&image), Err(Error::OutOfRange { .. })));
}

#[test]
fn fat_members() {
    let first = Builder::new().segment("__TEXT", 0x1000, 0x1000, 0, 0).build();
    let second = Builder::new()
        .is_32_bits(true)
        .cputype(7)
        .command(LC_UUID, &[0x22; 16])
        .build();

    let data = fat(false, &[(0x01000007, &first[..]), (7, &second[..])]);

    let result = crate::parse(&data);
    let fat = result.as_ref().unwrap().as_fat().unwrap();

    assert_eq!(fat.members.len(), 2);
    assert_eq!(fat.members[0].arch.offset, 0x100);
    assert_eq!(fat.members[0].arch.size, first.len() as u64);
    assert_eq!(fat.members[0].arch.align, 8);
    assert_eq!(fat.members[1].arch.offset, 0x200);

    let files = result.as_ref().unwrap().files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].base_offset(), 0x100);
    assert_eq!(files[0].commands()[0].offset, 0x100 + 32);
    assert_eq!(files[0].segments()[0].segname, b"__TEXT");
    assert_eq!(files[1].base_offset(), 0x200);
    assert_eq!(files[1].uuid(), Some(&[0x22; 16][..]));
}

#[test]
fn fat_64() {
    let member = Builder::new().build();
    let data = fat(true, &[(0x0100000c, &member[..])]);

    let result = crate::parse(&data);
    let fat = result.as_ref().unwrap().as_fat().unwrap();

    assert_eq!(fat.magic, FAT_MAGIC_64);
    assert!(fat.is_64_bits);
    assert_eq!(fat.members[0].arch.cputype, 0x0100000c);
    assert_eq!(fat.members[0].arch.reserved, Some(0));
    assert!(fat.members[0].image.is_ok());
}

#[test]
fn fat_isolation() {
    let good = Builder::new().command(LC_UUID, &[0x33; 16]).build();
    let bad = Builder::new().raw_command(LC_UUID, 4, &[]).build();

    let data = fat(false, &[(7, &bad[..]), (0x01000007, &good[..])]);

    let result = crate::parse(&data);
    let fat = result.as_ref().unwrap().as_fat().unwrap();

    assert_eq!(
        fat.members[0].image,
        Err(Error::InvalidCommandSize { cmd: LC_UUID, size: 4, min: 8 })
    );

    let files = result.as_ref().unwrap().files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].uuid(), Some(&[0x33; 16][..]));
}

#[test]
fn fat_errors() {
    // The table says there are 100 architectures.
    let mut data = FAT_MAGIC.to_be_bytes().to_vec();
    data.extend(100_u32.to_be_bytes());
    data.extend([0_u8; 40]);

    assert_eq!(
        crate::parse(&data),
        Err(Error::OutOfRange { offset: 8, length: 2000, size: 48 })
    );

    // A member that is not a Mach-O file.
    let data = fat(false, &[(7, &b"\x7fELF"[..])]);
    let result = crate::parse(&data);
    let fat = result.as_ref().unwrap().as_fat().unwrap();

    assert_eq!(
        fat.members[0].image,
        Err(Error::UnsupportedFormat { magic: 0x7f454c46 })
    );
}

#[test]
fn fat_nesting() {
    let member = Builder::new().build();
    let inner = fat(false, &[(0x01000007, &member[..])]);
    let outer = fat(false, &[(0x01000007, &inner[..])]);

    let result = crate::parse(&outer);
    let fat = result.as_ref().unwrap().as_fat().unwrap();

    assert_eq!(fat.members[0].image, Err(Error::NestingTooDeep { depth: 1 }));

    let config = ParserConfig { max_fat_depth: 2, ..Default::default() };
    let result = Parser::new().config(config).parse(&outer);
    let files = result.as_ref().unwrap().files();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].base_offset(), 0x200);
}

#[test]
fn deterministic() {
    let mut builder = Builder::new();
    let (offset, size) = builder.data(&[0x70, 0x08, 0x90, 0x00]);
    let image = builder
        .segment("__DATA", 0x4000, 0x1000, 0, 0)
        .dyld_info([(0, 0), (offset, size), (0, 0), (0, 0), (0, 0)])
        .build();

    let data =
        fat(false, &[(0x01000007, &image[..]), (0x01000007, &image[..])]);

    let first = crate::parse(&data);
    let second = crate::parse(&data);

    assert_eq!(first, second);

    let files = first.as_ref().unwrap().files();
    assert_eq!(files[0].binds()[0].address, files[1].binds()[0].address);
    assert_ne!(files[0].binds()[0].offset, files[1].binds()[0].offset);
}
