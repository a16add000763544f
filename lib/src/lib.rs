/*! A bounds-checked parser for Mach-O files, written in Rust.

The parser handles both single-architecture Mach-O files and fat (a.k.a.
universal) binaries. Every access to the input goes through a bounds-checked
[`Buffer`], so malformed or truncated files produce an [`Error`] instead of
reading outside the input data.

Besides the header and load commands, the parser decodes segments and
sections, references to dynamic libraries, run paths, thread states, the
symbol table, and the information used by the dynamic linker: the records
produced by the rebase and bind opcodes and the symbols in the export trie.

# Example

```rust,no_run
# fn main() -> Result<(), Box<dyn std::error::Error>> {
let data = std::fs::read("/usr/lib/dyld")?;
let macho = machofile::parse(&data)?;

for file in macho.files() {
    println!("cputype: {:#x}", file.header().cputype);
    for dylib in file.dylibs() {
        println!("  {}", String::from_utf8_lossy(dylib.install_name()));
    }
    for export in file.exports() {
        println!("  {} @ {:#x}", export.name, export.address);
    }
}
# Ok(())
# }
```
*/

#![deny(missing_docs)]

pub use buffer::Buffer;

pub use config::load_config_from_file;
pub use config::ParserConfig;

pub use errors::Error;

pub use macho::parse;
pub use macho::BindKind;
pub use macho::BindRecord;
pub use macho::BuildTool;
pub use macho::BuildVersion;
pub use macho::ByteOrder;
pub use macho::DyldInfo;
pub use macho::Dylib;
pub use macho::DylibKind;
pub use macho::Dysymtab;
pub use macho::EntryPoint;
pub use macho::ExportKind;
pub use macho::ExportRecord;
pub use macho::FatArch;
pub use macho::FatMachO;
pub use macho::FatMember;
pub use macho::LoadCommand;
pub use macho::MachO;
pub use macho::MachOFile;
pub use macho::MachOHeader;
pub use macho::MinVersion;
pub use macho::Parser;
pub use macho::Rpath;
pub use macho::Section;
pub use macho::Segment;
pub use macho::SourceVersion;
pub use macho::Symbol;
pub use macho::Symtab;
pub use macho::ThreadCommand;
pub use macho::ThreadFlavor;
pub use macho::ThreadState;
pub use macho::Version;

pub use utils::leb128::read_sleb128;
pub use utils::leb128::read_uleb128;

mod buffer;
mod config;
mod errors;
mod macho;
mod utils;
