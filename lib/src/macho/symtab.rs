use nom::combinator::map;
use nom::number::complete::{le_u8, u16, u32};
use nom::sequence::tuple;

use crate::macho::parser::uint;
use crate::macho::*;
use crate::{Buffer, Error};

/// Size of the `nlist` and `nlist_64` structures.
const NLIST_SIZE: u64 = 12;
const NLIST_64_SIZE: u64 = 16;

impl<'a> MachOFile<'a> {
    /// Decodes the symbol table referenced by the `LC_SYMTAB` command, if
    /// any. Symbol names are resolved from the string table.
    pub(super) fn parse_symbols(
        &mut self,
        buffer: &Buffer<'a>,
    ) -> Result<(), Error> {
        let symtab = match self.symtab {
            Some(symtab) if symtab.nsyms > 0 => symtab,
            _ => return Ok(()),
        };

        let is_32_bits = self.is_32_bits;
        let endianness = self.endianness();

        let nlist_size = if is_32_bits { NLIST_SIZE } else { NLIST_64_SIZE };

        let strings =
            buffer.sub_buffer(symtab.stroff.into(), symtab.strsize.into())?;

        let table = buffer.sub_buffer(
            symtab.symoff.into(),
            u64::from(symtab.nsyms) * nlist_size,
        )?;

        self.symbols = (0..u64::from(symtab.nsyms))
            .map(|i| {
                table.decode(
                    i * nlist_size,
                    nlist_size,
                    map(
                        tuple((
                            u32(endianness),              // n_strx
                            le_u8,                        // n_type
                            le_u8,                        // n_sect
                            u16(endianness),              // n_desc
                            uint(endianness, is_32_bits), // n_value
                        )),
                        |(n_strx, n_type, n_sect, n_desc, n_value)| Symbol {
                            name: strings.read_cstr(n_strx.into()).ok(),
                            n_strx,
                            n_type,
                            n_sect,
                            n_desc,
                            n_value,
                        },
                    ),
                )
            })
            .collect::<Result<_, _>>()?;

        Ok(())
    }
}
