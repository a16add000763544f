use nom::number::complete::{u32, u64};
use nom::sequence::tuple;
use serde::Serialize;

use crate::macho::*;
use crate::{Buffer, Error};

/// Mach-O CPU types
pub(crate) const CPU_TYPE_X86: u32 = 0x00000007;
pub(crate) const CPU_TYPE_X86_64: u32 = 0x01000007;
pub(crate) const CPU_TYPE_ARM: u32 = 0x0000000c;
pub(crate) const CPU_TYPE_ARM64: u32 = 0x0100000c;

/// Thread state flavors that contain the instruction pointer.
const X86_THREAD_STATE32: u32 = 1;
const X86_THREAD_STATE64: u32 = 4;
const ARM_THREAD_STATE: u32 = 1;
const ARM_THREAD_STATE64: u32 = 6;

/// Flavors of thread states for x86 and x86_64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ThreadFlavor {
    ThreadState32,
    FloatState32,
    ExceptionState32,
    ThreadState64,
    FloatState64,
    ExceptionState64,
    ThreadState,
    FloatState,
    ExceptionState,
    DebugState32,
    DebugState64,
    DebugState,
    /// A flavor not listed above.
    Unknown(u32),
}

impl From<u32> for ThreadFlavor {
    fn from(flavor: u32) -> Self {
        match flavor {
            1 => ThreadFlavor::ThreadState32,
            2 => ThreadFlavor::FloatState32,
            3 => ThreadFlavor::ExceptionState32,
            4 => ThreadFlavor::ThreadState64,
            5 => ThreadFlavor::FloatState64,
            6 => ThreadFlavor::ExceptionState64,
            7 => ThreadFlavor::ThreadState,
            8 => ThreadFlavor::FloatState,
            9 => ThreadFlavor::ExceptionState,
            10 => ThreadFlavor::DebugState32,
            11 => ThreadFlavor::DebugState64,
            12 => ThreadFlavor::DebugState,
            other => ThreadFlavor::Unknown(other),
        }
    }
}

impl ThreadState<'_> {
    /// Interprets the flavor as one of the x86 or x86_64 flavors. The same
    /// numbers have other meanings for other CPU types.
    pub fn x86_flavor(&self) -> ThreadFlavor {
        self.flavor.into()
    }
}

impl<'a> MachOFile<'a> {
    /// Decodes a `LC_THREAD` or `LC_UNIXTHREAD` command.
    ///
    /// The command contains a sequence of thread states, each one starts
    /// with its flavor and its size in 32-bits words.
    pub(super) fn thread_command(
        &self,
        cmd: u32,
        command: &Buffer<'a>,
    ) -> Result<ThreadCommand<'a>, Error> {
        let endianness = self.endianness();

        let mut states = Vec::new();
        let mut pos = 8;

        while pos < command.len() {
            let (flavor, count) = command.decode(
                pos,
                8,
                tuple((
                    u32(endianness), // flavor
                    u32(endianness), // count
                )),
            )?;

            let size = u64::from(count) * 4;
            let state = command.offset_read(pos, 8, size)?;

            states.push(ThreadState { flavor, count, state });
            pos += 8 + size;
        }

        let entry_point =
            states.iter().find_map(|state| self.instruction_pointer(state));

        Ok(ThreadCommand { cmd, states, entry_point })
    }

    /// Returns the instruction pointer contained in the given thread
    /// state, if the state is one of the known general purpose register
    /// states for the CPU type of this file.
    fn instruction_pointer(&self, state: &ThreadState<'a>) -> Option<u64> {
        let endianness = self.endianness();
        let registers = Buffer::new(state.state);

        match (self.header.cputype, state.flavor) {
            // eip is preceded by eax, ebx, ecx, edx, edi, esi, ebp, esp,
            // ss and eflags.
            (CPU_TYPE_X86, X86_THREAD_STATE32) => registers
                .decode(10 * 4, 4, u32(endianness))
                .map(u64::from)
                .ok(),
            // rip is preceded by rax, rbx, rcx, rdx, rdi, rsi, rbp, rsp and
            // r8 to r15.
            (CPU_TYPE_X86_64, X86_THREAD_STATE64) => {
                registers.decode(16 * 8, 8, u64(endianness)).ok()
            }
            // pc is preceded by r0 to r12, sp and lr.
            (CPU_TYPE_ARM, ARM_THREAD_STATE) => registers
                .decode(15 * 4, 4, u32(endianness))
                .map(u64::from)
                .ok(),
            // pc is preceded by x0 to x28, fp, lr and sp.
            (CPU_TYPE_ARM64, ARM_THREAD_STATE64) => {
                registers.decode(32 * 8, 8, u64(endianness)).ok()
            }
            _ => None,
        }
    }
}
