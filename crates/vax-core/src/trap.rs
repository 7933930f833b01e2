//! The change-mode trap boundary between guest code and the host OS shim.
//!
//! A trap carries a system-call number; the dispatcher looks up the
//! argument count, marshals longword arguments off the guest argument
//! list, and hands the request to a [`TrapService`]. Result conventions
//! follow the historical kernel ABI: success returns values in R0/R1
//! with the carry flag untouched, failure puts an error number in R0 and
//! sets carry.

use crate::fault::Fault;
use crate::state::{Cpu, Flag, AP, NBPW};
use crate::value::DataType;

/// v7-era error numbers returned through R0 on a failed call.
pub mod errno {
    #![allow(missing_docs)]
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const E2BIG: i32 = 7;
    pub const ENOEXEC: i32 = 8;
    pub const EBADF: i32 = 9;
    pub const ECHILD: i32 = 10;
    pub const EACCES: i32 = 13;
    pub const EFAULT: i32 = 14;
    pub const EBUSY: i32 = 16;
    pub const EEXIST: i32 = 17;
    pub const ENOTDIR: i32 = 20;
    pub const EISDIR: i32 = 21;
    pub const EINVAL: i32 = 22;
    pub const ENFILE: i32 = 23;
    pub const EMFILE: i32 = 24;
    pub const ENOTTY: i32 = 25;
    pub const ESPIPE: i32 = 29;
    pub const EPIPE: i32 = 32;
}

/// One system-call table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallEntry {
    /// Call number (0..=63).
    pub number: u8,
    /// Historical name.
    pub name: &'static str,
    /// Longword arguments read from the argument list.
    pub nargs: usize,
}

impl SyscallEntry {
    /// `true` for the indirect slot and for unassigned numbers, both of
    /// which take the real call number from the argument list.
    #[must_use]
    pub fn is_indirect(&self) -> bool {
        self.name == "indir"
    }
}

const fn ent(number: u8, name: &'static str, nargs: usize) -> SyscallEntry {
    SyscallEntry { number, name, nargs }
}

/// The system-call table. Call 0 is the indirect slot; numbers with no
/// assigned service resolve indirectly too.
pub const SYSENT: [SyscallEntry; 64] = {
    let mut table = [ent(0, "indir", 0); 64];
    let mut i = 0;
    while i < 64 {
        table[i].number = i as u8;
        i += 1;
    }
    macro_rules! fill {
        ($($num:literal $name:literal $nargs:literal;)*) => {
            $(table[$num] = ent($num, $name, $nargs);)*
        };
    }
    fill! {
        0 "indir" 0;
        1 "exit" 1;
        2 "fork" 0;
        3 "read" 3;
        4 "write" 3;
        5 "open" 2;
        6 "close" 1;
        7 "wait" 0;
        8 "creat" 2;
        9 "link" 2;
        10 "unlink" 1;
        11 "exec" 2;
        12 "chdir" 1;
        13 "time" 0;
        14 "mknod" 3;
        15 "chmod" 2;
        16 "chown" 3;
        17 "sbreak" 1;
        18 "stat" 2;
        19 "seek" 3;
        20 "getpid" 0;
        21 "mount" 3;
        22 "umount" 1;
        23 "setuid" 1;
        24 "getuid" 0;
        25 "stime" 1;
        26 "ptrace" 4;
        27 "alarm" 1;
        28 "fstat" 2;
        29 "pause" 0;
        30 "utime" 2;
        31 "stty" 2;
        32 "gtty" 2;
        33 "access" 2;
        34 "nice" 1;
        35 "ftime" 1;
        36 "sync" 0;
        37 "kill" 2;
        41 "dup" 2;
        42 "pipe" 0;
        43 "times" 1;
        44 "prof" 4;
        46 "setgid" 1;
        47 "getgid" 0;
        48 "sig" 2;
        51 "sysacct" 1;
        52 "sysphys" 3;
        53 "syslock" 1;
        54 "ioctl" 3;
        56 "mpxchan" 4;
        59 "exece" 3;
        60 "umask" 1;
        61 "chroot" 1;
    }
    table
};

/// Looks up a table entry by call number (masked to the table size).
#[must_use]
pub fn syscall_entry(number: u8) -> &'static SyscallEntry {
    &SYSENT[usize::from(number & 0x3f)]
}

/// What the service did with a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Success: `val1` goes to R0; `val2` replaces R1 when present.
    Done {
        /// Primary return value.
        val1: i32,
        /// Secondary return value; `None` leaves R1 as the guest set it.
        val2: Option<i32>,
    },
    /// Failure: the error number goes to R0 with carry set.
    Error(i32),
    /// The guest asked to terminate with this status.
    Exit(i32),
}

/// Host-side implementation of the system-call surface. The interpreter
/// core never touches the host OS itself; everything behind the trap
/// goes through this trait.
pub trait TrapService {
    /// Services one call. `args` holds the marshalled longword
    /// arguments; `cpu` gives access to guest memory and registers for
    /// buffer transfer.
    fn syscall(&mut self, entry: &SyscallEntry, args: &[i32], cpu: &mut Cpu) -> SyscallOutcome;
}

/// Dispatches a change-mode trap: resolves the indirect slot, marshals
/// arguments, runs the service, and writes results back. Returns the
/// exit status when the guest terminated.
pub fn dispatch_trap(
    cpu: &mut Cpu,
    code: u32,
    service: &mut dyn TrapService,
) -> Result<Option<i32>, Fault> {
    let mut params = cpu.reg(AP).wrapping_add(NBPW);
    let mut entry = syscall_entry((code & 0x3f) as u8);
    if entry.is_indirect() {
        // Indirect call: the real number sits first in the argument
        // list. One level only; a nested indirect number stays indirect.
        let real = cpu.memory.load_int(params, DataType::L)?.uint();
        params = params.wrapping_add(NBPW);
        entry = syscall_entry((real & 0x3f) as u8);
    }

    let mut args = [0i32; 4];
    for (i, arg) in args.iter_mut().take(entry.nargs).enumerate() {
        let offset = u32::try_from(i).unwrap_or(0) * NBPW;
        *arg = cpu.memory.load_int(params.wrapping_add(offset), DataType::L)?.sint();
    }

    match service.syscall(entry, &args[..entry.nargs], cpu) {
        SyscallOutcome::Done { val1, val2 } => {
            cpu.set_reg(0, val1 as u32);
            if let Some(val2) = val2 {
                cpu.set_reg(1, val2 as u32);
            }
            Ok(None)
        }
        SyscallOutcome::Error(err) => {
            cpu.set_reg(0, err as u32);
            cpu.set_flag(Flag::C, true);
            Ok(None)
        }
        SyscallOutcome::Exit(status) => Ok(Some(status)),
    }
}
