//! Minimal host-side system-call service: console I/O, exit, and
//! process identity. Everything else fails with `EINVAL` so guest code
//! sees an ordinary error return rather than a dead machine.

use std::io::{Read, Write};

use vax_core::{errno, Cpu, SyscallEntry, SyscallOutcome, TrapService};

/// Console-only trap service.
#[derive(Debug, Default)]
pub struct ConsoleService;

impl ConsoleService {
    fn write(fd: i32, addr: u32, count: i32, cpu: &mut Cpu) -> SyscallOutcome {
        let Ok(count) = usize::try_from(count) else {
            return SyscallOutcome::Error(errno::EINVAL);
        };
        let mut buf = vec![0u8; count];
        if cpu.memory.read(addr, &mut buf).is_err() {
            return SyscallOutcome::Error(errno::EFAULT);
        }
        let written = match fd {
            1 => std::io::stdout().write(&buf),
            2 => std::io::stderr().write(&buf),
            _ => return SyscallOutcome::Error(errno::EBADF),
        };
        match written {
            Ok(n) => SyscallOutcome::Done {
                val1: i32::try_from(n).unwrap_or(i32::MAX),
                val2: None,
            },
            Err(_) => SyscallOutcome::Error(errno::EPIPE),
        }
    }

    fn read(fd: i32, addr: u32, count: i32, cpu: &mut Cpu) -> SyscallOutcome {
        if fd != 0 {
            return SyscallOutcome::Error(errno::EBADF);
        }
        let Ok(count) = usize::try_from(count) else {
            return SyscallOutcome::Error(errno::EINVAL);
        };
        let mut buf = vec![0u8; count];
        match std::io::stdin().lock().read(&mut buf) {
            Ok(n) => {
                if cpu.memory.write(addr, &buf[..n]).is_err() {
                    return SyscallOutcome::Error(errno::EFAULT);
                }
                SyscallOutcome::Done {
                    val1: i32::try_from(n).unwrap_or(i32::MAX),
                    val2: None,
                }
            }
            Err(_) => SyscallOutcome::Error(errno::EBADF),
        }
    }
}

impl TrapService for ConsoleService {
    fn syscall(&mut self, entry: &SyscallEntry, args: &[i32], cpu: &mut Cpu) -> SyscallOutcome {
        match entry.name {
            "exit" => SyscallOutcome::Exit(args[0]),
            "write" => Self::write(args[0], args[1] as u32, args[2], cpu),
            "read" => Self::read(args[0], args[1] as u32, args[2], cpu),
            "getpid" => SyscallOutcome::Done {
                val1: i32::try_from(std::process::id()).unwrap_or(1),
                val2: None,
            },
            _ => SyscallOutcome::Error(errno::EINVAL),
        }
    }
}
