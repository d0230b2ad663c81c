//! `dumpmem`: the contents of a physical or virtual range, byte by byte.
//!
//! A physical dump reads through the direct map and is clamped to the top of
//! physical memory. A virtual dump translates the range one leaf at a time
//! and only reads the bytes of present pages; every byte of a hole is
//! reported as unmapped instead.
use super::Monitor;
use crate::{
    MonitorError, Status,
    mm::page_table::{PageDirectory, translate},
    util::parse_number,
};
use abyss::{
    addressing::{PAGE_SIZE, Pa, Va},
    dev::{PhysicalMemory, VirtualMemory},
};
use core::fmt::Write;

/// Usage of `dumpmem`.
pub const USAGE: &str = "Usage: dumpmem [option] <start> <length>\n\
    \t-p, --physical\tuse physical address\n\
    \t[-v, --virtual]\tuse virtual address(default)";

/// Which address space a dump reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpMode {
    /// Physical addresses, through the direct map.
    Physical,
    /// Virtual addresses of the current address space.
    Virtual,
}

impl DumpMode {
    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-p" | "--physical" => Some(DumpMode::Physical),
            "-v" | "--virtual" => Some(DumpMode::Virtual),
            _ => None,
        }
    }
}

/// One line of a dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpLine {
    /// A byte of physical memory.
    Physical {
        /// Address of the byte.
        pa: Pa,
        /// The byte.
        value: u8,
    },
    /// A byte of a present page.
    Mapped {
        /// Virtual address of the byte.
        va: Va,
        /// Physical address `va` translates to.
        pa: Pa,
        /// The byte.
        value: u8,
    },
    /// An address without a translation.
    Unmapped {
        /// Virtual address of the byte.
        va: Va,
    },
}

impl core::fmt::Display for DumpLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DumpLine::Physical { pa, value } => {
                write!(f, "[PA 0x{:08x}]: {:02x}", pa.into_u32(), value)
            }
            DumpLine::Mapped { va, pa, value } => write!(
                f,
                "[VA 0x{:08x}, PA 0x{:08x}]: {:02x}",
                va.into_u32(),
                pa.into_u32(),
                value
            ),
            DumpLine::Unmapped { va } => {
                write!(f, "[VA 0x{:08x}, PA No-mapping]: None", va.into_u32())
            }
        }
    }
}

/// Iterator over the bytes of a physical range.
pub struct PhysicalDump<'a, M: PhysicalMemory + ?Sized> {
    mem: &'a M,
    cursor: u64,
    end: u64,
}

impl<'a, M: PhysicalMemory + ?Sized> PhysicalDump<'a, M> {
    /// Dump `[start, start + len)`, clamped to the top of physical memory.
    ///
    /// The second value tells whether the range was clamped.
    pub fn new(mem: &'a M, start: Pa, len: u32) -> (Self, bool) {
        let top = mem.top().into_u32() as u64;
        let end = start.into_u32() as u64 + len as u64;
        let dump = Self {
            mem,
            cursor: start.into_u32() as u64,
            end: end.min(top),
        };
        (dump, end > top)
    }
}

impl<M: PhysicalMemory + ?Sized> Iterator for PhysicalDump<'_, M> {
    type Item = DumpLine;

    fn next(&mut self) -> Option<DumpLine> {
        if self.cursor >= self.end {
            return None;
        }
        let pa = Pa::new(self.cursor as u32);
        self.cursor += 1;
        Some(DumpLine::Physical {
            pa,
            value: self.mem.read_u8(pa),
        })
    }
}

/// Iterator over the bytes of a virtual range.
///
/// The range is walked in chunks that end at the next leaf boundary. A chunk
/// is translated once, and its bytes are read only if it is mapped.
pub struct VirtualDump<'a, M: PhysicalMemory + VirtualMemory + ?Sized> {
    mem: &'a M,
    pgdir: PageDirectory,
    cursor: u64,
    end: u64,
    chunk_end: u64,
    // Physical address of the chunk's first byte, if mapped.
    chunk_pa: Option<u64>,
    chunk_start: u64,
}

impl<'a, M: PhysicalMemory + VirtualMemory + ?Sized> VirtualDump<'a, M> {
    /// Dump `[start, start + len)` through the page directory.
    pub fn new(mem: &'a M, pgdir: PageDirectory, start: Va, len: u32) -> Self {
        let start = start.into_u32() as u64;
        Self {
            mem,
            pgdir,
            cursor: start,
            end: (start + len as u64).min(1 << 32),
            chunk_end: start,
            chunk_pa: None,
            chunk_start: start,
        }
    }

    fn enter_chunk(&mut self) {
        let va = Va::new(self.cursor as u32);
        let translation = translate(self.mem, &self.pgdir, va);
        // Holes advance a small page at a time.
        let mask = (translation.page_size().unwrap_or(PAGE_SIZE) - 1) as u64;
        self.chunk_start = self.cursor;
        self.chunk_end = ((self.cursor | mask) + 1).min(self.end);
        self.chunk_pa = translation.pa().map(|pa| pa.into_u32() as u64);
    }
}

impl<M: PhysicalMemory + VirtualMemory + ?Sized> Iterator for VirtualDump<'_, M> {
    type Item = DumpLine;

    fn next(&mut self) -> Option<DumpLine> {
        if self.cursor >= self.end {
            return None;
        }
        if self.cursor >= self.chunk_end {
            self.enter_chunk();
        }
        let va = Va::new(self.cursor as u32);
        let line = match self.chunk_pa {
            Some(base) => DumpLine::Mapped {
                va,
                pa: Pa::new((base + (self.cursor - self.chunk_start)) as u32),
                value: self.mem.peek_u8(va),
            },
            None => DumpLine::Unmapped { va },
        };
        self.cursor += 1;
        Some(line)
    }
}

/// `dumpmem [option] <start> <length>`
pub fn mon_dumpmem(
    mon: &mut Monitor<'_>,
    argv: &[&str],
    out: &mut dyn Write,
) -> Result<Status, MonitorError> {
    let (mode, start, len) = match argv {
        [_, start, len] => (DumpMode::Virtual, start, len),
        [_, rest @ ..] if rest.len() == 3 => {
            let (idx, mode) = rest
                .iter()
                .enumerate()
                .find_map(|(idx, arg)| Some((idx, DumpMode::from_flag(arg)?)))
                .ok_or(MonitorError::Usage)?;
            let mut args = rest
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, arg)| arg);
            match (args.next(), args.next()) {
                (Some(start), Some(len)) => (mode, start, len),
                _ => return Err(MonitorError::Usage),
            }
        }
        _ => return Err(MonitorError::Usage),
    };
    let start = parse_number(start).ok_or(MonitorError::Usage)?;
    let len = parse_number(len).ok_or(MonitorError::Usage)?;

    match mode {
        DumpMode::Physical => {
            let (dump, clamped) = PhysicalDump::new(&*mon.machine, Pa::new(start), len);
            if clamped {
                warning!(
                    out,
                    "Target memory out of range. Only dump to TOP 0x{:08x}.",
                    mon.machine.top().into_u32()
                );
            }
            for line in dump {
                println!(out, "{}", line);
            }
        }
        DumpMode::Virtual => {
            let pgdir = mon.ctx.root();
            for line in VirtualDump::new(&*mon.machine, pgdir, Va::new(start), len) {
                println!(out, "{}", line);
            }
        }
    }
    Ok(Status::Success)
}
