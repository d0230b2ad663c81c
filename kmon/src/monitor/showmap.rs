//! `showmap`: the mappings covering a virtual range.
//!
//! The scan starts at the page containing the start address and reports one
//! record per leaf entry, up to and including the page that contains
//! `start + length`. A superpage is reported once, from the cursor to its
//! end. The scan stops at the first address without a translation.
use super::Monitor;
use crate::{
    MonitorError, Status,
    mm::{
        Mapping,
        page_table::{PageDirectory, Translation, translate},
        permission::perm2str,
    },
    util::parse_number,
};
use abyss::{
    addressing::{LARGE_PAGE_MASK, LARGE_PAGE_SIZE, PAGE_MASK, PAGE_SIZE, Va},
    dev::PhysicalMemory,
};
use core::fmt::Write;

/// Usage of `showmap`.
pub const USAGE: &str =
    "Usage: showmap <start> [<length>]\nOutput: VA:[VA], PA:[PA], PERM-bit:[GSDACTUWP]";

/// A record of a range scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanRecord {
    /// A present leaf entry.
    Mapped(Mapping),
    /// The address has no translation. Always the last record.
    Unmapped(Va),
}

/// Iterator over the mappings of a virtual range.
pub struct MappingScanner<'a, M: PhysicalMemory + ?Sized> {
    mem: &'a M,
    pgdir: PageDirectory,
    cursor: u64,
    // Inclusive.
    end: u64,
    done: bool,
}

impl<'a, M: PhysicalMemory + ?Sized> MappingScanner<'a, M> {
    /// Scan `[start, start + len]` through the page directory.
    pub fn new(mem: &'a M, pgdir: PageDirectory, start: Va, len: u32) -> Self {
        Self {
            mem,
            pgdir,
            cursor: (start.into_u32() & !PAGE_MASK) as u64,
            end: start.into_u32() as u64 + len as u64,
            done: false,
        }
    }
}

impl<M: PhysicalMemory + ?Sized> Iterator for MappingScanner<'_, M> {
    type Item = ScanRecord;

    fn next(&mut self) -> Option<ScanRecord> {
        if self.done || self.cursor > self.end || self.cursor > u32::MAX as u64 {
            return None;
        }
        let va = Va::new(self.cursor as u32);
        let (pa, perm, next, superpage) = match translate(self.mem, &self.pgdir, va) {
            Translation::Unmapped => {
                self.done = true;
                return Some(ScanRecord::Unmapped(va));
            }
            Translation::Superpage { pa, perm } => (
                pa,
                perm,
                (self.cursor & !(LARGE_PAGE_MASK as u64)) + LARGE_PAGE_SIZE as u64,
                true,
            ),
            Translation::SmallPage { pa, perm } => {
                (pa, perm, self.cursor + PAGE_SIZE as u64, false)
            }
        };
        let size = next - self.cursor;
        self.cursor = next;
        Some(ScanRecord::Mapped(Mapping {
            va,
            pa,
            size: size as u32,
            perm,
            superpage,
        }))
    }
}

/// Print one mapped record.
pub fn print_mapping(mapping: &Mapping, out: &mut dyn Write) {
    let perm = perm2str(mapping.perm);
    if perm.dropped() != 0 {
        warning!(
            out,
            "Permission bits 0x{:03x} of VA 0x{:08x} are not shown.",
            perm.dropped(),
            mapping.va.into_u32()
        );
    }
    println!(
        out,
        "({}) VA: 0x{:08x}, PA: 0x{:08x}, PERM: {:>9}",
        if mapping.superpage { "PSE_ON" } else { "PSE_OFF" },
        mapping.va.into_u32(),
        mapping.pa.into_u32(),
        perm
    );
}

/// `showmap <start> [<length>]`
pub fn mon_showmap(
    mon: &mut Monitor<'_>,
    argv: &[&str],
    out: &mut dyn Write,
) -> Result<Status, MonitorError> {
    let (start, len) = match argv {
        [_, start] => (parse_number(start), Some(1)),
        [_, start, len] => (parse_number(start), parse_number(len)),
        _ => return Err(MonitorError::Usage),
    };
    let (Some(start), Some(len)) = (start, len) else {
        return Err(MonitorError::Usage);
    };
    let pgdir = mon.ctx.root();
    for record in MappingScanner::new(&*mon.machine, pgdir, Va::new(start), len) {
        match record {
            ScanRecord::Mapped(mapping) => print_mapping(&mapping, out),
            ScanRecord::Unmapped(va) => {
                println!(out, "VA: 0x{:08x}, PA: No Mapping", va.into_u32());
                return Err(MonitorError::NoMapping(va));
            }
        }
    }
    Ok(Status::Success)
}
