//! `setperm`: rewrite the permission bits of one mapping.
use super::Monitor;
use crate::{
    MonitorError, Status,
    mm::{
        page_table::{PageDirectory, PteFlags},
        permission::{PERM_STR_LEN, str2perm},
    },
    util::parse_number,
};
use abyss::{
    addressing::{Pa, Va},
    dev::PhysicalMemory,
};
use core::fmt::Write;

/// Usage of `setperm`.
pub const USAGE: &str =
    "Usage: setperm <virtual address> <permission>\n*For PSE-enabled pgd, PTE_PS will be auto-set.";

/// The mapping after a successful `setperm`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewMapping {
    /// The address whose mapping changed.
    pub va: Va,
    /// Physical address `va` translates to.
    pub pa: Pa,
    /// Permission field of the rewritten entry.
    pub perm: u32,
}

/// Replace the permission bits of the leaf entry that maps `va`.
///
/// The frame of the entry is kept, the present flag is always set, and on a
/// superpage the page-size flag is always set as well. If no present entry
/// maps `va`, nothing is written.
///
/// The new entry is stored in place; stale TLB entries of `va` are the
/// caller's to flush.
pub fn setperm<M: PhysicalMemory + ?Sized>(
    mem: &mut M,
    pgdir: &PageDirectory,
    va: Va,
    perm: PteFlags,
) -> Result<NewMapping, MonitorError> {
    let pde = pgdir.pde(mem, va);
    if pde.is_superpage() {
        if !pde.is_present() {
            return Err(MonitorError::NoMapping(va));
        }
        let pde = pde.with_perm((perm | PteFlags::P | PteFlags::PS).bits());
        pgdir.set_pde(mem, va, pde);
        let frame = pde.large_frame().ok_or(MonitorError::NoMapping(va))?;
        Ok(NewMapping {
            va,
            pa: frame | va.large_offset(),
            perm: pde.perm(),
        })
    } else {
        let (pt, pte) = pgdir
            .walk(mem, va)
            .map_err(|_| MonitorError::NoMapping(va))?;
        let pte = pte.with_perm((perm | PteFlags::P).bits());
        pt.set_pte(mem, va, pte);
        let frame = pte.pa().ok_or(MonitorError::NoMapping(va))?;
        Ok(NewMapping {
            va,
            pa: frame | va.offset(),
            perm: pte.perm(),
        })
    }
}

/// `setperm <virtual address> <permission>`
pub fn mon_setperm(
    mon: &mut Monitor<'_>,
    argv: &[&str],
    out: &mut dyn Write,
) -> Result<Status, MonitorError> {
    let [_, va, token] = argv else {
        return Err(MonitorError::Usage);
    };
    let va = Va::new(parse_number(va).ok_or(MonitorError::Usage)?);
    // Only the first nine characters are looked at.
    let token = token
        .char_indices()
        .nth(PERM_STR_LEN)
        .map_or(*token, |(idx, _)| &token[..idx]);
    let perm = match str2perm(token) {
        Ok(perm) => perm,
        Err(e) => {
            if let MonitorError::InvalidPermission(c) = e {
                println!(out, "Invalid permission letter '{}'", c);
            }
            return Err(e);
        }
    };
    let pgdir = mon.ctx.root();
    match setperm(&mut *mon.machine, &pgdir, va, perm) {
        Ok(mapping) => {
            println!(
                out,
                "New mapping = VA: 0x{:08x}, PA: 0x{:08x}, perm: 0x{:03x}.",
                mapping.va.into_u32(),
                mapping.pa.into_u32(),
                mapping.perm
            );
            Ok(Status::Success)
        }
        Err(e) => {
            println!(out, "No such mapping");
            Err(e)
        }
    }
}
