//! Entries of the two-level page table and their walk.
//!
//! A 32-bit virtual address is split into a page directory index, a page
//! table index and a page offset:
//!
//! ```text
//! 31                  22 21                  12 11                    0
//! +---------------------+----------------------+----------------------+
//! |  Page Directory Idx |   Page Table Index   |     Page Offset      |
//! +---------------------+----------------------+----------------------+
//! ```
//!
//! A page directory entry with [`PteFlags::PS`] maps a 4 MiB superpage by
//! itself, and the page table index becomes part of the offset.
//!
//! Both tables live in physical memory and are reached through a
//! [`PhysicalMemory`] window. Nothing here allocates: a walk that reaches a
//! missing level reports [`PageTableMappingError::NotExist`].
use abyss::{
    addressing::{LARGE_PAGE_MASK, LARGE_PAGE_SIZE, PAGE_MASK, PAGE_SIZE, Pa, Va},
    dev::PhysicalMemory,
};

bitflags::bitflags! {
    /// Flags of a page directory entry or a page table entry.
    ///
    /// Only the low nine bits carry a meaning the monitor knows about. The
    /// remaining three bits of the low 12 are left to software.
    pub struct PteFlags: u32 {
        /// Present; must be 1 to map a page or reference a page table.
        const P = 1 << 0;
        /// Read/write; if 0, writes may not be allowed to the region controlled by this entry.
        const W = 1 << 1;
        /// User/supervisor; if 0, user-mode accesses are not allowed to the region controlled by this entry.
        const U = 1 << 2;
        /// Page-level write-through.
        const PWT = 1 << 3;
        /// Page-level cache disable.
        const PCD = 1 << 4;
        /// Accessed; set by the processor on a translation through this entry.
        const A = 1 << 5;
        /// Dirty; set by the processor on a write through this entry.
        const D = 1 << 6;
        /// Page size; in a page directory entry, maps a 4 MiB superpage.
        const PS = 1 << 7;
        /// Global; the translation survives a `%cr3` reload.
        const G = 1 << 8;
    }
}

/// Mask of the permission field of an entry.
pub const PERM_MASK: u32 = PAGE_MASK;

/// Page Directory Entry (PDE).
///
/// A present PDE either references a page table, or, when [`PteFlags::PS`] is
/// set, maps a 4 MiB superpage directly.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Pde(pub u32);

impl core::fmt::Debug for Pde {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_present() {
            write!(f, "Pde({:08x}, {:?})", self.0 & !PERM_MASK, self.flags())
        } else {
            write!(f, ".")
        }
    }
}

impl Pde {
    /// Whether the "P" flag is set.
    #[inline]
    pub const fn is_present(&self) -> bool {
        self.0 & PteFlags::P.bits() != 0
    }

    /// Whether the entry is tagged as a superpage.
    ///
    /// This only looks at the "PS" flag; the entry may still be absent.
    #[inline]
    pub const fn is_superpage(&self) -> bool {
        self.0 & PteFlags::PS.bits() != 0
    }

    /// Get the flags associated with this entry.
    #[inline]
    pub const fn flags(&self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    /// Get the whole permission field, including the bits left to software.
    #[inline]
    pub const fn perm(&self) -> u32 {
        self.0 & PERM_MASK
    }

    /// Get the frame of the superpage mapped by this entry.
    ///
    /// # Returns
    /// - `Some(Pa)` if the entry is present and maps a superpage.
    /// - `None` otherwise.
    #[inline]
    pub const fn large_frame(&self) -> Option<Pa> {
        if self.is_present() && self.is_superpage() {
            Some(Pa::new(self.0 & !LARGE_PAGE_MASK))
        } else {
            None
        }
    }

    /// Get the page table referenced by this entry.
    ///
    /// # Returns
    /// - `Ok(PageTable)` if the entry is present and not a superpage.
    /// - `Err(PageTableMappingError::NotExist)` if the entry is absent.
    /// - `Err(PageTableMappingError::Superpage)` if the entry maps a
    ///   superpage.
    #[inline]
    pub const fn pt(&self) -> Result<PageTable, PageTableMappingError> {
        if !self.is_present() {
            Err(PageTableMappingError::NotExist)
        } else if self.is_superpage() {
            Err(PageTableMappingError::Superpage)
        } else {
            Ok(PageTable(Pa::new(self.0 & !PERM_MASK)))
        }
    }

    /// Replace the permission field, keeping the frame.
    #[inline]
    pub const fn with_perm(self, perm: u32) -> Self {
        Self((self.0 & !PERM_MASK) | (perm & PERM_MASK))
    }
}

/// Page Table Entry (PTE).
///
/// A present PTE maps a 4 KiB page.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Pte(pub u32);

impl core::fmt::Debug for Pte {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(pa) = self.pa() {
            write!(f, "Pte({:08x}, {:?})", pa.into_u32(), self.flags())
        } else {
            write!(f, ".")
        }
    }
}

impl Pte {
    /// Whether the "P" flag is set.
    #[inline]
    pub const fn is_present(&self) -> bool {
        self.0 & PteFlags::P.bits() != 0
    }

    /// Get the physical address of the page mapped by this entry.
    ///
    /// # Returns
    /// - `Some(Pa)` if the entry is present.
    /// - `None` if the "P" flag is not set.
    #[inline]
    pub const fn pa(&self) -> Option<Pa> {
        if self.is_present() {
            Some(Pa::new(self.0 & !PERM_MASK))
        } else {
            None
        }
    }

    /// Get the flags associated with this entry.
    #[inline]
    pub const fn flags(&self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    /// Get the whole permission field, including the bits left to software.
    #[inline]
    pub const fn perm(&self) -> u32 {
        self.0 & PERM_MASK
    }

    /// Replace the permission field, keeping the frame.
    #[inline]
    pub const fn with_perm(self, perm: u32) -> Self {
        Self((self.0 & !PERM_MASK) | (perm & PERM_MASK))
    }
}

/// A page directory located in physical memory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PageDirectory(Pa);

impl PageDirectory {
    /// The page directory at the physical address.
    #[inline]
    pub const fn new(pa: Pa) -> Self {
        Self(pa)
    }

    /// Physical address of the directory.
    #[inline]
    pub const fn pa(&self) -> Pa {
        self.0
    }

    #[inline]
    fn slot(&self, va: Va) -> Pa {
        self.0 + va.pdx() * 4
    }

    /// Read the entry that covers the address.
    pub fn pde<M: PhysicalMemory + ?Sized>(&self, mem: &M, va: Va) -> Pde {
        Pde(mem.read_u32(self.slot(va)))
    }

    /// Store the entry that covers the address.
    pub fn set_pde<M: PhysicalMemory + ?Sized>(&self, mem: &mut M, va: Va, pde: Pde) {
        mem.write_u32(self.slot(va), pde.0)
    }

    /// Walk down to the present page table entry of a small page.
    ///
    /// # Returns
    /// - `Ok((PageTable, Pte))` with the table holding the entry.
    /// - `Err(PageTableMappingError::NotExist)` if either level is absent.
    /// - `Err(PageTableMappingError::Superpage)` if the address is covered
    ///   by a superpage.
    pub fn walk<M: PhysicalMemory + ?Sized>(
        &self,
        mem: &M,
        va: Va,
    ) -> Result<(PageTable, Pte), PageTableMappingError> {
        let pt = self.pde(mem, va).pt()?;
        let pte = pt.pte(mem, va);
        if pte.is_present() {
            Ok((pt, pte))
        } else {
            Err(PageTableMappingError::NotExist)
        }
    }
}

/// A page table located in physical memory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PageTable(Pa);

impl PageTable {
    /// Physical address of the table.
    #[inline]
    pub const fn pa(&self) -> Pa {
        self.0
    }

    #[inline]
    fn slot(&self, va: Va) -> Pa {
        self.0 + va.ptx() * 4
    }

    /// Read the entry that covers the address.
    pub fn pte<M: PhysicalMemory + ?Sized>(&self, mem: &M, va: Va) -> Pte {
        Pte(mem.read_u32(self.slot(va)))
    }

    /// Store the entry that covers the address.
    pub fn set_pte<M: PhysicalMemory + ?Sized>(&self, mem: &mut M, va: Va, pte: Pte) {
        mem.write_u32(self.slot(va), pte.0)
    }
}

/// The translation of a single virtual address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Translation {
    /// Mapped by a present superpage entry of the page directory.
    Superpage {
        /// Physical address of the translated byte.
        pa: Pa,
        /// Permission field of the page directory entry.
        perm: u32,
    },
    /// Mapped by a present entry of a page table.
    SmallPage {
        /// Physical address of the translated byte.
        pa: Pa,
        /// Permission field of the page table entry.
        perm: u32,
    },
    /// No present entry maps the address.
    Unmapped,
}

impl Translation {
    /// Physical address of the translated byte, if mapped.
    pub fn pa(&self) -> Option<Pa> {
        match self {
            Translation::Superpage { pa, .. } | Translation::SmallPage { pa, .. } => Some(*pa),
            Translation::Unmapped => None,
        }
    }

    /// Permission field of the leaf entry, if mapped.
    pub fn perm(&self) -> Option<u32> {
        match self {
            Translation::Superpage { perm, .. } | Translation::SmallPage { perm, .. } => {
                Some(*perm)
            }
            Translation::Unmapped => None,
        }
    }

    /// Size of the page the address lies in, if mapped.
    pub fn page_size(&self) -> Option<u32> {
        match self {
            Translation::Superpage { .. } => Some(LARGE_PAGE_SIZE),
            Translation::SmallPage { .. } => Some(PAGE_SIZE),
            Translation::Unmapped => None,
        }
    }
}

/// Translate a virtual address through the page directory.
///
/// The page table is consulted only when the page directory entry is
/// present and is not a superpage. An entry that is tagged as a superpage
/// but absent translates to [`Translation::Unmapped`].
pub fn translate<M: PhysicalMemory + ?Sized>(
    mem: &M,
    pgdir: &PageDirectory,
    va: Va,
) -> Translation {
    let pde = pgdir.pde(mem, va);
    if let Some(frame) = pde.large_frame() {
        return Translation::Superpage {
            pa: frame | va.large_offset(),
            perm: pde.perm(),
        };
    }
    match pde.pt() {
        Ok(pt) => {
            let pte = pt.pte(mem, va);
            match pte.pa() {
                Some(frame) => Translation::SmallPage {
                    pa: frame | va.offset(),
                    perm: pte.perm(),
                },
                None => Translation::Unmapped,
            }
        }
        Err(_) => Translation::Unmapped,
    }
}

/// Page Table Mapping Error.
///
/// This enum represents errors that can occur when walking the page table
/// of an address.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PageTableMappingError {
    /// Not exist.
    ///
    /// This error is returned when a requested page table entry does not
    /// exist, i.e. it or one of the entries above it is not present.
    NotExist,

    /// Covered by a superpage.
    ///
    /// This error is returned when a page table is requested for an address
    /// that the page directory maps with a superpage.
    Superpage,
}
