//! Physical and Virtual Memory Addressing Schemes.
//!
//! This module provides abstractions for virtual address and physical
//! address of the 32-bit protected-mode kernel. The kernel maps all of
//! physical memory at [`KERNBASE`]: the first page above [`KERNBASE`] maps to
//! the first frame of physical memory, the second page maps to the second
//! frame, and so on. This direct mapping allows the kernel to calculate the
//! physical address from the kernel virtual address with simple arithmetic
//! operations, by adding or subtracting a constant offset.
//!
//! The module defines three primary types for memory addresses: [`Kva`] for
//! kernel virtual address, [`Va`] for virtual address, and [`Pa`] for
//! physical address.
//!
//! ## Two-level paging
//!
//! A virtual address is decomposed as follows:
//! ```text
//! 31                    22 21                    12 11                     0
//! +-----------------------+-----------------------+------------------------+
//! |    Page-Directory     |      Page-Table       |      Page Offset       |
//! |        Index          |        Index          |                        |
//! +-----------------------+-----------------------+------------------------+
//! |--------- 10 ----------|--------- 10 ----------|---------- 12 ----------|
//! ```
//!
//! A directory entry with the page-size bit set maps a whole
//! [`LARGE_PAGE_SIZE`] region and the low 22 bits become the offset within
//! that superpage.
//!
//! ## Example Usage:
//!
//! ```
//! use abyss::addressing::{Pa, Va};
//!
//! let va = Va::new(0xf010_2345);
//! assert_eq!(va.pdx(), 0x3c0);
//! assert_eq!(va.ptx(), 0x102);
//! assert_eq!(va.offset(), 0x345);
//!
//! let pa = Pa::new(0x0010_2000);
//! assert_eq!(pa.into_kva().into_u32(), 0xf010_2000);
//! ```

/// Base of the kernel's direct map of physical memory.
///
/// Every physical address `pa` below the top of memory is reachable at the
/// kernel virtual address `pa + KERNBASE`.
pub const KERNBASE: u32 = 0xf000_0000;

/// The size of a single page in memory, in bytes.
///
/// This constant represents the size of a memory page, which is 4 KiB. It is
/// the granularity of a second-level (page table) mapping.
pub const PAGE_SIZE: u32 = 0x1000;

/// The shift amount to get the page index from a given address.
pub const PAGE_SHIFT: u32 = 12;

/// A mask for extracting the offset within a page from a given address.
pub const PAGE_MASK: u32 = 0xfff;

/// The size of a superpage mapped directly by a page directory entry.
///
/// This constant represents 4 MiB, the region covered by one page directory
/// entry and by one full page table.
pub const LARGE_PAGE_SIZE: u32 = 0x40_0000;

/// The shift amount to get the page directory index from a given address.
pub const LARGE_PAGE_SHIFT: u32 = 22;

/// A mask for extracting the offset within a superpage from a given address.
pub const LARGE_PAGE_MASK: u32 = 0x3f_ffff;

/// Number of entries in a page directory and in a page table.
pub const NR_ENTRIES: u32 = 1024;

/// Represents a physical address.
///
/// The `Pa` (Physical Address) struct is a wrapper around the `u32` type,
/// which represents a physical address in memory.
///
/// This struct provides methods to:
/// - Create a new physical address.
/// - Convert a physical address to a kernel virtual address.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Pa(u32);

impl Pa {
    /// The physical address `0`.
    pub const ZERO: Self = Self(0);

    /// Creates a new physical address.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Cast the physical address into a raw `u32`.
    #[inline]
    pub const fn into_u32(self) -> u32 {
        self.0
    }

    /// Convert the physical address to a kernel virtual address.
    ///
    /// This is `KADDR` of the direct map. The caller is responsible for
    /// checking that the physical address is below the top of memory.
    #[inline]
    pub const fn into_kva(self) -> Kva {
        Kva(self.0.wrapping_add(KERNBASE))
    }
}

/// Represents a kernel virtual address.
///
/// The [`Kva`] (Kernel Virtual Address) struct is a lightweight wrapper around
/// a `u32` value that represents an address in the kernel's direct map.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Kva(u32);

impl Kva {
    /// Creates a new kernel virtual address if the address is in the direct
    /// map.
    ///
    /// # Returns
    /// - `Some(Kva)` if the address is at or above [`KERNBASE`].
    /// - `None` otherwise.
    #[inline]
    pub const fn new(addr: u32) -> Option<Self> {
        if addr >= KERNBASE {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Cast the kernel virtual address into a raw `u32`.
    #[inline]
    pub const fn into_u32(self) -> u32 {
        self.0
    }

    /// Convert the kernel virtual address to a physical address (`PADDR`).
    #[inline]
    pub const fn into_pa(self) -> Pa {
        Pa(self.0.wrapping_sub(KERNBASE))
    }

    /// View this kernel virtual address as a plain virtual address.
    #[inline]
    pub const fn into_va(self) -> Va {
        Va(self.0)
    }
}

/// Represents a virtual address.
///
/// Every 32-bit value is a valid virtual address; whether it is mapped is
/// decided by the page tables, not by this type.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Va(u32);

impl Va {
    /// Creates a new virtual address.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Cast the virtual address into a raw `u32`.
    #[inline]
    pub const fn into_u32(self) -> u32 {
        self.0
    }

    /// Page directory index (`PDX`) of this address.
    #[inline]
    pub const fn pdx(self) -> u32 {
        self.0 >> LARGE_PAGE_SHIFT
    }

    /// Page table index (`PTX`) of this address.
    #[inline]
    pub const fn ptx(self) -> u32 {
        (self.0 >> PAGE_SHIFT) & (NR_ENTRIES - 1)
    }

    /// Offset within the 4 KiB page (`PGOFF`).
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0 & PAGE_MASK
    }

    /// Offset within the 4 MiB superpage.
    #[inline]
    pub const fn large_offset(self) -> u32 {
        self.0 & LARGE_PAGE_MASK
    }

    /// Align down the virtual address to the page boundary.
    #[inline]
    pub const fn page_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Align down the virtual address to the superpage boundary.
    #[inline]
    pub const fn large_page_down(self) -> Self {
        Self(self.0 & !LARGE_PAGE_MASK)
    }

    /// Builds an address back from its decomposition (`PGADDR`).
    #[inline]
    pub const fn from_parts(pdx: u32, ptx: u32, offset: u32) -> Self {
        Self((pdx << LARGE_PAGE_SHIFT) | (ptx << PAGE_SHIFT) | offset)
    }
}

macro_rules! impl_arith {
    ($t: ty) => {
        impl core::ops::Add<u32> for $t {
            type Output = Self;

            fn add(self, other: u32) -> Self::Output {
                Self(self.0 + other)
            }
        }
        impl core::ops::Sub<Self> for $t {
            type Output = u32;

            fn sub(self, other: Self) -> Self::Output {
                self.0 - other.0
            }
        }
        impl core::ops::BitOr<u32> for $t {
            type Output = Self;

            fn bitor(self, other: u32) -> Self {
                Self(self.0 | other)
            }
        }
        impl core::ops::BitAnd<u32> for $t {
            type Output = Self;

            fn bitand(self, other: u32) -> Self {
                Self(self.0 & other)
            }
        }
    };
}

impl_arith!(Kva);
impl_arith!(Va);
impl_arith!(Pa);

impl core::fmt::Debug for Kva {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Kva(0x{:08x})", self.0)
    }
}
impl core::fmt::Debug for Va {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Va(0x{:08x})", self.0)
    }
}
impl core::fmt::Debug for Pa {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Pa(0x{:08x})", self.0)
    }
}
