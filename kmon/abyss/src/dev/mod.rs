//! Memory windows of the machine.
//!
//! The monitor never dereferences a raw address by itself. Every access to
//! translation tables, physical memory or the current address space goes
//! through one of the windows defined here, so that the introspection engine
//! only deals with integer addresses.

use crate::addressing::{Pa, Va};

/// Physical-memory access window.
///
/// Translation tables live in physical memory; both the tables and the raw
/// physical dump are read (and the tables written) through this window.
pub trait PhysicalMemory {
    /// Highest physical address that is installed and usable (exclusive).
    fn top(&self) -> Pa;

    /// Read a byte at the physical address.
    fn read_u8(&self, pa: Pa) -> u8;

    /// Read a little-endian 32-bit word at the physical address.
    fn read_u32(&self, pa: Pa) -> u32;

    /// Store a 32-bit word at the physical address.
    fn write_u32(&mut self, pa: Pa, value: u32);
}

/// Reads through the currently loaded address space.
///
/// The caller must have confirmed that the address is mapped; reading an
/// unmapped address faults.
pub trait VirtualMemory {
    /// Read a byte at the virtual address.
    fn peek_u8(&self, va: Va) -> u8;

    /// Read a 32-bit word at the virtual address.
    fn peek_u32(&self, va: Va) -> u32;
}

/// The machine the monitor inspects.
pub trait Machine: PhysicalMemory + VirtualMemory {
    /// The frame pointer (`%ebp`) of the function that calls this method.
    ///
    /// The frame of `frame_pointer` itself is never part of the result.
    fn frame_pointer(&self) -> u32;
}

/// The machine the kernel is running on.
///
/// Physical memory is reached through the direct map at
/// [`KERNBASE`](crate::addressing::KERNBASE) and virtual memory through the
/// page tables currently loaded in `%cr3`.
pub struct KernelMachine {
    top: Pa,
}

impl KernelMachine {
    /// Create the window over the running kernel.
    ///
    /// # Safety
    /// The kernel must map all physical memory below `top` at `KERNBASE`.
    pub const unsafe fn new(top: Pa) -> Self {
        Self { top }
    }
}

impl PhysicalMemory for KernelMachine {
    fn top(&self) -> Pa {
        self.top
    }

    fn read_u8(&self, pa: Pa) -> u8 {
        let ptr = pa.into_kva().into_u32() as usize as *const u8;
        unsafe { core::ptr::read_volatile(ptr) }
    }

    fn read_u32(&self, pa: Pa) -> u32 {
        let ptr = pa.into_kva().into_u32() as usize as *const u32;
        unsafe { core::ptr::read_volatile(ptr) }
    }

    fn write_u32(&mut self, pa: Pa, value: u32) {
        let ptr = pa.into_kva().into_u32() as usize as *mut u32;
        unsafe { core::ptr::write_volatile(ptr, value) }
    }
}

impl VirtualMemory for KernelMachine {
    fn peek_u8(&self, va: Va) -> u8 {
        let ptr = va.into_u32() as usize as *const u8;
        unsafe { core::ptr::read_volatile(ptr) }
    }

    fn peek_u32(&self, va: Va) -> u32 {
        let ptr = va.into_u32() as usize as *const u32;
        unsafe { core::ptr::read_volatile(ptr) }
    }
}

impl Machine for KernelMachine {
    // Reached through a vtable, so this always runs in a frame of its own.
    #[inline(never)]
    fn frame_pointer(&self) -> u32 {
        crate::unwind::caller_frame(self, crate::x86::read_ebp())
    }
}
