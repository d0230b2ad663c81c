//! 32-bit x86 registers and the trap frame.

bitflags::bitflags! {
    /// Flags of the `EFLAGS` register.
    pub struct Eflags: u32 {
        /// Carry flag.
        const CF = 1 << 0;
        /// Parity flag.
        const PF = 1 << 2;
        /// Auxiliary carry flag.
        const AF = 1 << 4;
        /// Zero flag.
        const ZF = 1 << 6;
        /// Sign flag.
        const SF = 1 << 7;
        /// Trap flag; raises a debug exception after every instruction.
        const TF = 1 << 8;
        /// Interrupt enable flag.
        const IF = 1 << 9;
        /// Direction flag.
        const DF = 1 << 10;
        /// Overflow flag.
        const OF = 1 << 11;
        /// I/O privilege level, bit 0.
        const IOPL_0 = 1 << 12;
        /// I/O privilege level, bit 1.
        const IOPL_1 = 1 << 13;
        /// Nested task.
        const NT = 1 << 14;
        /// Resume flag.
        const RF = 1 << 16;
        /// Virtual 8086 mode.
        const VM = 1 << 17;
        /// Alignment check.
        const AC = 1 << 18;
        /// Virtual interrupt flag.
        const VIF = 1 << 19;
        /// Virtual interrupt pending.
        const VIP = 1 << 20;
        /// CPUID instruction is available.
        const ID = 1 << 21;
    }
}

/// Debug exception.
pub const T_DEBUG: u32 = 1;
/// Breakpoint.
pub const T_BRKPT: u32 = 3;

/// The part of the saved register state the monitor looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trapframe {
    /// Trap number.
    pub trapno: u32,
    /// Error code pushed by the processor, or zero.
    pub err: u32,
    /// Saved instruction pointer.
    pub eip: u32,
    /// Saved code segment selector.
    pub cs: u16,
    /// Saved flags.
    pub eflags: Eflags,
}

impl Trapframe {
    /// Current privilege level of the trapped context.
    #[inline]
    pub const fn cpl(&self) -> u16 {
        self.cs & 3
    }

    /// Whether the trap is a debug or breakpoint trap raised in user mode.
    pub fn is_user_debug_trap(&self) -> bool {
        (self.trapno == T_DEBUG || self.trapno == T_BRKPT) && self.cpl() == 3
    }
}

/// Read the frame pointer register.
#[cfg(target_arch = "x86")]
#[inline(always)]
pub fn read_ebp() -> u32 {
    let ebp: u32;
    unsafe {
        core::arch::asm!("mov {}, ebp", out(reg) ebp, options(nomem, nostack, preserves_flags));
    }
    ebp
}

/// Read the frame pointer register.
///
/// There is no 32-bit frame chain to walk on other architectures.
#[cfg(not(target_arch = "x86"))]
#[inline(always)]
pub fn read_ebp() -> u32 {
    0
}
