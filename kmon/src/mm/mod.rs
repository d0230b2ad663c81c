//! Translation tables as seen by the monitor.
//!
//! The monitor inspects either the kernel's own address space or, when it
//! was entered from a trap of a user environment, the address space of that
//! environment. [`TranslationContext`] names the page directory to use for
//! the duration of a command.
pub mod page_table;
pub mod permission;

use abyss::addressing::{Pa, Va};
use page_table::PageDirectory;

/// The address spaces known to the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslationContext {
    kern_pgdir: Pa,
    env_pgdir: Option<Pa>,
}

impl TranslationContext {
    /// Only the kernel's address space.
    pub const fn kernel(kern_pgdir: Pa) -> Self {
        Self {
            kern_pgdir,
            env_pgdir: None,
        }
    }

    /// The kernel's address space and the address space of the environment
    /// the monitor was entered from.
    pub const fn with_process(kern_pgdir: Pa, env_pgdir: Pa) -> Self {
        Self {
            kern_pgdir,
            env_pgdir: Some(env_pgdir),
        }
    }

    /// The page directory of the kernel.
    pub const fn kernel_root(&self) -> PageDirectory {
        PageDirectory::new(self.kern_pgdir)
    }

    /// The page directory commands translate through.
    ///
    /// This is the current environment's directory if there is one, and the
    /// kernel's otherwise.
    pub fn root(&self) -> PageDirectory {
        PageDirectory::new(self.env_pgdir.unwrap_or(self.kern_pgdir))
    }
}

/// One mapping reported by a range scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapping {
    /// First virtual address of the record.
    pub va: Va,
    /// Physical address `va` translates to.
    pub pa: Pa,
    /// Number of bytes from `va` to the end of the leaf.
    pub size: u32,
    /// Permission field of the leaf entry.
    pub perm: u32,
    /// Whether the record comes from a superpage.
    pub superpage: bool,
}
