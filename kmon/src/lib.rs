//! # kmon: a kernel monitor for 32-bit x86
//!
//! **kmon** is the interactive debugging console of a small 32-bit x86
//! kernel. When the kernel has nothing better to do, or when it traps on a
//! breakpoint, it drops into the monitor and lets the operator inspect the
//! machine from the inside.
//!
//! The monitor understands the two-level x86 translation tables with both 4
//! KiB small pages and 4 MiB superpages, and offers the following commands:
//!
//! | Command      | What it does                                              |
//! |--------------|-----------------------------------------------------------|
//! | `help`       | Lists the commands.                                       |
//! | `kerninfo`   | Shows the kernel's link-time symbols and footprint.       |
//! | `backtrace`  | Walks the frame-pointer chain and symbolizes every frame. |
//! | `showmap`    | Shows the mappings that cover a virtual range.            |
//! | `setperm`    | Rewrites the permission bits of one mapping.              |
//! | `dumpmem`    | Dumps a physical or virtual range byte by byte.           |
//! | `step`, `s`  | Single-steps a user program stopped on a debug trap.      |
//! | `continue`, `c` | Resumes a user program stopped on a debug trap.        |
//!
//! ## Layout
//!
//! - [`mm`] decodes the translation tables: entries, the permission
//!   alphabet, and single-address translation.
//! - [`monitor`] holds the command interpreter and one module per
//!   introspection command.
//! - [`debugging`] resolves instruction addresses to source locations and
//!   function names from the kernel's ELF image.
//! - [`teletype`] is the line-oriented console the monitor talks to.
//!
//! Everything that touches hardware lives in the [`abyss`] crate. The monitor
//! only ever sees memory through the [`Machine`] windows, so the whole engine
//! can run against a simulated machine as well as against the live kernel.
//!
//! ## Logging
//!
//! The monitor writes its report to the console it was given. Diagnostics go
//! through the same sink with the [`info!`], [`warning!`] and [`debug!`]
//! macros, which prefix the line with its level. [`abyss::QUITE`] silences
//! them, and [`abyss::VERBOSE`] enables `debug!`.
//!
//! [`Machine`]: abyss::dev::Machine
//! [`info!`]: abyss::info
//! [`warning!`]: abyss::warning
//! [`debug!`]: abyss::debug

#![no_std]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

#[macro_use]
extern crate abyss;
extern crate alloc;

pub mod debugging;
pub mod mm;
pub mod monitor;
pub mod teletype;
pub mod util;

pub use abyss::{addressing, debug, info, print, println, warning};
use addressing::Va;

/// Enum representing errors that can occur while running a monitor command.
///
/// Every error is recoverable: the monitor reports it and prompts for the
/// next command.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum MonitorError {
    /// The command was invoked with the wrong arguments.
    Usage,
    /// No translation exists for the address.
    NoMapping(Va),
    /// The permission string contains a letter outside of the alphabet.
    InvalidPermission(char),
    /// The command line has more tokens than the interpreter accepts.
    TooManyArguments,
    /// The first token does not name a command.
    UnknownCommand,
}

impl MonitorError {
    /// The status the command reports for this error.
    ///
    /// Interpreter errors are reported but do not fail the line.
    pub fn status(&self) -> Status {
        match self {
            MonitorError::Usage
            | MonitorError::NoMapping(_)
            | MonitorError::InvalidPermission(_) => Status::Failure,
            MonitorError::TooManyArguments | MonitorError::UnknownCommand => Status::Success,
        }
    }
}

/// The outcome of a monitor command.
#[derive(Debug, Eq, PartialEq, Clone, Copy, num_enum::IntoPrimitive)]
#[repr(i32)]
pub enum Status {
    /// The command succeeded.
    Success = 0,
    /// The command failed; the monitor keeps running.
    Failure = 1,
    /// The monitor must return to its caller.
    Exit = -1,
}

/// Link-time layout of the kernel image.
///
/// All addresses are kernel virtual addresses, except `start` which is the
/// physical load address of the entry code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelLayout {
    /// Physical address of `_start`.
    pub start: u32,
    /// Virtual address of `entry`.
    pub entry: u32,
    /// End of the text segment.
    pub etext: u32,
    /// End of the initialized data.
    pub edata: u32,
    /// End of the kernel image.
    pub end: u32,
}

/// Settings of the kernel monitor.
///
/// Built once at boot with [`MonitorConfigurationBuilder`] and shared by
/// every monitor session.
#[derive(Debug, Clone)]
pub struct MonitorConfiguration {
    prompt: &'static str,
    max_backtrace_depth: Option<usize>,
    kernel_layout: KernelLayout,
}

impl MonitorConfiguration {
    /// The prompt printed before every command line.
    pub fn prompt(&self) -> &'static str {
        self.prompt
    }

    /// The maximum number of frames `backtrace` prints, if bounded.
    pub fn max_backtrace_depth(&self) -> Option<usize> {
        self.max_backtrace_depth
    }

    /// The kernel layout shown by `kerninfo`.
    pub fn kernel_layout(&self) -> &KernelLayout {
        &self.kernel_layout
    }
}

impl Default for MonitorConfiguration {
    fn default() -> Self {
        MonitorConfigurationBuilder::new().build()
    }
}

/// A builder for the monitor configuration.
///
/// ```
/// use kmon::MonitorConfigurationBuilder;
///
/// let config = MonitorConfigurationBuilder::new()
///     .max_backtrace_depth(32)
///     .build();
/// assert_eq!(config.prompt(), "K> ");
/// assert_eq!(config.max_backtrace_depth(), Some(32));
/// ```
pub struct MonitorConfigurationBuilder {
    config: MonitorConfiguration,
}

impl MonitorConfigurationBuilder {
    /// Start from the defaults: prompt `"K> "`, unbounded backtraces and an
    /// empty kernel layout.
    pub const fn new() -> Self {
        Self {
            config: MonitorConfiguration {
                prompt: "K> ",
                max_backtrace_depth: None,
                kernel_layout: KernelLayout {
                    start: 0,
                    entry: 0,
                    etext: 0,
                    edata: 0,
                    end: 0,
                },
            },
        }
    }

    /// Sets the prompt.
    pub fn prompt(mut self, prompt: &'static str) -> Self {
        self.config.prompt = prompt;
        self
    }

    /// Bounds the number of frames a backtrace walks.
    ///
    /// A corrupted frame chain may loop forever; the bound stops it.
    pub fn max_backtrace_depth(mut self, depth: usize) -> Self {
        self.config.max_backtrace_depth = Some(depth);
        self
    }

    /// Sets the kernel layout shown by `kerninfo`.
    pub fn kernel_layout(mut self, layout: KernelLayout) -> Self {
        self.config.kernel_layout = layout;
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> MonitorConfiguration {
        self.config
    }
}

impl Default for MonitorConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
