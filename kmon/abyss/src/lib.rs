//! The abyss of the kernel monitor that touches the hardware.
//!
//! This crate contains the pieces of the monitor that know about the 32-bit
//! x86 machine itself: how an address is decomposed for the two-level page
//! tables, how memory is reached, how the frame pointer chain is laid out on
//! the stack, and where console output goes.
//!
//! The [`kmon`] crate builds the introspection engine and the monitor
//! commands on top of these abstractions.
//!
//! [`kmon`]: ../kmon/index.html
#![no_std]

use core::sync::atomic::AtomicBool;

#[doc(hidden)]
#[macro_use]
pub mod kprint;
pub mod addressing;
pub mod dev;
pub mod unwind;
pub mod x86;

/// Silences `info!`, `warning!` and `debug!` messages.
pub static QUITE: AtomicBool = AtomicBool::new(false);

/// Enables `debug!` messages.
pub static VERBOSE: AtomicBool = AtomicBool::new(false);
