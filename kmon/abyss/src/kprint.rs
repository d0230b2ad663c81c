//! Kernel print utilities.
//!
//! The monitor does not own a global console: every macro takes the sink it
//! writes to as its first argument. A sink is anything implementing
//! [`core::fmt::Write`], such as the serial teletype or a buffer.

use core::fmt::Write;

#[doc(hidden)]
pub fn _print(sink: &mut dyn Write, fmt: core::fmt::Arguments<'_>) {
    // The console cannot report its own failures anywhere.
    let _ = sink.write_fmt(fmt);
}

/// Prints out the message.
///
/// Use the format! syntax to write data to the given sink.
#[macro_export]
macro_rules! print {
    ($sink:expr, $($arg:tt)*) => ($crate::kprint::_print($sink, format_args!($($arg)*)));
}

/// Prints out the message with a newline.
///
/// Use the format! syntax to write data to the given sink.
#[macro_export]
macro_rules! println {
    ($sink:expr) => ($crate::print!($sink, "\n"));
    ($sink:expr, $($arg:tt)*) => ($crate::print!($sink, "{}\n", format_args!($($arg)*)));
}

/// Display an information message.
#[macro_export]
macro_rules! info {
    ($sink:expr) => (if !$crate::QUITE.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!($sink, "[INFO]\n") });
    ($sink:expr, $($arg:tt)*) => (if !$crate::QUITE.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!($sink, "[INFO] {}\n", format_args!($($arg)*)) });
}

/// Display a warning message.
#[macro_export]
macro_rules! warning {
    ($sink:expr) => (if !$crate::QUITE.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!($sink, "[WARN]\n") });
    ($sink:expr, $($arg:tt)*) => (if !$crate::QUITE.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!($sink, "[WARN] {}\n", format_args!($($arg)*)) });
}

/// Display a debug message.
///
/// Debug messages are only shown when [`VERBOSE`] is set.
///
/// [`VERBOSE`]: crate::VERBOSE
#[macro_export]
macro_rules! debug {
    ($sink:expr) => (if $crate::VERBOSE.load(core::sync::atomic::Ordering::SeqCst) && !$crate::QUITE.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!($sink, "[DEBUG]\n") });
    ($sink:expr, $($arg:tt)*) => (if $crate::VERBOSE.load(core::sync::atomic::Ordering::SeqCst) && !$crate::QUITE.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!($sink, "[DEBUG] {}\n", format_args!($($arg)*))} );
}
