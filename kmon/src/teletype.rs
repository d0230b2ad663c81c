//! A teletype (TTY) interface for line-oriented I/O.
//!
//! The monitor prints through [`core::fmt::Write`] and reads one command
//! line at a time. Echoing and line editing are the business of the device.

use alloc::string::String;

/// The console the monitor talks to.
pub trait Teletype: core::fmt::Write {
    /// Print the prompt and read a line, without its terminator.
    ///
    /// # Returns
    /// - `Some(String)` with the line the operator typed.
    /// - `None` if the input is closed.
    fn readline(&mut self, prompt: &str) -> Option<String>;
}
