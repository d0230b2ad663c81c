//! The command interpreter of the kernel monitor.
//!
//! A [`Monitor`] reads one line at a time from a [`Teletype`], splits it
//! into whitespace-separated tokens, and dispatches on the first one. Every
//! command receives the full token list, including its own name, and a sink
//! for its report:
//!
//! ```text
//! K> showmap 0xf0000000 0x1000
//! (PSE_ON) VA: 0xf0000000, PA: 0x00000000, PERM: -S-----WP
//! (PSE_ON) VA: 0xf0400000, PA: 0x00400000, PERM: -S-----WP
//! ```
//!
//! The set of commands is fixed; see [`COMMANDS`].
pub mod backtrace;
pub mod dumpmem;
pub mod setperm;
pub mod showmap;

use crate::{
    MonitorConfiguration, MonitorError, Status,
    debugging::DebugInfoResolver,
    mm::TranslationContext,
    teletype::Teletype,
};
use abyss::{
    dev::Machine,
    x86::{Eflags, Trapframe},
};
use arrayvec::ArrayVec;
use core::fmt::Write;

/// Characters that separate the tokens of a command line.
pub const WHITESPACE: &[char] = &['\t', '\r', '\n', ' '];

/// Size of the token buffer of a command line.
///
/// One slot is reserved, so a line holds at most `MAXARGS - 1` tokens.
pub const MAXARGS: usize = 16;

/// The commands of the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// `help`
    Help,
    /// `kerninfo`
    Kerninfo,
    /// `backtrace`
    Backtrace,
    /// `showmap`
    Showmap,
    /// `setperm`
    Setperm,
    /// `dumpmem`
    Dumpmem,
    /// `step` and `s`
    Step,
    /// `continue` and `c`
    Continue,
}

/// An entry of the command table.
pub struct Command {
    /// Name the operator types.
    pub name: &'static str,
    /// One-line description shown by `help`.
    pub desc: &'static str,
    /// Usage shown when the command is invoked with bad arguments.
    pub usage: Option<&'static str>,
    /// Which command this is.
    pub kind: CommandKind,
}

/// The command table.
pub const COMMANDS: [Command; 10] = [
    Command {
        name: "help",
        desc: "Display this list of commands",
        usage: None,
        kind: CommandKind::Help,
    },
    Command {
        name: "kerninfo",
        desc: "Display information about the kernel",
        usage: None,
        kind: CommandKind::Kerninfo,
    },
    Command {
        name: "backtrace",
        desc: "Display the current call stack",
        usage: None,
        kind: CommandKind::Backtrace,
    },
    Command {
        name: "showmap",
        desc: "Display the physical mappings of a virtual range",
        usage: Some(showmap::USAGE),
        kind: CommandKind::Showmap,
    },
    Command {
        name: "setperm",
        desc: "Set the permission bits of a mapping",
        usage: Some(setperm::USAGE),
        kind: CommandKind::Setperm,
    },
    Command {
        name: "dumpmem",
        desc: "Dump the contents of a physical or virtual range",
        usage: Some(dumpmem::USAGE),
        kind: CommandKind::Dumpmem,
    },
    Command {
        name: "step",
        desc: "Execute one instruction of the trapped program",
        usage: None,
        kind: CommandKind::Step,
    },
    Command {
        name: "s",
        desc: "Alias of step",
        usage: None,
        kind: CommandKind::Step,
    },
    Command {
        name: "continue",
        desc: "Resume the trapped program",
        usage: None,
        kind: CommandKind::Continue,
    },
    Command {
        name: "c",
        desc: "Alias of continue",
        usage: None,
        kind: CommandKind::Continue,
    },
];

impl CommandKind {
    fn run(
        self,
        mon: &mut Monitor<'_>,
        argv: &[&str],
        out: &mut dyn Write,
    ) -> Result<Status, MonitorError> {
        match self {
            CommandKind::Help => mon_help(argv, out),
            CommandKind::Kerninfo => mon_kerninfo(mon, argv, out),
            CommandKind::Backtrace => backtrace::mon_backtrace(mon, argv, out),
            CommandKind::Showmap => showmap::mon_showmap(mon, argv, out),
            CommandKind::Setperm => setperm::mon_setperm(mon, argv, out),
            CommandKind::Dumpmem => dumpmem::mon_dumpmem(mon, argv, out),
            CommandKind::Step => mon_step(mon, out),
            CommandKind::Continue => mon_continue(mon, out),
        }
    }
}

/// Look up a command by name.
pub fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Split a command line into tokens.
pub fn tokenize(line: &str) -> Result<ArrayVec<&str, MAXARGS>, MonitorError> {
    let mut argv = ArrayVec::new();
    for token in line.split(WHITESPACE).filter(|token| !token.is_empty()) {
        if argv.len() == MAXARGS - 1 {
            return Err(MonitorError::TooManyArguments);
        }
        argv.push(token);
    }
    Ok(argv)
}

/// A monitor session.
pub struct Monitor<'a> {
    pub(crate) config: &'a MonitorConfiguration,
    pub(crate) ctx: TranslationContext,
    pub(crate) machine: &'a mut dyn Machine,
    pub(crate) debug_info: &'a dyn DebugInfoResolver,
    tf: Option<&'a mut Trapframe>,
}

impl<'a> Monitor<'a> {
    /// Open a session on the machine.
    pub fn new(
        config: &'a MonitorConfiguration,
        ctx: TranslationContext,
        machine: &'a mut dyn Machine,
        debug_info: &'a dyn DebugInfoResolver,
    ) -> Self {
        Self {
            config,
            ctx,
            machine,
            debug_info,
            tf: None,
        }
    }

    /// Attach the trap frame the monitor was entered with.
    pub fn with_trapframe(mut self, tf: &'a mut Trapframe) -> Self {
        self.tf = Some(tf);
        self
    }

    /// The trap frame the monitor was entered with, if any.
    pub fn trapframe(&self) -> Option<&Trapframe> {
        self.tf.as_deref()
    }

    /// Run a single command line.
    ///
    /// Failures are reported to `out`; the returned status tells the caller
    /// whether to keep prompting.
    pub fn runcmd(&mut self, line: &str, out: &mut dyn Write) -> Status {
        let argv = match tokenize(line) {
            Ok(argv) => argv,
            Err(e) => {
                println!(out, "Too many arguments (max {})", MAXARGS);
                return e.status();
            }
        };
        let Some(name) = argv.first() else {
            return Status::Success;
        };
        let Some(cmd) = find_command(name) else {
            println!(out, "Unknown command '{}'", name);
            return MonitorError::UnknownCommand.status();
        };
        match cmd.kind.run(self, &argv, out) {
            Ok(status) => status,
            Err(e) => {
                let usage = match e {
                    MonitorError::Usage | MonitorError::InvalidPermission(_) => cmd.usage,
                    _ => None,
                };
                if let Some(usage) = usage {
                    println!(out, "{}", usage);
                }
                debug!(out, "{} failed: {:?}", cmd.name, e);
                e.status()
            }
        }
    }

    /// Run the interactive loop until a command asks to leave or the input
    /// is closed.
    pub fn run<T: Teletype>(&mut self, tty: &mut T) {
        println!(tty, "Welcome to the JOS kernel monitor!");
        println!(tty, "Type 'help' for a list of commands.");
        if let Some(tf) = self.trapframe() {
            print_trapframe(tf, tty);
        }
        while let Some(line) = tty.readline(self.config.prompt()) {
            if self.runcmd(&line, tty) == Status::Exit {
                break;
            }
        }
    }
}

fn trap_name(trapno: u32) -> &'static str {
    const NAMES: [&str; 20] = [
        "Divide error",
        "Debug",
        "Non-Maskable Interrupt",
        "Breakpoint",
        "Overflow",
        "BOUND Range Exceeded",
        "Invalid Opcode",
        "Device Not Available",
        "Double Fault",
        "Coprocessor Segment Overrun",
        "Invalid TSS",
        "Segment Not Present",
        "Stack Fault",
        "General Protection",
        "Page Fault",
        "(unknown trap)",
        "x87 FPU Floating-Point Error",
        "Alignment Check",
        "Machine-Check",
        "SIMD Floating-Point Exception",
    ];
    match NAMES.get(trapno as usize) {
        Some(name) => name,
        None => "(unknown trap)",
    }
}

/// Print the parts of the trap frame the monitor knows about.
pub fn print_trapframe(tf: &Trapframe, out: &mut dyn Write) {
    println!(out, "TRAP frame");
    println!(out, "  trap 0x{:08x} {}", tf.trapno, trap_name(tf.trapno));
    println!(out, "  err  0x{:08x}", tf.err);
    println!(out, "  eip  0x{:08x}", tf.eip);
    println!(out, "  cs   0x----{:04x}", tf.cs);
    println!(out, "  flag 0x{:08x}", tf.eflags.bits());
}

fn mon_help(_argv: &[&str], out: &mut dyn Write) -> Result<Status, MonitorError> {
    for cmd in COMMANDS.iter() {
        println!(out, "{} - {}", cmd.name, cmd.desc);
    }
    Ok(Status::Success)
}

fn mon_kerninfo(
    mon: &mut Monitor<'_>,
    _argv: &[&str],
    out: &mut dyn Write,
) -> Result<Status, MonitorError> {
    use abyss::addressing::KERNBASE;

    let layout = mon.config.kernel_layout();
    let pgdir = mon.ctx.kernel_root().pa();
    println!(out, "Special kernel symbols:");
    println!(out, "  _start                  {:08x} (phys)", layout.start);
    for (name, virt) in [
        ("entry", layout.entry),
        ("etext", layout.etext),
        ("edata", layout.edata),
        ("end", layout.end),
    ] {
        println!(
            out,
            "  {:<6} {:08x} (virt)  {:08x} (phys)",
            name,
            virt,
            virt.wrapping_sub(KERNBASE)
        );
    }
    println!(
        out,
        "  kern_pgdir  {:08x} (virt)  {:08x} (phys)",
        pgdir.into_kva().into_u32(),
        pgdir.into_u32()
    );
    let footprint = layout.end.wrapping_sub(layout.entry).div_ceil(1024);
    println!(out, "Kernel executable memory footprint: {}KB", footprint);
    Ok(Status::Success)
}

fn mon_step(mon: &mut Monitor<'_>, out: &mut dyn Write) -> Result<Status, MonitorError> {
    match mon.tf.as_deref_mut() {
        Some(tf) if tf.is_user_debug_trap() => {
            tf.eflags.insert(Eflags::TF);
            Ok(Status::Exit)
        }
        _ => {
            debug!(out, "not stopped at a debug trap of a user program");
            Ok(Status::Success)
        }
    }
}

fn mon_continue(mon: &mut Monitor<'_>, out: &mut dyn Write) -> Result<Status, MonitorError> {
    match mon.tf.as_deref_mut() {
        Some(tf) if tf.is_user_debug_trap() => {
            tf.eflags.remove(Eflags::TF);
            Ok(Status::Exit)
        }
        _ => {
            debug!(out, "not stopped at a debug trap of a user program");
            Ok(Status::Success)
        }
    }
}
