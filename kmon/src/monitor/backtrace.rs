//! `backtrace`: the frame-pointer chain of the monitor's caller.
use super::Monitor;
use crate::{
    MonitorError, Status,
    debugging::{DebugInfoResolver, EipDebugInfo},
};
use abyss::{
    dev::VirtualMemory,
    unwind::{FramePointerWalk, StackFrame},
};
use core::fmt::Write;

/// Walk the chain from `ebp` and resolve every return address.
///
/// Addresses the resolver does not know are shown as
/// [`EipDebugInfo::unknown`].
pub fn backtrace<'a, M: VirtualMemory + ?Sized>(
    mem: &'a M,
    ebp: u32,
    max_depth: Option<usize>,
    resolver: &'a dyn DebugInfoResolver,
) -> impl Iterator<Item = (StackFrame, EipDebugInfo)> + 'a {
    let walk = FramePointerWalk::new(mem, ebp, max_depth);
    walk.map(move |frame| {
        let info = resolver
            .resolve(frame.eip)
            .unwrap_or_else(|| EipDebugInfo::unknown(frame.eip));
        (frame, info)
    })
}

/// Print one frame.
pub fn print_frame(frame: &StackFrame, info: &EipDebugInfo, out: &mut dyn Write) {
    let [a0, a1, a2, a3] = frame.args;
    println!(
        out,
        "  ebp {:08x}  eip {:08x}  args {:08x} {:08x} {:08x} {:08x}",
        frame.ebp, frame.eip, a0, a1, a2, a3
    );
    println!(
        out,
        "         {}:{}: {}+{}",
        info.file,
        info.line,
        info.name(),
        frame.eip.wrapping_sub(info.fn_addr)
    );
}

/// `backtrace`
pub fn mon_backtrace(
    mon: &mut Monitor<'_>,
    _argv: &[&str],
    out: &mut dyn Write,
) -> Result<Status, MonitorError> {
    println!(out, "Stack backtrace:");
    let ebp = mon.machine.frame_pointer();
    for (frame, info) in backtrace(
        &*mon.machine,
        ebp,
        mon.config.max_backtrace_depth(),
        mon.debug_info,
    ) {
        print_frame(&frame, &info, out);
    }
    Ok(Status::Success)
}
