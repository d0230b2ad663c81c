// Copyright 2025 Computer Architecture and Systems Lab
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frame-pointer based stack unwinding.
//!
//! Every function compiled with frame pointers starts with
//! `push %ebp; mov %esp, %ebp`, so the stack looks like this:
//!
//! ```text
//!            +------------------+
//! ebp + 20   |     arg 3        |
//! ebp + 16   |     arg 2        |
//! ebp + 12   |     arg 1        |
//! ebp + 8    |     arg 0        |
//! ebp + 4    |  return address  |
//! ebp ---->  |  caller's ebp    | ---> next frame
//!            +------------------+
//! ```
//!
//! The chain ends at the frame whose saved `ebp` is zero, which the kernel
//! entry code pushes before calling into Rust.
//!
//! Reads are trusted: nothing checks that a frame pointer lies within a
//! stack. A corrupted chain may loop or fault, which is why the walk can be
//! bounded with a maximum depth.

use crate::{addressing::Va, dev::VirtualMemory};

/// Number of argument words shown for every frame.
pub const NR_ARGS: usize = 4;

/// The frame pointer saved by the frame at `ebp`, that is, its caller's.
///
/// The end of the chain stays at the end: a zero `ebp` gives zero without
/// reading memory.
pub fn caller_frame<M: VirtualMemory + ?Sized>(mem: &M, ebp: u32) -> u32 {
    if ebp == 0 {
        0
    } else {
        mem.peek_u32(Va::new(ebp))
    }
}

/// A single frame of the frame-pointer chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackFrame {
    /// Frame pointer of this frame.
    pub ebp: u32,
    /// Return address stored one word above the frame pointer.
    pub eip: u32,
    /// Words stored from two words above the frame pointer.
    pub args: [u32; NR_ARGS],
}

/// Iterator over the frame-pointer chain, innermost frame first.
pub struct FramePointerWalk<'a, M: VirtualMemory + ?Sized> {
    mem: &'a M,
    ebp: u32,
    remaining: Option<usize>,
}

impl<'a, M: VirtualMemory + ?Sized> FramePointerWalk<'a, M> {
    /// Start a walk from the given frame pointer.
    ///
    /// With `max_depth` set, at most that many frames are produced.
    pub fn new(mem: &'a M, ebp: u32, max_depth: Option<usize>) -> Self {
        Self {
            mem,
            ebp,
            remaining: max_depth,
        }
    }

    #[inline]
    fn word(&self, ofs: u32) -> u32 {
        self.mem.peek_u32(Va::new(self.ebp.wrapping_add(ofs)))
    }
}

impl<M: VirtualMemory + ?Sized> Iterator for FramePointerWalk<'_, M> {
    type Item = StackFrame;

    fn next(&mut self) -> Option<StackFrame> {
        if self.ebp == 0 {
            return None;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let mut args = [0; NR_ARGS];
        for (i, arg) in args.iter_mut().enumerate() {
            *arg = self.word(8 + 4 * i as u32);
        }
        let frame = StackFrame {
            ebp: self.ebp,
            eip: self.word(4),
            args,
        };
        self.ebp = caller_frame(self.mem, self.ebp);
        Some(frame)
    }
}
