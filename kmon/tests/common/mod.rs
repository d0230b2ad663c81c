//! A simulated 32-bit machine for the monitor tests.
#![allow(dead_code)]

use abyss::{
    addressing::{PAGE_MASK, PAGE_SIZE, Pa, Va},
    dev::{Machine, PhysicalMemory, VirtualMemory},
};
use kmon::{
    MonitorConfiguration, Status,
    debugging::{DebugInfoResolver, EipDebugInfo, NoDebugInfo},
    mm::{
        TranslationContext,
        page_table::{PageDirectory, Pde, Pte, PteFlags, translate},
    },
    monitor::Monitor,
    teletype::Teletype,
};
use std::collections::{BTreeMap, VecDeque};

/// Physical address of the first frame handed out for tables.
const TABLE_FRAMES: u32 = 0x0080_0000;

/// Sparse physical memory, a page directory in `%cr3`, and a frame pointer.
///
/// Memory that was never written reads as zero. Reading through the virtual
/// window an address that the loaded directory does not map panics, the
/// way the real machine would fault.
pub struct SimMachine {
    frames: BTreeMap<u32, Box<[u8; PAGE_SIZE as usize]>>,
    top: Pa,
    next_table: u32,
    pub cr3: PageDirectory,
    pub ebp: u32,
}

impl SimMachine {
    /// A machine with `top` bytes of physical memory and an empty page
    /// directory loaded.
    pub fn new(top: u32) -> Self {
        let mut machine = Self {
            frames: BTreeMap::new(),
            top: Pa::new(top),
            next_table: TABLE_FRAMES,
            cr3: PageDirectory::new(Pa::ZERO),
            ebp: 0,
        };
        machine.cr3 = machine.new_pgdir();
        machine
    }

    /// Hand out a zeroed frame for a table.
    pub fn alloc_table(&mut self) -> Pa {
        let pa = Pa::new(self.next_table);
        self.next_table += PAGE_SIZE;
        self.frames.insert(pa.into_u32(), Box::new([0; PAGE_SIZE as usize]));
        pa
    }

    /// An empty page directory.
    pub fn new_pgdir(&mut self) -> PageDirectory {
        PageDirectory::new(self.alloc_table())
    }

    /// Map the 4 KiB page at `va` to the frame at `pa` with the leaf entry
    /// flags `flags`, creating the page table if needed.
    pub fn map_page(&mut self, pgdir: PageDirectory, va: u32, pa: u32, flags: PteFlags) {
        let va = Va::new(va);
        let pde = pgdir.pde(&*self, va);
        let pt = match pde.pt() {
            Ok(pt) => pt,
            Err(_) => {
                let table = self.alloc_table();
                let flags = PteFlags::P | PteFlags::W | PteFlags::U;
                let pde = Pde(table.into_u32() | flags.bits());
                pgdir.set_pde(self, va, pde);
                pde.pt().expect("fresh page table")
            }
        };
        pt.set_pte(self, va, Pte((pa & !PAGE_MASK) | flags.bits()));
    }

    /// Store `pde` as is in the slot that covers `va`.
    pub fn set_raw_pde(&mut self, pgdir: PageDirectory, va: u32, pde: u32) {
        pgdir.set_pde(self, Va::new(va), Pde(pde));
    }

    /// Map the 4 MiB superpage at `va` to the frame at `pa` with `flags`.
    /// `PS` is added to the flags.
    pub fn map_superpage(&mut self, pgdir: PageDirectory, va: u32, pa: u32, flags: PteFlags) {
        self.set_raw_pde(pgdir, va, pa | (flags | PteFlags::PS).bits());
    }

    /// Copy `bytes` into physical memory at `pa`.
    pub fn write_bytes(&mut self, pa: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            let addr = pa + i as u32;
            self.frame_mut(addr)[(addr & PAGE_MASK) as usize] = *b;
        }
    }

    /// Store little-endian words into physical memory at `pa`.
    pub fn write_words(&mut self, pa: u32, words: &[u32]) {
        for (i, w) in words.iter().enumerate() {
            self.write_bytes(pa + 4 * i as u32, &w.to_le_bytes());
        }
    }

    /// A copy of every frame that has been touched.
    pub fn snapshot(&self) -> BTreeMap<u32, Box<[u8; PAGE_SIZE as usize]>> {
        self.frames.clone()
    }

    fn frame_mut(&mut self, pa: u32) -> &mut [u8; PAGE_SIZE as usize] {
        self.frames
            .entry(pa & !PAGE_MASK)
            .or_insert_with(|| Box::new([0; PAGE_SIZE as usize]))
    }
}

impl PhysicalMemory for SimMachine {
    fn top(&self) -> Pa {
        self.top
    }

    fn read_u8(&self, pa: Pa) -> u8 {
        let pa = pa.into_u32();
        let top = self.top.into_u32();
        assert!(pa < top, "physical read beyond top: {pa:#x}");
        self.frames
            .get(&(pa & !PAGE_MASK))
            .map_or(0, |frame| frame[(pa & PAGE_MASK) as usize])
    }

    fn read_u32(&self, pa: Pa) -> u32 {
        u32::from_le_bytes([
            self.read_u8(pa),
            self.read_u8(pa + 1),
            self.read_u8(pa + 2),
            self.read_u8(pa + 3),
        ])
    }

    fn write_u32(&mut self, pa: Pa, value: u32) {
        self.write_bytes(pa.into_u32(), &value.to_le_bytes());
    }
}

impl VirtualMemory for SimMachine {
    fn peek_u8(&self, va: Va) -> u8 {
        match translate(self, &self.cr3, va).pa() {
            Some(pa) => self.read_u8(pa),
            None => panic!("page fault at {va:?}"),
        }
    }

    fn peek_u32(&self, va: Va) -> u32 {
        u32::from_le_bytes([
            self.peek_u8(va),
            self.peek_u8(va + 1),
            self.peek_u8(va + 2),
            self.peek_u8(va + 3),
        ])
    }
}

impl Machine for SimMachine {
    fn frame_pointer(&self) -> u32 {
        self.ebp
    }
}

/// A resolver over a fixed list of functions.
#[derive(Default)]
pub struct StaticSymbols {
    pub functions: Vec<(u32, u32, &'static str, u32, &'static str, usize)>,
}

impl StaticSymbols {
    /// Add the function `[start, end)` defined at `file:line`, whose name is
    /// the first `namelen` bytes of `name`.
    pub fn with(
        mut self,
        start: u32,
        end: u32,
        file: &'static str,
        line: u32,
        name: &'static str,
        namelen: usize,
    ) -> Self {
        self.functions.push((start, end, file, line, name, namelen));
        self
    }
}

impl DebugInfoResolver for StaticSymbols {
    fn resolve(&self, eip: u32) -> Option<EipDebugInfo> {
        self.functions
            .iter()
            .find(|(start, end, ..)| (*start..*end).contains(&eip))
            .map(|&(start, _, file, line, name, namelen)| EipDebugInfo {
                file: file.to_string(),
                line,
                fn_name: name.to_string(),
                fn_namelen: namelen,
                fn_addr: start,
            })
    }
}

/// A console fed from a script.
#[derive(Default)]
pub struct ScriptTty {
    pub input: VecDeque<String>,
    pub output: String,
    pub prompts: usize,
}

impl ScriptTty {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            input: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl core::fmt::Write for ScriptTty {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Teletype for ScriptTty {
    fn readline(&mut self, prompt: &str) -> Option<String> {
        self.prompts += 1;
        self.output.push_str(prompt);
        self.input.pop_front()
    }
}

/// The lines of `output`, without the empty trailing one.
pub fn lines(output: &str) -> Vec<&str> {
    output.lines().collect()
}

/// Run one command line against the kernel's address space of `machine`.
pub fn run_command(machine: &mut SimMachine, line: &str) -> (Status, String) {
    let config = MonitorConfiguration::default();
    let ctx = TranslationContext::kernel(machine.cr3.pa());
    let mut out = String::new();
    let status = Monitor::new(&config, ctx, machine, &NoDebugInfo).runcmd(line, &mut out);
    (status, out)
}
