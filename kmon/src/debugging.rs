//! Source-level information of instruction addresses.
//!
//! `backtrace` shows, for every return address it finds on the stack, the
//! source file and line of the address and the function containing it. The
//! monitor asks a [`DebugInfoResolver`] for this; [`KernelDebugInfo`]
//! answers from the DWARF sections and the symbol table of the kernel's ELF
//! image.
use addr2line::Context;
use alloc::{
    borrow::Cow,
    boxed::Box,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::fmt::Write;

/// Source-level information of one instruction address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EipDebugInfo {
    /// Source file name.
    pub file: String,
    /// Source line number.
    pub line: u32,
    /// Name of the function containing the address.
    pub fn_name: String,
    /// Number of meaningful bytes of `fn_name`.
    pub fn_namelen: usize,
    /// Start address of the function.
    pub fn_addr: u32,
}

impl EipDebugInfo {
    /// The information shown for an address nothing is known about.
    pub fn unknown(eip: u32) -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            fn_name: "<unknown>".to_string(),
            fn_namelen: "<unknown>".len(),
            fn_addr: eip,
        }
    }

    /// The first `fn_namelen` bytes of the function name.
    pub fn name(&self) -> &str {
        let name = self.fn_name.get(..self.fn_namelen);
        name.unwrap_or(&self.fn_name)
    }
}

/// Resolves instruction addresses to source-level information.
pub trait DebugInfoResolver {
    /// Look up an instruction address.
    ///
    /// Returns `None` if the address is not known.
    fn resolve(&self, eip: u32) -> Option<EipDebugInfo>;
}

/// A resolver that knows nothing.
pub struct NoDebugInfo;

impl DebugInfoResolver for NoDebugInfo {
    fn resolve(&self, _eip: u32) -> Option<EipDebugInfo> {
        None
    }
}

/// Errors of loading the debug information of a kernel image.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DebugInfoError {
    /// The image is not an ELF file.
    BadImage,
    /// The DWARF sections cannot be parsed.
    BadDwarf,
}

struct Symbol {
    addr: u32,
    size: u32,
    name: String,
}

/// Debug information of the kernel image.
pub struct KernelDebugInfo {
    context: Context<gimli::EndianArcSlice<gimli::LittleEndian>>,
    /// Function symbols, sorted by address.
    symbols: Vec<Symbol>,
}

impl KernelDebugInfo {
    /// Load debugging symbols from the kernel image.
    pub fn load(image: &[u8]) -> Result<Self, DebugInfoError> {
        use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};

        let Ok(kernel) = object::File::parse(image) else {
            return Err(DebugInfoError::BadImage);
        };
        let dwarf: Result<_, ()> = gimli::Dwarf::load(|id| {
            let data = kernel
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[]));
            let data: Arc<[u8]> = Arc::from(data.as_ref());
            Ok(gimli::EndianArcSlice::new(data, gimli::LittleEndian))
        });
        let Ok(dwarf) = dwarf else {
            return Err(DebugInfoError::BadDwarf);
        };
        let Ok(context) = Context::from_dwarf(dwarf) else {
            return Err(DebugInfoError::BadDwarf);
        };

        let mut symbols = kernel
            .symbols()
            .filter(|sym| sym.is_definition() && sym.kind() == SymbolKind::Text)
            .filter_map(|sym| {
                Some(Symbol {
                    addr: u32::try_from(sym.address()).ok()?,
                    size: u32::try_from(sym.size()).ok()?,
                    name: sym.name().ok()?.to_string(),
                })
            })
            .collect::<Vec<_>>();
        symbols.sort_by_key(|sym| sym.addr);
        Ok(Self { context, symbols })
    }

    fn symbol(&self, eip: u32) -> Option<&Symbol> {
        let idx = self
            .symbols
            .partition_point(|sym| sym.addr <= eip)
            .checked_sub(1)?;
        let sym = &self.symbols[idx];
        // A symbol without a size covers everything up to the next one.
        if sym.size == 0 || eip - sym.addr < sym.size {
            Some(sym)
        } else {
            None
        }
    }

    fn dwarf_function(&self, eip: u32) -> Option<String> {
        let mut frames = self.context.find_frames(eip as u64).ok()?;
        let frame = frames.next().ok()??;
        let name = frame.function?.demangle().ok()?.into_owned();
        Some(name)
    }
}

impl DebugInfoResolver for KernelDebugInfo {
    fn resolve(&self, eip: u32) -> Option<EipDebugInfo> {
        let (file, line) = match self.context.find_location(eip as u64) {
            Ok(Some(loc)) => (loc.file.unwrap_or("<unknown>"), loc.line.unwrap_or(0)),
            _ => ("<unknown>", 0),
        };
        let (fn_name, fn_addr) = match self.symbol(eip) {
            Some(sym) => {
                let name = addr2line::demangle_auto(Cow::Borrowed(sym.name.as_str()), None);
                (name.into_owned(), sym.addr)
            }
            None => (self.dwarf_function(eip)?, eip),
        };
        Some(EipDebugInfo {
            file: file.to_string(),
            line,
            fn_namelen: fn_name.len(),
            fn_name,
            fn_addr,
        })
    }
}

/// Load the kernel's debug information, falling back to [`NoDebugInfo`].
pub fn load_debug_infos(image: Option<&[u8]>, out: &mut dyn Write) -> Box<dyn DebugInfoResolver> {
    let Some(image) = image else {
        warning!(
            out,
            "Failed to read kernel image. Disabling symbolized backtrace."
        );
        return Box::new(NoDebugInfo);
    };
    match KernelDebugInfo::load(image) {
        Ok(info) => {
            info!(out, "Loaded {} function symbols.", info.symbols.len());
            Box::new(info)
        }
        Err(e) => {
            warning!(
                out,
                "Failed to load debug symbols ({:?}). Disabling symbolized backtrace.",
                e
            );
            Box::new(NoDebugInfo)
        }
    }
}
