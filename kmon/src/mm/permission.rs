//! The permission alphabet.
//!
//! The nine architectural flags of an entry are written as a fixed-width
//! string, one position per flag, most significant flag first:
//!
//! ```text
//! position  0 1 2 3 4 5 6 7 8
//! letter    G S D A C T U W P
//! bit       8 7 6 5 4 3 2 1 0
//! ```
//!
//! A set flag shows its letter and a clear flag shows `-`. `C` stands for
//! cache-disable (PCD) and `T` for write-through (PWT). A user-writable
//! present page, for instance, reads `------UWP`.
use super::page_table::PteFlags;
use crate::MonitorError;

/// Number of positions in a permission string.
pub const PERM_STR_LEN: usize = 9;

/// The bits covered by the alphabet.
pub const PERM_DOMAIN: u32 = (1 << PERM_STR_LEN) - 1;

/// Letters of the alphabet, least significant flag first.
const ALPHABET: [u8; PERM_STR_LEN] = *b"PWUTCADSG";

/// Decode a single letter of the alphabet.
///
/// Letters are case-sensitive; any other character is `None`.
pub fn char2perm(c: char) -> Option<PteFlags> {
    ALPHABET
        .iter()
        .position(|&l| l as char == c)
        .map(|bit| PteFlags::from_bits_truncate(1 << bit))
}

/// A rendered permission string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PermString {
    letters: [u8; PERM_STR_LEN],
    dropped: u32,
}

impl PermString {
    /// The nine letters.
    pub fn as_str(&self) -> &str {
        // Only ASCII letters and dashes are ever stored.
        core::str::from_utf8(&self.letters).unwrap_or_default()
    }

    /// The bits outside of the alphabet that were given to [`perm2str`] and
    /// do not appear in the string.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl core::fmt::Display for PermString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(self.as_str())
    }
}

impl core::fmt::Debug for PermString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PermString({:?})", self.as_str())
    }
}

/// Render the permission bits of an entry.
///
/// Bits above the alphabet are truncated and reported by
/// [`PermString::dropped`]; the caller decides whether to warn about them.
pub fn perm2str(bits: u32) -> PermString {
    let mut letters = [b'-'; PERM_STR_LEN];
    for (bit, letter) in ALPHABET.iter().enumerate() {
        if bits & (1 << bit) != 0 {
            letters[PERM_STR_LEN - 1 - bit] = *letter;
        }
    }
    PermString {
        letters,
        dropped: bits & !PERM_DOMAIN,
    }
}

/// Parse a permission string back into flags.
///
/// Letters may appear in any order and `-` is accepted as a placeholder, so
/// every string produced by [`perm2str`] parses back to the bits it was made
/// from.
///
/// # Returns
/// - `Ok(PteFlags)` with the union of the named flags.
/// - `Err(MonitorError::InvalidPermission)` naming the first character that
///   is neither a letter of the alphabet nor `-`.
pub fn decode_perm(s: &str) -> Result<PteFlags, MonitorError> {
    s.chars().try_fold(PteFlags::empty(), |acc, c| match c {
        '-' => Ok(acc),
        c => char2perm(c)
            .map(|flag| acc | flag)
            .ok_or(MonitorError::InvalidPermission(c)),
    })
}

/// Parse the permission string of `setperm`.
///
/// Same as [`decode_perm`], except that the present flag is removed: the
/// mutator sets it on its own and the operator cannot unmap a page by
/// rewriting its permission.
pub fn str2perm(s: &str) -> Result<PteFlags, MonitorError> {
    decode_perm(s).map(|flags| flags - PteFlags::P)
}
