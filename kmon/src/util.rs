//! Utilities.

/// Parse a number the way C's `strtol` with base 0 does.
///
/// A `0x` or `0X` prefix selects hexadecimal, a leading `0` selects octal, and
/// anything else is decimal. A leading `-` negates the value in two's
/// complement. Unlike `strtol`, trailing garbage is rejected.
///
/// ```
/// use kmon::util::parse_number;
///
/// assert_eq!(parse_number("0xf0100000"), Some(0xf010_0000));
/// assert_eq!(parse_number("010"), Some(8));
/// assert_eq!(parse_number("4096"), Some(4096));
/// assert_eq!(parse_number("12ab"), None);
/// ```
pub fn parse_number(s: &str) -> Option<u32> {
    let (neg, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (radix, digits) = if let Some(hex) = hex {
        (16, hex)
    } else if s.len() > 1 && s.starts_with('0') {
        (8, &s[1..])
    } else {
        (10, s)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = u32::from_str_radix(digits, radix).ok()?;
    Some(if neg { value.wrapping_neg() } else { value })
}
