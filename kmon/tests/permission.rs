use kmon::{
    MonitorError,
    mm::page_table::PteFlags,
    mm::permission::{PERM_DOMAIN, char2perm, decode_perm, perm2str, str2perm},
};

/// Render `bits` and verify the string.
///
/// It ensures that:
/// - The string has exactly nine characters.
/// - It matches the expected letters.
/// - No bit is reported as dropped.
fn check_render(bits: u32, expected: &str) {
    let perm = perm2str(bits);
    assert_eq!(perm.as_str().len(), 9);
    assert_eq!(perm.as_str(), expected);
    assert_eq!(perm.dropped(), 0);
}

#[test]
fn char2perm_alphabet() {
    let alphabet = [
        ('P', PteFlags::P),
        ('W', PteFlags::W),
        ('U', PteFlags::U),
        ('T', PteFlags::PWT),
        ('C', PteFlags::PCD),
        ('A', PteFlags::A),
        ('D', PteFlags::D),
        ('S', PteFlags::PS),
        ('G', PteFlags::G),
    ];
    for (c, flag) in alphabet {
        assert_eq!(char2perm(c), Some(flag));
    }
    // Letters are case-sensitive.
    for c in ['p', 'w', 'x', '-', ' ', '0'] {
        assert_eq!(char2perm(c), None);
    }
}

#[test]
fn perm2str_canonical_order() {
    check_render(0, "---------");
    check_render(0x1ff, "GSDACTUWP");
    check_render(
        (PteFlags::U | PteFlags::W | PteFlags::P).bits(),
        "------UWP",
    );
    check_render((PteFlags::U | PteFlags::P).bits(), "------U-P");
    check_render(
        (PteFlags::PS | PteFlags::W | PteFlags::P).bits(),
        "-S-----WP",
    );
    check_render(PteFlags::G.bits(), "G--------");
    check_render((PteFlags::PCD | PteFlags::PWT).bits(), "----CT---");
}

#[test]
fn perm2str_reports_dropped_bits() {
    let perm = perm2str(0xe07);
    assert_eq!(perm.as_str(), "------UWP");
    assert_eq!(perm.dropped(), 0xe00);
    // Padding keeps the string right-aligned in a wider field.
    assert_eq!(format!("{:>12}", perm), "   ------UWP");
}

#[test]
fn decode_inverts_encode() {
    for v in 0..=PERM_DOMAIN {
        assert_eq!(
            decode_perm(perm2str(v).as_str()),
            Ok(PteFlags::from_bits_truncate(v)),
            "perm 0x{v:03x}"
        );
    }
}

#[test]
fn str2perm_never_sets_present() {
    for v in 0..=PERM_DOMAIN {
        let flags = str2perm(perm2str(v).as_str()).unwrap();
        assert!(!flags.contains(PteFlags::P));
        assert_eq!(flags, PteFlags::from_bits_truncate(v) - PteFlags::P);
    }
    assert_eq!(str2perm("P"), Ok(PteFlags::empty()));
}

#[test]
fn str2perm_any_order() {
    assert_eq!(str2perm("UW"), Ok(PteFlags::U | PteFlags::W));
    assert_eq!(str2perm("WU"), Ok(PteFlags::U | PteFlags::W));
    assert_eq!(str2perm("--U-W"), Ok(PteFlags::U | PteFlags::W));
    assert_eq!(str2perm(""), Ok(PteFlags::empty()));
}

#[test]
fn str2perm_invalid_letter() {
    assert_eq!(str2perm("UWX"), Err(MonitorError::InvalidPermission('X')));
    assert_eq!(str2perm("uw"), Err(MonitorError::InvalidPermission('u')));
    // The first offending character is reported.
    assert_eq!(str2perm("Z-Q"), Err(MonitorError::InvalidPermission('Z')));
}
