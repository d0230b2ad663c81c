mod common;

use abyss::addressing::{Pa, Va};
use common::{SimMachine, lines, run_command};
use kmon::{
    MonitorError, Status,
    mm::page_table::{PteFlags, Translation, translate},
    monitor::setperm::{NewMapping, setperm},
};

const TOP: u32 = 0x1000_0000;

/// Rewrite the permission of `va` through the command, and verify.
///
/// It ensures that:
/// - The command succeeds and reports the new mapping.
/// - The translation of `va` afterwards carries `expected` as its
///   permission field and keeps its physical address.
fn check_setperm(machine: &mut SimMachine, va: u32, token: &str, expected: u32) {
    let before = translate(&*machine, &machine.cr3, Va::new(va));
    let (status, out) = run_command(machine, &format!("setperm {va:#x} {token}"));
    assert_eq!(status, Status::Success);
    let after = translate(&*machine, &machine.cr3, Va::new(va));
    assert_eq!(after.pa(), before.pa());
    assert_eq!(after.perm(), Some(expected));
    assert_eq!(
        lines(&out),
        [format!(
            "New mapping = VA: 0x{:08x}, PA: 0x{:08x}, perm: 0x{:03x}.",
            va,
            after.pa().unwrap().into_u32(),
            expected
        )]
    );
}

#[test]
fn small_page() {
    let mut machine = SimMachine::new(TOP);
    let pgdir = machine.cr3;
    machine.map_page(pgdir, 0x1000, 0x0010_0000, PteFlags::U | PteFlags::P);

    check_setperm(&mut machine, 0x1000, "UWP", 0x007);
    let (_, out) = run_command(&mut machine, "showmap 0x1000");
    assert_eq!(
        lines(&out),
        ["(PSE_OFF) VA: 0x00001000, PA: 0x00100000, PERM: ------UWP"]
    );

    // Dropping every letter, present included, keeps the page present.
    check_setperm(&mut machine, 0x1234, "---------", 0x001);
    check_setperm(&mut machine, 0x1234, "GDACT", 0x179);
}

#[test]
fn superpage_keeps_structural_bits() {
    let mut machine = SimMachine::new(TOP);
    let pgdir = machine.cr3;
    machine.map_superpage(pgdir, 0xf000_0000, 0x0000_0000, PteFlags::P | PteFlags::W);

    // Neither P nor S is in the token.
    check_setperm(&mut machine, 0xf012_3456, "U", 0x085);
    assert_eq!(
        translate(&machine, &pgdir, Va::new(0xf012_3456)),
        Translation::Superpage {
            pa: Pa::new(0x0012_3456),
            perm: (PteFlags::P | PteFlags::U | PteFlags::PS).bits(),
        }
    );
    check_setperm(&mut machine, 0xf000_0000, "-", 0x081);
}

#[test]
fn keeps_frame_and_upper_bits() {
    let mut machine = SimMachine::new(TOP);
    let pgdir = machine.cr3;
    machine.map_page(pgdir, 0x0804_8000, 0xdead_b000, PteFlags::P);

    let mapping = setperm(&mut machine, &pgdir, Va::new(0x0804_8010), PteFlags::W).unwrap();
    assert_eq!(
        mapping,
        NewMapping {
            va: Va::new(0x0804_8010),
            pa: Pa::new(0xdead_b010),
            perm: 0x003,
        }
    );
    let (_, pte) = pgdir.walk(&machine, Va::new(0x0804_8000)).unwrap();
    assert_eq!(pte.0, 0xdead_b003);
}

#[test]
fn unmapped_leaves_tables_unchanged() {
    let mut machine = SimMachine::new(TOP);
    let pgdir = machine.cr3;
    machine.map_page(pgdir, 0x1000, 0x0010_0000, PteFlags::U | PteFlags::P);
    // A leaf with a frame but without the present bit.
    machine.map_page(pgdir, 0x2000, 0x0010_1000, PteFlags::U | PteFlags::W);
    // A superpage-tagged entry without the present bit.
    machine.set_raw_pde(pgdir, 0x0040_0000, 0x0040_0000 | PteFlags::PS.bits());
    let before = machine.snapshot();

    for va in [0x2000u32, 0x3000, 0x0040_0000, 0x0080_0000] {
        assert_eq!(
            setperm(&mut machine, &pgdir, Va::new(va), PteFlags::W),
            Err(MonitorError::NoMapping(Va::new(va)))
        );
        let (status, out) = run_command(&mut machine, &format!("setperm {va:#x} UW"));
        assert_eq!(status, Status::Failure);
        assert_eq!(lines(&out), ["No such mapping"]);
        assert_eq!(machine.snapshot(), before);
    }
}

#[test]
fn invalid_letter_is_recoverable() {
    let mut machine = SimMachine::new(TOP);
    let pgdir = machine.cr3;
    machine.map_page(pgdir, 0x1000, 0x0010_0000, PteFlags::U | PteFlags::P);
    let before = machine.snapshot();

    let (status, out) = run_command(&mut machine, "setperm 0x1000 UWX");
    assert_eq!(status, Status::Failure);
    assert_eq!(
        lines(&out),
        [
            "Invalid permission letter 'X'",
            "Usage: setperm <virtual address> <permission>",
            "*For PSE-enabled pgd, PTE_PS will be auto-set.",
        ]
    );
    assert_eq!(machine.snapshot(), before);

    // The session goes on.
    check_setperm(&mut machine, 0x1000, "UW", 0x007);
}

#[test]
fn only_nine_letters_are_read() {
    let mut machine = SimMachine::new(TOP);
    let pgdir = machine.cr3;
    machine.map_page(pgdir, 0x1000, 0x0010_0000, PteFlags::P);

    // The tenth character would be invalid, but it is never looked at.
    check_setperm(&mut machine, 0x1000, "--------WX", 0x003);
}

#[test]
fn usage() {
    let mut machine = SimMachine::new(TOP);
    for line in [
        "setperm",
        "setperm 0x1000",
        "setperm 0x1000 UW P",
        "setperm 1k UW",
    ] {
        let (status, out) = run_command(&mut machine, line);
        assert_eq!(status, Status::Failure);
        assert_eq!(
            lines(&out),
            [
                "Usage: setperm <virtual address> <permission>",
                "*For PSE-enabled pgd, PTE_PS will be auto-set.",
            ]
        );
    }
}
