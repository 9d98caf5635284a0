//! ARM implementer and part-number lookup tables.
//!
//! Part names are a display aid for common cores. Unlisted silicon falls
//! back to the implementer name with a generic label.

use crate::constants::UNKNOWN;

/// MIDR implementer byte → company.
pub static IMPLEMENTERS: &[(u8, &str)] = &[
    (0x41, "ARM"),
    (0x42, "Broadcom"),
    (0x43, "Cavium"),
    (0x44, "DEC"),
    (0x46, "Fujitsu"),
    (0x48, "HiSilicon"),
    (0x49, "Infineon"),
    (0x4D, "Motorola/Freescale"),
    (0x4E, "NVIDIA"),
    (0x50, "APM"),
    (0x51, "Qualcomm"),
    (0x53, "Samsung"),
    (0x56, "Marvell"),
    (0x61, "Apple"),
    (0x66, "Faraday"),
    (0x69, "Intel"),
    (0x6D, "Microsoft"),
    (0x70, "Phytium"),
    (0xC0, "Ampere"),
];

/// (implementer, part) → core name.
pub static PARTS: &[(u8, u16, &str)] = &[
    (0x41, 0xD02, "Cortex-A34"),
    (0x41, 0xD03, "Cortex-A53"),
    (0x41, 0xD04, "Cortex-A35"),
    (0x41, 0xD05, "Cortex-A55"),
    (0x41, 0xD06, "Cortex-A65"),
    (0x41, 0xD07, "Cortex-A57"),
    (0x41, 0xD08, "Cortex-A72"),
    (0x41, 0xD09, "Cortex-A73"),
    (0x41, 0xD0A, "Cortex-A75"),
    (0x41, 0xD0B, "Cortex-A76"),
    (0x41, 0xD0C, "Neoverse N1"),
    (0x41, 0xD0D, "Cortex-A77"),
    (0x41, 0xD0E, "Cortex-A76AE"),
    (0x41, 0xD40, "Neoverse V1"),
    (0x41, 0xD41, "Cortex-A78"),
    (0x41, 0xD42, "Cortex-A78AE"),
    (0x41, 0xD43, "Cortex-A65AE"),
    (0x41, 0xD44, "Cortex-X1"),
    (0x41, 0xD46, "Cortex-A510"),
    (0x41, 0xD47, "Cortex-A710"),
    (0x41, 0xD48, "Cortex-X2"),
    (0x41, 0xD49, "Neoverse N2"),
    (0x41, 0xD4A, "Neoverse E1"),
    (0x41, 0xD4B, "Cortex-A78C"),
    (0x41, 0xD4C, "Cortex-X1C"),
    (0x41, 0xD4D, "Cortex-A715"),
    (0x41, 0xD4E, "Cortex-X3"),
    (0x41, 0xD4F, "Neoverse V2"),
    (0x41, 0xD80, "Cortex-A520"),
    (0x41, 0xD81, "Cortex-A720"),
    (0x41, 0xD82, "Cortex-X4"),
    (0x4E, 0x003, "Denver"),
    (0x4E, 0x004, "Denver 2"),
    (0x51, 0x800, "Kryo 2xx Gold"),
    (0x51, 0x801, "Kryo 2xx Silver"),
    (0x51, 0x802, "Kryo 3xx Gold"),
    (0x51, 0x803, "Kryo 3xx Silver"),
    (0x51, 0x804, "Kryo 4xx Gold"),
    (0x51, 0x805, "Kryo 4xx Silver"),
    (0x51, 0xC00, "Falkor"),
    (0x51, 0xC01, "Saphira"),
    (0x61, 0x020, "Icestorm (A14)"),
    (0x61, 0x021, "Firestorm (A14)"),
    (0x61, 0x022, "Icestorm (M1)"),
    (0x61, 0x023, "Firestorm (M1)"),
    (0x61, 0x024, "Icestorm (M1 Pro)"),
    (0x61, 0x025, "Firestorm (M1 Pro)"),
    (0x61, 0x028, "Icestorm (M1 Max)"),
    (0x61, 0x029, "Firestorm (M1 Max)"),
    (0x61, 0x030, "Blizzard (A15)"),
    (0x61, 0x031, "Avalanche (A15)"),
    (0x61, 0x032, "Blizzard (M2)"),
    (0x61, 0x033, "Avalanche (M2)"),
    (0xC0, 0xAC3, "Ampere-1"),
    (0xC0, 0xAC4, "Ampere-1A"),
];

/// Maps an implementer byte to its company name, `"Unknown"` when unlisted.
///
/// ```
/// assert_eq!(cpu_probe::tables::implementer_name(0x41), "ARM");
/// assert_eq!(cpu_probe::tables::implementer_name(0x61), "Apple");
/// assert_eq!(cpu_probe::tables::implementer_name(0x00), "Unknown");
/// ```
pub fn implementer_name(implementer: u8) -> &'static str {
    IMPLEMENTERS
        .iter()
        .find(|(code, _)| *code == implementer)
        .map_or(UNKNOWN, |(_, name)| *name)
}

/// Maps an (implementer, part) pair to a core name.
pub fn part_name(implementer: u8, part: u16) -> Option<&'static str> {
    PARTS
        .iter()
        .find(|(imp, p, _)| *imp == implementer && *p == part)
        .map(|(_, _, name)| *name)
}
