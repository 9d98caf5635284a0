//! Plain-text rendering of a probe snapshot.
//!
//! Reads the three accessors only. Zero cache and frequency values are
//! printed as "unknown".

use std::fmt::Display;
use std::io::{self, Write};

use crate::{CacheInfo, CpuProbe, Features, ProcessorInfo, Signature};

const FLAG_COLUMNS: usize = 4;
const LABEL_WIDTH: usize = 16;

fn or_unknown(value: u32, unit: &str) -> String {
    if value == 0 {
        "unknown".to_string()
    } else {
        format!("{value} {unit}")
    }
}

fn heading(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(title.len()))
}

/// One `Label:  value` line with the values aligned in a column.
fn field(out: &mut impl Write, label: &str, value: impl Display) -> io::Result<()> {
    let label = format!("{label}:");
    writeln!(out, "{label:<LABEL_WIDTH$}{value}")
}

pub fn write_processor(out: &mut impl Write, info: &ProcessorInfo) -> io::Result<()> {
    heading(out, "Processor Info")?;
    field(out, "Architecture", info.architecture.label())?;
    field(out, "Vendor", &info.vendor)?;
    field(out, "Brand", &info.brand)?;

    match info.signature {
        Signature::X86 {
            family,
            model,
            stepping,
        } => {
            field(out, "Family", family)?;
            field(out, "Model", model)?;
            field(out, "Stepping", stepping)?;
        }
        Signature::Arm {
            implementer,
            variant,
            part,
            revision,
        } => {
            field(out, "Implementer", format!("0x{implementer:02X}"))?;
            field(out, "Variant", format!("0x{variant:X}"))?;
            field(out, "Part", format!("0x{part:03X}"))?;
            field(out, "Revision", revision)?;
        }
        Signature::Unknown => {}
    }

    field(out, "Physical Cores", info.physical_cores)?;
    field(out, "Logical Cores", info.logical_cores)?;
    if info.base_frequency_mhz == 0 && info.max_frequency_mhz == 0 {
        return writeln!(out, "Frequency information not available");
    }
    let mhz = |value| or_unknown(value, "MHz");
    field(out, "Base Frequency", mhz(info.base_frequency_mhz))?;
    field(out, "Max Frequency", mhz(info.max_frequency_mhz))
}

pub fn write_features(out: &mut impl Write, features: &Features) -> io::Result<()> {
    heading(out, "Features")?;
    let flags = features.flags();
    if flags.is_empty() {
        return writeln!(out, "No feature information for this architecture");
    }

    for row in flags.chunks(FLAG_COLUMNS) {
        let line = row
            .iter()
            .map(|(name, supported)| {
                let mark = if *supported { 'x' } else { ' ' };
                format!("[{mark}] {name:<12}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}", line.trim_end())?;
    }

    match features.as_arm() {
        Some(arm) if arm.sve => {
            let bits = or_unknown(arm.sve_vector_bits, "bits");
            writeln!(out, "SVE vector length: {bits}")
        }
        _ => Ok(()),
    }
}

pub fn write_cache(
    out: &mut impl Write,
    cache: &CacheInfo,
    info: &ProcessorInfo,
) -> io::Result<()> {
    let kb = |value| or_unknown(value, "KB");

    heading(out, "Cache & Topology")?;
    field(out, "L1 Data", kb(cache.l1_data_kb))?;
    field(out, "L1 Instruction", kb(cache.l1_instruction_kb))?;
    field(out, "L2", kb(cache.l2_kb))?;
    field(out, "L3", kb(cache.l3_kb))?;
    field(out, "Line Size", or_unknown(cache.line_size, "bytes"))?;
    match info.physical_cores {
        0 => field(out, "Threads/Core", "unknown"),
        physical => field(out, "Threads/Core", info.logical_cores / physical),
    }
}

/// Writes all three sections, separated by blank lines.
pub fn write_report(out: &mut impl Write, probe: &CpuProbe) -> io::Result<()> {
    write_processor(out, probe.processor_info())?;
    writeln!(out)?;
    write_features(out, probe.features())?;
    writeln!(out)?;
    write_cache(out, probe.cache_info(), probe.processor_info())
}
