//! ARM pipeline tests against captured procfs/sysfs trees.
//!
//! Each test writes a minimal tree into a temporary directory and runs the
//! full detection pass over it, so they run on any host architecture.

use std::fs;
use std::path::Path;

use cpu_probe::arm::{ArmBackend, ArmHost};
use cpu_probe::sysfs::SysFs;
use cpu_probe::{CpuArchitecture, CpuProbe, Hwcaps, Result, Signature};
use tempfile::TempDir;

struct FixtureHost {
    fs: SysFs,
    caps: Hwcaps,
}

impl ArmHost for FixtureHost {
    fn hwcaps(&self) -> Hwcaps {
        self.caps
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        self.fs.read_to_string(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.fs.exists(path)
    }

    fn hardware_concurrency(&self) -> u32 {
        2
    }
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path.trim_start_matches('/'));
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn write_cache_index(root: &Path, index: u32, level: u32, kind: &str, size: &str) {
    let dir = format!("/sys/devices/system/cpu/cpu0/cache/index{index}");
    write(root, &format!("{dir}/level"), &format!("{level}\n"));
    write(root, &format!("{dir}/type"), &format!("{kind}\n"));
    write(root, &format!("{dir}/size"), &format!("{size}\n"));
    write(root, &format!("{dir}/coherency_line_size"), "64\n");
}

fn probe(dir: &TempDir, caps: Hwcaps, arch: CpuArchitecture) -> CpuProbe {
    let host = FixtureHost {
        fs: SysFs::new(dir.path()),
        caps,
    };
    CpuProbe::detect_with(&ArmBackend::new(host, arch))
}

const GRAVITON2_CPUINFO: &str = "\
processor\t: 0
BogoMIPS\t: 243.75
Features\t: fp asimd evtstrm aes pmull sha1 sha2 crc32 atomics fphp asimdhp cpuid asimdrdm lrcpc dcpop asimddp ssbs
CPU implementer\t: 0x41
CPU architecture: 8
CPU variant\t: 0x3
CPU part\t: 0xd0c
CPU revision\t: 1

processor\t: 1
CPU implementer\t: 0x41
CPU part\t: 0xd0c
";

#[test]
fn test_full_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(root, "/proc/cpuinfo", GRAVITON2_CPUINFO);
    write_cache_index(root, 0, 1, "Data", "64K");
    write_cache_index(root, 1, 1, "Instruction", "64K");
    write_cache_index(root, 2, 2, "Unified", "1024K");
    write_cache_index(root, 3, 3, "Unified", "32M");
    write(root, "/sys/devices/system/cpu/present", "0-63\n");
    write(root, "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq", "2500000\n");
    write(root, "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_min_freq", "1000000\n");

    // FP, ASIMD, AES, PMULL, SHA1, SHA2, CRC32, ATOMICS
    let caps = Hwcaps::new(0b1_1111_1011, 0);
    let probe = probe(&dir, caps, CpuArchitecture::ARM64);

    let info = probe.processor_info();
    assert_eq!(info.vendor, "ARM");
    assert_eq!(info.brand, "ARM Neoverse N1");
    assert_eq!(
        info.signature,
        Signature::Arm {
            implementer: 0x41,
            variant: 3,
            part: 0xD0C,
            revision: 1
        }
    );
    assert_eq!(info.logical_cores, 64);
    assert_eq!(info.physical_cores, 64);
    assert_eq!(info.max_frequency_mhz, 2500);
    assert_eq!(info.base_frequency_mhz, 1000);

    let cache = probe.cache_info();
    assert_eq!(cache.l1_data_kb, 64);
    assert_eq!(cache.l1_instruction_kb, 64);
    assert_eq!(cache.l2_kb, 1024);
    assert_eq!(cache.l3_kb, 32 * 1024);
    assert_eq!(cache.line_size, 64);

    let features = probe.features().as_arm().unwrap();
    assert!(features.neon && features.aes && features.sha2 && features.lse);
    assert!(!features.sve && !features.sha3 && !features.bti);
}

#[test]
fn test_empty_tree_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let probe = probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64);

    let info = probe.processor_info();
    assert_eq!(info.vendor, "ARM");
    assert_eq!(info.brand, "ARM Processor");
    assert_eq!(info.signature, Signature::Unknown);
    assert_eq!(info.logical_cores, 2);
    assert_eq!(info.physical_cores, 2);
    assert_eq!(info.base_frequency_mhz, 0);
    assert_eq!(info.max_frequency_mhz, 0);

    let cache = probe.cache_info();
    assert_eq!(cache.l1_data_kb, 0);
    assert_eq!(cache.l2_kb, 0);
    assert_eq!(cache.line_size, 64, "line size falls back to the ARMv8 default");

    assert!(probe.features().flags().iter().all(|(_, supported)| !supported));
}

#[test]
fn test_cache_walk_stops_at_missing_index() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_cache_index(root, 0, 1, "Data", "32K");
    // index1 missing: index2 must not be read
    write_cache_index(root, 2, 2, "Unified", "2M");

    let probe = probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64);
    assert_eq!(probe.cache_info().l1_data_kb, 32);
    assert_eq!(probe.cache_info().l2_kb, 0);
}

#[test]
fn test_bad_level_skips_only_that_index() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_cache_index(root, 0, 1, "Data", "64K");
    write(root, "/sys/devices/system/cpu/cpu0/cache/index0/level", "n/a\n");
    write_cache_index(root, 1, 1, "Instruction", "32K");
    write_cache_index(root, 2, 2, "Unified", "1024K");
    write_cache_index(root, 3, 3, "Unified", "8M");

    let cache = *probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64).cache_info();
    assert_eq!(cache.l1_data_kb, 0);
    assert_eq!(cache.l1_instruction_kb, 32);
    assert_eq!(cache.l2_kb, 1024);
    assert_eq!(cache.l3_kb, 8 * 1024);
    assert_eq!(cache.line_size, 64);
}

#[test]
fn test_missing_level_file_skips_only_that_index() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let index0 = "/sys/devices/system/cpu/cpu0/cache/index0";
    write(root, &format!("{index0}/type"), "Data\n");
    write(root, &format!("{index0}/size"), "64K\n");
    write_cache_index(root, 1, 2, "Unified", "2M");

    let cache = *probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64).cache_info();
    assert_eq!(cache.l1_data_kb, 0);
    assert_eq!(cache.l2_kb, 2048);
}

#[test]
fn test_online_used_when_present_missing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "/sys/devices/system/cpu/online", "0-3\n");

    let probe = probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64);
    assert_eq!(probe.processor_info().logical_cores, 4);
}

#[test]
fn test_smt_active_halves_physical() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "/sys/devices/system/cpu/present", "0-7\n");
    write(dir.path(), "/sys/devices/system/cpu/smt/active", "1\n");

    let probe = probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64);
    assert_eq!(probe.processor_info().logical_cores, 8);
    assert_eq!(probe.processor_info().physical_cores, 4);
}

#[test]
fn test_base_frequency_node_preferred() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "/sys/devices/system/cpu/cpu0/cpufreq/base_frequency", "2000000\n");
    write(root, "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_min_freq", "500000\n");

    let probe = probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64);
    assert_eq!(probe.processor_info().base_frequency_mhz, 2000);
}

#[test]
fn test_malformed_files_read_as_zero() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "/proc/cpuinfo", "CPU implementer\t: garbage\nCPU part\t: ??\n");
    write(root, "/sys/devices/system/cpu/present", "nonsense\n");
    write(root, "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq", "<unknown>\n");
    write_cache_index(root, 0, 1, "Data", "lots");

    let probe = probe(&dir, Hwcaps::default(), CpuArchitecture::ARM64);
    let info = probe.processor_info();
    assert_eq!(info.vendor, "ARM");
    assert_eq!(info.signature, Signature::Unknown);
    assert_eq!(info.logical_cores, 2);
    assert_eq!(info.max_frequency_mhz, 0);
    assert_eq!(probe.cache_info().l1_data_kb, 0);
}

#[test]
fn test_sve_length_from_procfs() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "/proc/sys/abi/sve_default_vector_length", "64\n");

    // SVE (bit 22) + SVE2 (hwcap2 bit 1)
    let probe = probe(&dir, Hwcaps::new(1 << 22, 1 << 1), CpuArchitecture::ARM64);
    let features = probe.features().as_arm().unwrap();
    assert!(features.sve && features.sve2);
    assert_eq!(features.sve_vector_bits, 512);
}

#[test]
fn test_aarch32_uses_its_table() {
    let dir = tempfile::tempdir().unwrap();
    // VFP (6) + NEON (12); hwcap2 AES (0)
    let probe = probe(&dir, Hwcaps::new((1 << 6) | (1 << 12), 1), CpuArchitecture::ARM);
    let features = probe.features().as_arm().unwrap();
    assert!(features.vfp && features.neon && features.aes);
    assert!(!features.asimd && !features.rdm);
}
