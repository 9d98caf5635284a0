//! Detection for ARM cores through OS-mediated sources.
//!
//! No instruction exposes identity, cache or topology to user space on ARM,
//! so every stage composes several [`ArmHost`] queries and falls through to
//! the next source when one is missing.

use log::{debug, trace};

use crate::constants::{
    ASSUMED_SMT_WIDTH, DEFAULT_ARM_CACHE_LINE, DEFAULT_ARM_VENDOR, GENERIC_ARM_LABEL,
    MAX_CACHE_INDEX, PROC_CPUINFO, SVE_DEFAULT_VECTOR_LENGTH, SYS_CPU0_BASE_FREQ, SYS_CPU0_CACHE,
    SYS_CPU0_MAX_FREQ, SYS_CPU0_MIN_FREQ, SYS_CPU_ONLINE, SYS_CPU_PRESENT, SYS_SMT_ACTIVE,
    SYSCTL_BRAND_STRING, SYSCTL_CACHE_LINE, SYSCTL_FREQ, SYSCTL_FREQ_MAX, SYSCTL_L1D_CACHE,
    SYSCTL_L1I_CACHE, SYSCTL_L2_CACHE, SYSCTL_L3_CACHE, SYSCTL_LOGICAL_CPU, SYSCTL_PHYSICAL_CPU,
};
use crate::features::{ArmFeatures, Features};
use crate::hwcap::{
    self, AARCH32_CAPABILITIES, AARCH64_CAPABILITIES, Capability, DARWIN_FEATURE_SYSCTLS, Hwcaps,
};
use crate::sysfs::{
    khz_to_mhz, parse_auto_radix, parse_cache_size_kb, parse_cpu_list_count, parse_flag,
    parse_leading_u64,
};
use crate::tables::{implementer_name, part_name};
use crate::{Backend, CacheInfo, CpuArchitecture, ProbeError, ProcessorInfo, Result, Signature};

/// Operating-system sources the ARM backend draws from.
///
/// Every method defaults to "unavailable" so a host only implements the
/// queries its platform actually has.
pub trait ArmHost {
    /// Primary and secondary hardware-capability words.
    fn hwcaps(&self) -> Hwcaps {
        Hwcaps::default()
    }

    /// Reads a kernel pseudo-file by its absolute path.
    fn read_to_string(&self, _path: &str) -> Result<String> {
        Err(ProbeError::Unsupported("no procfs/sysfs on this platform"))
    }

    /// Whether a kernel pseudo-file or directory exists at `path`.
    fn exists(&self, _path: &str) -> bool {
        false
    }

    /// String-valued `sysctl` (Darwin).
    fn sysctl_string(&self, _name: &str) -> Option<String> {
        None
    }

    /// Integer-valued `sysctl` (Darwin).
    fn sysctl_u64(&self, _name: &str) -> Option<u64> {
        None
    }

    /// Number of CPUs the OS lets this process run on.
    fn hardware_concurrency(&self) -> u32 {
        crate::hardware_concurrency()
    }
}

/// Host with no sources beyond hardware concurrency.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl ArmHost for NullHost {}

/// Fields of interest from the first processor block of `/proc/cpuinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuinfoFields {
    pub implementer: Option<u8>,
    pub variant: Option<u8>,
    pub part: Option<u16>,
    pub revision: Option<u8>,
    pub model_name: Option<String>,
    pub hardware: Option<String>,
}

/// Parses `/proc/cpuinfo` text. The first occurrence of each key wins.
pub fn parse_cpuinfo(content: &str) -> CpuinfoFields {
    let mut fields = CpuinfoFields::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "CPU implementer" if fields.implementer.is_none() => {
                fields.implementer = parse_auto_radix(value).and_then(|v| u8::try_from(v).ok());
            }
            "CPU variant" if fields.variant.is_none() => {
                fields.variant = parse_auto_radix(value).and_then(|v| u8::try_from(v).ok());
            }
            "CPU part" if fields.part.is_none() => {
                fields.part = parse_auto_radix(value).and_then(|v| u16::try_from(v).ok());
            }
            "CPU revision" if fields.revision.is_none() => {
                fields.revision = parse_auto_radix(value).and_then(|v| u8::try_from(v).ok());
            }
            _ if key.eq_ignore_ascii_case("model name") && fields.model_name.is_none() => {
                if !value.is_empty() {
                    fields.model_name = Some(value.to_string());
                }
            }
            "Hardware" if fields.hardware.is_none() => {
                if !value.is_empty() {
                    fields.hardware = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    fields
}

fn generic_brand(vendor: &str) -> String {
    if vendor == DEFAULT_ARM_VENDOR {
        GENERIC_ARM_LABEL.to_string()
    } else {
        format!("{vendor} {GENERIC_ARM_LABEL}")
    }
}

/// Detection pipeline over an [`ArmHost`].
#[derive(Debug, Clone)]
pub struct ArmBackend<H> {
    host: H,
    architecture: CpuArchitecture,
}

impl<H: ArmHost> ArmBackend<H> {
    /// `architecture` selects the AArch32 or AArch64 capability table.
    pub fn new(host: H, architecture: CpuArchitecture) -> Self {
        Self { host, architecture }
    }

    /// Capability table for the execution state this backend runs in.
    pub fn capability_table(&self) -> &'static [Capability] {
        match self.architecture {
            CpuArchitecture::ARM => AARCH32_CAPABILITIES,
            _ => AARCH64_CAPABILITIES,
        }
    }

    fn read(&self, path: &str) -> Option<String> {
        match self.host.read_to_string(path) {
            Ok(text) => {
                trace!("{path}: {:?}", text.trim());
                Some(text)
            }
            Err(err) => {
                debug!("{err}");
                None
            }
        }
    }

    fn read_u64(&self, path: &str) -> Option<u64> {
        let text = self.read(path)?;
        let value = parse_leading_u64(&text);
        if value.is_none() {
            let err = ProbeError::Parse {
                path: path.into(),
                value: text.trim().to_string(),
            };
            debug!("{err}");
        }
        value
    }

    fn sysctl_kb(&self, name: &str) -> u32 {
        self.host
            .sysctl_u64(name)
            .map_or(0, |bytes| u32::try_from(bytes / 1024).unwrap_or(u32::MAX))
    }

    fn sysctl_mhz(&self, name: &str) -> u32 {
        self.host
            .sysctl_u64(name)
            .map_or(0, |hz| u32::try_from(hz / 1_000_000).unwrap_or(u32::MAX))
    }

    fn sysfs_cache(&self, cache: &mut CacheInfo) -> bool {
        let mut found = false;

        for index in 0..MAX_CACHE_INDEX {
            let dir = format!("{SYS_CPU0_CACHE}/index{index}");
            if !self.host.exists(&dir) {
                break;
            }
            found = true;

            // An unreadable level drops this entry only.
            let level = self.read_u64(&format!("{dir}/level")).unwrap_or(0);

            let kind = self.read(&format!("{dir}/type")).unwrap_or_default();
            let size = self
                .read(&format!("{dir}/size"))
                .map_or(0, |text| parse_cache_size_kb(&text));

            match (level, kind.trim().to_ascii_lowercase().as_str()) {
                (1, "data") => cache.l1_data_kb = size,
                (1, "instruction") => cache.l1_instruction_kb = size,
                (2, _) => cache.l2_kb = size,
                (3, _) => cache.l3_kb = size,
                _ => {}
            }

            if cache.line_size == 0 {
                cache.line_size = self
                    .read_u64(&format!("{dir}/coherency_line_size"))
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(0);
            }
        }

        found
    }

    fn sysctl_cache(&self, cache: &mut CacheInfo) {
        cache.l1_data_kb = self.sysctl_kb(SYSCTL_L1D_CACHE);
        cache.l1_instruction_kb = self.sysctl_kb(SYSCTL_L1I_CACHE);
        cache.l2_kb = self.sysctl_kb(SYSCTL_L2_CACHE);
        cache.l3_kb = self.sysctl_kb(SYSCTL_L3_CACHE);
        cache.line_size = self
            .host
            .sysctl_u64(SYSCTL_CACHE_LINE)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
    }
}

impl<H: ArmHost> Backend for ArmBackend<H> {
    fn architecture(&self) -> CpuArchitecture {
        self.architecture
    }

    fn identify(&self, info: &mut ProcessorInfo) {
        info.vendor = DEFAULT_ARM_VENDOR.to_string();
        info.brand = generic_brand(&info.vendor);

        if let Some(content) = self.read(PROC_CPUINFO) {
            let fields = parse_cpuinfo(&content);

            if let Some(implementer) = fields.implementer {
                info.vendor = implementer_name(implementer).to_string();
            }

            let core = fields
                .implementer
                .zip(fields.part)
                .and_then(|(implementer, part)| part_name(implementer, part));

            info.brand = match (core, fields.model_name, fields.hardware) {
                (Some(core), _, _) => format!("{} {core}", info.vendor),
                (None, Some(model_name), _) => model_name,
                (None, None, Some(hardware)) => hardware,
                (None, None, None) => generic_brand(&info.vendor),
            };

            if fields.implementer.is_some() || fields.part.is_some() {
                info.signature = Signature::Arm {
                    implementer: fields.implementer.unwrap_or(0),
                    variant: fields.variant.unwrap_or(0),
                    part: fields.part.unwrap_or(0),
                    revision: fields.revision.unwrap_or(0),
                };
            }
            return;
        }

        if let Some(brand) = self.host.sysctl_string(SYSCTL_BRAND_STRING) {
            if brand.starts_with("Apple") {
                info.vendor = "Apple".to_string();
            }
            info.brand = brand;
        }
    }

    fn features(&self) -> Features {
        let mut features = ArmFeatures::default();

        let caps = self.host.hwcaps();
        if caps.is_empty() {
            debug!("no hardware-capability words");
        }
        trace!("hwcap {:#x}, hwcap2 {:#x}", caps.hwcap, caps.hwcap2);
        hwcap::apply(self.capability_table(), caps, &mut features);

        for (name, flag) in DARWIN_FEATURE_SYSCTLS {
            if self.host.sysctl_u64(name).is_some_and(|v| v != 0) {
                features.set(*flag);
            }
        }

        if features.sve {
            features.sve_vector_bits = self
                .read_u64(SVE_DEFAULT_VECTOR_LENGTH)
                .and_then(|bytes| u32::try_from(bytes.saturating_mul(8)).ok())
                .unwrap_or(0);
        }

        Features::Arm(features)
    }

    fn cache(&self) -> CacheInfo {
        let mut cache = CacheInfo::default();

        if !self.sysfs_cache(&mut cache) {
            debug!("no sysfs cache nodes, trying sysctl");
            self.sysctl_cache(&mut cache);
        }

        if cache.line_size == 0 {
            cache.line_size = DEFAULT_ARM_CACHE_LINE;
        }
        cache
    }

    fn topology(&self, info: &mut ProcessorInfo) {
        let listed = [SYS_CPU_PRESENT, SYS_CPU_ONLINE]
            .into_iter()
            .find_map(|path| {
                self.read(path)
                    .and_then(|text| parse_cpu_list_count(&text))
            });

        let logical = listed
            .or_else(|| {
                self.host
                    .sysctl_u64(SYSCTL_LOGICAL_CPU)
                    .and_then(|v| u32::try_from(v).ok())
            })
            .unwrap_or_else(|| self.host.hardware_concurrency());
        info.logical_cores = logical;

        let smt_active = self
            .read(SYS_SMT_ACTIVE)
            .is_some_and(|text| parse_flag(&text));
        info.physical_cores = if smt_active {
            (logical / ASSUMED_SMT_WIDTH).max(1)
        } else {
            self.host
                .sysctl_u64(SYSCTL_PHYSICAL_CPU)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(logical)
        };
    }

    fn frequency(&self, info: &mut ProcessorInfo) {
        info.max_frequency_mhz = self
            .read(SYS_CPU0_MAX_FREQ)
            .map_or(0, |text| khz_to_mhz(&text));

        info.base_frequency_mhz = self
            .read(SYS_CPU0_BASE_FREQ)
            .or_else(|| self.read(SYS_CPU0_MIN_FREQ))
            .map_or(0, |text| khz_to_mhz(&text));

        if info.max_frequency_mhz == 0 {
            info.max_frequency_mhz = self.sysctl_mhz(SYSCTL_FREQ_MAX);
        }
        if info.base_frequency_mhz == 0 {
            info.base_frequency_mhz = self.sysctl_mhz(SYSCTL_FREQ);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory host for exercising the pipeline without a filesystem.
    #[derive(Default)]
    struct MapHost {
        files: HashMap<&'static str, &'static str>,
        sysctls: HashMap<&'static str, u64>,
        strings: HashMap<&'static str, &'static str>,
        caps: Hwcaps,
    }

    impl ArmHost for MapHost {
        fn hwcaps(&self) -> Hwcaps {
            self.caps
        }

        fn read_to_string(&self, path: &str) -> Result<String> {
            self.files
                .get(path)
                .map(|s| s.to_string())
                .ok_or(ProbeError::Unsupported("missing"))
        }

        fn exists(&self, path: &str) -> bool {
            let dir = format!("{path}/");
            self.files
                .keys()
                .any(|file| *file == path || file.starts_with(&dir))
        }

        fn sysctl_string(&self, name: &str) -> Option<String> {
            self.strings.get(name).map(|s| s.to_string())
        }

        fn sysctl_u64(&self, name: &str) -> Option<u64> {
            self.sysctls.get(name).copied()
        }

        fn hardware_concurrency(&self) -> u32 {
            3
        }
    }

    const CPUINFO_A78: &str = "processor\t: 0\n\
BogoMIPS\t: 50.00\n\
Features\t: fp asimd evtstrm aes pmull sha1 sha2 crc32 atomics\n\
CPU implementer\t: 0x41\n\
CPU architecture: 8\n\
CPU variant\t: 0x1\n\
CPU part\t: 0xd41\n\
CPU revision\t: 1\n\
\n\
processor\t: 1\n\
CPU implementer\t: 0x51\n\
CPU part\t: 0x805\n";

    #[test]
    fn cpuinfo_first_block_wins() {
        let fields = parse_cpuinfo(CPUINFO_A78);
        assert_eq!(fields.implementer, Some(0x41));
        assert_eq!(fields.variant, Some(0x1));
        assert_eq!(fields.part, Some(0xD41));
        assert_eq!(fields.revision, Some(1));
        assert_eq!(fields.model_name, None);
    }

    #[test]
    fn cpuinfo_without_colons_is_empty() {
        assert_eq!(parse_cpuinfo("garbage\nmore garbage"), CpuinfoFields::default());
    }

    #[test]
    fn identity_from_known_part() {
        let host = MapHost {
            files: HashMap::from([(PROC_CPUINFO, CPUINFO_A78)]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.identify(&mut info);

        assert_eq!(info.vendor, "ARM");
        assert_eq!(info.brand, "ARM Cortex-A78");
        assert_eq!(
            info.signature,
            Signature::Arm {
                implementer: 0x41,
                variant: 1,
                part: 0xD41,
                revision: 1
            }
        );
    }

    #[test]
    fn identity_unknown_part_uses_model_name() {
        let host = MapHost {
            files: HashMap::from([(
                PROC_CPUINFO,
                "model name\t: ARMv7 Processor rev 4 (v7l)\n\
                 CPU implementer\t: 0x41\n\
                 CPU part\t: 0xc07\n",
            )]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM);
        let mut info = ProcessorInfo::default();
        backend.identify(&mut info);
        assert_eq!(info.brand, "ARMv7 Processor rev 4 (v7l)");
    }

    #[test]
    fn identity_falls_back_to_hardware_line() {
        let host = MapHost {
            files: HashMap::from([(
                PROC_CPUINFO,
                "Processor\t: AArch64 Processor rev 4 (aarch64)\n\
                 CPU implementer\t: 0x51\n\
                 CPU part\t: 0x0ff\n\
                 Hardware\t: Qualcomm Technologies, Inc SM8150\n",
            )]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.identify(&mut info);
        assert_eq!(info.vendor, "Qualcomm");
        assert_eq!(info.brand, "Qualcomm Technologies, Inc SM8150");
    }

    #[test]
    fn identity_unknown_implementer_generic_label() {
        let host = MapHost {
            files: HashMap::from([(PROC_CPUINFO, "CPU implementer\t: 0x99\nCPU part\t: 0x001\n")]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.identify(&mut info);
        assert_eq!(info.vendor, "Unknown");
        assert_eq!(info.brand, "Unknown ARM Processor");
    }

    #[test]
    fn identity_from_sysctl_brand() {
        let host = MapHost {
            strings: HashMap::from([(SYSCTL_BRAND_STRING, "Apple M2")]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.identify(&mut info);
        assert_eq!(info.vendor, "Apple");
        assert_eq!(info.brand, "Apple M2");
        assert_eq!(info.signature, Signature::Unknown);
    }

    #[test]
    fn darwin_sysctl_features() {
        let host = MapHost {
            sysctls: HashMap::from([
                ("hw.optional.neon", 1),
                ("hw.optional.arm.FEAT_AES", 1),
                ("hw.optional.arm.FEAT_SHA3", 0),
            ]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let features = backend.features();
        let arm = features.as_arm().unwrap();
        assert!(arm.neon && arm.asimd);
        assert!(arm.aes);
        assert!(!arm.sha3);
    }

    #[test]
    fn sve_vector_length_in_bits() {
        let host = MapHost {
            caps: Hwcaps::new(1 << 22, 0),
            files: HashMap::from([(SVE_DEFAULT_VECTOR_LENGTH, "32\n")]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let features = backend.features();
        assert_eq!(features.as_arm().unwrap().sve_vector_bits, 256);
    }

    #[test]
    fn sve_length_ignored_without_sve() {
        let host = MapHost {
            files: HashMap::from([(SVE_DEFAULT_VECTOR_LENGTH, "32\n")]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        assert_eq!(backend.features().as_arm().unwrap().sve_vector_bits, 0);
    }

    #[test]
    fn cache_from_sysctl_and_default_line() {
        let host = MapHost {
            sysctls: HashMap::from([
                (SYSCTL_L1D_CACHE, 65_536),
                (SYSCTL_L1I_CACHE, 131_072),
                (SYSCTL_L2_CACHE, 4_194_304),
            ]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let cache = backend.cache();
        assert_eq!(cache.l1_data_kb, 64);
        assert_eq!(cache.l1_instruction_kb, 128);
        assert_eq!(cache.l2_kb, 4096);
        assert_eq!(cache.l3_kb, 0);
        assert_eq!(cache.line_size, 64);
    }

    #[test]
    fn sysfs_cache_stops_at_first_missing_index() {
        let host = MapHost {
            files: HashMap::from([
                ("/sys/devices/system/cpu/cpu0/cache/index0/level", "x\n"),
                ("/sys/devices/system/cpu/cpu0/cache/index1/level", "2\n"),
                ("/sys/devices/system/cpu/cpu0/cache/index1/type", "Unified\n"),
                ("/sys/devices/system/cpu/cpu0/cache/index1/size", "512K\n"),
                ("/sys/devices/system/cpu/cpu0/cache/index3/level", "3\n"),
                ("/sys/devices/system/cpu/cpu0/cache/index3/size", "4M\n"),
            ]),
            sysctls: HashMap::from([(SYSCTL_L3_CACHE, 1 << 30)]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let cache = backend.cache();
        assert_eq!(cache.l2_kb, 512);
        assert_eq!(cache.l3_kb, 0, "index3 lies past the gap, sysctl is not consulted");
    }

    #[test]
    fn topology_falls_back_to_hardware_concurrency() {
        let backend = ArmBackend::new(MapHost::default(), CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.topology(&mut info);
        assert_eq!(info.logical_cores, 3);
        assert_eq!(info.physical_cores, 3);
    }

    #[test]
    fn topology_present_then_smt() {
        let host = MapHost {
            files: HashMap::from([(SYS_CPU_PRESENT, "0-7\n"), (SYS_SMT_ACTIVE, "1\n")]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.topology(&mut info);
        assert_eq!(info.logical_cores, 8);
        assert_eq!(info.physical_cores, 4);
    }

    #[test]
    fn frequency_min_freq_stands_in_for_base() {
        let host = MapHost {
            files: HashMap::from([
                (SYS_CPU0_MAX_FREQ, "2841600\n"),
                (SYS_CPU0_MIN_FREQ, "300000\n"),
            ]),
            ..Default::default()
        };
        let backend = ArmBackend::new(host, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.frequency(&mut info);
        assert_eq!(info.max_frequency_mhz, 2841);
        assert_eq!(info.base_frequency_mhz, 300);
    }

    #[test]
    fn null_host_degrades_to_defaults() {
        let backend = ArmBackend::new(NullHost, CpuArchitecture::ARM64);
        let mut info = ProcessorInfo::default();
        backend.identify(&mut info);
        backend.frequency(&mut info);
        assert_eq!(info.vendor, "ARM");
        assert_eq!(info.brand, "ARM Processor");
        assert_eq!(info.base_frequency_mhz, 0);
        assert_eq!(info.max_frequency_mhz, 0);
        assert_eq!(backend.features(), Features::Arm(ArmFeatures::default()));
    }
}
