//! # cpu_probe
//!
//! Queries the host processor for its identity, instruction-set capabilities,
//! cache hierarchy and core topology, and returns one normalized snapshot
//! regardless of how the platform exposes that data.
//!
//! - **x86 / x86_64**: CPUID leaves, decoded bit by bit.
//! - **ARM / AArch64**: hardware-capability words from the auxiliary vector,
//!   `/proc/cpuinfo`, sysfs cache/topology/cpufreq nodes, and `sysctl` on macOS.
//!
//! Detection runs once, when the probe is built. Sources that are missing or
//! unreadable leave their fields at the documented defaults (`false`, `0`,
//! empty string); nothing in the pipeline fails.
//!
//! ## Example
//!
//! ```no_run
//! use cpu_probe::CpuProbe;
//!
//! let probe = CpuProbe::new();
//! let info = probe.processor_info();
//! println!("{} ({})", info.brand, info.architecture.label());
//! println!("{} cores / {} threads", info.physical_cores, info.logical_cores);
//! println!("AVX2: {}", probe.features().supports("avx2"));
//! println!("L2: {} KB", probe.cache_info().l2_kb);
//! ```

use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod arm;
pub mod constants;
pub mod features;
pub mod hwcap;
pub mod report;
pub mod sysfs;
pub mod tables;
pub mod x86;

#[cfg(all(feature = "linux", any(target_os = "linux", target_os = "android")))]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(all(feature = "windows", target_os = "windows"))]
pub mod windows;

pub use features::{ArmFeatures, Features, X86Features};
pub use hwcap::{ArmFlag, Hwcaps};

/// Errors raised by individual sources.
///
/// Detection never surfaces these to the caller; they are logged and the
/// affected field keeps its default.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unparseable value {value:?} in {}", path.display())]
    Parse { path: PathBuf, value: String },

    #[error("Source not supported: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// CPU architecture type.
///
/// Represents the instruction set architecture of the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CpuArchitecture {
    /// 32-bit x86
    X86,
    /// 64-bit x86 (AMD64/Intel 64)
    X86_64,
    /// 32-bit ARM
    ARM,
    /// 64-bit ARM (AArch64)
    ARM64,
    /// Unknown or unsupported architecture
    #[default]
    Unknown,
}

impl CpuArchitecture {
    /// Detects the CPU architecture using Rust's built-in constants.
    ///
    /// This is compile-time information and doesn't require any system calls.
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => CpuArchitecture::X86_64,
            "aarch64" => CpuArchitecture::ARM64,
            "arm" => CpuArchitecture::ARM,
            "x86" => CpuArchitecture::X86,
            _ => CpuArchitecture::Unknown,
        }
    }

    /// Human-readable name used in reports.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpu_probe::CpuArchitecture;
    ///
    /// assert_eq!(CpuArchitecture::ARM64.label(), "ARM64 (AArch64)");
    /// assert_eq!(CpuArchitecture::X86_64.label(), "x86_64");
    /// ```
    pub fn label(&self) -> &'static str {
        match self {
            CpuArchitecture::X86 => "x86",
            CpuArchitecture::X86_64 => "x86_64",
            CpuArchitecture::ARM => "ARM (AArch32)",
            CpuArchitecture::ARM64 => "ARM64 (AArch64)",
            CpuArchitecture::Unknown => std::env::consts::ARCH,
        }
    }

    /// True for both the 32-bit and 64-bit x86 variants.
    pub fn is_x86(&self) -> bool {
        matches!(self, CpuArchitecture::X86 | CpuArchitecture::X86_64)
    }

    /// True for AArch32 and AArch64.
    pub fn is_arm(&self) -> bool {
        matches!(self, CpuArchitecture::ARM | CpuArchitecture::ARM64)
    }
}

/// CPU manufacturer/vendor.
///
/// Represents the company that designed or manufactured the CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fabricant {
    /// Intel Corporation
    Intel,
    /// Advanced Micro Devices (AMD)
    Amd,
    /// Arm Ltd. reference cores
    Arm,
    Apple,
    Qualcomm,
    /// Other manufacturer with vendor string
    Other(String),
    /// Unknown manufacturer
    Unknown,
}

/// Architecture-specific identification fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signature {
    /// Decoded from CPUID leaf 1 EAX, extended fields already folded in.
    X86 { family: u32, model: u32, stepping: u32 },
    /// Main ID register fields as reported by the kernel.
    Arm {
        implementer: u8,
        variant: u8,
        part: u16,
        revision: u8,
    },
    #[default]
    Unknown,
}

/// Identity, topology and clock information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessorInfo {
    /// Raw vendor id (`GenuineIntel`) on x86, implementer name on ARM.
    pub vendor: String,
    /// Human-readable brand string.
    pub brand: String,
    /// Architecture of the backend that produced this record.
    pub architecture: CpuArchitecture,
    pub signature: Signature,
    /// Physical cores; derived from the logical count under an SMT
    /// assumption when the platform does not enumerate cores.
    pub physical_cores: u32,
    /// Hardware threads the OS can schedule.
    pub logical_cores: u32,
    /// 0 when undeterminable.
    pub base_frequency_mhz: u32,
    /// 0 when undeterminable.
    pub max_frequency_mhz: u32,
}

impl ProcessorInfo {
    /// Classifies the vendor string.
    pub fn fabricant(&self) -> Fabricant {
        match self.vendor.as_str() {
            "" => Fabricant::Unknown,
            constants::VENDOR_GENUINE_INTEL | "Intel" => Fabricant::Intel,
            constants::VENDOR_AUTHENTIC_AMD | "AMD" => Fabricant::Amd,
            "ARM" => Fabricant::Arm,
            "Apple" => Fabricant::Apple,
            "Qualcomm" => Fabricant::Qualcomm,
            constants::UNKNOWN => Fabricant::Unknown,
            other => Fabricant::Other(other.to_string()),
        }
    }
}

/// Cache sizes in kilobytes and line size in bytes.
///
/// Zero means "not determined", never "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    /// L1 data cache of one core.
    pub l1_data_kb: u32,
    pub l1_instruction_kb: u32,
    pub l2_kb: u32,
    pub l3_kb: u32,
    /// Coherency line size in bytes.
    pub line_size: u32,
}

/// One detection strategy. Stages run once each, in declaration order, and a
/// stage that finds nothing leaves its fields at their defaults.
pub trait Backend {
    fn architecture(&self) -> CpuArchitecture;

    /// Vendor, brand and signature.
    fn identify(&self, info: &mut ProcessorInfo);

    fn features(&self) -> Features;

    fn cache(&self) -> CacheInfo;

    /// Logical and physical core counts.
    fn topology(&self, info: &mut ProcessorInfo);

    /// Base and maximum clock in MHz.
    fn frequency(&self, info: &mut ProcessorInfo);
}

/// Backend for targets that are neither x86 nor ARM: only the core count is
/// known.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericBackend;

impl Backend for GenericBackend {
    fn architecture(&self) -> CpuArchitecture {
        CpuArchitecture::current()
    }

    fn identify(&self, info: &mut ProcessorInfo) {
        info.vendor = constants::UNKNOWN.to_string();
        info.brand = constants::UNKNOWN.to_string();
    }

    fn features(&self) -> Features {
        Features::Unavailable
    }

    fn cache(&self) -> CacheInfo {
        CacheInfo::default()
    }

    fn topology(&self, info: &mut ProcessorInfo) {
        info.logical_cores = hardware_concurrency();
        info.physical_cores = info.logical_cores;
    }

    fn frequency(&self, _info: &mut ProcessorInfo) {}
}

/// Knobs for the native probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Directory procfs/sysfs paths are resolved against on an ARM Linux
    /// host. CPUID-based detection on x86 never reads it.
    pub sysfs_root: PathBuf,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/"),
        }
    }
}

/// Single-shot CPU capability snapshot.
///
/// Construction runs the whole detection pipeline; the accessors only read
/// its result. Build a new probe to sample again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuProbe {
    features: Features,
    cache_info: CacheInfo,
    processor_info: ProcessorInfo,
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbe {
    /// Probes the running CPU with the native backend.
    pub fn new() -> Self {
        Self::with_options(ProbeOptions::default())
    }

    /// Probes the running CPU, resolving kernel files against
    /// `options.sysfs_root`.
    pub fn with_options(options: ProbeOptions) -> Self {
        let backend = native_backend(&options);
        Self::detect_with(backend.as_ref())
    }

    /// Runs identity → features → cache → topology → frequency on `backend`.
    pub fn detect_with<B: Backend + ?Sized>(backend: &B) -> Self {
        let mut processor_info = ProcessorInfo {
            architecture: backend.architecture(),
            ..ProcessorInfo::default()
        };

        backend.identify(&mut processor_info);
        let features = backend.features();
        let cache_info = backend.cache();
        backend.topology(&mut processor_info);
        backend.frequency(&mut processor_info);

        info!(
            "detected {} ({}), {} cores / {} threads",
            processor_info.brand,
            processor_info.architecture.label(),
            processor_info.physical_cores,
            processor_info.logical_cores
        );
        debug!("cache: {cache_info:?}");

        Self {
            features,
            cache_info,
            processor_info,
        }
    }

    /// Instruction-set extensions of the probed CPU.
    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn cache_info(&self) -> &CacheInfo {
        &self.cache_info
    }

    pub fn processor_info(&self) -> &ProcessorInfo {
        &self.processor_info
    }
}

/// Picks the backend for the compile target.
pub fn native_backend(options: &ProbeOptions) -> Box<dyn Backend> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        let _ = options;
        Box::new(x86::X86Backend::new(
            x86::NativeCpuid,
            CpuArchitecture::current(),
        ))
    }

    #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
    {
        Box::new(arm::ArmBackend::new(
            native_arm_host(options),
            CpuArchitecture::current(),
        ))
    }

    #[cfg(not(any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64"
    )))]
    {
        let _ = options;
        Box::new(GenericBackend)
    }
}

#[cfg(all(
    any(target_arch = "arm", target_arch = "aarch64"),
    feature = "linux",
    any(target_os = "linux", target_os = "android")
))]
fn native_arm_host(options: &ProbeOptions) -> linux::LinuxHost {
    linux::LinuxHost::with_root(options.sysfs_root.clone())
}

#[cfg(all(any(target_arch = "arm", target_arch = "aarch64"), target_os = "macos"))]
fn native_arm_host(_options: &ProbeOptions) -> macos::MacHost {
    macos::MacHost
}

#[cfg(all(
    any(target_arch = "arm", target_arch = "aarch64"),
    feature = "windows",
    target_os = "windows"
))]
fn native_arm_host(_options: &ProbeOptions) -> windows::WindowsHost {
    windows::WindowsHost
}

#[cfg(all(
    any(target_arch = "arm", target_arch = "aarch64"),
    not(all(feature = "linux", any(target_os = "linux", target_os = "android"))),
    not(target_os = "macos"),
    not(all(feature = "windows", target_os = "windows"))
))]
fn native_arm_host(_options: &ProbeOptions) -> arm::NullHost {
    arm::NullHost
}

/// Number of CPUs available to this process, 0 if the OS won't say.
pub fn hardware_concurrency() -> u32 {
    std::thread::available_parallelism()
        .ok()
        .and_then(|n| u32::try_from(n.get()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyBackend;

    impl Backend for EmptyBackend {
        fn architecture(&self) -> CpuArchitecture {
            CpuArchitecture::Unknown
        }
        fn identify(&self, _info: &mut ProcessorInfo) {}
        fn features(&self) -> Features {
            Features::Unavailable
        }
        fn cache(&self) -> CacheInfo {
            CacheInfo::default()
        }
        fn topology(&self, _info: &mut ProcessorInfo) {}
        fn frequency(&self, _info: &mut ProcessorInfo) {}
    }

    #[test]
    fn empty_backend_yields_defaults() {
        let probe = CpuProbe::detect_with(&EmptyBackend);
        assert_eq!(probe.processor_info(), &ProcessorInfo::default());
        assert_eq!(probe.cache_info(), &CacheInfo::default());
        assert_eq!(probe.features(), &Features::Unavailable);
    }

    #[test]
    fn native_probe_reports_architecture() {
        let probe = CpuProbe::new();
        assert_eq!(probe.processor_info().architecture, CpuArchitecture::current());
        assert!(probe.processor_info().logical_cores > 0);
    }

    #[test]
    fn fabricant_classification() {
        let mut info = ProcessorInfo {
            vendor: "GenuineIntel".to_string(),
            ..Default::default()
        };
        assert_eq!(info.fabricant(), Fabricant::Intel);

        info.vendor = "AuthenticAMD".to_string();
        assert_eq!(info.fabricant(), Fabricant::Amd);

        info.vendor = "HygonGenuine".to_string();
        assert_eq!(info.fabricant(), Fabricant::Other("HygonGenuine".to_string()));

        info.vendor = "Unknown".to_string();
        assert_eq!(info.fabricant(), Fabricant::Unknown);
    }

    #[test]
    fn generic_backend_counts_cores_only() {
        let probe = CpuProbe::detect_with(&GenericBackend);
        assert_eq!(probe.features(), &Features::Unavailable);
        assert_eq!(probe.cache_info(), &CacheInfo::default());
        assert_eq!(probe.processor_info().logical_cores, hardware_concurrency());
    }
}
