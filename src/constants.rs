//! Probe Constants
//!
//! Centralized paths, limits and labels so the backends never carry string
//! literals for the files and sysctls they read.

// ========== Labels ==========
pub const UNKNOWN: &str = "Unknown";
pub const GENERIC_ARM_LABEL: &str = "ARM Processor";
pub const DEFAULT_ARM_VENDOR: &str = "ARM";

// ========== x86 Vendor Strings ==========
pub const VENDOR_GENUINE_INTEL: &str = "GenuineIntel";
pub const VENDOR_AUTHENTIC_AMD: &str = "AuthenticAMD";

// ========== procfs ==========
pub const PROC_CPUINFO: &str = "/proc/cpuinfo";
pub const SVE_DEFAULT_VECTOR_LENGTH: &str = "/proc/sys/abi/sve_default_vector_length";

// ========== sysfs ==========
pub const SYS_CPU_PRESENT: &str = "/sys/devices/system/cpu/present";
pub const SYS_CPU_ONLINE: &str = "/sys/devices/system/cpu/online";
pub const SYS_SMT_ACTIVE: &str = "/sys/devices/system/cpu/smt/active";
pub const SYS_CPU0_CACHE: &str = "/sys/devices/system/cpu/cpu0/cache";
pub const SYS_CPU0_MAX_FREQ: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";
pub const SYS_CPU0_MIN_FREQ: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_min_freq";
pub const SYS_CPU0_BASE_FREQ: &str = "/sys/devices/system/cpu/cpu0/cpufreq/base_frequency";

// ========== Darwin sysctl names ==========
pub const SYSCTL_BRAND_STRING: &str = "machdep.cpu.brand_string";
pub const SYSCTL_PHYSICAL_CPU: &str = "hw.physicalcpu";
pub const SYSCTL_LOGICAL_CPU: &str = "hw.logicalcpu";
pub const SYSCTL_L1D_CACHE: &str = "hw.l1dcachesize";
pub const SYSCTL_L1I_CACHE: &str = "hw.l1icachesize";
pub const SYSCTL_L2_CACHE: &str = "hw.l2cachesize";
pub const SYSCTL_L3_CACHE: &str = "hw.l3cachesize";
pub const SYSCTL_CACHE_LINE: &str = "hw.cachelinesize";
pub const SYSCTL_FREQ_MAX: &str = "hw.cpufrequency_max";
pub const SYSCTL_FREQ: &str = "hw.cpufrequency";

// ========== Limits ==========
/// Upper bound on CPUID leaf 4 / 0x8000001D sub-leaves walked.
pub const MAX_CACHE_SUBLEAVES: u32 = 10;
/// Upper bound on sysfs `indexN` cache directories walked.
pub const MAX_CACHE_INDEX: u32 = 10;

// ========== Defaults ==========
/// Assumed ARMv8 line size when no source reports one. A policy choice, not a measurement.
pub const DEFAULT_ARM_CACHE_LINE: u32 = 64;
/// Threads per core assumed whenever SMT is reported without a precise topology.
pub const ASSUMED_SMT_WIDTH: u32 = 2;
