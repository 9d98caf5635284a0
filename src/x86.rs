//! CPUID-based detection for x86 and x86_64.
//!
//! All decoding works on plain register values so it can be exercised on any
//! host; only [`NativeCpuid`] touches the instruction itself.

use log::{debug, trace};

use crate::constants::{ASSUMED_SMT_WIDTH, MAX_CACHE_SUBLEAVES, UNKNOWN};
use crate::features::{Features, X86Features};
use crate::{Backend, CacheInfo, CpuArchitecture, ProcessorInfo, Signature};

const LEAF_VENDOR: u32 = 0x0;
const LEAF_FEATURES: u32 = 0x1;
const LEAF_CACHE_PARAMS: u32 = 0x4;
const LEAF_EXTENDED_FEATURES: u32 = 0x7;
const LEAF_EXTENDED_TOPOLOGY: u32 = 0xB;
const LEAF_FREQUENCY: u32 = 0x16;
const EXT_LEAF_MAX: u32 = 0x8000_0000;
const EXT_LEAF_FEATURES: u32 = 0x8000_0001;
const EXT_LEAF_BRAND: u32 = 0x8000_0002;
const EXT_LEAF_BRAND_LAST: u32 = 0x8000_0004;
const EXT_LEAF_L1_CACHE: u32 = 0x8000_0005;
const EXT_LEAF_L2_L3_CACHE: u32 = 0x8000_0006;
const EXT_LEAF_CACHE_TOPOLOGY: u32 = 0x8000_001D;

/// The four registers returned by one CPUID query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuidRegs {
    /// First output register; also the leaf maximum for leaves 0 and 0x8000_0000.
    pub eax: u32,
    /// Second output register.
    pub ebx: u32,
    /// Third output register.
    pub ecx: u32,
    /// Fourth output register.
    pub edx: u32,
}

impl CpuidRegs {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }
}

/// Source of CPUID results.
///
/// [`NativeCpuid`] executes the instruction; tests substitute canned
/// register values.
pub trait CpuidReader {
    /// Returns the registers for `leaf`/`subleaf`. Leaves that take no
    /// sub-leaf ignore the second argument.
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidRegs;
}

/// Executes the CPUID instruction on the current core.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCpuid;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CpuidReader for NativeCpuid {
    #[allow(unused_unsafe)]
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidRegs {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::__cpuid_count;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::__cpuid_count;

        // SAFETY: CPUID is available on every x86_64 core and on every x86
        // core Rust targets; it has no side effects beyond filling registers.
        let result = unsafe { __cpuid_count(leaf, subleaf) };
        CpuidRegs::new(result.eax, result.ebx, result.ecx, result.edx)
    }
}

#[inline]
fn bit(value: u32, n: u32) -> bool {
    value & (1 << n) != 0
}

/// Assembles the 12-byte vendor id from leaf 0 (EBX, EDX, ECX order).
pub fn decode_vendor(leaf0: CpuidRegs) -> String {
    let mut vendor = [0u8; 12];
    vendor[0..4].copy_from_slice(&leaf0.ebx.to_le_bytes());
    vendor[4..8].copy_from_slice(&leaf0.edx.to_le_bytes());
    vendor[8..12].copy_from_slice(&leaf0.ecx.to_le_bytes());
    String::from_utf8_lossy(&vendor)
        .trim_end_matches('\0')
        .to_string()
}

/// Assembles the 48-byte brand string from leaves `0x80000002..=0x80000004`.
///
/// The string ends at the first NUL; leading padding spaces are dropped.
pub fn decode_brand(leaves: &[CpuidRegs; 3]) -> String {
    let mut brand = [0u8; 48];
    for (i, regs) in leaves.iter().enumerate() {
        let offset = i * 16;
        brand[offset..offset + 4].copy_from_slice(&regs.eax.to_le_bytes());
        brand[offset + 4..offset + 8].copy_from_slice(&regs.ebx.to_le_bytes());
        brand[offset + 8..offset + 12].copy_from_slice(&regs.ecx.to_le_bytes());
        brand[offset + 12..offset + 16].copy_from_slice(&regs.edx.to_le_bytes());
    }
    let end = brand.iter().position(|&b| b == 0).unwrap_or(brand.len());
    String::from_utf8_lossy(&brand[..end])
        .trim_start_matches(' ')
        .trim_end()
        .to_string()
}

/// Decodes family, model and stepping from leaf 1 EAX.
///
/// The extended family byte is added only when the base family is `0xF`; the
/// extended model nibble is folded in when the base family is `0x6` or `0xF`.
pub fn decode_signature(eax: u32) -> (u32, u32, u32) {
    let stepping = eax & 0xF;
    let base_model = (eax >> 4) & 0xF;
    let base_family = (eax >> 8) & 0xF;

    let mut family = base_family;
    if base_family == 0xF {
        family += (eax >> 20) & 0xFF;
    }

    let mut model = base_model;
    if base_family == 0x6 || base_family == 0xF {
        model += ((eax >> 16) & 0xF) << 4;
    }

    (family, model, stepping)
}

/// Kind of cache reported by a deterministic cache-parameters sub-leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Data,
    Instruction,
    Unified,
}

/// One decoded cache-parameters sub-leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub level: u32,
    pub kind: CacheKind,
    pub size_bytes: u64,
    pub line_size: u32,
}

impl CacheDescriptor {
    pub fn size_kb(&self) -> u32 {
        u32::try_from(self.size_bytes / 1024).unwrap_or(u32::MAX)
    }
}

/// Decodes a leaf 4 (or `0x8000001D`) sub-leaf. `None` marks the end of the
/// list (cache type 0); reserved types are skipped as `None` as well.
pub fn decode_cache_descriptor(regs: CpuidRegs) -> Option<CacheDescriptor> {
    let kind = match regs.eax & 0x1F {
        1 => CacheKind::Data,
        2 => CacheKind::Instruction,
        3 => CacheKind::Unified,
        _ => return None,
    };
    let level = (regs.eax >> 5) & 0x7;
    let line_size = (regs.ebx & 0xFFF) + 1;
    let partitions = ((regs.ebx >> 12) & 0x3FF) + 1;
    let ways = ((regs.ebx >> 22) & 0x3FF) + 1;
    let sets = u64::from(regs.ecx) + 1;

    Some(CacheDescriptor {
        level,
        kind,
        size_bytes: u64::from(ways) * u64::from(partitions) * u64::from(line_size) * sets,
        line_size,
    })
}

/// Physical core count under the leaf-1 heuristic: two threads per core when
/// the HTT bit is set. Never reports 0 for a nonzero logical count.
pub fn physical_from_htt(logical: u32, htt: bool) -> u32 {
    let physical = if htt { logical / ASSUMED_SMT_WIDTH } else { logical };
    if physical == 0 { logical } else { physical }
}

/// Decodes the feature flags from whichever leaves are available.
pub fn decode_features(
    leaf1: Option<CpuidRegs>,
    leaf7: Option<CpuidRegs>,
    ext1: Option<CpuidRegs>,
) -> X86Features {
    let mut f = X86Features::default();

    if let Some(CpuidRegs { ecx, edx, .. }) = leaf1 {
        f.x87_fpu = bit(edx, 0);
        f.tsc = bit(edx, 4);
        f.mmx = bit(edx, 23);
        f.sse = bit(edx, 25);
        f.sse2 = bit(edx, 26);
        f.htt = bit(edx, 28);

        f.sse3 = bit(ecx, 0);
        f.pclmulqdq = bit(ecx, 1);
        f.vmx = bit(ecx, 5);
        f.ssse3 = bit(ecx, 9);
        f.fma = bit(ecx, 12);
        f.sse4_1 = bit(ecx, 19);
        f.sse4_2 = bit(ecx, 20);
        f.movbe = bit(ecx, 22);
        f.popcnt = bit(ecx, 23);
        f.aes = bit(ecx, 25);
        f.xsave = bit(ecx, 26);
        f.osxsave = bit(ecx, 27);
        f.avx = bit(ecx, 28);
        f.f16c = bit(ecx, 29);
        f.rdrand = bit(ecx, 30);
        f.hypervisor = bit(ecx, 31);
    }

    if let Some(CpuidRegs { ebx, ecx, edx, .. }) = leaf7 {
        f.sgx = bit(ebx, 2);
        f.bmi1 = bit(ebx, 3);
        f.avx2 = bit(ebx, 5);
        f.smep = bit(ebx, 7);
        f.bmi2 = bit(ebx, 8);
        f.avx512f = bit(ebx, 16);
        f.avx512dq = bit(ebx, 17);
        f.rdseed = bit(ebx, 18);
        f.adx = bit(ebx, 19);
        f.smap = bit(ebx, 20);
        f.avx512ifma = bit(ebx, 21);
        f.avx512cd = bit(ebx, 28);
        f.sha = bit(ebx, 29);
        f.avx512bw = bit(ebx, 30);
        f.avx512vl = bit(ebx, 31);

        f.avx512vbmi = bit(ecx, 1);
        f.umip = bit(ecx, 2);
        f.pku = bit(ecx, 3);
        f.gfni = bit(ecx, 8);
        f.vaes = bit(ecx, 9);
        f.vpclmulqdq = bit(ecx, 10);

        f.hybrid = bit(edx, 15);
        f.ibt = bit(edx, 20);
    }

    if let Some(CpuidRegs { ecx, edx, .. }) = ext1 {
        f.lahf_lm = bit(ecx, 0);
        f.svm = bit(ecx, 2);
        f.lzcnt = bit(ecx, 5);
        f.sse4a = bit(ecx, 6);
        f.fma4 = bit(ecx, 16);

        f.syscall = bit(edx, 11);
        f.nx = bit(edx, 20);
        f.pdpe1gb = bit(edx, 26);
        f.rdtscp = bit(edx, 27);
        f.lm = bit(edx, 29);
    }

    f
}

/// Decodes the legacy AMD cache leaves `0x80000005` and `0x80000006`.
pub fn decode_legacy_amd_cache(l1: Option<CpuidRegs>, l2l3: Option<CpuidRegs>) -> CacheInfo {
    let mut cache = CacheInfo::default();
    if let Some(regs) = l1 {
        cache.l1_data_kb = regs.ecx >> 24;
        cache.l1_instruction_kb = regs.edx >> 24;
        cache.line_size = regs.ecx & 0xFF;
    }
    if let Some(regs) = l2l3 {
        cache.l2_kb = regs.ecx >> 16;
        // EDX[31:18] counts 512 KB blocks.
        cache.l3_kb = (regs.edx >> 18) * 512;
        if cache.line_size == 0 {
            cache.line_size = regs.ecx & 0xFF;
        }
    }
    cache
}

/// Detection pipeline over a [`CpuidReader`].
#[derive(Debug, Clone)]
pub struct X86Backend<R> {
    reader: R,
    architecture: CpuArchitecture,
    max_basic_leaf: u32,
    max_extended_leaf: u32,
}

impl<R: CpuidReader> X86Backend<R> {
    /// Discovers the basic and extended leaf maxima; later queries never go
    /// past them.
    pub fn new(reader: R, architecture: CpuArchitecture) -> Self {
        let max_basic_leaf = reader.cpuid(LEAF_VENDOR, 0).eax;
        let max_extended_leaf = match reader.cpuid(EXT_LEAF_MAX, 0).eax {
            max if max >= EXT_LEAF_MAX => max,
            _ => 0,
        };
        trace!(
            "cpuid max basic leaf {max_basic_leaf:#x}, max extended leaf {max_extended_leaf:#x}"
        );

        Self {
            reader,
            architecture,
            max_basic_leaf,
            max_extended_leaf,
        }
    }

    /// Highest standard leaf reported by leaf 0.
    pub fn max_basic_leaf(&self) -> u32 {
        self.max_basic_leaf
    }

    /// Highest extended leaf, 0 when the extended range is absent.
    pub fn max_extended_leaf(&self) -> u32 {
        self.max_extended_leaf
    }

    /// Queries `leaf` only if it lies within the discovered maximum.
    fn leaf(&self, leaf: u32, subleaf: u32) -> Option<CpuidRegs> {
        let max = if leaf >= EXT_LEAF_MAX {
            self.max_extended_leaf
        } else {
            self.max_basic_leaf
        };
        if leaf > max {
            debug!("cpuid leaf {leaf:#x} beyond maximum {max:#x}");
            return None;
        }
        let regs = self.reader.cpuid(leaf, subleaf);
        trace!("cpuid({leaf:#x}, {subleaf}) = {regs:x?}");
        Some(regs)
    }

    fn walk_cache_leaf(&self, leaf: u32) -> Option<CacheInfo> {
        let mut cache = CacheInfo::default();
        let mut found = false;

        for subleaf in 0..MAX_CACHE_SUBLEAVES {
            let regs = self.leaf(leaf, subleaf)?;
            if regs.eax & 0x1F == 0 {
                break;
            }
            let Some(desc) = decode_cache_descriptor(regs) else {
                continue;
            };
            found = true;

            if cache.line_size == 0 {
                cache.line_size = desc.line_size;
            }
            match (desc.level, desc.kind) {
                (1, CacheKind::Data) => cache.l1_data_kb = desc.size_kb(),
                (1, CacheKind::Instruction) => cache.l1_instruction_kb = desc.size_kb(),
                (2, _) => cache.l2_kb = desc.size_kb(),
                (3, _) => cache.l3_kb = desc.size_kb(),
                _ => {}
            }
        }

        found.then_some(cache)
    }
}

impl<R: CpuidReader> Backend for X86Backend<R> {
    fn architecture(&self) -> CpuArchitecture {
        self.architecture
    }

    fn identify(&self, info: &mut ProcessorInfo) {
        info.vendor = self
            .leaf(LEAF_VENDOR, 0)
            .map(decode_vendor)
            .unwrap_or_default();

        info.brand = if self.max_extended_leaf >= EXT_LEAF_BRAND_LAST {
            let leaves = [
                self.reader.cpuid(EXT_LEAF_BRAND, 0),
                self.reader.cpuid(EXT_LEAF_BRAND + 1, 0),
                self.reader.cpuid(EXT_LEAF_BRAND + 2, 0),
            ];
            match decode_brand(&leaves) {
                brand if brand.is_empty() => UNKNOWN.to_string(),
                brand => brand,
            }
        } else {
            debug!("brand string leaves unavailable");
            UNKNOWN.to_string()
        };

        if let Some(leaf1) = self.leaf(LEAF_FEATURES, 0) {
            let (family, model, stepping) = decode_signature(leaf1.eax);
            info.signature = Signature::X86 {
                family,
                model,
                stepping,
            };
        }
    }

    fn features(&self) -> Features {
        Features::X86(decode_features(
            self.leaf(LEAF_FEATURES, 0),
            self.leaf(LEAF_EXTENDED_FEATURES, 0),
            self.leaf(EXT_LEAF_FEATURES, 0),
        ))
    }

    fn cache(&self) -> CacheInfo {
        if let Some(cache) = self.walk_cache_leaf(LEAF_CACHE_PARAMS) {
            return cache;
        }
        // AMD reports the same layout under 0x8000001D (TOPOEXT).
        if let Some(cache) = self.walk_cache_leaf(EXT_LEAF_CACHE_TOPOLOGY) {
            return cache;
        }
        debug!("no deterministic cache leaves, trying legacy AMD leaves");
        decode_legacy_amd_cache(
            self.leaf(EXT_LEAF_L1_CACHE, 0),
            self.leaf(EXT_LEAF_L2_L3_CACHE, 0),
        )
    }

    fn topology(&self, info: &mut ProcessorInfo) {
        let Some(leaf1) = self.leaf(LEAF_FEATURES, 0) else {
            debug!("cpuid leaf 1 unavailable, using hardware concurrency");
            info.logical_cores = crate::hardware_concurrency();
            info.physical_cores = info.logical_cores;
            return;
        };

        let mut logical = (leaf1.ebx >> 16) & 0xFF;
        if logical == 0 {
            debug!("cpuid reports 0 logical processors, using hardware concurrency");
            logical = crate::hardware_concurrency();
        }
        info.logical_cores = logical;

        let topology = self
            .leaf(LEAF_EXTENDED_TOPOLOGY, 0)
            .filter(|regs| regs.ebx != 0);

        info.physical_cores = match topology {
            Some(regs) => {
                let thread_mask_width = regs.eax & 0x1F;
                match logical.checked_shr(thread_mask_width) {
                    Some(physical) if physical != 0 => physical,
                    _ => logical,
                }
            }
            None => physical_from_htt(logical, bit(leaf1.edx, 28)),
        };
    }

    fn frequency(&self, info: &mut ProcessorInfo) {
        if let Some(regs) = self.leaf(LEAF_FREQUENCY, 0) {
            info.base_frequency_mhz = regs.eax & 0xFFFF;
            info.max_frequency_mhz = regs.ebx & 0xFFFF;
        }
    }
}
