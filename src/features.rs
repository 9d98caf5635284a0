use serde::{Deserialize, Serialize};

use crate::hwcap::ArmFlag;

/// Instruction-set capabilities of the running processor.
///
/// Each architecture family carries its own flag set so that concepts which
/// only share a name (x86 `sha` against ARM `sha1`/`sha2`/`sha3`) never
/// collapse into one field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "arch", rename_all = "lowercase")]
pub enum Features {
    /// Flags decoded from CPUID.
    X86(X86Features),
    /// Flags advertised by the operating system for an ARM core.
    Arm(ArmFeatures),
    /// No backend for this architecture; every query answers false.
    #[default]
    Unavailable,
}

impl Features {
    /// Returns every `(label, supported)` pair known to the active architecture.
    pub fn flags(&self) -> Vec<(&'static str, bool)> {
        match self {
            Features::X86(features) => features.flags(),
            Features::Arm(features) => features.flags(),
            Features::Unavailable => Vec::new(),
        }
    }

    /// Returns `true` only if `label` names a flag of the active architecture
    /// and that flag was observed set.
    ///
    /// ```
    /// use cpu_probe::{Features, X86Features};
    ///
    /// let features = Features::X86(X86Features { avx2: true, ..Default::default() });
    /// assert!(features.supports("avx2"));
    /// assert!(!features.supports("neon"));
    /// ```
    pub fn supports(&self, label: &str) -> bool {
        self.flags()
            .into_iter()
            .any(|(name, supported)| supported && name.eq_ignore_ascii_case(label))
    }

    pub fn as_x86(&self) -> Option<&X86Features> {
        match self {
            Features::X86(features) => Some(features),
            _ => None,
        }
    }

    pub fn as_arm(&self) -> Option<&ArmFeatures> {
        match self {
            Features::Arm(features) => Some(features),
            _ => None,
        }
    }
}

/// x86 capability flags from CPUID leaves 1, 7 and `0x80000001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct X86Features {
    // Leaf 1 EDX
    pub x87_fpu: bool,
    pub tsc: bool,
    pub mmx: bool,
    pub sse: bool,
    pub sse2: bool,
    /// Hyper-threading capable package (HTT).
    pub htt: bool,

    // Leaf 1 ECX
    pub sse3: bool,
    pub pclmulqdq: bool,
    pub vmx: bool,
    pub ssse3: bool,
    pub fma: bool,
    pub sse4_1: bool,
    pub sse4_2: bool,
    pub movbe: bool,
    pub popcnt: bool,
    pub aes: bool,
    pub xsave: bool,
    pub osxsave: bool,
    pub avx: bool,
    pub f16c: bool,
    pub rdrand: bool,
    pub hypervisor: bool,

    // Leaf 7 EBX
    pub sgx: bool,
    pub bmi1: bool,
    pub avx2: bool,
    pub smep: bool,
    pub bmi2: bool,
    pub avx512f: bool,
    pub avx512dq: bool,
    pub rdseed: bool,
    pub adx: bool,
    pub smap: bool,
    pub avx512ifma: bool,
    pub avx512cd: bool,
    pub sha: bool,
    pub avx512bw: bool,
    pub avx512vl: bool,

    // Leaf 7 ECX
    pub avx512vbmi: bool,
    pub umip: bool,
    pub pku: bool,
    pub gfni: bool,
    pub vaes: bool,
    pub vpclmulqdq: bool,

    // Leaf 7 EDX
    pub hybrid: bool,
    pub ibt: bool,

    // Extended leaf 0x80000001
    pub lahf_lm: bool,
    pub svm: bool,
    pub lzcnt: bool,
    pub sse4a: bool,
    pub fma4: bool,
    pub syscall: bool,
    pub nx: bool,
    pub pdpe1gb: bool,
    pub rdtscp: bool,
    pub lm: bool,
}

impl X86Features {
    pub fn flags(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("x87", self.x87_fpu),
            ("tsc", self.tsc),
            ("mmx", self.mmx),
            ("sse", self.sse),
            ("sse2", self.sse2),
            ("htt", self.htt),
            ("sse3", self.sse3),
            ("pclmulqdq", self.pclmulqdq),
            ("vmx", self.vmx),
            ("ssse3", self.ssse3),
            ("fma", self.fma),
            ("sse4.1", self.sse4_1),
            ("sse4.2", self.sse4_2),
            ("movbe", self.movbe),
            ("popcnt", self.popcnt),
            ("aes", self.aes),
            ("xsave", self.xsave),
            ("osxsave", self.osxsave),
            ("avx", self.avx),
            ("f16c", self.f16c),
            ("rdrand", self.rdrand),
            ("hypervisor", self.hypervisor),
            ("sgx", self.sgx),
            ("bmi1", self.bmi1),
            ("avx2", self.avx2),
            ("smep", self.smep),
            ("bmi2", self.bmi2),
            ("avx512f", self.avx512f),
            ("avx512dq", self.avx512dq),
            ("rdseed", self.rdseed),
            ("adx", self.adx),
            ("smap", self.smap),
            ("avx512ifma", self.avx512ifma),
            ("avx512cd", self.avx512cd),
            ("sha", self.sha),
            ("avx512bw", self.avx512bw),
            ("avx512vl", self.avx512vl),
            ("avx512vbmi", self.avx512vbmi),
            ("umip", self.umip),
            ("pku", self.pku),
            ("gfni", self.gfni),
            ("vaes", self.vaes),
            ("vpclmulqdq", self.vpclmulqdq),
            ("hybrid", self.hybrid),
            ("ibt", self.ibt),
            ("lahf_lm", self.lahf_lm),
            ("svm", self.svm),
            ("lzcnt", self.lzcnt),
            ("sse4a", self.sse4a),
            ("fma4", self.fma4),
            ("syscall", self.syscall),
            ("nx", self.nx),
            ("pdpe1gb", self.pdpe1gb),
            ("rdtscp", self.rdtscp),
            ("lm", self.lm),
        ]
    }
}

/// ARM capability flags as advertised by the kernel (or Darwin sysctls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArmFeatures {
    // SIMD and floating point
    pub fp: bool,
    pub asimd: bool,
    /// Same capability as `asimd` on AArch64; the AArch32 `neon` hwcap otherwise.
    pub neon: bool,
    pub fp16: bool,
    pub bf16: bool,
    pub i8mm: bool,
    pub rdm: bool,
    pub dotprod: bool,
    pub fhm: bool,
    pub fcma: bool,
    pub jscvt: bool,
    pub frint: bool,

    // AArch32 only
    pub vfp: bool,
    pub vfpv3: bool,
    pub vfpv4: bool,
    pub idiv: bool,

    // Cryptography
    pub aes: bool,
    pub pmull: bool,
    pub sha1: bool,
    pub sha2: bool,
    pub sha3: bool,
    pub sha512: bool,
    pub sm3: bool,
    pub sm4: bool,
    pub crc32: bool,
    pub rng: bool,

    // Atomics and memory model
    /// Large System Extensions (the kernel's `atomics` hwcap).
    pub lse: bool,
    pub lse2: bool,
    pub lrcpc: bool,
    pub dcpop: bool,
    pub dcpodp: bool,
    pub flagm: bool,

    // Scalable vectors and matrices
    pub sve: bool,
    pub sve2: bool,
    pub sve_aes: bool,
    pub sve_pmull: bool,
    pub sve_bitperm: bool,
    pub sve_sha3: bool,
    pub sve_sm4: bool,
    pub sme: bool,
    /// Default SVE vector length in bits, 0 when SVE is absent or the length is unknown.
    pub sve_vector_bits: u32,

    // Security
    pub pauth: bool,
    pub pauth_generic: bool,
    pub bti: bool,
    pub mte: bool,
    pub dit: bool,
    pub ssbs: bool,
    pub sb: bool,
}

impl ArmFeatures {
    /// Records a capability the platform reported as present.
    pub fn set(&mut self, flag: ArmFlag) {
        match flag {
            ArmFlag::Fp => self.fp = true,
            ArmFlag::Asimd => {
                self.asimd = true;
                self.neon = true;
            }
            ArmFlag::Neon => self.neon = true,
            ArmFlag::Fp16 => self.fp16 = true,
            ArmFlag::Bf16 => self.bf16 = true,
            ArmFlag::I8mm => self.i8mm = true,
            ArmFlag::Rdm => self.rdm = true,
            ArmFlag::DotProd => self.dotprod = true,
            ArmFlag::Fhm => self.fhm = true,
            ArmFlag::Fcma => self.fcma = true,
            ArmFlag::Jscvt => self.jscvt = true,
            ArmFlag::Frint => self.frint = true,
            ArmFlag::Vfp => self.vfp = true,
            ArmFlag::Vfpv3 => self.vfpv3 = true,
            ArmFlag::Vfpv4 => self.vfpv4 = true,
            ArmFlag::Idiv => self.idiv = true,
            ArmFlag::Aes => self.aes = true,
            ArmFlag::Pmull => self.pmull = true,
            ArmFlag::Sha1 => self.sha1 = true,
            ArmFlag::Sha2 => self.sha2 = true,
            ArmFlag::Sha3 => self.sha3 = true,
            ArmFlag::Sha512 => self.sha512 = true,
            ArmFlag::Sm3 => self.sm3 = true,
            ArmFlag::Sm4 => self.sm4 = true,
            ArmFlag::Crc32 => self.crc32 = true,
            ArmFlag::Rng => self.rng = true,
            ArmFlag::Atomics => self.lse = true,
            ArmFlag::Lse2 => self.lse2 = true,
            ArmFlag::Lrcpc => self.lrcpc = true,
            ArmFlag::Dcpop => self.dcpop = true,
            ArmFlag::Dcpodp => self.dcpodp = true,
            ArmFlag::FlagM => self.flagm = true,
            ArmFlag::Sve => self.sve = true,
            ArmFlag::Sve2 => self.sve2 = true,
            ArmFlag::SveAes => self.sve_aes = true,
            ArmFlag::SvePmull => self.sve_pmull = true,
            ArmFlag::SveBitperm => self.sve_bitperm = true,
            ArmFlag::SveSha3 => self.sve_sha3 = true,
            ArmFlag::SveSm4 => self.sve_sm4 = true,
            ArmFlag::Sme => self.sme = true,
            ArmFlag::PauthAddress => self.pauth = true,
            ArmFlag::PauthGeneric => self.pauth_generic = true,
            ArmFlag::Bti => self.bti = true,
            ArmFlag::Mte => self.mte = true,
            ArmFlag::Dit => self.dit = true,
            ArmFlag::Ssbs => self.ssbs = true,
            ArmFlag::Sb => self.sb = true,
        }
    }

    pub fn flags(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("fp", self.fp),
            ("asimd", self.asimd),
            ("neon", self.neon),
            ("fp16", self.fp16),
            ("bf16", self.bf16),
            ("i8mm", self.i8mm),
            ("rdm", self.rdm),
            ("dotprod", self.dotprod),
            ("fhm", self.fhm),
            ("fcma", self.fcma),
            ("jscvt", self.jscvt),
            ("frint", self.frint),
            ("vfp", self.vfp),
            ("vfpv3", self.vfpv3),
            ("vfpv4", self.vfpv4),
            ("idiv", self.idiv),
            ("aes", self.aes),
            ("pmull", self.pmull),
            ("sha1", self.sha1),
            ("sha2", self.sha2),
            ("sha3", self.sha3),
            ("sha512", self.sha512),
            ("sm3", self.sm3),
            ("sm4", self.sm4),
            ("crc32", self.crc32),
            ("rng", self.rng),
            ("lse", self.lse),
            ("lse2", self.lse2),
            ("lrcpc", self.lrcpc),
            ("dcpop", self.dcpop),
            ("dcpodp", self.dcpodp),
            ("flagm", self.flagm),
            ("sve", self.sve),
            ("sve2", self.sve2),
            ("sve_aes", self.sve_aes),
            ("sve_pmull", self.sve_pmull),
            ("sve_bitperm", self.sve_bitperm),
            ("sve_sha3", self.sve_sha3),
            ("sve_sm4", self.sve_sm4),
            ("sme", self.sme),
            ("pauth", self.pauth),
            ("pauth_generic", self.pauth_generic),
            ("bti", self.bti),
            ("mte", self.mte),
            ("dit", self.dit),
            ("ssbs", self.ssbs),
            ("sb", self.sb),
        ]
    }
}
