//! ARM hardware-capability tables.
//!
//! The kernel publishes two capability words in the auxiliary vector
//! (`AT_HWCAP`, `AT_HWCAP2`). Bit positions differ between AArch64 and
//! AArch32, so each execution state has its own table. A bit that no table
//! names is ignored: unknown capability bits are never reported as present.

use serde::{Deserialize, Serialize};

use crate::features::ArmFeatures;

/// Raw capability words, zero when the platform has no auxiliary vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hwcaps {
    pub hwcap: u64,
    pub hwcap2: u64,
}

impl Hwcaps {
    pub fn new(hwcap: u64, hwcap2: u64) -> Self {
        Self { hwcap, hwcap2 }
    }

    pub fn is_empty(&self) -> bool {
        self.hwcap == 0 && self.hwcap2 == 0
    }

    fn word(&self, word: HwcapWord) -> u64 {
        match word {
            HwcapWord::Primary => self.hwcap,
            HwcapWord::Secondary => self.hwcap2,
        }
    }

    /// Sets the bit that `table` assigns to `flag`. Flags the table does not
    /// know leave the words untouched.
    pub fn with_flag(mut self, table: &[Capability], flag: ArmFlag) -> Self {
        if let Some(cap) = table.iter().find(|cap| cap.flag == flag) {
            let mask = 1u64 << cap.bit;
            match cap.word {
                HwcapWord::Primary => self.hwcap |= mask,
                HwcapWord::Secondary => self.hwcap2 |= mask,
            }
        }
        self
    }
}

/// Which auxiliary-vector word a capability lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwcapWord {
    /// `AT_HWCAP`
    Primary,
    /// `AT_HWCAP2`, absent from older kernels.
    Secondary,
}

/// Every ARM capability the probe knows how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmFlag {
    Fp,
    Asimd,
    Neon,
    Fp16,
    Bf16,
    I8mm,
    Rdm,
    DotProd,
    Fhm,
    Fcma,
    Jscvt,
    Frint,
    Vfp,
    Vfpv3,
    Vfpv4,
    Idiv,
    Aes,
    Pmull,
    Sha1,
    Sha2,
    Sha3,
    Sha512,
    Sm3,
    Sm4,
    Crc32,
    Rng,
    Atomics,
    Lse2,
    Lrcpc,
    Dcpop,
    Dcpodp,
    FlagM,
    Sve,
    Sve2,
    SveAes,
    SvePmull,
    SveBitperm,
    SveSha3,
    SveSm4,
    Sme,
    PauthAddress,
    PauthGeneric,
    Bti,
    Mte,
    Dit,
    Ssbs,
    Sb,
}

/// One known capability bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub word: HwcapWord,
    pub bit: u32,
    pub flag: ArmFlag,
}

const fn primary(bit: u32, flag: ArmFlag) -> Capability {
    Capability {
        word: HwcapWord::Primary,
        bit,
        flag,
    }
}

const fn secondary(bit: u32, flag: ArmFlag) -> Capability {
    Capability {
        word: HwcapWord::Secondary,
        bit,
        flag,
    }
}

/// `arch/arm64/include/uapi/asm/hwcap.h`
pub static AARCH64_CAPABILITIES: &[Capability] = &[
    primary(0, ArmFlag::Fp),
    primary(1, ArmFlag::Asimd),
    primary(3, ArmFlag::Aes),
    primary(4, ArmFlag::Pmull),
    primary(5, ArmFlag::Sha1),
    primary(6, ArmFlag::Sha2),
    primary(7, ArmFlag::Crc32),
    primary(8, ArmFlag::Atomics),
    primary(9, ArmFlag::Fp16),
    primary(12, ArmFlag::Rdm),
    primary(13, ArmFlag::Jscvt),
    primary(14, ArmFlag::Fcma),
    primary(15, ArmFlag::Lrcpc),
    primary(16, ArmFlag::Dcpop),
    primary(17, ArmFlag::Sha3),
    primary(18, ArmFlag::Sm3),
    primary(19, ArmFlag::Sm4),
    primary(20, ArmFlag::DotProd),
    primary(21, ArmFlag::Sha512),
    primary(22, ArmFlag::Sve),
    primary(23, ArmFlag::Fhm),
    primary(24, ArmFlag::Dit),
    // HWCAP_USCAT
    primary(25, ArmFlag::Lse2),
    primary(27, ArmFlag::FlagM),
    primary(28, ArmFlag::Ssbs),
    primary(29, ArmFlag::Sb),
    primary(30, ArmFlag::PauthAddress),
    primary(31, ArmFlag::PauthGeneric),
    secondary(0, ArmFlag::Dcpodp),
    secondary(1, ArmFlag::Sve2),
    secondary(2, ArmFlag::SveAes),
    secondary(3, ArmFlag::SvePmull),
    secondary(4, ArmFlag::SveBitperm),
    secondary(5, ArmFlag::SveSha3),
    secondary(6, ArmFlag::SveSm4),
    secondary(8, ArmFlag::Frint),
    secondary(13, ArmFlag::I8mm),
    secondary(14, ArmFlag::Bf16),
    secondary(16, ArmFlag::Rng),
    secondary(17, ArmFlag::Bti),
    secondary(18, ArmFlag::Mte),
    secondary(23, ArmFlag::Sme),
];

/// `arch/arm/include/uapi/asm/hwcap.h`
pub static AARCH32_CAPABILITIES: &[Capability] = &[
    primary(6, ArmFlag::Vfp),
    primary(12, ArmFlag::Neon),
    primary(13, ArmFlag::Vfpv3),
    primary(16, ArmFlag::Vfpv4),
    primary(17, ArmFlag::Idiv),
    secondary(0, ArmFlag::Aes),
    secondary(1, ArmFlag::Pmull),
    secondary(2, ArmFlag::Sha1),
    secondary(3, ArmFlag::Sha2),
    secondary(4, ArmFlag::Crc32),
];

/// `hw.optional.*` sysctls Darwin uses in place of an auxiliary vector.
pub static DARWIN_FEATURE_SYSCTLS: &[(&str, ArmFlag)] = &[
    ("hw.optional.floatingpoint", ArmFlag::Fp),
    ("hw.optional.neon", ArmFlag::Asimd),
    ("hw.optional.arm.FEAT_AES", ArmFlag::Aes),
    ("hw.optional.arm.FEAT_PMULL", ArmFlag::Pmull),
    ("hw.optional.arm.FEAT_SHA1", ArmFlag::Sha1),
    ("hw.optional.arm.FEAT_SHA256", ArmFlag::Sha2),
    ("hw.optional.arm.FEAT_SHA3", ArmFlag::Sha3),
    ("hw.optional.arm.FEAT_SHA512", ArmFlag::Sha512),
    ("hw.optional.armv8_crc32", ArmFlag::Crc32),
    ("hw.optional.arm.FEAT_LSE", ArmFlag::Atomics),
    ("hw.optional.arm.FEAT_LSE2", ArmFlag::Lse2),
    ("hw.optional.arm.FEAT_FP16", ArmFlag::Fp16),
    ("hw.optional.arm.FEAT_BF16", ArmFlag::Bf16),
    ("hw.optional.arm.FEAT_I8MM", ArmFlag::I8mm),
    ("hw.optional.arm.FEAT_RDM", ArmFlag::Rdm),
    ("hw.optional.arm.FEAT_DotProd", ArmFlag::DotProd),
    ("hw.optional.arm.FEAT_FHM", ArmFlag::Fhm),
    ("hw.optional.arm.FEAT_FCMA", ArmFlag::Fcma),
    ("hw.optional.arm.FEAT_JSCVT", ArmFlag::Jscvt),
    ("hw.optional.arm.FEAT_FRINTTS", ArmFlag::Frint),
    ("hw.optional.arm.FEAT_LRCPC", ArmFlag::Lrcpc),
    ("hw.optional.arm.FEAT_DPB", ArmFlag::Dcpop),
    ("hw.optional.arm.FEAT_DPB2", ArmFlag::Dcpodp),
    ("hw.optional.arm.FEAT_FlagM", ArmFlag::FlagM),
    ("hw.optional.arm.FEAT_SME", ArmFlag::Sme),
    ("hw.optional.arm.FEAT_PAuth", ArmFlag::PauthAddress),
    ("hw.optional.arm.FEAT_BTI", ArmFlag::Bti),
    ("hw.optional.arm.FEAT_DIT", ArmFlag::Dit),
    ("hw.optional.arm.FEAT_SSBS", ArmFlag::Ssbs),
    ("hw.optional.arm.FEAT_SB", ArmFlag::Sb),
];

/// Sets every flag in `features` whose table bit is set in `caps`.
pub fn apply(table: &[Capability], caps: Hwcaps, features: &mut ArmFeatures) {
    for cap in table {
        if caps.word(cap.word) & (1u64 << cap.bit) != 0 {
            features.set(cap.flag);
        }
    }
}
