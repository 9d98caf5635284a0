use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};
use windows::Win32::System::Threading::{
    IsProcessorFeaturePresent, PF_ARM_NEON_INSTRUCTIONS_AVAILABLE,
    PF_ARM_V8_CRC32_INSTRUCTIONS_AVAILABLE, PF_ARM_V8_CRYPTO_INSTRUCTIONS_AVAILABLE,
    PF_ARM_V81_ATOMIC_INSTRUCTIONS_AVAILABLE, PF_ARM_V82_DP_INSTRUCTIONS_AVAILABLE,
    PROCESSOR_FEATURE_ID,
};

use crate::arm::ArmHost;
use crate::hwcap::{AARCH64_CAPABILITIES, ArmFlag, Hwcaps};

/// Windows on ARM host.
///
/// Windows answers feature questions one at a time, so the answers are packed
/// into AArch64 hwcap words and decoded by the same table as on Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsHost;

fn present(feature: PROCESSOR_FEATURE_ID) -> bool {
    // SAFETY: a pure query with no pointer arguments.
    unsafe { IsProcessorFeaturePresent(feature) }.as_bool()
}

impl ArmHost for WindowsHost {
    fn hwcaps(&self) -> Hwcaps {
        let mut caps = Hwcaps::default();
        if present(PF_ARM_NEON_INSTRUCTIONS_AVAILABLE) {
            caps = caps
                .with_flag(AARCH64_CAPABILITIES, ArmFlag::Fp)
                .with_flag(AARCH64_CAPABILITIES, ArmFlag::Asimd);
        }
        if present(PF_ARM_V8_CRYPTO_INSTRUCTIONS_AVAILABLE) {
            for flag in [ArmFlag::Aes, ArmFlag::Pmull, ArmFlag::Sha1, ArmFlag::Sha2] {
                caps = caps.with_flag(AARCH64_CAPABILITIES, flag);
            }
        }
        if present(PF_ARM_V8_CRC32_INSTRUCTIONS_AVAILABLE) {
            caps = caps.with_flag(AARCH64_CAPABILITIES, ArmFlag::Crc32);
        }
        if present(PF_ARM_V81_ATOMIC_INSTRUCTIONS_AVAILABLE) {
            caps = caps.with_flag(AARCH64_CAPABILITIES, ArmFlag::Atomics);
        }
        if present(PF_ARM_V82_DP_INSTRUCTIONS_AVAILABLE) {
            caps = caps.with_flag(AARCH64_CAPABILITIES, ArmFlag::DotProd);
        }
        caps
    }

    fn hardware_concurrency(&self) -> u32 {
        let mut info = SYSTEM_INFO::default();
        // SAFETY: `info` is a valid, writable SYSTEM_INFO.
        unsafe { GetSystemInfo(&mut info) };
        match info.dwNumberOfProcessors {
            0 => crate::hardware_concurrency(),
            n => n,
        }
    }
}
