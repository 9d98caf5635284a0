use crate::Result;
use crate::arm::ArmHost;
use crate::hwcap::Hwcaps;
use crate::sysfs::SysFs;

/// Linux (and Android) host: procfs/sysfs plus the auxiliary vector.
///
/// File reads go through a [`SysFs`] root so a captured `/proc` + `/sys`
/// tree can stand in for the live system. Capability words always come from
/// the running process.
///
/// # Examples
///
/// ```no_run
/// use cpu_probe::arm::ArmBackend;
/// use cpu_probe::linux::LinuxHost;
/// use cpu_probe::{CpuArchitecture, CpuProbe};
///
/// let backend = ArmBackend::new(LinuxHost::new(), CpuArchitecture::ARM64);
/// let probe = CpuProbe::detect_with(&backend);
/// println!("{}", probe.processor_info().brand);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinuxHost {
    fs: SysFs,
}

impl LinuxHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads procfs/sysfs below `root` instead of `/`.
    pub fn with_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            fs: SysFs::new(root),
        }
    }
}

impl ArmHost for LinuxHost {
    fn hwcaps(&self) -> Hwcaps {
        // SAFETY: getauxval only reads the auxiliary vector the kernel placed
        // in this process; unknown types return 0.
        let (hwcap, hwcap2) = unsafe {
            (
                libc::getauxval(libc::AT_HWCAP),
                libc::getauxval(libc::AT_HWCAP2),
            )
        };
        Hwcaps::new(u64::from(hwcap), u64::from(hwcap2))
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        self.fs.read_to_string(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.fs.exists(path)
    }
}
