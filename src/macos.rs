//! Darwin host: everything comes from `sysctlbyname`.

use std::ffi::CString;

use crate::arm::ArmHost;

/// Reads the raw value of a sysctl, `None` if the name is unknown.
fn sysctl_raw(name: &str) -> Option<Vec<u8>> {
    let name = CString::new(name).ok()?;
    let mut len: libc::size_t = 0;

    // SAFETY: a null output buffer asks the kernel for the value size only.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            std::ptr::null_mut(),
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 || len == 0 {
        return None;
    }

    let mut buf = vec![0u8; len];
    // SAFETY: `buf` holds `len` writable bytes and `len` reports its size.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            buf.as_mut_ptr().cast(),
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return None;
    }
    buf.truncate(len);
    Some(buf)
}

pub fn sysctl_string(name: &str) -> Option<String> {
    let buf = sysctl_raw(name)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let value = String::from_utf8_lossy(&buf[..end]).trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Integer sysctls are 32 or 64 bits wide depending on the name.
pub fn sysctl_u64(name: &str) -> Option<u64> {
    let buf = sysctl_raw(name)?;
    match buf.len() {
        4 => Some(u64::from(u32::from_ne_bytes(buf[..4].try_into().ok()?))),
        8 => Some(u64::from_ne_bytes(buf[..8].try_into().ok()?)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MacHost;

impl ArmHost for MacHost {
    fn sysctl_string(&self, name: &str) -> Option<String> {
        sysctl_string(name)
    }

    fn sysctl_u64(&self, name: &str) -> Option<u64> {
        sysctl_u64(name)
    }
}
