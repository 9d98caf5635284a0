//! Best-effort readers for kernel pseudo-files.
//!
//! Parsers here never fail loudly: malformed text yields `None` (or 0), and
//! trailing units or newlines after the leading number are tolerated.

use std::fs;
use std::path::PathBuf;

use crate::{ProbeError, Result};

/// procfs/sysfs reader rooted at a directory, `/` on a live system.
#[derive(Debug, Clone)]
pub struct SysFs {
    root: PathBuf,
}

impl Default for SysFs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl SysFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves an absolute kernel path (`/proc/...`) below the root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Whether `path` names a file or directory below the root.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    /// Reads a whole pseudo-file; the error carries the resolved path.
    pub fn read_to_string(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|source| ProbeError::Io { path: full, source })
    }
}

/// Parses the leading decimal digits of `text`, ignoring surrounding
/// whitespace and anything after the digits.
///
/// ```
/// use cpu_probe::sysfs::parse_leading_u64;
///
/// assert_eq!(parse_leading_u64(" 2400000\n"), Some(2_400_000));
/// assert_eq!(parse_leading_u64("64 bytes"), Some(64));
/// assert_eq!(parse_leading_u64("n/a"), None);
/// ```
pub fn parse_leading_u64(text: &str) -> Option<u64> {
    let text = text.trim();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

/// Parses an integer the way `strtoul(.., 0)` does for the values found in
/// `/proc/cpuinfo`: `0x` prefix means hexadecimal, otherwise decimal.
pub fn parse_auto_radix(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => {
            let end = hex
                .find(|c: char| !c.is_ascii_hexdigit())
                .unwrap_or(hex.len());
            u64::from_str_radix(&hex[..end], 16).ok()
        }
        None => parse_leading_u64(text),
    }
}

/// Converts a sysfs cache size (`"32K"`, `"2M"`) to kilobytes.
///
/// A bare number is taken as kilobytes. Unparseable text yields 0.
pub fn parse_cache_size_kb(text: &str) -> u32 {
    let text = text.trim();
    let Some(value) = parse_leading_u64(text) else {
        return 0;
    };
    let suffix = text.trim_start_matches(|c: char| c.is_ascii_digit()).trim();
    let kb = match suffix.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('M') => value.saturating_mul(1024),
        Some('G') => value.saturating_mul(1024 * 1024),
        _ => value,
    };
    u32::try_from(kb).unwrap_or(u32::MAX)
}

/// Counts the CPUs in a sysfs list such as `"0-7"` or `"0-3,6,8-9"`.
///
/// Returns `None` for empty or malformed lists.
pub fn parse_cpu_list_count(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut count = 0u32;
    for part in text.split(',') {
        let part = part.trim();
        match part.split_once('-') {
            Some((first, last)) => {
                let first: u32 = first.trim().parse().ok()?;
                let last: u32 = last.trim().parse().ok()?;
                if last < first {
                    return None;
                }
                count = count.checked_add(last - first + 1)?;
            }
            None => {
                part.parse::<u32>().ok()?;
                count = count.checked_add(1)?;
            }
        }
    }
    Some(count)
}

/// Reads a sysfs boolean (`"1"`/`"0"`).
pub fn parse_flag(text: &str) -> bool {
    parse_leading_u64(text).is_some_and(|v| v != 0)
}

/// Converts a kHz reading (cpufreq) to MHz.
pub fn khz_to_mhz(text: &str) -> u32 {
    parse_leading_u64(text)
        .map(|khz| u32::try_from(khz / 1000).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
