// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resident memory sampling for heartbeat checkups.

/// Resident set size of this process in bytes, where the platform exposes it.
pub fn sample_memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        parse_statm_rss(&statm)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Second field of `/proc/self/statm` is RSS in pages.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_statm_rss(statm: &str) -> Option<u64> {
    let rss_pages = statm.split_whitespace().nth(1)?.parse::<u64>().ok()?;
    Some(rss_pages * 4096)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_pages() {
        assert_eq!(parse_statm_rss("1000 250 30 4 0 80 0"), Some(250 * 4096));
    }

    #[test]
    fn malformed_statm_is_none() {
        assert_eq!(parse_statm_rss(""), None);
        assert_eq!(parse_statm_rss("12 abc"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn samples_on_linux() {
        assert!(sample_memory_usage().is_some_and(|bytes| bytes > 0));
    }
}
