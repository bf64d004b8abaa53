//! Formatted output helpers for CLI commands.

use c2m_common::constants::CREATE_OPTIONS_LIMIT;

/// Formats a byte count into a human-readable string (e.g., "1.5 KiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a create-options size with a marker when it exceeds the wire limit.
#[must_use]
pub fn format_options_size(bytes: usize) -> String {
    let size = format_bytes(u64::try_from(bytes).unwrap_or(u64::MAX));
    if bytes >= CREATE_OPTIONS_LIMIT {
        format!("{size} (!)")
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_displays_bytes() {
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn format_bytes_displays_kib() {
        assert_eq!(format_bytes(2048), "2.0 KiB");
    }

    #[test]
    fn format_bytes_displays_mib() {
        assert_eq!(format_bytes(3_145_728), "3.0 MiB");
    }

    #[test]
    fn options_size_flags_oversized() {
        assert_eq!(format_options_size(4095), "4.0 KiB");
        assert_eq!(format_options_size(4096), "4.0 KiB (!)");
    }
}
