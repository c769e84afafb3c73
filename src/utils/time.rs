/// Format seconds as `M:SS`, the way the timeline ruler and time display read.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format seconds as `M:SS.t` for precise readouts (playhead, clip lengths).
pub fn format_precise(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let tenths = ((seconds - seconds.floor()) * 10.0).floor() as u64;
    format!("{}.{}", format_clock(seconds), tenths.min(9))
}

/// Parse `SS`, `M:SS` or `H:MM:SS` (fractional seconds allowed) into seconds
pub fn parse_time(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();

    let value = match parts.len() {
        1 => parts[0].parse::<f64>().ok()?,
        2 => {
            let minutes: f64 = parts[0].parse().ok()?;
            let seconds: f64 = parts[1].parse().ok()?;
            minutes * 60.0 + seconds
        }
        3 => {
            let hours: f64 = parts[0].parse().ok()?;
            let minutes: f64 = parts[1].parse().ok()?;
            let seconds: f64 = parts[2].parse().ok()?;
            hours * 3600.0 + minutes * 60.0 + seconds
        }
        _ => return None,
    };

    (value >= 0.0).then_some(value)
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Bytes to megabytes rounded to two decimals, as reported in export listings.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(30.0), "0:30");
        assert_eq!(format_clock(90.0), "1:30");
        assert_eq!(format_clock(125.0), "2:05");
        assert_eq!(format_clock(59.9), "0:59");
        assert_eq!(format_clock(-3.0), "0:00");
    }

    #[test]
    fn test_format_precise() {
        assert_eq!(format_precise(8.25), "0:08.2");
        assert_eq!(format_precise(61.0), "1:01.0");
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("30"), Some(30.0));
        assert_eq!(parse_time("1:30"), Some(90.0));
        assert_eq!(parse_time("1:01:30"), Some(3690.0));
        assert_eq!(parse_time("-2"), None);
        assert_eq!(parse_time("abc"), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(bytes_to_mb(1024 * 1024 * 3), 3.0);
    }
}
