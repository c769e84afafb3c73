/// Seconds of output written so far, from either progress format FFmpeg emits.
///
/// `-progress pipe:1` writes `out_time=00:00:05.000000` (and `out_time_us=`),
/// the stderr status line carries `time=00:00:05.00`.
pub fn parse_progress_time(line: &str) -> Option<f64> {
    let line = line.trim();
    if let Some(micros) = line.strip_prefix("out_time_us=") {
        return micros.parse::<i64>().ok().filter(|v| *v >= 0).map(|v| v as f64 / 1e6);
    }
    if let Some(value) = line.strip_prefix("out_time=") {
        return parse_time_string(value);
    }

    let time_pos = line.find("time=")?;
    let rest = &line[time_pos + 5..];
    let value = rest.split_whitespace().next()?;
    parse_time_string(value)
}

/// Fraction complete (0..1) for a render of `total_duration` seconds.
pub fn parse_progress_line(line: &str, total_duration: f64) -> Option<f32> {
    if total_duration <= 0.0 {
        return None;
    }
    let current = parse_progress_time(line)?;
    Some((current / total_duration).clamp(0.0, 1.0) as f32)
}

/// Parse FFmpeg time format (HH:MM:SS.ms)
fn parse_time_string(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() == 3 {
        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;
        if hours < 0.0 {
            return None;
        }
        return Some(hours * 3600.0 + minutes * 60.0 + seconds);
    }
    None
}
