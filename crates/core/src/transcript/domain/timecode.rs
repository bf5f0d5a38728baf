/// `HH:MM:SS`, truncated to the whole second.
pub fn format_clock(seconds: f64) -> String {
    let total = non_negative(seconds).trunc() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_subtitle(seconds: f64) -> String {
    let millis = (non_negative(seconds) * 1000.0).round() as u64;
    let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, millis) = (rest / 1000, rest % 1000);
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
