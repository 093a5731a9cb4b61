/// Format milliseconds as zero-padded `mm:ss`.
///
/// Minutes are not wrapped into hours, so a 75 minute file shows `75:00`.
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Time label text, `position / duration`.
pub fn format_time_display(position_ms: u64, duration_ms: u64) -> String {
    format!("{} / {}", format_time(position_ms), format_time(duration_ms))
}
