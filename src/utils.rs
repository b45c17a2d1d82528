//! Utility functions for the radiacode-spectrum-ble crate.

/// Format an accumulation time as readable text.
///
/// Zero-valued units are left out; zero itself reads `0 seconds`.
///
/// # Example
///
/// ```
/// use radiacode_spectrum_ble::format_duration;
///
/// assert_eq!(format_duration(3_725), "1 hour, 2 minutes, 5 seconds");
/// ```
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0 seconds".to_string();
    }

    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;

    [(days, "day"), (hours, "hour"), (minutes, "minute"), (secs, "second")]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            if *value > 1 {
                format!("{} {}s", value, unit)
            } else {
                format!("{} {}", value, unit)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
