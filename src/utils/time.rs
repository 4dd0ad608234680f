//! Time parsing and formatting utilities

use crate::domain::errors::DomainError;

/// Format seconds as zero-padded `HH:MM:SS.mmm`.
///
/// Components are truncated, not rounded. Negative input formats as zero.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        // absorb float noise such as 1.001 * 1000 = 1000.999..
        (seconds * 1000.0 + 1e-6).floor() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Parse seconds, `MM:SS.ms` or `HH:MM:SS.ms` into seconds
pub fn parse_timestamp(time_str: &str) -> Result<f64, DomainError> {
    let trimmed = time_str.trim();
    let invalid = || {
        DomainError::BadArgs(format!(
            "Invalid time '{}'. Expected seconds, MM:SS.ms or HH:MM:SS.ms",
            time_str
        ))
    };

    let parts: Vec<&str> = trimmed.split(':').collect();
    let seconds = match parts.as_slice() {
        [secs] => secs.parse::<f64>().map_err(|_| invalid())?,
        [mins, secs] => {
            let mins = mins.parse::<u32>().map_err(|_| invalid())?;
            let secs = parse_sexagesimal(secs).ok_or_else(invalid)?;
            mins as f64 * 60.0 + secs
        }
        [hours, mins, secs] => {
            let hours = hours.parse::<u32>().map_err(|_| invalid())?;
            let mins = mins.parse::<u32>().map_err(|_| invalid())?;
            if mins >= 60 {
                return Err(invalid());
            }
            let secs = parse_sexagesimal(secs).ok_or_else(invalid)?;
            hours as f64 * 3600.0 + mins as f64 * 60.0 + secs
        }
        _ => return Err(invalid()),
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(DomainError::BadArgs(format!(
            "Time cannot be negative: {}",
            time_str
        )));
    }
    Ok(seconds)
}

fn parse_sexagesimal(secs: &str) -> Option<f64> {
    secs.parse::<f64>().ok().filter(|s| (0.0..60.0).contains(s))
}
