//! Progress derivation from ffmpeg's machine-readable progress stream.
//!
//! ffmpeg emits periodic `key=value` lines when asked for `-progress`;
//! ffmpeg-sidecar surfaces these as parsed progress events carrying an
//! `out_time` string. This module turns that string plus the known source
//! duration into a 0-100 completion percentage. Anything unparsable
//! degrades to an indeterminate value, never an error.

/// Parses an ffmpeg time string (HH:MM:SS.MS) to seconds. Returns None if invalid.
#[must_use]
pub fn parse_ffmpeg_time(time: &str) -> Option<f64> {
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() == 3 {
        let hours = parts[0].parse::<f64>().ok()?;
        let minutes = parts[1].parse::<f64>().ok()?;
        let seconds = parts[2].parse::<f64>().ok()?;
        if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
            return None;
        }
        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    } else {
        None
    }
}

/// One progress observation derived from the external process's stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Completion percentage (0-100), or None when it cannot be derived
    /// (unknown total duration, or a malformed time token).
    pub percent: Option<f32>,
    /// Seconds of output produced so far, when the stream reported it.
    pub out_time_secs: Option<f64>,
    /// Processing speed relative to realtime, as reported by ffmpeg.
    pub speed: f32,
}

impl ProgressUpdate {
    /// Derives an update from a raw `out_time` token and the total
    /// duration. A missing duration or a malformed token yields an
    /// indeterminate update rather than a failure.
    #[must_use]
    pub fn from_out_time(time: &str, total_duration: Option<f64>, speed: f32) -> Self {
        let out_time_secs = parse_ffmpeg_time(time);
        let percent = match (out_time_secs, total_duration) {
            (Some(current), Some(total)) if total > 0.0 => {
                Some(((current / total) * 100.0).min(100.0) as f32)
            }
            _ => None,
        };
        Self {
            percent,
            out_time_secs,
            speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffmpeg_time() {
        assert_eq!(parse_ffmpeg_time("01:30:45"), Some(5445.0));
        assert_eq!(parse_ffmpeg_time("00:00:10.50"), Some(10.5));
        assert_eq!(parse_ffmpeg_time("N/A"), None);
        assert_eq!(parse_ffmpeg_time(""), None);
        assert_eq!(parse_ffmpeg_time("12:34"), None);
        assert_eq!(parse_ffmpeg_time("aa:bb:cc"), None);
    }

    #[test]
    fn test_progress_percent() {
        let update = ProgressUpdate::from_out_time("00:00:45", Some(180.0), 1.5);
        assert_eq!(update.percent, Some(25.0));
        assert_eq!(update.out_time_secs, Some(45.0));
    }

    #[test]
    fn test_progress_clamps_to_100() {
        let update = ProgressUpdate::from_out_time("00:05:00", Some(180.0), 1.0);
        assert_eq!(update.percent, Some(100.0));
    }

    #[test]
    fn test_malformed_time_is_indeterminate() {
        let update = ProgressUpdate::from_out_time("garbage", Some(180.0), 1.0);
        assert_eq!(update.percent, None);
        assert_eq!(update.out_time_secs, None);
    }

    #[test]
    fn test_unknown_duration_is_indeterminate() {
        let update = ProgressUpdate::from_out_time("00:00:45", None, 1.0);
        assert_eq!(update.percent, None);
        assert_eq!(update.out_time_secs, Some(45.0));
    }
}
