//! Media facts and encode progress derived from engine log output

use crate::domain::errors::DomainError;
use crate::domain::model::MediaInfo;
use crate::utils::time::parse_timestamp;

/// Parse an engine clock such as `00:01:02.50`; `N/A` yields `None`
pub fn parse_clock(value: &str) -> Option<f64> {
    let value = value.trim().trim_end_matches(',');
    if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
        return None;
    }
    let negative = value.starts_with('-');
    let seconds = parse_timestamp(value.trim_start_matches('-')).ok()?;
    Some(if negative { -seconds } else { seconds })
}

/// Duration from a `Duration: HH:MM:SS.cc, start: ...` banner line
pub fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let value = rest.split(',').next()?;
    parse_clock(value)
}

/// Frame size from the first `Video:` stream description in `line`
pub fn parse_video_size(line: &str) -> Option<(u32, u32)> {
    let (_, description) = line.split_once("Video:")?;
    description
        .split(|c: char| c == ' ' || c == ',')
        .find_map(parse_dimensions)
}

fn parse_dimensions(token: &str) -> Option<(u32, u32)> {
    let (w, h) = token.split_once('x')?;
    if w.is_empty() || h.is_empty() {
        return None;
    }
    if !w.bytes().all(|b| b.is_ascii_digit()) || !h.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (w, h) = (w.parse::<u32>().ok()?, h.parse::<u32>().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}

/// Value of the `time=` field in a stats line
pub fn parse_stats_time(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once("time=")?;
    let value = rest.split_whitespace().next()?;
    parse_clock(value)
}

/// Collect duration and frame size from a probe run's log lines
pub fn media_info_from_log<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> Result<MediaInfo, DomainError> {
    let mut duration = None;
    let mut size = None;

    for line in lines {
        if duration.is_none() {
            duration = parse_duration_line(line);
        }
        if size.is_none() {
            size = parse_video_size(line);
        }
        if duration.is_some() && size.is_some() {
            break;
        }
    }

    let duration = duration
        .filter(|d| *d > 0.0)
        .ok_or_else(|| DomainError::ProbeFailed("no duration reported".to_string()))?;
    let (width, height) =
        size.ok_or_else(|| DomainError::ProbeFailed("no video stream reported".to_string()))?;

    Ok(MediaInfo {
        duration,
        width,
        height,
    })
}

/// Turns engine stderr lines into fractional progress.
///
/// The total comes from the `Duration:` banner, narrowed by any `-ss`/`-to`
/// found in the invocation arguments.
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    seek_start: Option<f64>,
    seek_end: Option<f64>,
    total: Option<f64>,
}

impl ProgressParser {
    pub fn for_args(args: &[String]) -> Self {
        let mut parser = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-ss" => parser.seek_start = iter.next().and_then(|v| parse_clock(v)),
                "-to" => parser.seek_end = iter.next().and_then(|v| parse_clock(v)),
                // options after the input belong to the output
                "-i" => break,
                _ => {}
            }
        }
        parser
    }

    /// Feed one line; returns progress when the line carries a position
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if self.total.is_none() {
            if let Some(duration) = parse_duration_line(line) {
                let end = self.seek_end.map_or(duration, |e| e.min(duration));
                let span = end - self.seek_start.unwrap_or(0.0);
                self.total = (span > 0.0).then_some(span);
                return None;
            }
        }
        let position = parse_stats_time(line)?;
        let total = self.total?;
        Some(position / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNER: &[&str] = &[
        "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mp4':",
        "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1205 kb/s",
        "  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(progressive), 1280x720 [SAR 1:1 DAR 16:9], 1070 kb/s, 30 fps",
        "  Stream #0:1[0x2](und): Audio: aac (LC), 44100 Hz, stereo",
    ];

    #[test]
    fn test_media_info_from_banner() {
        let info = media_info_from_log(BANNER.iter().copied()).unwrap();
        assert_eq!(info.duration, 10.0);
        assert_eq!((info.width, info.height), (1280, 720));
    }

    #[test]
    fn test_media_info_requires_video_stream() {
        let lines = ["  Duration: 00:00:03.00, start: 0.0", "Stream #0:0: Audio: mp3"];
        assert!(matches!(
            media_info_from_log(lines),
            Err(DomainError::ProbeFailed(_))
        ));
    }

    #[test]
    fn test_codec_tag_is_not_mistaken_for_size() {
        assert_eq!(parse_video_size("Video: h264 (avc1 / 0x31637661), 640x360"), Some((640, 360)));
        assert_eq!(parse_video_size("Audio: aac"), None);
    }

    #[test]
    fn test_duration_na_is_ignored() {
        assert_eq!(parse_duration_line("  Duration: N/A, bitrate: N/A"), None);
    }

    #[test]
    fn test_progress_parser_tracks_stats_lines() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.feed("frame= 1 time=00:00:01.00"), None);
        assert_eq!(parser.feed(BANNER[1]), None);
        let progress = parser.feed("frame=  75 fps=25 q=-0.0 size=  512kB time=00:00:02.50 bitrate=N/A").unwrap();
        assert!((progress - 0.25).abs() < 1e-9);
        assert_eq!(parser.feed("time=N/A"), None);
    }

    #[test]
    fn test_progress_parser_narrows_total_by_trim() {
        let args: Vec<String> = ["-hide_banner", "-to", "00:00:06.000", "-ss", "00:00:02.000", "-i", "in.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut parser = ProgressParser::for_args(&args);
        parser.feed(BANNER[1]);
        let progress = parser.feed("time=00:00:02.00").unwrap();
        assert!((progress - 0.5).abs() < 1e-9);
    }
}
