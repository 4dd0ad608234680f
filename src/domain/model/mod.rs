// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;


/// Extension appended to every encoded output
pub const OUTPUT_EXTENSION: &str = "gif";

/// Media type of every encoded output
pub const OUTPUT_MEDIA_TYPE: &str = "image/gif";

/// Extension and media type of editor preview transcodes
pub const PREVIEW_EXTENSION: &str = "mp4";
pub const PREVIEW_MEDIA_TYPE: &str = "video/mp4";

/// Height presets offered by the editor's scale selector
pub const SCALE_PRESETS: [u32; 7] = [1080, 720, 620, 520, 480, 320, 240];

/// Smallest crop rectangle edge, in preview pixels
pub const MIN_CROP_SIZE: f64 = 32.0;

/// User-editable encoding settings.
///
/// An absent field means "do not constrain this dimension"; the matching
/// filter stage is left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpdecimate: Option<u32>,
}

impl EncodingSettings {
    /// Factory defaults restored by a settings reset
    pub fn factory() -> Self {
        Self {
            fps: Some(50),
            height: None,
            mpdecimate: Some(3),
        }
    }

    /// Build settings from free-form text fields.
    ///
    /// Empty or non-numeric text leaves the field absent. Numbers that are
    /// not strictly positive are rejected.
    pub fn from_form(fps: &str, height: &str, mpdecimate: &str) -> Result<Self, DomainError> {
        Ok(Self {
            fps: parse_positive_field("fps", fps)?,
            height: parse_positive_field("height", height)?,
            mpdecimate: parse_positive_field("mpdecimate", mpdecimate)?,
        })
    }

    /// Reject zero values that may have slipped in through a hand-edited file
    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, value) in [
            ("fps", self.fps),
            ("height", self.height),
            ("mpdecimate", self.mpdecimate),
        ] {
            if value == Some(0) {
                return Err(DomainError::OutOfRange(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}

/// Parse a settings text field, treating blank or unparseable text as absent
pub fn parse_safe_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_positive_field(name: &str, value: &str) -> Result<Option<u32>, DomainError> {
    // positivity is judged after rounding: 0.3 reads as 0
    match parse_safe_number(value).map(|v| (v, v.round())) {
        None => Ok(None),
        Some((v, rounded)) if rounded <= 0.0 => Err(DomainError::OutOfRange(format!(
            "{} must be positive, got {}",
            name, v
        ))),
        Some((v, rounded)) if rounded > u32::MAX as f64 => {
            Err(DomainError::OutOfRange(format!("{} is too large: {}", name, v)))
        }
        Some((_, rounded)) => Ok(Some(rounded as u32)),
    }
}

/// Per-job height choice made in the editor's scale selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightOverride {
    /// Keep the source height even if settings name one
    Original,
    /// Scale to this height instead of the settings height
    Height(u32),
}

impl HeightOverride {
    /// Resolve the height a job should scale to
    pub fn resolve(choice: Option<HeightOverride>, settings: &EncodingSettings) -> Option<u32> {
        match choice {
            None => settings.height,
            Some(HeightOverride::Original) => None,
            Some(HeightOverride::Height(h)) => Some(h),
        }
    }
}

/// Validated start/end pair against a clip's duration, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimSelection {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

impl TrimSelection {
    /// Bound differences smaller than this count as the natural bound
    const BOUND_EPSILON: f64 = 1e-6;

    /// Create a selection, enforcing `0 <= start <= end <= duration`
    pub fn new(start_time: f64, end_time: f64, duration: f64) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::OutOfRange(format!(
                "duration must be positive, got {}",
                duration
            )));
        }
        if !(start_time.is_finite() && end_time.is_finite()) {
            return Err(DomainError::BadArgs("trim bounds must be finite".to_string()));
        }
        if start_time < 0.0 || start_time > end_time || end_time > duration {
            return Err(DomainError::OutOfRange(format!(
                "trim {:.3}..{:.3} does not fit 0..{:.3}",
                start_time, end_time, duration
            )));
        }
        Ok(Self {
            start_time,
            end_time,
            duration,
        })
    }

    /// The full clip
    pub fn full(duration: f64) -> Result<Self, DomainError> {
        Self::new(0.0, duration, duration)
    }

    /// Start bound, if it differs from the clip's natural start
    pub fn start_bound(&self) -> Option<f64> {
        (self.start_time > Self::BOUND_EPSILON).then_some(self.start_time)
    }

    /// End bound, if it differs from the clip's natural end
    pub fn end_bound(&self) -> Option<f64> {
        (self.duration - self.end_time > Self::BOUND_EPSILON).then_some(self.end_time)
    }

    pub fn length(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Width and height of a surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Crop rectangle in source-resolution pixels, as the crop filter expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCropBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl fmt::Display for SourceCropBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.w, self.h, self.x, self.y)
    }
}

impl SourceCropBox {
    /// Parse the `W:H:X:Y` form used on the command line
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = text.trim().split(':').collect();
        if parts.len() != 4 {
            return Err(DomainError::BadArgs(format!(
                "crop must be W:H:X:Y, got '{}'",
                text
            )));
        }
        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| DomainError::BadArgs(format!("invalid crop component '{}'", part)))?;
        }
        let [w, h, x, y] = values;
        if w == 0 || h == 0 {
            return Err(DomainError::InvalidCrop("crop size cannot be zero".to_string()));
        }
        Ok(Self { x, y, w, h })
    }
}

/// Everything the editors hand back for one input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditSelection {
    pub trim: Option<TrimSelection>,
    pub crop: Option<SourceCropBox>,
    pub height_override: Option<HeightOverride>,
}

impl EditSelection {
    pub fn is_empty(&self) -> bool {
        self.trim.is_none() && self.crop.is_none() && self.height_override.is_none()
    }
}

/// Where the bytes of an input come from
#[derive(Debug, Clone, PartialEq)]
pub enum InputData {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A user-supplied video file
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub name: String,
    pub data: InputData,
}

impl InputFile {
    /// Reference a file on disk; bytes are fetched when the job runs
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                DomainError::BadArgs(format!("input path has no file name: {}", path.display()))
            })?;
        Ok(Self {
            name,
            data: InputData::Path(path),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::BadArgs("input name cannot be empty".to_string()));
        }
        Ok(Self {
            name,
            data: InputData::Bytes(bytes),
        })
    }

    /// Name of the encoded output for this input
    pub fn output_name(&self) -> String {
        replace_extension(&self.name, OUTPUT_EXTENSION)
    }

    /// Whether a preview can play the file as-is
    pub fn has_native_preview(&self) -> bool {
        matches!(
            extension_of(&self.name).map(|e| e.to_ascii_lowercase()).as_deref(),
            Some("mp4") | Some("webm")
        )
    }
}

/// Strip the final extension of `name` and append `extension`
pub fn replace_extension(name: &str, extension: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    };
    format!("{}.{}", stem, extension)
}

fn extension_of(name: &str) -> Option<&str> {
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    (!ext.is_empty()).then_some(ext)
}

/// An encoded result with its media type
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub name: String,
    pub media_type: &'static str,
    pub data: Vec<u8>,
}

impl OutputFile {
    pub fn gif(name: String, data: Vec<u8>) -> Self {
        Self {
            name,
            media_type: OUTPUT_MEDIA_TYPE,
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Lifecycle of one encode job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    LoadingEngine,
    LoadingInput,
    Encoding,
    Done,
    Aborted,
    Failed,
}

impl JobStatus {
    /// A busy job holds the engine; submits are dropped meanwhile
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            JobStatus::LoadingEngine | JobStatus::LoadingInput | JobStatus::Encoding
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Aborted | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Idle => "idle",
            JobStatus::LoadingEngine => "loading engine",
            JobStatus::LoadingInput => "loading input",
            JobStatus::Encoding => "encoding",
            JobStatus::Done => "done",
            JobStatus::Aborted => "aborted",
            JobStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Observable state of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Whole percent, 0..=100
    pub progress: u8,
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self {
            status: JobStatus::Idle,
            progress: 0,
        }
    }
}

/// Facts about a source video reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

impl MediaInfo {
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}
