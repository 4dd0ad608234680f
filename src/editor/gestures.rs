//! Scripted pointer gestures
//!
//! A gesture script is a JSON document that drives the trim and crop
//! editors without a display:
//!
//! ```json
//! {
//!   "bar": { "left": 0, "width": 1000 },
//!   "trim": [
//!     { "handle": "start", "path": [{ "x": 0 }, { "x": 200, "t_ms": 100 }] }
//!   ],
//!   "crop": {
//!     "drags": [
//!       { "grip": { "corner": "bottom_right" }, "path": [{ "x": 96, "y": 96 }, { "x": 300, "y": 200 }] }
//!     ]
//!   },
//!   "height": { "height": 240 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::crop::{preview_rect, CropEditor, CropGrip};
use super::trim::{TrimEditor, TrimHandle};
use super::{BarGeometry, DragTarget, HeadlessPlayer, Point, PointerCapture};
use crate::domain::errors::DomainError;
use crate::domain::model::{EditSelection, HeightOverride, MediaInfo, Size};

/// One pointer sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerStep {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Milliseconds since the script started
    #[serde(default)]
    pub t_ms: u64,
}

impl PointerStep {
    fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn at(&self) -> Duration {
        Duration::from_millis(self.t_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimDrag {
    pub handle: TrimHandle,
    /// First step is the press, the rest are moves; release follows the last
    pub path: Vec<PointerStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropDrag {
    pub grip: CropGrip,
    pub path: Vec<PointerStep>,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropGestures {
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default)]
    pub drags: Vec<CropDrag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureScript {
    #[serde(default)]
    pub bar: BarGeometry,
    /// Preview surface size; defaults to the source frame size
    #[serde(default)]
    pub preview: Option<Size>,
    #[serde(default)]
    pub trim: Vec<TrimDrag>,
    #[serde(default)]
    pub crop: Option<CropGestures>,
    #[serde(default)]
    pub height: Option<HeightOverride>,
}

impl GestureScript {
    pub fn from_json(text: &str) -> Result<Self, DomainError> {
        serde_json::from_str(text)
            .map_err(|e| DomainError::BadArgs(format!("invalid gesture script: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self, DomainError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DomainError::BadArgs(format!("cannot read gesture script {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Run the script against both editors and collect the committed selection.
    ///
    /// `previous` seeds the editors with an earlier commit for the same input.
    pub fn replay(
        &self,
        media: &MediaInfo,
        previous: Option<&EditSelection>,
        aspect_tolerance: f64,
    ) -> Result<EditSelection, DomainError> {
        let previous_trim = previous.and_then(|p| p.trim.as_ref());
        let mut trim = TrimEditor::new(HeadlessPlayer::new(true), self.bar);
        trim.load_metadata(media.duration, previous_trim)?;
        for drag in &self.trim {
            run_drag(&mut trim, drag.handle, &drag.path)?;
        }
        let trim = trim.commit()?;

        let source = media.size();
        let preview = self.preview.unwrap_or(source);
        let mut crop = CropEditor::new(preview)?;
        if let Some(committed) = previous.and_then(|p| p.crop.as_ref()) {
            crop.restore(preview_rect(committed, source, preview))?;
            crop.toggle();
        }
        if let Some(gestures) = &self.crop {
            if crop.is_active() != gestures.active {
                crop.toggle();
            }
            for drag in &gestures.drags {
                run_drag(&mut crop, drag.grip, &drag.path)?;
            }
        }
        let crop = crop.source_box(source, aspect_tolerance)?;

        let height_override = self
            .height
            .or_else(|| previous.and_then(|p| p.height_override));

        info!(
            start = trim.start_time,
            end = trim.end_time,
            crop = ?crop.map(|c| c.to_string()),
            "Gesture script replayed"
        );
        Ok(EditSelection {
            trim: Some(trim),
            crop,
            height_override,
        })
    }
}

fn run_drag<T>(target: &mut T, grip: T::Grip, path: &[PointerStep]) -> Result<(), DomainError>
where
    T: DragTarget,
    T::Grip: std::fmt::Debug,
{
    let Some((first, rest)) = path.split_first() else {
        return Err(DomainError::BadArgs(format!("gesture on {:?} has no steps", grip)));
    };
    let mut capture = PointerCapture::acquire(target, grip, first.point(), first.at())
        .ok_or_else(|| DomainError::BadArgs(format!("press on {:?} was refused", grip)))?;

    let mut released_at = first.at();
    for step in rest {
        capture.move_to(step.point(), step.at());
        released_at = step.at();
    }
    capture.release(released_at);
    debug!(grip = ?grip, steps = path.len(), "Gesture delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{SourceCropBox, TrimSelection};

    const MEDIA: MediaInfo = MediaInfo {
        duration: 10.0,
        width: 1280,
        height: 720,
    };

    #[test]
    fn test_empty_script_selects_full_clip_without_crop() {
        let selection = GestureScript::from_json("{}").unwrap().replay(&MEDIA, None, 0.01).unwrap();
        assert_eq!(selection.trim, Some(TrimSelection::full(10.0).unwrap()));
        assert_eq!(selection.crop, None);
        assert_eq!(selection.height_override, None);
    }

    #[test]
    fn test_script_drives_both_editors() {
        let script = GestureScript::from_json(
            r#"{
                "bar": { "left": 0, "width": 1000 },
                "preview": { "width": 320, "height": 180 },
                "trim": [
                    { "handle": "start", "path": [{ "x": 0 }, { "x": 250, "t_ms": 100 }] },
                    { "handle": "end", "path": [{ "x": 1000, "t_ms": 200 }, { "x": 750, "t_ms": 300 }] }
                ],
                "crop": {
                    "drags": [
                        { "grip": { "corner": "bottom_right" },
                          "path": [{ "x": 96, "y": 96 }, { "x": 160, "y": 90 }] }
                    ]
                },
                "height": "original"
            }"#,
        )
        .unwrap();

        let selection = script.replay(&MEDIA, None, 0.01).unwrap();
        let trim = selection.trim.unwrap();
        assert_eq!((trim.start_time, trim.end_time), (2.5, 7.5));
        assert_eq!(selection.crop, Some(SourceCropBox { x: 0, y: 0, w: 640, h: 360 }));
        assert_eq!(selection.height_override, Some(HeightOverride::Original));
    }

    #[test]
    fn test_previous_commit_seeds_editors() {
        let previous = EditSelection {
            trim: Some(TrimSelection::new(1.0, 4.0, 10.0).unwrap()),
            crop: Some(SourceCropBox { x: 128, y: 72, w: 256, h: 144 }),
            height_override: Some(HeightOverride::Height(240)),
        };
        let selection = GestureScript::default().replay(&MEDIA, Some(&previous), 0.01).unwrap();
        assert_eq!(selection, previous);
    }

    #[test]
    fn test_refused_press_is_an_error() {
        let script = GestureScript::from_json(
            r#"{ "crop": { "active": false, "drags": [{ "grip": "interior", "path": [{ "x": 5, "y": 5 }] }] } }"#,
        )
        .unwrap();
        assert!(matches!(script.replay(&MEDIA, None, 0.01), Err(DomainError::BadArgs(_))));
    }

    #[test]
    fn test_malformed_script_is_rejected() {
        assert!(GestureScript::from_json("{ \"trim\": 3 }").is_err());
    }
}
