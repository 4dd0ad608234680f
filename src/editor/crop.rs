//! Crop editor: a movable, resizable rectangle over the preview surface.
//!
//! The rectangle stays inside the preview and at least [`MIN_CROP_SIZE`] on
//! each side after every event. Commit scales it to source pixels.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DragTarget, Point};
use crate::domain::errors::DomainError;
use crate::domain::model::{Size, SourceCropBox, MIN_CROP_SIZE};

/// Edge length of the rectangle a fresh editor starts with
pub const DEFAULT_CROP_SIZE: f64 = 96.0;

/// Rectangle in preview pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, at: Point) -> bool {
        at.x >= self.left && at.x <= self.right() && at.y >= self.top && at.y <= self.bottom()
    }

    /// Whether the rectangle satisfies the editor invariants for `preview`
    pub fn fits(&self, preview: Size) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= preview.width
            && self.bottom() <= preview.height
            && self.width >= MIN_CROP_SIZE
            && self.height >= MIN_CROP_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Part of the rectangle a pointer went down on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropGrip {
    Interior,
    Corner(Corner),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropState {
    Idle,
    Moving,
    Resizing(Corner),
}

pub struct CropEditor {
    preview: Size,
    rect: CropRect,
    active: bool,
    state: CropState,
    press_at: Point,
    press_rect: CropRect,
}

impl CropEditor {
    pub fn new(preview: Size) -> Result<Self, DomainError> {
        if !preview.is_positive()
            || preview.width < MIN_CROP_SIZE
            || preview.height < MIN_CROP_SIZE
        {
            return Err(DomainError::InvalidCrop(format!(
                "preview {}x{} is smaller than the {}px minimum",
                preview.width, preview.height, MIN_CROP_SIZE
            )));
        }

        let rect = CropRect {
            left: 0.0,
            top: 0.0,
            width: DEFAULT_CROP_SIZE.min(preview.width),
            height: DEFAULT_CROP_SIZE.min(preview.height),
        };
        Ok(Self {
            preview,
            rect,
            active: false,
            state: CropState::Idle,
            press_at: Point::default(),
            press_rect: rect,
        })
    }

    pub fn preview(&self) -> Size {
        self.preview
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn state(&self) -> CropState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Flip crop on or off; geometry is kept either way
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    /// Replace the rectangle, e.g. with one restored from a previous commit
    pub fn restore(&mut self, rect: CropRect) -> Result<(), DomainError> {
        if !rect.fits(self.preview) {
            return Err(DomainError::InvalidCrop(format!(
                "rectangle {:?} does not fit the preview",
                rect
            )));
        }
        self.rect = rect;
        Ok(())
    }

    fn move_to(&mut self, dx: f64, dy: f64) {
        let origin = self.press_rect;
        self.rect.left = (origin.left + dx).clamp(0.0, self.preview.width - origin.width);
        self.rect.top = (origin.top + dy).clamp(0.0, self.preview.height - origin.height);
    }

    fn resize(&mut self, corner: Corner, dx: f64, dy: f64) {
        let origin = self.press_rect;
        // edges that move the origin stop where the size floor would push the opposite edge
        let shrink_x = dx.min(origin.width - MIN_CROP_SIZE);
        let shrink_y = dy.min(origin.height - MIN_CROP_SIZE);

        let (left, width) = match corner {
            Corner::TopLeft | Corner::BottomLeft => (origin.left + shrink_x, origin.width - shrink_x),
            Corner::TopRight | Corner::BottomRight => (origin.left, origin.width + dx),
        };
        let (top, height) = match corner {
            Corner::TopLeft | Corner::TopRight => (origin.top + shrink_y, origin.height - shrink_y),
            Corner::BottomLeft | Corner::BottomRight => (origin.top, origin.height + dy),
        };

        if left < 0.0 || top < 0.0 {
            return;
        }

        self.rect = CropRect {
            left,
            top,
            width: width.max(MIN_CROP_SIZE).min(self.preview.width - left),
            height: height.max(MIN_CROP_SIZE).min(self.preview.height - top),
        };
    }

    /// Scale the rectangle to source pixels; `None` while crop is inactive.
    ///
    /// Preview and source aspect ratios must agree within `tolerance`
    /// (relative); the rounded box is clamped to the source frame.
    pub fn source_box(
        &self,
        source: Size,
        tolerance: f64,
    ) -> Result<Option<SourceCropBox>, DomainError> {
        if !self.active {
            return Ok(None);
        }
        if !source.is_positive() || source.width < 1.0 || source.height < 1.0 {
            return Err(DomainError::InvalidCrop(format!(
                "source size {}x{} is smaller than one pixel",
                source.width, source.height
            )));
        }

        let (preview_aspect, source_aspect) = (self.preview.aspect(), source.aspect());
        if ((preview_aspect - source_aspect) / source_aspect).abs() > tolerance {
            return Err(DomainError::AspectMismatch {
                preview: preview_aspect,
                source_aspect,
            });
        }

        let scale_x = source.width / self.preview.width;
        let scale_y = source.height / self.preview.height;
        let (max_w, max_h) = (source.width as u32, source.height as u32);

        let x = ((self.rect.left * scale_x).round() as u32).min(max_w.saturating_sub(1));
        let y = ((self.rect.top * scale_y).round() as u32).min(max_h.saturating_sub(1));
        let w = ((self.rect.width * scale_x).round() as u32).clamp(1, max_w - x);
        let h = ((self.rect.height * scale_y).round() as u32).clamp(1, max_h - y);

        let crop = SourceCropBox { x, y, w, h };
        debug!(crop = %crop, "Crop committed");
        Ok(Some(crop))
    }
}

/// Map a source box back onto a preview surface
pub fn preview_rect(crop: &SourceCropBox, source: Size, preview: Size) -> CropRect {
    let scale_x = preview.width / source.width;
    let scale_y = preview.height / source.height;
    CropRect {
        left: crop.x as f64 * scale_x,
        top: crop.y as f64 * scale_y,
        width: crop.w as f64 * scale_x,
        height: crop.h as f64 * scale_y,
    }
}

impl DragTarget for CropEditor {
    type Grip = CropGrip;

    fn press(&mut self, grip: CropGrip, at: Point, _now: Duration) -> bool {
        if !self.active || self.state != CropState::Idle {
            return false;
        }
        self.state = match grip {
            CropGrip::Interior if self.rect.contains(at) => CropState::Moving,
            CropGrip::Interior => return false,
            CropGrip::Corner(corner) => CropState::Resizing(corner),
        };
        self.press_at = at;
        self.press_rect = self.rect;
        true
    }

    fn drag(&mut self, at: Point, _now: Duration) {
        let (dx, dy) = (at.x - self.press_at.x, at.y - self.press_at.y);
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        match self.state {
            CropState::Idle => {}
            CropState::Moving => self.move_to(dx, dy),
            CropState::Resizing(corner) => self.resize(corner, dx, dy),
        }
    }

    fn release(&mut self, _now: Duration) {
        self.state = CropState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::PointerCapture;

    fn editor(w: f64, h: f64) -> CropEditor {
        let mut editor = CropEditor::new(Size::new(w, h)).unwrap();
        editor.toggle();
        editor
    }

    fn gesture(editor: &mut CropEditor, grip: CropGrip, from: Point, to: Point) {
        let mut capture = PointerCapture::acquire(editor, grip, from, Duration::ZERO).unwrap();
        capture.move_to(to, Duration::from_millis(16));
    }

    #[test]
    fn test_rejects_tiny_preview() {
        assert!(matches!(
            CropEditor::new(Size::new(20.0, 200.0)),
            Err(DomainError::InvalidCrop(_))
        ));
    }

    #[test]
    fn test_default_rect_is_clamped() {
        let editor = CropEditor::new(Size::new(64.0, 300.0)).unwrap();
        assert_eq!(editor.rect().width, 64.0);
        assert_eq!(editor.rect().height, 96.0);
        assert!(!editor.is_active());
    }

    #[test]
    fn test_move_is_clamped_to_preview() {
        let mut editor = editor(320.0, 180.0);
        gesture(&mut editor, CropGrip::Interior, Point::new(10.0, 10.0), Point::new(1000.0, 1000.0));
        assert_eq!(editor.rect().left, 224.0);
        assert_eq!(editor.rect().top, 84.0);
        gesture(&mut editor, CropGrip::Interior, Point::new(230.0, 90.0), Point::new(-500.0, 90.0));
        assert_eq!(editor.rect().left, 0.0);
    }

    #[test]
    fn test_press_outside_interior_is_refused() {
        let mut editor = editor(320.0, 180.0);
        assert!(!editor.press(CropGrip::Interior, Point::new(200.0, 150.0), Duration::ZERO));
        assert_eq!(editor.state(), CropState::Idle);
    }

    #[test]
    fn test_inactive_editor_refuses_gestures_and_yields_no_box() {
        let mut editor = CropEditor::new(Size::new(320.0, 180.0)).unwrap();
        assert!(!editor.press(CropGrip::Interior, Point::new(10.0, 10.0), Duration::ZERO));
        assert_eq!(editor.source_box(Size::new(1280.0, 720.0), 0.01).unwrap(), None);
    }

    #[test]
    fn test_bottom_right_grows_until_preview_edge() {
        let mut editor = editor(320.0, 180.0);
        gesture(
            &mut editor,
            CropGrip::Corner(Corner::BottomRight),
            Point::new(96.0, 96.0),
            Point::new(500.0, 500.0),
        );
        assert_eq!(editor.rect(), CropRect { left: 0.0, top: 0.0, width: 320.0, height: 180.0 });
    }

    #[test]
    fn test_top_left_anchors_bottom_right_corner() {
        let mut editor = editor(320.0, 180.0);
        editor
            .restore(CropRect { left: 50.0, top: 50.0, width: 100.0, height: 100.0 })
            .unwrap();
        gesture(
            &mut editor,
            CropGrip::Corner(Corner::TopLeft),
            Point::new(50.0, 50.0),
            Point::new(250.0, 250.0),
        );
        let rect = editor.rect();
        assert_eq!((rect.width, rect.height), (MIN_CROP_SIZE, MIN_CROP_SIZE));
        assert_eq!((rect.right(), rect.bottom()), (150.0, 150.0));
    }

    #[test]
    fn test_resize_pushing_origin_negative_is_rejected() {
        let mut editor = editor(320.0, 180.0);
        editor
            .restore(CropRect { left: 10.0, top: 10.0, width: 64.0, height: 64.0 })
            .unwrap();
        let before = editor.rect();
        gesture(
            &mut editor,
            CropGrip::Corner(Corner::TopLeft),
            Point::new(10.0, 10.0),
            Point::new(-5.0, 0.0),
        );
        assert_eq!(editor.rect(), before);
    }

    #[test]
    fn test_source_box_scales_and_rounds() {
        let mut editor = editor(320.0, 180.0);
        editor
            .restore(CropRect { left: 10.3, top: 20.0, width: 100.0, height: 50.0 })
            .unwrap();
        let crop = editor.source_box(Size::new(1280.0, 720.0), 0.01).unwrap().unwrap();
        assert_eq!(crop, SourceCropBox { x: 41, y: 80, w: 400, h: 200 });
        assert_eq!(crop.to_string(), "400:200:41:80");
    }

    #[test]
    fn test_aspect_mismatch_is_rejected() {
        let editor = editor(320.0, 180.0);
        let err = editor.source_box(Size::new(640.0, 480.0), 0.01).unwrap_err();
        assert!(matches!(
            err,
            DomainError::AspectMismatch { source_aspect, .. } if (source_aspect - 4.0 / 3.0).abs() < 1e-9
        ));
        assert_eq!(
            err.to_string(),
            "Aspect ratio mismatch: preview 1.7778 vs source 1.3333"
        );
    }
}
