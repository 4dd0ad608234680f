//! Interactive editors
//!
//! The trim and crop editors are pointer-driven state machines. A pointer
//! gesture is always delivered through a [`PointerCapture`], which owns the
//! move/up routing for the lifetime of the gesture and guarantees the
//! editor sees exactly one pointer-up.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod crop;
pub mod gestures;
pub mod trim;

pub use crop::{Corner, CropEditor, CropGrip, CropRect, CropState};
pub use gestures::GestureScript;
pub use trim::{TrimEditor, TrimHandle, TrimState};

/// Pointer position in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Something a pointer gesture can grab.
///
/// `now` is a monotonic timestamp; only differences between values matter.
pub trait DragTarget {
    /// What the pointer went down on
    type Grip: Copy;

    /// Pointer-down; returns false when the press is refused
    fn press(&mut self, grip: Self::Grip, at: Point, now: Duration) -> bool;

    /// Pointer-move while captured
    fn drag(&mut self, at: Point, now: Duration);

    /// Pointer-up
    fn release(&mut self, now: Duration);
}

/// Scoped ownership of pointer-move/up for one gesture
pub struct PointerCapture<'a, T: DragTarget> {
    target: &'a mut T,
    last: Duration,
    released: bool,
}

impl<'a, T: DragTarget> PointerCapture<'a, T> {
    /// Deliver pointer-down; `None` when the target refused it
    pub fn acquire(target: &'a mut T, grip: T::Grip, at: Point, now: Duration) -> Option<Self> {
        if !target.press(grip, at, now) {
            return None;
        }
        Some(Self {
            target,
            last: now,
            released: false,
        })
    }

    pub fn move_to(&mut self, at: Point, now: Duration) {
        self.last = now;
        self.target.drag(at, now);
    }

    pub fn target(&self) -> &T {
        self.target
    }

    /// Deliver pointer-up and end the gesture
    pub fn release(mut self, now: Duration) {
        self.finish(now);
    }

    fn finish(&mut self, now: Duration) {
        if !self.released {
            self.released = true;
            self.target.release(now);
        }
    }
}

impl<T: DragTarget> Drop for PointerCapture<'_, T> {
    fn drop(&mut self) {
        let last = self.last;
        self.finish(last);
    }
}

/// The preview video the trim editor drives
pub trait PreviewPlayer {
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, time: f64);
    fn current_time(&self) -> f64;
}

/// Player without a display that records every seek
#[derive(Debug, Clone, Default)]
pub struct HeadlessPlayer {
    playing: bool,
    time: f64,
    seeks: Vec<f64>,
}

impl HeadlessPlayer {
    pub fn new(playing: bool) -> Self {
        Self {
            playing,
            ..Self::default()
        }
    }

    pub fn seeks(&self) -> &[f64] {
        &self.seeks
    }

    /// Advance playback as a real element would between time updates
    pub fn advance(&mut self, seconds: f64) {
        if self.playing {
            self.time += seconds;
        }
    }
}

impl PreviewPlayer for HeadlessPlayer {
    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, time: f64) {
        self.time = time;
        self.seeks.push(time);
    }

    fn current_time(&self) -> f64 {
        self.time
    }
}

/// Horizontal placement of the trim bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarGeometry {
    pub left: f64,
    pub width: f64,
}

impl Default for BarGeometry {
    fn default() -> Self {
        Self {
            left: 0.0,
            width: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        presses: usize,
        moves: usize,
        releases: usize,
        refuse: bool,
    }

    impl DragTarget for Counter {
        type Grip = ();

        fn press(&mut self, _grip: (), _at: Point, _now: Duration) -> bool {
            self.presses += 1;
            !self.refuse
        }

        fn drag(&mut self, _at: Point, _now: Duration) {
            self.moves += 1;
        }

        fn release(&mut self, _now: Duration) {
            self.releases += 1;
        }
    }

    #[test]
    fn test_release_is_delivered_once() {
        let mut counter = Counter::default();
        let mut capture =
            PointerCapture::acquire(&mut counter, (), Point::default(), Duration::ZERO).unwrap();
        capture.move_to(Point::new(1.0, 0.0), Duration::from_millis(5));
        capture.release(Duration::from_millis(10));
        assert_eq!((counter.presses, counter.moves, counter.releases), (1, 1, 1));
    }

    #[test]
    fn test_dropped_capture_still_releases() {
        let mut counter = Counter::default();
        {
            let _capture =
                PointerCapture::acquire(&mut counter, (), Point::default(), Duration::ZERO);
        }
        assert_eq!(counter.releases, 1);
    }

    #[test]
    fn test_refused_press_captures_nothing() {
        let mut counter = Counter {
            refuse: true,
            ..Counter::default()
        };
        assert!(PointerCapture::acquire(&mut counter, (), Point::default(), Duration::ZERO).is_none());
        assert_eq!(counter.releases, 0);
    }
}
