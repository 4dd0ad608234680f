//! Trim editor: two handles over a progress bar bound to a preview player

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BarGeometry, DragTarget, Point, PreviewPlayer};
use crate::domain::errors::DomainError;
use crate::domain::model::TrimSelection;

/// Minimum wall-clock spacing between preview seeks during a drag
pub const SEEK_INTERVAL: Duration = Duration::from_millis(80);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimHandle {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimState {
    Idle,
    DraggingStart,
    DraggingEnd,
}

pub struct TrimEditor<P: PreviewPlayer> {
    player: P,
    bar: BarGeometry,
    duration: Option<f64>,
    start: f64,
    end: f64,
    state: TrimState,
    was_playing: bool,
    last_seek: Option<Duration>,
}

impl<P: PreviewPlayer> TrimEditor<P> {
    pub fn new(player: P, bar: BarGeometry) -> Self {
        Self {
            player,
            bar,
            duration: None,
            start: 0.0,
            end: 0.0,
            state: TrimState::Idle,
            was_playing: false,
            last_seek: None,
        }
    }

    /// Arm the editor once the preview knows its duration.
    ///
    /// A previously committed selection seeds the handles, clamped into the
    /// new duration; otherwise the full clip is selected.
    pub fn load_metadata(
        &mut self,
        duration: f64,
        previous: Option<&TrimSelection>,
    ) -> Result<(), DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::OutOfRange(format!(
                "preview duration must be positive, got {}",
                duration
            )));
        }

        let (start, end) = match previous {
            Some(prev) => {
                let start = prev.start_time.clamp(0.0, duration);
                (start, prev.end_time.clamp(start, duration))
            }
            None => (0.0, duration),
        };

        self.duration = Some(duration);
        self.start = start;
        self.end = end;
        self.state = TrimState::Idle;
        self.player.seek(start);
        debug!(duration, start, end, "Trim editor armed");
        Ok(())
    }

    pub fn set_bar(&mut self, bar: BarGeometry) {
        self.bar = bar;
    }

    pub fn state(&self) -> TrimState {
        self.state
    }

    pub fn start_time(&self) -> f64 {
        self.start
    }

    pub fn end_time(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Handle position along the bar, 0..=1
    pub fn handle_fraction(&self, handle: TrimHandle) -> Option<f64> {
        let duration = self.duration?;
        Some(match handle {
            TrimHandle::Start => self.start / duration,
            TrimHandle::End => self.end / duration,
        })
    }

    fn is_dragging(&self) -> bool {
        self.state != TrimState::Idle
    }

    /// Loop playback inside the selection
    pub fn on_time_update(&mut self) {
        if self.is_dragging() || self.duration.is_none() {
            return;
        }
        if self.player.is_playing() && self.player.current_time() >= self.end {
            self.player.seek(self.start);
        }
    }

    /// Playback hit the end of the media
    pub fn on_ended(&mut self) {
        if self.is_dragging() || self.duration.is_none() {
            return;
        }
        self.player.seek(self.start);
        self.player.play();
    }

    /// The current selection as a validated value
    pub fn commit(&self) -> Result<TrimSelection, DomainError> {
        let duration = self
            .duration
            .ok_or_else(|| DomainError::BadArgs("no preview metadata loaded".to_string()))?;
        TrimSelection::new(self.start, self.end, duration)
    }
}

impl<P: PreviewPlayer> DragTarget for TrimEditor<P> {
    type Grip = TrimHandle;

    fn press(&mut self, grip: TrimHandle, _at: Point, _now: Duration) -> bool {
        if self.duration.is_none() || self.bar.width <= 0.0 || self.is_dragging() {
            return false;
        }

        self.was_playing = self.player.is_playing();
        if self.was_playing {
            self.player.pause();
        }
        self.last_seek = None;
        self.state = match grip {
            TrimHandle::Start => TrimState::DraggingStart,
            TrimHandle::End => TrimState::DraggingEnd,
        };
        true
    }

    fn drag(&mut self, at: Point, now: Duration) {
        let Some(duration) = self.duration else {
            return;
        };
        let time = duration * (at.x - self.bar.left) / self.bar.width;
        if !time.is_finite() {
            return;
        }

        let position = match self.state {
            TrimState::Idle => return,
            TrimState::DraggingStart => {
                self.start = time.clamp(0.0, self.end);
                self.start
            }
            TrimState::DraggingEnd => {
                self.end = time.clamp(self.start, duration);
                self.end
            }
        };

        let due = self
            .last_seek
            .map_or(true, |last| now.saturating_sub(last) > SEEK_INTERVAL);
        if due {
            self.player.seek(position);
            self.last_seek = Some(now);
        }
    }

    fn release(&mut self, _now: Duration) {
        let finished = self.state;
        if finished == TrimState::Idle {
            return;
        }
        self.state = TrimState::Idle;

        if self.was_playing {
            // both handles resume from the selection start so playback loops inside it
            self.player.seek(self.start);
            self.player.play();
        } else {
            let position = match finished {
                TrimState::DraggingEnd => self.end,
                _ => self.start,
            };
            self.player.seek(position);
        }
        self.was_playing = false;
        debug!(start = self.start, end = self.end, "Trim drag finished");
    }
}
