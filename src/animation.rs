//! Keyframe playback.
//!
//! [`Playback`] is a pure timer: the host calls [`Playback::tick`] once per
//! display refresh with the elapsed milliseconds, and the returned
//! [`PlaybackStep`] says which document actions to apply. Interpolation steps
//! are never snapshotted into history.

#[cfg(test)]
#[path = "animation_test.rs"]
mod animation_test;

use crate::consts::{CYCLE_DURATION_MS, MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
use crate::reduce::Action;

/// Result of advancing playback by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackStep {
    /// Not playing; nothing to do.
    Idle,
    /// Mid-transition between two frames.
    Interpolate { from: usize, to: usize, t: f64 },
    /// The `from`→`to` transition completed. `current` is the new current
    /// frame; `finished` is set when a full loop back to frame 0 completed.
    Reached { from: usize, to: usize, current: usize, finished: bool },
}

impl PlaybackStep {
    /// Document actions that realize this step.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        match *self {
            Self::Idle => Vec::new(),
            Self::Interpolate { from, to, t } => vec![Action::InterpolateFrames { from, to, t }],
            Self::Reached { from, to, current, .. } => vec![
                Action::InterpolateFrames { from, to, t: 1.0 },
                Action::SetCurrentFrame(current),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    playing: bool,
    from: usize,
    to: usize,
    progress: f64,
    speed: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self { playing: false, from: 0, to: 0, progress: 0.0, speed: 1.0 }
    }
}

impl Playback {
    #[must_use]
    pub fn new(speed: f64) -> Self {
        let mut playback = Self::default();
        playback.set_speed(speed);
        playback
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Progress through the current transition in `[0, 1)`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// The frame pair currently being interpolated.
    #[must_use]
    pub fn pair(&self) -> (usize, usize) {
        (self.from, self.to)
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED) } else { 1.0 };
    }

    /// Begin playing from `current`. Returns false (and stays stopped) with fewer than two frames.
    pub fn start(&mut self, frame_count: usize, current: usize) -> bool {
        if frame_count < 2 {
            return false;
        }
        let from = current.min(frame_count - 1);
        self.from = from;
        self.to = (from + 1) % frame_count;
        self.progress = 0.0;
        self.playing = true;
        true
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.progress = 0.0;
    }

    /// Advance by `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f64, frame_count: usize) -> PlaybackStep {
        if !self.playing {
            return PlaybackStep::Idle;
        }
        if frame_count < 2 || self.from >= frame_count || self.to >= frame_count {
            self.stop();
            return PlaybackStep::Idle;
        }

        self.progress += (dt_ms.max(0.0) / CYCLE_DURATION_MS) * self.speed;
        if self.progress < 1.0 {
            return PlaybackStep::Interpolate { from: self.from, to: self.to, t: self.progress };
        }

        let (from, to) = (self.from, self.to);
        self.from = to;
        self.to = (to + 1) % frame_count;
        self.progress = 0.0;
        let finished = self.from == 0;
        if finished {
            self.playing = false;
        }
        PlaybackStep::Reached { from, to, current: self.from, finished }
    }
}
