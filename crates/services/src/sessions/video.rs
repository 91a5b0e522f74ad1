use std::time::Duration;

use chrono::{DateTime, Utc};
use course_core::model::VideoLesson;
use course_core::time;
use tracing::{info, warn};

use crate::error::VideoError;
use crate::store::CourseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    Watched,
}

/// State of the platform player as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Loading { since: DateTime<Utc> },
    Ready,
    Error,
}

/// Status changes emitted by the platform video component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Loading,
    ReadyToPlay { duration_secs: Option<f64> },
    Error,
}

/// Tracks a video lesson from thumbnail to completion.
///
/// Playback itself is delegated; this only records what the learner did and what
/// the player reported.
#[derive(Debug, Clone)]
pub struct VideoSession {
    step_index: usize,
    lesson: VideoLesson,
    watch: WatchState,
    status: PlaybackStatus,
    player_visible: bool,
    duration_secs: f64,
    load_timeout: Duration,
}

impl VideoSession {
    #[must_use]
    pub fn new(step_index: usize, lesson: VideoLesson, load_timeout: Duration) -> Self {
        let duration_secs = f64::from(lesson.duration);
        Self {
            step_index,
            lesson,
            watch: WatchState::Unwatched,
            status: PlaybackStatus::Idle,
            player_visible: false,
            duration_secs,
            load_timeout,
        }
    }

    #[must_use]
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    #[must_use]
    pub fn lesson(&self) -> &VideoLesson {
        &self.lesson
    }

    #[must_use]
    pub fn watch_state(&self) -> WatchState {
        self.watch
    }

    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    #[must_use]
    pub fn is_player_visible(&self) -> bool {
        self.player_visible
    }

    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Duration as `m:ss`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_label(&self) -> String {
        time::format_elapsed(self.duration_secs.max(0.0).floor() as u64)
    }

    /// The learner pressed play. Counts as watched from here on.
    pub fn play(&mut self, now: DateTime<Utc>) {
        info!(step = self.step_index + 1, url = %self.lesson.video_url, "video playback requested");
        self.player_visible = true;
        self.status = PlaybackStatus::Loading { since: now };
        self.watch = WatchState::Watched;
    }

    pub fn on_player_event(&mut self, event: PlayerEvent, now: DateTime<Utc>) {
        self.status = match event {
            PlayerEvent::Loading => match self.status {
                PlaybackStatus::Loading { since } => PlaybackStatus::Loading { since },
                _ => PlaybackStatus::Loading { since: now },
            },
            PlayerEvent::ReadyToPlay { duration_secs } => {
                if let Some(reported) = duration_secs.filter(|d| *d > 0.0) {
                    self.duration_secs = reported;
                }
                PlaybackStatus::Ready
            }
            PlayerEvent::Error => {
                warn!(step = self.step_index + 1, "video player reported an error");
                PlaybackStatus::Error
            }
        };
    }

    /// Flip a load that has been pending for longer than the timeout into an error.
    /// Returns `true` if it did.
    pub fn check_timeout(&mut self, now: DateTime<Utc>) -> bool {
        let PlaybackStatus::Loading { since } = self.status else {
            return false;
        };
        let expired = (now - since)
            .to_std()
            .is_ok_and(|waited| waited >= self.load_timeout);
        if expired {
            warn!(step = self.step_index + 1, "video load timed out");
            self.status = PlaybackStatus::Error;
        }
        expired
    }

    /// Retry after an error. Returns `false` if the player is not in error.
    pub fn replay(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != PlaybackStatus::Error {
            return false;
        }
        self.play(now);
        true
    }

    /// Back to the thumbnail.
    pub fn close_player(&mut self) {
        self.player_visible = false;
        self.status = PlaybackStatus::Idle;
    }

    #[must_use]
    pub fn can_complete(&self) -> bool {
        self.watch == WatchState::Watched
    }

    /// # Errors
    ///
    /// Returns `VideoError::NotWatched` if playback was never started.
    pub fn complete(&self, store: &mut CourseStore) -> Result<(), VideoError> {
        if !self.can_complete() {
            return Err(VideoError::NotWatched);
        }
        store.mark_step_complete(self.step_index);
        Ok(())
    }
}
