mod progress;
mod quiz;
mod reading;
mod video;

// Public API of the step sessions.
pub use progress::{QuizProgress, ReadingProgress};
pub use quiz::{QuizAdvance, QuizPhase, QuizResult, QuizSession};
pub use reading::ReadingSession;
pub use video::{PlaybackStatus, PlayerEvent, VideoSession, WatchState};
