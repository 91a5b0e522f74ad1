#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod course_flow;
pub mod course_service;
pub mod error;
pub mod latency;
pub mod sessions;
pub mod store;
pub mod theme_service;
pub mod view;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use config::{CourseConfig, LatencyMode};
pub use course_flow::{ActiveStep, CourseFlow};
pub use course_service::CourseService;
pub use error::{
    AppServicesError, CourseFlowError, CourseLoadError, QuizError, ReadingError,
    ThemeServiceError, VideoError,
};
pub use latency::{FixedLatency, Latency, SimulatedLatency};
pub use sessions::{
    PlaybackStatus, PlayerEvent, QuizAdvance, QuizPhase, QuizProgress, QuizResult, QuizSession,
    ReadingProgress, ReadingSession, VideoSession, WatchState,
};
pub use store::CourseStore;
pub use theme_service::{THEME_STORAGE_KEY, ThemeService};
