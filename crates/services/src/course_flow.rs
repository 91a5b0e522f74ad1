use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use course_core::Clock;
use course_core::model::CourseStep;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::course_service::CourseService;
use crate::error::{CourseFlowError, CourseLoadError};
use crate::sessions::{QuizSession, ReadingSession, VideoSession};
use crate::store::CourseStore;

const DEFAULT_READ_DWELL: Duration = Duration::from_secs(3);
const DEFAULT_VIDEO_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Session for the step on screen, built from its loaded payload.
#[derive(Debug)]
pub enum ActiveStep {
    Video(VideoSession),
    Quiz(QuizSession),
    Reading(ReadingSession),
}

/// Drives a learner through the course: loading, gating and step sessions.
#[derive(Debug)]
pub struct CourseFlow {
    store: CourseStore,
    service: Arc<CourseService>,
    clock: Clock,
    read_dwell: Duration,
    video_load_timeout: Duration,
    prefetch: Option<JoinHandle<()>>,
}

impl CourseFlow {
    #[must_use]
    pub fn new(store: CourseStore, service: Arc<CourseService>) -> Self {
        Self {
            store,
            service,
            clock: Clock::default(),
            read_dwell: DEFAULT_READ_DWELL,
            video_load_timeout: DEFAULT_VIDEO_LOAD_TIMEOUT,
            prefetch: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_timings(mut self, read_dwell: Duration, video_load_timeout: Duration) -> Self {
        self.read_dwell = read_dwell;
        self.video_load_timeout = video_load_timeout;
        self
    }

    #[must_use]
    pub fn store(&self) -> &CourseStore {
        &self.store
    }

    /// Mutable access for step sessions reporting completion.
    pub fn store_mut(&mut self) -> &mut CourseStore {
        &mut self.store
    }

    #[must_use]
    pub fn service(&self) -> &Arc<CourseService> {
        &self.service
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Resolve the payload of the current step and attach it to the store.
    ///
    /// Does nothing if the step is already loaded. On success the next step is
    /// prefetched in the background. On failure the loading flag is cleared and
    /// no data is attached.
    ///
    /// # Errors
    ///
    /// Returns the `CourseLoadError` of the failed load; the caller offers a retry.
    pub async fn load_current_step(&mut self) -> Result<Arc<CourseStep>, CourseLoadError> {
        let index = self.store.state().current_step();
        if let Some(loaded) = self.store.state().step_data(index) {
            return Ok(Arc::clone(loaded));
        }

        self.store.set_loading(true, Some(index));
        let loaded = self.service.load_step(index).await;
        self.store.set_loading(false, None);

        match loaded {
            Ok(step) => {
                self.store.set_step_data(index, Arc::clone(&step));
                self.prefetch = Some(self.service.spawn_preload(index));
                Ok(step)
            }
            Err(err) => {
                warn!(step = index + 1, error = %err, "step load failed");
                Err(err)
            }
        }
    }

    /// Same as `load_current_step`; named for the retry button.
    ///
    /// # Errors
    ///
    /// Returns the `CourseLoadError` of the failed load.
    pub async fn retry(&mut self) -> Result<Arc<CourseStep>, CourseLoadError> {
        self.load_current_step().await
    }

    /// Jump to step `index` if every earlier step is complete.
    /// Call `load_current_step` afterwards to resolve its payload.
    pub fn go_to_step(&mut self, index: usize) -> bool {
        self.store.set_current_step(index)
    }

    /// Advance past the current step once it is complete.
    pub fn next_step(&mut self) -> bool {
        let current = self.store.state().current_step();
        if !self.store.state().is_step_complete(current) {
            return false;
        }
        self.store.set_current_step(current + 1)
    }

    /// Forget all progress. Cached payloads stay in the service.
    pub fn restart(&mut self) {
        self.store.reset_course();
    }

    /// Wait for the background prefetch started by the last load, if any.
    pub async fn wait_for_prefetch(&mut self) {
        if let Some(prefetch) = self.prefetch.take() {
            if let Err(err) = prefetch.await {
                warn!(error = %err, "prefetch task did not finish");
            }
        }
    }

    /// Build the session for the loaded current step.
    ///
    /// # Errors
    ///
    /// Returns `CourseFlowError::NotLoaded` if the current step has no payload yet,
    /// or `CourseFlowError::Quiz` for a quiz without questions.
    pub fn start_step(&self) -> Result<ActiveStep, CourseFlowError> {
        let index = self.store.state().current_step();
        let step = self
            .store
            .state()
            .step_data(index)
            .ok_or(CourseFlowError::NotLoaded { index })?;

        let active = match step.as_ref() {
            CourseStep::Video(lesson) => ActiveStep::Video(VideoSession::new(
                index,
                lesson.clone(),
                self.video_load_timeout,
            )),
            CourseStep::Quiz(quiz) => {
                ActiveStep::Quiz(QuizSession::new(index, quiz.clone(), self.clock.now())?)
            }
            CourseStep::Content(section) => ActiveStep::Reading(ReadingSession::new(
                index,
                section.clone(),
                self.read_dwell,
                self.clock.now(),
            )),
        };
        Ok(active)
    }
}

impl Drop for CourseFlow {
    fn drop(&mut self) {
        if let Some(prefetch) = self.prefetch.take() {
            prefetch.abort();
        }
    }
}
