use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use course_core::model::{ContentBlock, ContentSection, rounded_percent};
use course_core::time;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::progress::ReadingProgress;
use crate::error::ReadingError;
use crate::store::CourseStore;

type ReadSet = Arc<Mutex<BTreeSet<usize>>>;

/// Pages through a content step, marking each section read after it has been on
/// screen for the dwell time.
///
/// Must be created inside a tokio runtime for the dwell timers to run.
#[derive(Debug)]
pub struct ReadingSession {
    step_index: usize,
    section: ContentSection,
    current: usize,
    read: ReadSet,
    dwell: Duration,
    timer: Option<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

impl ReadingSession {
    #[must_use]
    pub fn new(
        step_index: usize,
        section: ContentSection,
        dwell: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            step_index,
            section,
            current: 0,
            read: Arc::new(Mutex::new(BTreeSet::new())),
            dwell,
            timer: None,
            started_at,
        };
        session.start_dwell_timer();
        session
    }

    fn read_set(&self) -> MutexGuard<'_, BTreeSet<usize>> {
        self.read.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn start_dwell_timer(&mut self) {
        self.cancel_timer();
        let index = self.current;
        if index >= self.section.section_count() || self.is_section_read(index) {
            return;
        }
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "no runtime; reading timer not started");
                return;
            }
        };
        let read = Arc::clone(&self.read);
        let dwell = self.dwell;
        self.timer = Some(handle.spawn(async move {
            tokio::time::sleep(dwell).await;
            read.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(index);
            debug!(section = index + 1, "section read");
        }));
    }

    #[must_use]
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    #[must_use]
    pub fn section(&self) -> &ContentSection {
        &self.section
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_block(&self) -> Option<&ContentBlock> {
        self.section.content.get(self.current)
    }

    #[must_use]
    pub fn is_section_read(&self, index: usize) -> bool {
        self.read_set().contains(&index)
    }

    #[must_use]
    pub fn read_count(&self) -> usize {
        self.read_set().len()
    }

    #[must_use]
    pub fn all_read(&self) -> bool {
        self.read_count() == self.section.section_count()
    }

    #[must_use]
    pub fn is_last_section(&self) -> bool {
        self.current + 1 >= self.section.section_count()
    }

    /// The next section opens only once the current one has been read.
    #[must_use]
    pub fn can_go_next(&self) -> bool {
        !self.is_last_section() && self.is_section_read(self.current)
    }

    pub fn next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.current += 1;
        self.start_dwell_timer();
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.start_dwell_timer();
        true
    }

    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        time::elapsed_secs(self.started_at, now)
    }

    #[must_use]
    pub fn progress(&self) -> ReadingProgress {
        let total = self.section.section_count();
        ReadingProgress {
            section: self.current,
            total,
            read: self.read_count(),
            percent: rounded_percent(self.current + 1, total),
            all_read: self.all_read(),
        }
    }

    /// # Errors
    ///
    /// Returns `ReadingError::SectionsUnread` until every section has been read.
    pub fn complete(&self, store: &mut CourseStore) -> Result<(), ReadingError> {
        let read = self.read_count();
        let total = self.section.section_count();
        if read < total {
            return Err(ReadingError::SectionsUnread { read, total });
        }
        store.mark_step_complete(self.step_index);
        Ok(())
    }
}

impl Drop for ReadingSession {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::StepId;
    use course_core::time::fixed_now;

    const DWELL: Duration = Duration::from_secs(3);

    fn section(blocks: usize) -> ContentSection {
        ContentSection {
            id: StepId::for_index(2),
            title: "Components".into(),
            description: String::new(),
            content: (1..=blocks)
                .map(|n| ContentBlock {
                    text: format!("Block {n}"),
                    images: Vec::new(),
                })
                .collect(),
        }
    }

    async fn wait(d: Duration) {
        tokio::time::sleep(d).await;
    }

    #[tokio::test(start_paused = true)]
    async fn section_is_read_after_dwell() {
        let session = ReadingSession::new(2, section(2), DWELL, fixed_now());
        wait(Duration::from_millis(2900)).await;
        assert!(!session.is_section_read(0));
        wait(Duration::from_millis(200)).await;
        assert!(session.is_section_read(0));
        assert!(session.can_go_next());
    }

    #[tokio::test(start_paused = true)]
    async fn next_is_blocked_until_current_section_is_read() {
        let mut session = ReadingSession::new(2, section(2), DWELL, fixed_now());
        assert!(!session.next());
        wait(DWELL + Duration::from_millis(1)).await;
        assert!(session.next());
        assert_eq!(session.current_index(), 1);
        assert!(!session.next());
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_early_cancels_the_timer() {
        let mut session = ReadingSession::new(2, section(2), DWELL, fixed_now());
        wait(DWELL + Duration::from_millis(1)).await;
        assert!(session.next());

        wait(Duration::from_secs(1)).await;
        assert!(session.previous());
        wait(Duration::from_secs(5)).await;

        assert!(!session.is_section_read(1));
        assert_eq!(session.read_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_requires_every_section() {
        let mut store = CourseStore::default();
        let mut session = ReadingSession::new(2, section(3), DWELL, fixed_now());

        wait(DWELL + Duration::from_millis(1)).await;
        assert_eq!(
            session.complete(&mut store),
            Err(ReadingError::SectionsUnread { read: 1, total: 3 })
        );

        for _ in 0..2 {
            assert!(session.next());
            wait(DWELL + Duration::from_millis(1)).await;
        }
        assert!(session.all_read());
        assert!(session.progress().all_read);
        session.complete(&mut store).unwrap();
        assert!(store.state().is_step_complete(2));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_session_cancels_pending_timer() {
        let session = ReadingSession::new(2, section(1), DWELL, fixed_now());
        let read = Arc::clone(&session.read);
        drop(session);
        wait(DWELL * 2).await;
        assert!(read.lock().unwrap().is_empty());
    }

    #[test]
    fn without_runtime_nothing_is_marked_read() {
        let session = ReadingSession::new(2, section(1), DWELL, fixed_now());
        assert!(session.timer.is_none());
        assert!(!session.all_read());
    }

    #[tokio::test]
    async fn progress_reports_position() {
        let session = ReadingSession::new(2, section(4), DWELL, fixed_now());
        let progress = session.progress();
        assert_eq!((progress.section, progress.total, progress.percent), (0, 4, 25));
        assert_eq!(session.current_block().map(|b| b.text.as_str()), Some("Block 1"));
    }
}
