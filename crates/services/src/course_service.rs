use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use course_core::model::{CourseStep, StepId};
use storage::repository::StepSource;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::CourseLoadError;
use crate::latency::Latency;

/// Resolves step payloads by index, caching them by derived step id.
///
/// One instance is built by the composition root and shared for the life of the
/// process. Cached payloads are handed out as the same `Arc` on every hit.
pub struct CourseService {
    source: Arc<dyn StepSource>,
    latency: Arc<dyn Latency>,
    cache: Mutex<HashMap<StepId, Arc<CourseStep>>>,
}

impl CourseService {
    #[must_use]
    pub fn new(source: Arc<dyn StepSource>, latency: Arc<dyn Latency>) -> Self {
        Self {
            source,
            latency,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.source.step_count()
    }

    #[must_use]
    pub fn is_cached(&self, index: usize) -> bool {
        self.cached(&StepId::for_index(index)).is_some()
    }

    fn cached(&self, key: &StepId) -> Option<Arc<CourseStep>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Load the step at `index`, waiting out the configured latency.
    ///
    /// # Errors
    ///
    /// Returns `CourseLoadError::StepNotFound` if the source has no step at `index`,
    /// or `CourseLoadError::LoadFailure` if the source fails.
    #[instrument(skip(self), fields(step = index + 1))]
    pub async fn load_step(&self, index: usize) -> Result<Arc<CourseStep>, CourseLoadError> {
        let key = StepId::for_index(index);

        if let Some(hit) = self.cached(&key) {
            debug!("step served from cache");
            tokio::time::sleep(self.latency.cached()).await;
            return Ok(hit);
        }

        let step = self
            .source
            .fetch_step(index)
            .await
            .map_err(|source| CourseLoadError::LoadFailure { index, source })?
            .ok_or(CourseLoadError::StepNotFound { index })?;

        tokio::time::sleep(self.latency.fresh()).await;

        // A concurrent load of the same step may have finished first; keep its value.
        let step = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(step)))
        };
        info!(kind = step.kind().as_str(), title = step.title(), "step loaded");
        Ok(step)
    }

    /// Load the step after `index` so it is cached before the learner reaches it.
    ///
    /// Does nothing past the last step.
    ///
    /// # Errors
    ///
    /// Propagates the `CourseLoadError` of the underlying load.
    pub async fn preload_next_step(&self, index: usize) -> Result<(), CourseLoadError> {
        let next = index + 1;
        if next >= self.source.step_count() {
            return Ok(());
        }
        self.load_step(next).await.map(|_| ())
    }

    /// Fire-and-forget variant of `preload_next_step`; failures are logged.
    pub fn spawn_preload(self: &Arc<Self>, index: usize) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = service.preload_next_step(index).await {
                warn!(error = %err, "prefetch failed");
            }
        })
    }
}

impl fmt::Debug for CourseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("CourseService")
            .field("steps", &self.source.step_count())
            .field("cached", &cached)
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::{FixedLatency, SimulatedLatency};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use storage::StaticCatalog;
    use storage::repository::StorageError;
    use tokio::time::Instant;

    fn service(latency: Arc<dyn Latency>) -> CourseService {
        CourseService::new(Arc::new(StaticCatalog::bundled().unwrap()), latency)
    }

    #[derive(Debug, Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl StepSource for CountingSource {
        fn step_count(&self) -> usize {
            1
        }

        async fn fetch_step(&self, index: usize) -> Result<Option<CourseStep>, StorageError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let catalog = StaticCatalog::bundled()?;
            Ok(catalog.steps().get(index).cloned())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl StepSource for BrokenSource {
        fn step_count(&self) -> usize {
            4
        }

        async fn fetch_step(&self, _index: usize) -> Result<Option<CourseStep>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_load_is_cached_and_faster() {
        let svc = service(Arc::new(SimulatedLatency::default()));

        let start = Instant::now();
        let first = svc.load_step(1).await.unwrap();
        let first_wait = start.elapsed();

        let start = Instant::now();
        let second = svc.load_step(1).await.unwrap();
        let second_wait = start.elapsed();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(first_wait >= Duration::from_millis(800));
        assert_eq!(second_wait, Duration::from_millis(300));
        assert!(second_wait < first_wait);
    }

    #[tokio::test]
    async fn cache_hit_skips_the_source() {
        let source = Arc::new(CountingSource::default());
        let svc = CourseService::new(source.clone(), Arc::new(FixedLatency::instant()));

        svc.load_step(0).await.unwrap();
        svc.load_step(0).await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_step_is_not_found() {
        let svc = service(Arc::new(FixedLatency::instant()));
        let err = svc.load_step(7).await.unwrap_err();
        assert!(matches!(err, CourseLoadError::StepNotFound { index: 7 }));
        assert!(!svc.is_cached(7));
    }

    #[tokio::test]
    async fn source_failure_is_load_failure_and_not_cached() {
        let svc = CourseService::new(Arc::new(BrokenSource), Arc::new(FixedLatency::instant()));
        let err = svc.load_step(0).await.unwrap_err();
        assert!(matches!(err, CourseLoadError::LoadFailure { index: 0, .. }));
        assert!(!svc.is_cached(0));
    }

    #[tokio::test]
    async fn preload_caches_next_step_only() {
        let svc = service(Arc::new(FixedLatency::instant()));
        svc.preload_next_step(0).await.unwrap();
        assert!(!svc.is_cached(0));
        assert!(svc.is_cached(1));
    }

    #[tokio::test]
    async fn preload_past_last_step_is_noop() {
        let svc = service(Arc::new(FixedLatency::instant()));
        svc.preload_next_step(3).await.unwrap();
        assert!(!svc.is_cached(4));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_preload_does_not_block_caller() {
        let svc = Arc::new(service(Arc::new(SimulatedLatency::default())));

        let start = Instant::now();
        let handle = svc.spawn_preload(0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!svc.is_cached(1));

        handle.await.unwrap();
        assert!(svc.is_cached(1));
    }
}
