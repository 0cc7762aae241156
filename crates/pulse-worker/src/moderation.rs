//! Moderation job processing.
//!
//! The terminal transition is exactly-once: the conditional UPDATE in
//! `complete_moderation` only succeeds for rows still in
//! `(processing, pending)`, and the event is published only when this call
//! performed the transition. A redelivered job, or a job whose video was
//! deleted in the meantime, no-ops and acks.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use rand::Rng;
use tracing::{debug, info};

use pulse_db::{DbResult, VideoRepository};
use pulse_models::{Event, ProcessingStatus, SensitivityStatus, VideoId, VideoRecord};
use pulse_queue::{EventChannel, ModerationJob, QueueResult};

use crate::error::WorkerResult;

/// Moderation outcome strategy.
///
/// The default implementation is a biased random draw; a real content
/// model slots in behind the same trait.
pub trait Classifier: Send + Sync {
    fn classify(&self, video: &VideoRecord) -> SensitivityStatus;
}

/// Draws `safe` with a fixed probability, `flagged` otherwise.
pub struct RandomClassifier {
    safe_probability: f64,
}

impl RandomClassifier {
    pub fn new(safe_probability: f64) -> Self {
        Self {
            safe_probability: safe_probability.clamp(0.0, 1.0),
        }
    }
}

impl Default for RandomClassifier {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl Classifier for RandomClassifier {
    fn classify(&self, _video: &VideoRecord) -> SensitivityStatus {
        if rand::thread_rng().gen_bool(self.safe_probability) {
            SensitivityStatus::Safe
        } else {
            SensitivityStatus::Flagged
        }
    }
}

/// Video persistence as seen by the moderation flow.
///
/// Same seam shape as `Classifier`: the Postgres repository is the real
/// implementation, tests use an in-memory stand-in.
pub trait VideoStore: Send + Sync {
    fn fetch(&self, id: VideoId) -> BoxFuture<'_, DbResult<Option<VideoRecord>>>;
    fn complete(
        &self,
        id: VideoId,
        processing: ProcessingStatus,
        sensitivity: SensitivityStatus,
    ) -> BoxFuture<'_, DbResult<bool>>;
}

impl VideoStore for VideoRepository {
    fn fetch(&self, id: VideoId) -> BoxFuture<'_, DbResult<Option<VideoRecord>>> {
        Box::pin(self.get(id))
    }

    fn complete(
        &self,
        id: VideoId,
        processing: ProcessingStatus,
        sensitivity: SensitivityStatus,
    ) -> BoxFuture<'_, DbResult<bool>> {
        Box::pin(self.complete_moderation(id, processing, sensitivity))
    }
}

/// Destination for `video_processed` events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: Event) -> BoxFuture<'_, QueueResult<()>>;
}

impl EventSink for EventChannel {
    fn publish(&self, event: Event) -> BoxFuture<'_, QueueResult<()>> {
        Box::pin(async move { EventChannel::publish(self, &event).await })
    }
}

/// Shared context for moderation jobs.
pub struct ModerationContext {
    pub videos: Arc<dyn VideoStore>,
    pub events: Arc<dyn EventSink>,
    pub classifier: Arc<dyn Classifier>,
}

/// Process a single moderation job to completion.
pub async fn process_moderation(ctx: &ModerationContext, job: &ModerationJob) -> WorkerResult<()> {
    // Honor the due time; a redelivered overdue job proceeds immediately.
    let wait = job.time_until_due();
    if !wait.is_zero() {
        debug!(video_id = %job.video_id, "Waiting {:?} until job is due", wait);
        tokio::time::sleep(wait).await;
    }

    let video = match ctx.videos.fetch(job.video_id).await? {
        Some(v) => v,
        None => {
            info!(video_id = %job.video_id, "Video gone before moderation, dropping job");
            return Ok(());
        }
    };

    if video.processing_status.is_terminal() {
        info!(video_id = %video.id, "Video already moderated, dropping job");
        return Ok(());
    }

    let outcome = ctx.classifier.classify(&video);

    let transitioned = ctx
        .videos
        .complete(video.id, ProcessingStatus::Completed, outcome)
        .await?;

    if !transitioned {
        info!(video_id = %video.id, "Moderation already committed elsewhere, no event");
        return Ok(());
    }

    info!(video_id = %video.id, outcome = %outcome, "Moderation committed");

    ctx.events
        .publish(Event::video_processed(
            video.id,
            outcome,
            ProcessingStatus::Completed,
        ))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;
    use pulse_models::UserId;

    struct StubStore {
        video: Option<VideoRecord>,
        transition_result: bool,
        completions: AtomicU32,
    }

    impl StubStore {
        fn new(video: Option<VideoRecord>, transition_result: bool) -> Self {
            Self {
                video,
                transition_result,
                completions: AtomicU32::new(0),
            }
        }
    }

    impl VideoStore for StubStore {
        fn fetch(&self, _id: VideoId) -> BoxFuture<'_, DbResult<Option<VideoRecord>>> {
            let video = self.video.clone();
            Box::pin(async move { Ok(video) })
        }

        fn complete(
            &self,
            _id: VideoId,
            _processing: ProcessingStatus,
            _sensitivity: SensitivityStatus,
        ) -> BoxFuture<'_, DbResult<bool>> {
            self.completions.fetch_add(1, Ordering::SeqCst);
            let result = self.transition_result;
            Box::pin(async move { Ok(result) })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl EventSink for RecordingSink {
        fn publish(&self, event: Event) -> BoxFuture<'_, QueueResult<()>> {
            self.events.lock().unwrap().push(event);
            Box::pin(async { Ok(()) })
        }
    }

    fn context_with(
        video: Option<VideoRecord>,
        transition_result: bool,
    ) -> (ModerationContext, Arc<StubStore>, Arc<RecordingSink>) {
        let store = Arc::new(StubStore::new(video, transition_result));
        let sink = Arc::new(RecordingSink::default());
        let ctx = ModerationContext {
            videos: store.clone(),
            events: sink.clone(),
            classifier: Arc::new(RandomClassifier::new(1.0)),
        };
        (ctx, store, sink)
    }

    fn overdue_job(video_id: VideoId) -> ModerationJob {
        ModerationJob::new(video_id, chrono::Duration::seconds(-1))
    }

    fn sample_video() -> VideoRecord {
        VideoRecord::new(
            "Demo",
            None,
            "videos/abc/clip.mp4",
            "https://cdn.example.com/videos/abc/clip.mp4",
            "clip.mp4",
            "video/mp4",
            1024,
            UserId::new(),
        )
    }

    #[test]
    fn classifier_extremes_are_deterministic() {
        let video = sample_video();

        let always_safe = RandomClassifier::new(1.0);
        let never_safe = RandomClassifier::new(0.0);

        for _ in 0..100 {
            assert_eq!(always_safe.classify(&video), SensitivityStatus::Safe);
            assert_eq!(never_safe.classify(&video), SensitivityStatus::Flagged);
        }
    }

    #[test]
    fn classifier_draws_are_roughly_biased() {
        let video = sample_video();
        let classifier = RandomClassifier::default();

        let safe = (0..1000)
            .filter(|_| classifier.classify(&video) == SensitivityStatus::Safe)
            .count();

        // 0.8 bias with generous tolerance to keep the test stable.
        assert!(safe > 700, "expected ~800 safe draws, got {}", safe);
        assert!(safe < 900, "expected ~800 safe draws, got {}", safe);
    }

    #[tokio::test]
    async fn committed_transition_publishes_one_event() {
        let video = sample_video();
        let job = overdue_job(video.id);
        let (ctx, store, sink) = context_with(Some(video.clone()), true);

        process_moderation(&ctx, &job).await.unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1, "exactly one event for one transition");
        assert_eq!(events[0].video_id(), video.id);
        assert_eq!(store.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lost_transition_race_publishes_nothing() {
        let video = sample_video();
        let job = overdue_job(video.id);
        let (ctx, store, sink) = context_with(Some(video), false);

        process_moderation(&ctx, &job).await.unwrap();

        assert!(sink.events.lock().unwrap().is_empty());
        assert_eq!(store.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_video_drops_job_without_effects() {
        let job = overdue_job(VideoId::new());
        let (ctx, store, sink) = context_with(None, true);

        process_moderation(&ctx, &job).await.unwrap();

        assert!(sink.events.lock().unwrap().is_empty());
        assert_eq!(store.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn terminal_video_drops_job_without_effects() {
        let mut video = sample_video();
        video.processing_status = ProcessingStatus::Completed;
        video.sensitivity_status = SensitivityStatus::Safe;
        let job = overdue_job(video.id);
        let (ctx, store, sink) = context_with(Some(video), true);

        process_moderation(&ctx, &job).await.unwrap();

        assert!(sink.events.lock().unwrap().is_empty());
        assert_eq!(store.completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let video = sample_video();
        assert_eq!(
            RandomClassifier::new(7.5).classify(&video),
            SensitivityStatus::Safe
        );
        assert_eq!(
            RandomClassifier::new(-1.0).classify(&video),
            SensitivityStatus::Flagged
        );
    }
}
