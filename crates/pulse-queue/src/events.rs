//! Realtime events via Redis Pub/Sub.
//!
//! The worker publishes here and every API instance subscribes, so a
//! `video_processed` event reaches clients regardless of which instance
//! holds their socket.

use redis::AsyncCommands;
use tracing::debug;

use pulse_models::Event;

use crate::error::QueueResult;

/// Pub/Sub channel all instances share.
pub const EVENTS_CHANNEL: &str = "pulse:events";

/// Channel for publishing/subscribing to realtime events.
pub struct EventChannel {
    client: redis::Client,
}

impl EventChannel {
    /// Create a new event channel.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from the REDIS_URL environment variable.
    pub fn from_env() -> QueueResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&redis_url)
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: &Event) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(event)?;

        debug!("Publishing event to {}", EVENTS_CHANNEL);
        conn.publish::<_, _, ()>(EVENTS_CHANNEL, payload).await?;

        Ok(())
    }

    /// Subscribe to the event channel.
    /// Returns a pinned stream that can be polled with `.next()`.
    pub async fn subscribe(
        &self,
    ) -> QueueResult<std::pin::Pin<Box<dyn futures_util::Stream<Item = Event> + Send>>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(EVENTS_CHANNEL).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}
