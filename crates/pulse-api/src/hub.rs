//! In-process event hub.
//!
//! The hub is an explicit connection registry over a tokio broadcast
//! channel: WebSocket handlers subscribe, the Redis bridge publishes.
//! It is transport-independent, so fan-out is testable without sockets.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use pulse_models::Event;
use pulse_queue::EventChannel;

/// Buffered events per subscriber before lagging clients start losing
/// messages. Delivery is best-effort; clients reconcile by re-fetching.
const HUB_CAPACITY: usize = 256;

/// Broadcast hub for realtime events.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<Event>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all subscribers. Returns the number of
    /// subscribers that received it; zero subscribers is not an error.
    pub fn publish(&self, event: Event) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridge the Redis pub/sub channel into the in-process hub.
///
/// Runs until the subscription stream ends (connection loss), then
/// returns so the caller can decide whether to reconnect.
pub async fn run_bridge(hub: EventHub, channel: Arc<EventChannel>) {
    loop {
        let mut stream = match channel.subscribe().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Event channel subscribe failed, retrying in 5s: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        info!("Event bridge connected");

        while let Some(event) = stream.next().await {
            let delivered = hub.publish(event.clone());
            debug!(
                video_id = %event.video_id(),
                subscribers = delivered,
                "Bridged event to hub"
            );
        }

        warn!("Event bridge stream ended, reconnecting");
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_models::{ProcessingStatus, SensitivityStatus, VideoId};

    fn sample_event() -> Event {
        Event::video_processed(
            VideoId::new(),
            SensitivityStatus::Safe,
            ProcessingStatus::Completed,
        )
    }

    #[tokio::test]
    async fn all_subscribers_receive_each_event() {
        let hub = EventHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        let event = sample_event();
        assert_eq!(hub.publish(event.clone()), 2);

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let hub = EventHub::new();
        assert_eq!(hub.publish(sample_event()), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_leaves_the_registry() {
        let hub = EventHub::new();
        let rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let hub = EventHub::new();
        hub.publish(sample_event());

        let mut late = hub.subscribe();
        let next = sample_event();
        hub.publish(next.clone());

        // Only the event published after subscribing arrives.
        assert_eq!(late.recv().await.unwrap(), next);
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
