//! Application state.

use std::sync::Arc;

use sqlx::postgres::PgPool;

use pulse_db::{UserRepository, VideoRepository};
use pulse_queue::{EventChannel, ModerationQueue};
use pulse_storage::ObjectStore;

use crate::auth::JwtKeys;
use crate::config::ApiConfig;
use crate::hub::EventHub;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pool: PgPool,
    pub users: UserRepository,
    pub videos: VideoRepository,
    pub storage: Arc<ObjectStore>,
    pub queue: Arc<ModerationQueue>,
    pub events: Arc<EventChannel>,
    pub hub: EventHub,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Create new application state, connecting every dependency.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        crate::error::set_production_mode(config.is_production());

        let jwt = JwtKeys::from_env()?;

        let pool = pulse_db::connect_from_env().await?;
        pulse_db::migrate(&pool).await?;

        let storage = ObjectStore::from_env()?;
        let queue = ModerationQueue::from_env()?;
        queue.init().await?;

        let events = EventChannel::from_env()?;

        Ok(Self {
            config,
            users: UserRepository::new(pool.clone()),
            videos: VideoRepository::new(pool.clone()),
            pool,
            storage: Arc::new(storage),
            queue: Arc::new(queue),
            events: Arc::new(events),
            hub: EventHub::new(),
            jwt: Arc::new(jwt),
        })
    }
}
