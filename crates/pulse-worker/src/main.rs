//! Moderation worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulse_db::VideoRepository;
use pulse_queue::{EventChannel, ModerationQueue};
use pulse_worker::{JobExecutor, ModerationContext, RandomClassifier, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("pulse=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting pulse-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Connect dependencies
    let pool = match pulse_db::connect_from_env().await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match ModerationQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create moderation queue: {}", e);
            std::process::exit(1);
        }
    };

    let events = match EventChannel::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create event channel: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = ModerationContext {
        videos: Arc::new(VideoRepository::new(pool)),
        events: Arc::new(events),
        classifier: Arc::new(RandomClassifier::new(config.safe_probability)),
    };

    // Create executor
    let executor = Arc::new(JobExecutor::new(config, queue));

    // Setup signal handler
    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    // Run executor
    if let Err(e) = executor.run(ctx).await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
