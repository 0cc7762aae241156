//! Postgres integration tests.
//!
//! These run against a live database (DATABASE_URL) and are ignored by
//! default.

use pulse_db::{UserRepository, VideoRepository};
use pulse_models::{
    ProcessingStatus, Role, SensitivityStatus, UserRecord, VideoId, VideoRecord,
};

async fn setup() -> (UserRepository, VideoRepository) {
    dotenvy::dotenv().ok();
    let pool = pulse_db::connect_from_env()
        .await
        .expect("Failed to connect");
    pulse_db::migrate(&pool).await.expect("Failed to migrate");
    (UserRepository::new(pool.clone()), VideoRepository::new(pool))
}

fn unique_user() -> UserRecord {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    UserRecord::new(
        format!("user-{}", tag),
        format!("{}@example.com", tag),
        "$argon2id$test",
        Role::Editor,
    )
}

fn video_for(user: &UserRecord) -> VideoRecord {
    VideoRecord::new(
        "Demo",
        None,
        "videos/test/clip.mp4",
        "https://cdn.example.com/videos/test/clip.mp4",
        "clip.mp4",
        "video/mp4",
        2 * 1024 * 1024,
        user.id,
    )
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn duplicate_email_is_a_conflict() {
    let (users, _) = setup().await;

    let first = unique_user();
    users.create(&first).await.expect("Failed to create");

    let mut duplicate = unique_user();
    duplicate.email = first.email.clone();

    let err = users.create(&duplicate).await.unwrap_err();
    assert!(err.is_conflict());

    // The original row is untouched.
    let fetched = users.find_by_email(&first.email).await.unwrap().unwrap();
    assert_eq!(fetched.id, first.id);
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn terminal_transition_commits_exactly_once() {
    let (users, videos) = setup().await;

    let user = unique_user();
    users.create(&user).await.expect("Failed to create user");

    let video = video_for(&user);
    videos.create(&video).await.expect("Failed to create video");

    let first = videos
        .complete_moderation(video.id, ProcessingStatus::Completed, SensitivityStatus::Safe)
        .await
        .unwrap();
    assert!(first, "first transition must commit");

    // A redelivered job must not commit a second transition.
    let second = videos
        .complete_moderation(
            video.id,
            ProcessingStatus::Completed,
            SensitivityStatus::Flagged,
        )
        .await
        .unwrap();
    assert!(!second, "second transition must no-op");

    let stored = videos.get(video.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert_eq!(stored.sensitivity_status, SensitivityStatus::Safe);
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn transition_on_deleted_video_no_ops() {
    let (users, videos) = setup().await;

    let user = unique_user();
    users.create(&user).await.expect("Failed to create user");

    let video = video_for(&user);
    videos.create(&video).await.expect("Failed to create video");
    assert!(videos.delete(video.id).await.unwrap());

    let transitioned = videos
        .complete_moderation(video.id, ProcessingStatus::Completed, SensitivityStatus::Safe)
        .await
        .unwrap();
    assert!(!transitioned);
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn list_is_newest_first_with_owner_username() {
    let (users, videos) = setup().await;

    let user = unique_user();
    users.create(&user).await.expect("Failed to create user");

    let first = video_for(&user);
    videos.create(&first).await.unwrap();
    let second = video_for(&user);
    videos.create(&second).await.unwrap();

    let listed = videos.list().await.unwrap();
    let positions: Vec<usize> = [second.id, first.id]
        .iter()
        .map(|id| listed.iter().position(|v| v.video.id == *id).unwrap())
        .collect();

    assert!(positions[0] < positions[1], "newest video must come first");
    let item = &listed[positions[0]];
    assert_eq!(item.uploader_username, user.username);

    let missing = videos.get(VideoId::new()).await.unwrap();
    assert!(missing.is_none());
}
