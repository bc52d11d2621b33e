use std::{fs, sync::Arc};

use chrono::{TimeZone, Utc};

use teabrew_lib::{
    db::Database,
    models::{NewSession, SessionPatch, SessionProgress, SessionStatus},
    settings::StorageBackend,
    storage::{JsonFileStorage, SessionStorage, SqliteStorage, SESSIONS_KEY},
    store::SessionStore,
    AppState,
};

fn morning() -> NewSession {
    NewSession {
        name: "Morning".into(),
        tea_type: "Dark Oolong".into(),
        notes: Some("roasty".into()),
        ..NewSession::default().with_steeps(4)
    }
}

async fn exercise(storage: Arc<dyn SessionStorage>, reopen: Arc<dyn SessionStorage>) {
    let store = SessionStore::open(storage).await;
    let kept = store.create(morning()).await.unwrap();
    let dropped = store.create(morning()).await.unwrap();
    assert_ne!(kept.id, dropped.id);

    let step_started = Utc.with_ymd_and_hms(2024, 5, 4, 8, 15, 30).unwrap()
        + chrono::Duration::milliseconds(250);
    store
        .update(
            &kept.id,
            SessionPatch {
                current_steep: Some(2),
                status: Some(SessionStatus::Steeping),
                notes: Some(None),
                progress: Some(SessionProgress {
                    completed_steeps: vec![1],
                    current_step_start_time: Some(step_started),
                }),
                ..SessionPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    let expected = store.pause(&kept.id).await.unwrap();
    assert!(store.delete(&dropped.id).await);

    let reopened = SessionStore::open(reopen).await;
    let sessions = reopened.list().await;
    assert_eq!(sessions.len(), 1);

    let session = &sessions[0];
    assert_eq!(session, &expected);
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.notes, None);
    assert_eq!(session.started_at, kept.started_at);
    assert_eq!(session.last_active_at, expected.last_active_at);
    assert_eq!(
        session.progress.current_step_start_time,
        Some(step_started)
    );
    // The active pointer is not persisted.
    assert_eq!(reopened.active_id().await, None);
}

#[tokio::test]
async fn json_file_sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    exercise(
        Arc::new(JsonFileStorage::new(dir.path(), SESSIONS_KEY)),
        Arc::new(JsonFileStorage::new(dir.path(), SESSIONS_KEY)),
    )
    .await;
    assert!(dir.path().join("tea-sessions.json").exists());
}

#[tokio::test]
async fn sqlite_sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("teabrew.sqlite3")).unwrap();
    exercise(
        Arc::new(SqliteStorage::new(db.clone(), SESSIONS_KEY)),
        Arc::new(SqliteStorage::new(db, SESSIONS_KEY)),
    )
    .await;
}

#[tokio::test]
async fn corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tea-sessions.json"), "[{\"id\":").unwrap();

    let store = SessionStore::open(Arc::new(JsonFileStorage::new(dir.path(), SESSIONS_KEY))).await;
    assert!(store.list().await.is_empty());

    // The next save replaces the corrupt payload.
    store.create(morning()).await.unwrap();
    let reopened = SessionStore::open(Arc::new(JsonFileStorage::new(dir.path(), SESSIONS_KEY))).await;
    assert_eq!(reopened.list().await.len(), 1);
}

#[tokio::test]
async fn app_state_follows_configured_backend() {
    let dir = tempfile::tempdir().unwrap();

    let state = AppState::open(dir.path().to_path_buf()).await.unwrap();
    assert_eq!(state.catalog.teas().len(), 8);
    state
        .settings
        .update(|settings| settings.storage_backend = StorageBackend::Sqlite)
        .unwrap();
    drop(state);

    let state = AppState::open(dir.path().to_path_buf()).await.unwrap();
    let created = state.store.create(morning()).await.unwrap();
    drop(state);

    assert!(dir.path().join("teabrew.sqlite3").exists());
    assert!(!dir.path().join("tea-sessions.json").exists());

    let state = AppState::open(dir.path().to_path_buf()).await.unwrap();
    assert_eq!(state.store.get(&created.id).await.unwrap().name, "Morning");
}
