//! In-memory session list with write-through persistence.
//!
//! Every mutation builds a new list, saves it, then swaps it in, so readers
//! holding an earlier [`SessionStore::list`] snapshot never observe a
//! half-applied change.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::SessionError,
    models::{NewSession, SessionPatch, SessionProgress, SessionStatus, TeaSession},
    storage::SessionStorage,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

struct StoreState {
    sessions: Arc<Vec<TeaSession>>,
    active_id: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<StoreState>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Loads the persisted list. A missing or unreadable store yields an
    /// empty list rather than an error.
    pub async fn open(storage: Arc<dyn SessionStorage>) -> Self {
        let sessions = match storage.load().await {
            Ok(sessions) => {
                log_info!("Loaded {} tea sessions", sessions.len());
                sessions
            }
            Err(err) => {
                log_warn!("Session storage unreadable, starting empty: {err:#}");
                Vec::new()
            }
        };

        Self {
            state: Arc::new(Mutex::new(StoreState {
                sessions: Arc::new(sessions),
                active_id: None,
            })),
            storage,
        }
    }

    pub async fn list(&self) -> Arc<Vec<TeaSession>> {
        self.state.lock().await.sessions.clone()
    }

    pub async fn get(&self, id: &str) -> Option<TeaSession> {
        let state = self.state.lock().await;
        state.sessions.iter().find(|session| session.id == id).cloned()
    }

    pub async fn active_id(&self) -> Option<String> {
        self.state.lock().await.active_id.clone()
    }

    pub async fn active(&self) -> Option<TeaSession> {
        let state = self.state.lock().await;
        let id = state.active_id.as_deref()?;
        state.sessions.iter().find(|session| session.id == id).cloned()
    }

    /// Validates, stores and activates a new session.
    pub async fn create(&self, new: NewSession) -> Result<TeaSession, SessionError> {
        new.validate()?;

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let session = TeaSession {
            id: unique_id(&state.sessions),
            name: new.name,
            tea_type: new.tea_type,
            total_steeps: new.total_steeps,
            current_steep: new.current_steep,
            steep_times: new.steep_times,
            water_temperature: new.water_temperature,
            mindfulness_enabled: new.mindfulness_enabled,
            mindfulness_theme: new.mindfulness_theme,
            status: SessionStatus::Preparing,
            started_at: now,
            last_active_at: now,
            notes: new.notes,
            progress: SessionProgress::default(),
        };

        let mut next = state.sessions.as_ref().clone();
        next.push(session.clone());
        self.commit(&mut state, next).await;
        state.active_id = Some(session.id.clone());

        log_info!("Created session {} ({} steeps)", session.id, session.total_steeps);
        Ok(session)
    }

    /// Merges `patch` into the session and refreshes `last_active_at`.
    /// `Ok(None)` when no session has that id. An invalid patch is rejected
    /// before anything changes.
    pub async fn update(
        &self,
        id: &str,
        patch: SessionPatch,
    ) -> Result<Option<TeaSession>, SessionError> {
        let mut state = self.state.lock().await;
        let Some(current) = state.sessions.iter().find(|session| session.id == id) else {
            return Ok(None);
        };
        current.check_patch(&patch)?;

        Ok(self
            .modify(&mut state, id, |session| session.apply(patch))
            .await)
    }

    /// Removes the session, clearing the active pointer if it pointed there.
    /// Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.sessions.iter().any(|session| session.id == id) {
            return false;
        }

        let next: Vec<TeaSession> = state
            .sessions
            .iter()
            .filter(|session| session.id != id)
            .cloned()
            .collect();
        self.commit(&mut state, next).await;
        if state.active_id.as_deref() == Some(id) {
            state.active_id = None;
        }

        log_info!("Deleted session {id}");
        true
    }

    /// Points the store at `id`, or clears the pointer with `None`.
    /// Activating refreshes the session's `last_active_at`. An unknown id
    /// leaves the pointer unchanged and returns `None`.
    pub async fn set_active(&self, id: Option<&str>) -> Option<TeaSession> {
        let mut state = self.state.lock().await;
        let Some(id) = id else {
            state.active_id = None;
            return None;
        };

        let touched = self.modify(&mut state, id, |_| {}).await?;
        state.active_id = Some(touched.id.clone());
        Some(touched)
    }

    /// `* → paused`.
    pub async fn pause(&self, id: &str) -> Option<TeaSession> {
        let mut state = self.state.lock().await;
        self.modify(&mut state, id, |session| {
            session.status = SessionStatus::Paused;
        })
        .await
    }

    /// `paused → preparing`. Sessions that are not paused are returned
    /// unchanged.
    pub async fn resume(&self, id: &str) -> Option<TeaSession> {
        let mut state = self.state.lock().await;
        let current = state.sessions.iter().find(|session| session.id == id)?;
        if current.status != SessionStatus::Paused {
            return Some(current.clone());
        }
        self.modify(&mut state, id, |session| {
            session.status = SessionStatus::Preparing;
        })
        .await
    }

    async fn modify<F>(&self, state: &mut StoreState, id: &str, change: F) -> Option<TeaSession>
    where
        F: FnOnce(&mut TeaSession),
    {
        let index = state.sessions.iter().position(|session| session.id == id)?;

        let mut next = state.sessions.as_ref().clone();
        let session = &mut next[index];
        change(session);
        session.last_active_at = Utc::now();
        let updated = session.clone();

        self.commit(state, next).await;
        Some(updated)
    }

    /// Persists `next` and swaps it in. A failed save is logged and the
    /// in-memory list still moves forward.
    async fn commit(&self, state: &mut StoreState, next: Vec<TeaSession>) {
        if let Err(err) = self.storage.save(&next).await {
            log_error!("Failed to persist {} tea sessions: {err:#}", next.len());
        }
        state.sessions = Arc::new(next);
    }
}

fn unique_id(existing: &[TeaSession]) -> String {
    loop {
        let candidate = format!("session-{}", Uuid::new_v4().simple());
        if existing.iter().all(|session| session.id != candidate) {
            return candidate;
        }
    }
}
