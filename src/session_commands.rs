//! Command handlers for managing saved sessions.

use anyhow::{anyhow, Result};

use crate::{
    catalog::format_temperature,
    cli::CreateArgs,
    models::{default_steep_times, NewSession, TeaSession},
    AppState,
};

impl CreateArgs {
    /// Form input with the configured mindfulness defaults filled in.
    pub fn into_new_session(self, state: &AppState) -> NewSession {
        let defaults = state.settings.get().mindfulness;
        let steep_times = if self.steep_times.is_empty() {
            default_steep_times(self.steeps)
        } else {
            self.steep_times
        };
        NewSession {
            name: self.name,
            tea_type: self.tea_type,
            total_steeps: self.steeps,
            current_steep: 1,
            steep_times,
            water_temperature: self.temperature,
            mindfulness_enabled: defaults.enabled && !self.no_mindfulness,
            mindfulness_theme: self.theme.unwrap_or(defaults.theme),
            notes: self.notes,
        }
    }
}

pub async fn create_session(state: &AppState, args: CreateArgs) -> Result<()> {
    let new = args.into_new_session(state);
    let session = state.store.create(new).await?;
    println!("Created session {} ({})", session.id, session.name);
    println!("  {}", describe(&session));
    Ok(())
}

pub async fn list_sessions(state: &AppState) -> Result<()> {
    let sessions = state.store.list().await;
    if sessions.is_empty() {
        println!("No tea sessions yet. Create one with `teabrew session create <name>`.");
        return Ok(());
    }
    let active = state.store.active_id().await;
    for session in sessions.iter() {
        let marker = if active.as_deref() == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {}  {}", session.id, session.name);
        println!("    {}", describe(session));
    }
    Ok(())
}

pub async fn delete_session(state: &AppState, id: &str) -> Result<()> {
    if state.store.delete(id).await {
        println!("Deleted session {id}");
        Ok(())
    } else {
        Err(anyhow!("session {id} not found"))
    }
}

pub async fn pause_session(state: &AppState, id: &str) -> Result<()> {
    let session = state
        .store
        .pause(id)
        .await
        .ok_or_else(|| anyhow!("session {id} not found"))?;
    println!("{}: {}", session.name, session.remaining_label());
    Ok(())
}

pub async fn resume_session(state: &AppState, id: &str) -> Result<()> {
    let session = state
        .store
        .resume(id)
        .await
        .ok_or_else(|| anyhow!("session {id} not found"))?;
    println!("{}: {} ({})", session.name, session.status.as_str(), session.remaining_label());
    Ok(())
}

/// One-line summary: tea, temperature, steep position and status.
pub fn describe(session: &TeaSession) -> String {
    format!(
        "{} at {}, steep {}/{} ({:.0}%), {}",
        session.tea_type,
        format_temperature(session.water_temperature),
        session.current_steep,
        session.total_steeps,
        session.progress_fraction() * 100.0,
        session.remaining_label(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{SessionProgress, SessionStatus};

    #[test]
    fn describe_reads_naturally() {
        let now = Utc::now();
        let session = TeaSession {
            id: "session-x".into(),
            name: "Quiet".into(),
            tea_type: "Oolong".into(),
            total_steeps: 4,
            current_steep: 1,
            steep_times: default_steep_times(4),
            water_temperature: 95,
            mindfulness_enabled: true,
            mindfulness_theme: "Focus on Aroma".into(),
            status: SessionStatus::Preparing,
            started_at: now,
            last_active_at: now,
            notes: None,
            progress: SessionProgress::default(),
        };
        assert_eq!(
            describe(&session),
            "Oolong at 95°C (203°F), steep 1/4 (25%), 3 steeps remaining"
        );
    }
}
