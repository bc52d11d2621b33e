//! Persisted gong-fu session records.
//!
//! Field names serialize in camelCase with RFC 3339 timestamps, the same
//! layout the browser app kept under its `tea-sessions` storage key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub const DEFAULT_MINDFULNESS_THEME: &str = "Focus on Aroma";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Preparing,
    Heating,
    Steeping,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Preparing => "preparing",
            SessionStatus::Heating => "heating",
            SessionStatus::Steeping => "steeping",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    #[serde(default)]
    pub completed_steeps: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeaSession {
    pub id: String,
    pub name: String,
    pub tea_type: String,
    pub total_steeps: u32,
    pub current_steep: u32,
    /// Seconds per steep, indexed by `steep - 1`.
    pub steep_times: Vec<u32>,
    pub water_temperature: u32,
    pub mindfulness_enabled: bool,
    pub mindfulness_theme: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub progress: SessionProgress,
}

impl TeaSession {
    /// `"Completed"`, `"Paused"`, or `"N steeps remaining"`.
    pub fn remaining_label(&self) -> String {
        match self.status {
            SessionStatus::Completed => "Completed".to_string(),
            SessionStatus::Paused => "Paused".to_string(),
            _ => format!(
                "{} steeps remaining",
                self.total_steeps.saturating_sub(self.current_steep)
            ),
        }
    }

    /// `current_steep / total_steeps`, for the session progress bar.
    pub fn progress_fraction(&self) -> f64 {
        if self.total_steeps == 0 {
            return 0.0;
        }
        f64::from(self.current_steep) / f64::from(self.total_steeps)
    }

    /// Rejects a patch that would leave the session inconsistent.
    pub fn check_patch(&self, patch: &SessionPatch) -> Result<(), SessionError> {
        if let Some(current) = patch.current_steep {
            if current == 0 || current > self.total_steeps {
                return Err(SessionError::CurrentSteepOutOfRange {
                    current,
                    total: self.total_steeps,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&mut self, patch: SessionPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(tea_type) = patch.tea_type {
            self.tea_type = tea_type;
        }
        if let Some(current_steep) = patch.current_steep {
            self.current_steep = current_steep;
        }
        if let Some(water_temperature) = patch.water_temperature {
            self.water_temperature = water_temperature;
        }
        if let Some(enabled) = patch.mindfulness_enabled {
            self.mindfulness_enabled = enabled;
        }
        if let Some(theme) = patch.mindfulness_theme {
            self.mindfulness_theme = theme;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
    }
}

/// Input for [`SessionStore::create`](crate::store::SessionStore::create).
/// Identity, timestamps, status and progress are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub name: String,
    pub tea_type: String,
    pub total_steeps: u32,
    pub current_steep: u32,
    pub steep_times: Vec<u32>,
    pub water_temperature: u32,
    pub mindfulness_enabled: bool,
    pub mindfulness_theme: String,
    pub notes: Option<String>,
}

impl Default for NewSession {
    fn default() -> Self {
        Self {
            name: String::new(),
            tea_type: "Oolong".into(),
            total_steeps: 5,
            current_steep: 1,
            steep_times: default_steep_times(5),
            water_temperature: 95,
            mindfulness_enabled: true,
            mindfulness_theme: DEFAULT_MINDFULNESS_THEME.into(),
            notes: None,
        }
    }
}

impl NewSession {
    /// Sets the steep count and regenerates the default steep table.
    pub fn with_steeps(mut self, total_steeps: u32) -> Self {
        self.total_steeps = total_steeps;
        self.steep_times = default_steep_times(total_steeps);
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.total_steeps == 0 {
            return Err(SessionError::NoSteeps);
        }
        if self.steep_times.len() < self.total_steeps as usize {
            return Err(SessionError::MissingSteepTimes {
                required: self.total_steeps,
                provided: self.steep_times.len(),
            });
        }
        if let Some(index) = self.steep_times.iter().position(|secs| *secs == 0) {
            return Err(SessionError::ZeroDuration {
                steep: index as u32 + 1,
            });
        }
        if self.current_steep == 0 || self.current_steep > self.total_steeps {
            return Err(SessionError::CurrentSteepOutOfRange {
                current: self.current_steep,
                total: self.total_steeps,
            });
        }
        Ok(())
    }
}

/// Partial update merged by [`SessionStore::update`](crate::store::SessionStore::update).
/// `None` leaves a field untouched; `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub tea_type: Option<String>,
    pub current_steep: Option<u32>,
    pub water_temperature: Option<u32>,
    pub mindfulness_enabled: Option<bool>,
    pub mindfulness_theme: Option<String>,
    pub status: Option<SessionStatus>,
    pub notes: Option<Option<String>>,
    pub progress: Option<SessionProgress>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// `10 + 5·i` seconds for each of `total_steeps` steeps.
pub fn default_steep_times(total_steeps: u32) -> Vec<u32> {
    (0..total_steeps).map(|i| 10 + i * 5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TeaSession {
        let now = Utc::now();
        TeaSession {
            id: "s-1".into(),
            name: "Morning".into(),
            tea_type: "Oolong".into(),
            total_steeps: 5,
            current_steep: 2,
            steep_times: default_steep_times(5),
            water_temperature: 95,
            mindfulness_enabled: true,
            mindfulness_theme: DEFAULT_MINDFULNESS_THEME.into(),
            status: SessionStatus::Steeping,
            started_at: now,
            last_active_at: now,
            notes: None,
            progress: SessionProgress::default(),
        }
    }

    #[test]
    fn default_steep_table_grows_by_five() {
        assert_eq!(default_steep_times(5), vec![10, 15, 20, 25, 30]);
        assert!(default_steep_times(0).is_empty());
    }

    #[test]
    fn remaining_label_reflects_status() {
        let mut session = sample();
        assert_eq!(session.remaining_label(), "3 steeps remaining");
        session.status = SessionStatus::Paused;
        assert_eq!(session.remaining_label(), "Paused");
        session.status = SessionStatus::Completed;
        assert_eq!(session.remaining_label(), "Completed");
        assert_eq!(session.progress_fraction(), 0.4);
    }

    #[test]
    fn validation_rejects_short_or_zero_tables() {
        assert_eq!(
            NewSession::default().with_steeps(0).validate(),
            Err(SessionError::NoSteeps)
        );

        let mut short = NewSession::default();
        short.steep_times = vec![10, 15];
        assert_eq!(
            short.validate(),
            Err(SessionError::MissingSteepTimes {
                required: 5,
                provided: 2
            })
        );

        let mut zero = NewSession::default();
        zero.steep_times[3] = 0;
        assert_eq!(zero.validate(), Err(SessionError::ZeroDuration { steep: 4 }));

        let mut late = NewSession::default();
        late.current_steep = 6;
        assert!(late.validate().is_err());

        assert_eq!(NewSession::default().validate(), Ok(()));
    }

    #[test]
    fn serializes_in_camel_case_with_lowercase_status() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["teaType"], "Oolong");
        assert_eq!(json["status"], "steeping");
        assert_eq!(json["progress"]["completedSteeps"], serde_json::json!([]));
        assert!(json.get("notes").is_none());
        assert!(json["startedAt"].is_string());
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut session = sample();
        session.notes = Some("floral".into());
        session.apply(SessionPatch {
            current_steep: Some(3),
            notes: Some(None),
            ..SessionPatch::default()
        });
        assert_eq!(session.current_steep, 3);
        assert_eq!(session.notes, None);
        assert_eq!(session.name, "Morning");
        assert_eq!(session.status, SessionStatus::Steeping);
    }
}
