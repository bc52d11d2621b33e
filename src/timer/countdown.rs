use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CountdownStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
}

/// Result of feeding one tick into a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown was not running; nothing changed.
    Ignored,
    Counted { remaining_secs: u32 },
    /// Remaining time just reached zero. Reported once per run.
    Expired,
}

/// Whole-second countdown. Holds no clock of its own: the owner feeds it one
/// [`Countdown::tick`] per elapsed second.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    total_secs: u32,
    remaining_secs: u32,
    status: CountdownStatus,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to `duration_secs` and starts running. A zero duration expires
    /// immediately without waiting for a tick.
    pub fn start(&mut self, duration_secs: u32) -> Tick {
        self.total_secs = duration_secs;
        self.remaining_secs = duration_secs;
        if duration_secs == 0 {
            self.status = CountdownStatus::Expired;
            Tick::Expired
        } else {
            self.status = CountdownStatus::Running;
            Tick::Counted {
                remaining_secs: duration_secs,
            }
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.status != CountdownStatus::Running {
            return Tick::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = CountdownStatus::Expired;
            Tick::Expired
        } else {
            Tick::Counted {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Suspends a running countdown, keeping the remaining time.
    pub fn pause(&mut self) -> bool {
        if self.status == CountdownStatus::Running {
            self.status = CountdownStatus::Paused;
            true
        } else {
            false
        }
    }

    /// Continues a paused countdown from where it stopped.
    pub fn resume(&mut self) -> bool {
        if self.status == CountdownStatus::Paused {
            self.status = CountdownStatus::Running;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.status == CountdownStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == CountdownStatus::Paused
    }

    pub fn status(&self) -> CountdownStatus {
        self.status
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Fraction elapsed in `[0, 1]`; `0` for a zero-length countdown.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        f64::from(self.total_secs - self.remaining_secs) / f64::from(self.total_secs)
    }
}
