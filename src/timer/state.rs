use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{BrewParameters, BrewingStyle},
    error::BrewError,
    models::{SessionStatus, TeaSession},
};

use super::countdown::{Countdown, Tick};

/// Water heating always takes one minute.
pub const HEATING_SECS: u32 = 60;

/// Each gong-fu infusion steeps this much longer than the previous one.
pub const GONGFU_STEEP_INCREMENT_SECS: u32 = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum BrewStage {
    #[default]
    Preparation,
    Heating,
    Steeping,
    Ready,
    Completed,
}

impl BrewStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrewStage::Preparation => "preparation",
            BrewStage::Heating => "heating",
            BrewStage::Steeping => "steeping",
            BrewStage::Ready => "ready",
            BrewStage::Completed => "completed",
        }
    }

    /// Stages driven by the countdown.
    pub fn is_timed(&self) -> bool {
        matches!(self, BrewStage::Heating | BrewStage::Steeping)
    }
}

impl fmt::Display for BrewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BrewMode {
    /// One cup; `Ready` offers "brew another".
    Single,
    /// Gong-fu or session brewing; `Ready` loops back to `Heating`.
    MultiInfusion,
}

/// How long each steep lasts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SteepSchedule {
    Fixed(u32),
    Incremental { first_secs: u32, increment_secs: u32 },
    /// Per-steep table. Steeps past the end reuse the last entry.
    Table(Vec<u32>),
}

impl SteepSchedule {
    /// Duration of the 1-indexed `steep`.
    pub fn duration_for(&self, steep: u32) -> u32 {
        let index = steep.saturating_sub(1);
        match self {
            SteepSchedule::Fixed(secs) => *secs,
            SteepSchedule::Incremental {
                first_secs,
                increment_secs,
            } => first_secs.saturating_add(index.saturating_mul(*increment_secs)),
            SteepSchedule::Table(times) => times
                .get(index as usize)
                .or_else(|| times.last())
                .copied()
                .unwrap_or(0),
        }
    }

    fn validate(&self) -> Result<(), BrewError> {
        match self {
            SteepSchedule::Fixed(0) => Err(BrewError::ZeroDuration { steep: 1 }),
            SteepSchedule::Incremental { first_secs: 0, .. } => {
                Err(BrewError::ZeroDuration { steep: 1 })
            }
            SteepSchedule::Table(times) if times.is_empty() => {
                Err(BrewError::EmptyDurationTable)
            }
            SteepSchedule::Table(times) => match times.iter().position(|secs| *secs == 0) {
                Some(index) => Err(BrewError::ZeroDuration {
                    steep: index as u32 + 1,
                }),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

/// Everything the stage machine needs to run one brew, resolved up front.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BrewPlan {
    pub temperature_c: u32,
    pub heating_secs: u32,
    pub schedule: SteepSchedule,
    pub total_steeps: u32,
    pub mode: BrewMode,
}

impl BrewPlan {
    pub fn new(
        temperature_c: u32,
        schedule: SteepSchedule,
        total_steeps: u32,
        mode: BrewMode,
    ) -> Result<Self, BrewError> {
        Self::with_heating(temperature_c, HEATING_SECS, schedule, total_steeps, mode)
    }

    pub fn with_heating(
        temperature_c: u32,
        heating_secs: u32,
        schedule: SteepSchedule,
        total_steeps: u32,
        mode: BrewMode,
    ) -> Result<Self, BrewError> {
        if total_steeps == 0 {
            return Err(BrewError::NoSteeps);
        }
        if heating_secs == 0 {
            return Err(BrewError::ZeroHeating);
        }
        schedule.validate()?;

        Ok(Self {
            temperature_c,
            heating_secs,
            schedule,
            total_steeps,
            mode,
        })
    }

    pub fn western(params: &BrewParameters) -> Result<Self, BrewError> {
        Self::new(
            params.temperature_c,
            SteepSchedule::Fixed(params.steep_time_secs),
            1,
            BrewMode::Single,
        )
    }

    pub fn gongfu(params: &BrewParameters) -> Result<Self, BrewError> {
        Self::new(
            params.temperature_c,
            SteepSchedule::Incremental {
                first_secs: params.steep_time_secs,
                increment_secs: GONGFU_STEEP_INCREMENT_SECS,
            },
            params.max_infusions,
            BrewMode::MultiInfusion,
        )
    }

    pub fn from_parameters(params: &BrewParameters) -> Result<Self, BrewError> {
        match params.style {
            BrewingStyle::Western => Self::western(params),
            BrewingStyle::Gongfu => Self::gongfu(params),
        }
    }

    pub fn for_session(session: &TeaSession) -> Result<Self, BrewError> {
        Self::new(
            session.water_temperature,
            SteepSchedule::Table(session.steep_times.clone()),
            session.total_steeps,
            BrewMode::MultiInfusion,
        )
    }

    pub fn steep_duration(&self, steep: u32) -> u32 {
        self.schedule.duration_for(steep)
    }
}

/// One stage change, as reported to subscribers and the session store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: BrewStage,
    pub to: BrewStage,
    pub steep: u32,
    /// Countdown length for the new stage; zero for untimed stages.
    pub duration_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineTick {
    Ignored,
    Counted { remaining_secs: u32 },
    Transitioned(Transition),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrewSnapshot {
    pub stage: BrewStage,
    pub current_steep: u32,
    pub total_steeps: u32,
    pub total_secs: u32,
    pub remaining_secs: u32,
    pub progress: f64,
    pub paused: bool,
    pub temperature_c: u32,
    pub completed_steeps: Vec<u32>,
}

/// Stage controller for a single brew or a multi-infusion session.
///
/// Owns its countdown. Time only moves through [`BrewMachine::tick`]; the
/// async driver in [`super::controller`] calls it once per second.
#[derive(Debug, Clone)]
pub struct BrewMachine {
    plan: BrewPlan,
    stage: BrewStage,
    current_steep: u32,
    countdown: Countdown,
    completed_steeps: Vec<u32>,
    /// Bumped whenever a ticker run must start or stop. A ticker holding an
    /// older value is stale and its ticks are dropped.
    run_epoch: u64,
}

impl BrewMachine {
    pub fn new(plan: BrewPlan) -> Self {
        Self {
            plan,
            stage: BrewStage::Preparation,
            current_steep: 1,
            countdown: Countdown::new(),
            completed_steeps: Vec::new(),
            run_epoch: 0,
        }
    }

    /// Rebuilds a machine for a persisted session, picking up at its
    /// current steep. A steep already poured comes back in `Ready`;
    /// completed sessions come back in `Completed`.
    pub fn for_session(session: &TeaSession) -> Result<Self, BrewError> {
        let plan = BrewPlan::for_session(session)?;
        let current_steep = session.current_steep.clamp(1, plan.total_steeps);
        let stage = if session.status == SessionStatus::Completed {
            BrewStage::Completed
        } else if session.progress.completed_steeps.contains(&current_steep) {
            BrewStage::Ready
        } else {
            BrewStage::Preparation
        };

        Ok(Self {
            plan,
            stage,
            current_steep,
            countdown: Countdown::new(),
            completed_steeps: session.progress.completed_steeps.clone(),
            run_epoch: 0,
        })
    }

    pub fn plan(&self) -> &BrewPlan {
        &self.plan
    }

    pub fn stage(&self) -> BrewStage {
        self.stage
    }

    pub fn current_steep(&self) -> u32 {
        self.current_steep
    }

    pub fn total_steeps(&self) -> u32 {
        self.plan.total_steeps
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn completed_steeps(&self) -> &[u32] {
        &self.completed_steeps
    }

    pub fn epoch(&self) -> u64 {
        self.run_epoch
    }

    pub fn is_counting(&self) -> bool {
        self.stage.is_timed() && self.countdown.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.stage.is_timed() && self.countdown.is_paused()
    }

    pub fn has_more_steeps(&self) -> bool {
        self.current_steep < self.plan.total_steeps
    }

    /// Steep time for the current steep.
    pub fn current_steep_secs(&self) -> u32 {
        self.plan.steep_duration(self.current_steep)
    }

    pub fn snapshot(&self) -> BrewSnapshot {
        BrewSnapshot {
            stage: self.stage,
            current_steep: self.current_steep,
            total_steeps: self.plan.total_steeps,
            total_secs: self.countdown.total_secs(),
            remaining_secs: self.countdown.remaining_secs(),
            progress: self.countdown.progress(),
            paused: self.is_paused(),
            temperature_c: self.plan.temperature_c,
            completed_steeps: self.completed_steeps.clone(),
        }
    }

    /// Preparation → Heating.
    pub fn begin(&mut self) -> Result<Transition, BrewError> {
        self.require_stage("begin brewing", BrewStage::Preparation)?;
        Ok(self.enter_heating())
    }

    /// Ready → Heating for the next infusion.
    pub fn next_steep(&mut self) -> Result<Transition, BrewError> {
        self.require_stage("start the next steep", BrewStage::Ready)?;
        if self.plan.mode != BrewMode::MultiInfusion {
            return Err(BrewError::InvalidTransition {
                action: "start the next steep",
                stage: self.stage,
            });
        }
        if !self.has_more_steeps() {
            return Err(BrewError::NoMoreSteeps {
                current: self.current_steep,
                total: self.plan.total_steeps,
            });
        }

        self.current_steep += 1;
        Ok(self.enter_heating())
    }

    /// Ready → Completed, only after the last steep.
    pub fn complete(&mut self) -> Result<Transition, BrewError> {
        self.require_stage("complete the session", BrewStage::Ready)?;
        if self.has_more_steeps() {
            return Err(BrewError::StepsRemaining {
                current: self.current_steep,
                total: self.plan.total_steeps,
            });
        }

        Ok(self.enter_untimed(BrewStage::Completed))
    }

    /// Ready → Preparation for another single cup.
    pub fn brew_another(&mut self) -> Result<Transition, BrewError> {
        self.require_stage("brew another cup", BrewStage::Ready)?;
        if self.plan.mode != BrewMode::Single {
            return Err(BrewError::InvalidTransition {
                action: "brew another cup",
                stage: self.stage,
            });
        }

        self.current_steep = 1;
        Ok(self.enter_untimed(BrewStage::Preparation))
    }

    /// Abandons the running countdown and drops back to `Preparation` for
    /// the current steep. `None` when there was nothing to abandon.
    pub fn cancel(&mut self) -> Option<Transition> {
        match self.stage {
            BrewStage::Preparation | BrewStage::Completed => None,
            BrewStage::Heating | BrewStage::Steeping | BrewStage::Ready => {
                Some(self.enter_untimed(BrewStage::Preparation))
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), BrewError> {
        if !self.stage.is_timed() || !self.countdown.pause() {
            return Err(BrewError::NotCounting);
        }
        self.run_epoch += 1;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), BrewError> {
        if !self.stage.is_timed() || !self.countdown.resume() {
            return Err(BrewError::NotPaused);
        }
        self.run_epoch += 1;
        Ok(())
    }

    /// Feeds one elapsed second. Expiry in `Heating` starts the steep
    /// countdown; expiry in `Steeping` lands in `Ready`.
    pub fn tick(&mut self) -> MachineTick {
        if !self.stage.is_timed() {
            return MachineTick::Ignored;
        }

        match self.countdown.tick() {
            Tick::Ignored => MachineTick::Ignored,
            Tick::Counted { remaining_secs } => MachineTick::Counted { remaining_secs },
            Tick::Expired => MachineTick::Transitioned(self.on_expire()),
        }
    }

    fn on_expire(&mut self) -> Transition {
        match self.stage {
            BrewStage::Heating => {
                let duration_secs = self.current_steep_secs();
                self.countdown.start(duration_secs);
                self.transition_to(BrewStage::Steeping, duration_secs)
            }
            _ => {
                if !self.completed_steeps.contains(&self.current_steep) {
                    self.completed_steeps.push(self.current_steep);
                }
                self.transition_to(BrewStage::Ready, 0)
            }
        }
    }

    fn enter_heating(&mut self) -> Transition {
        self.run_epoch += 1;
        let heating_secs = self.plan.heating_secs;
        self.countdown.start(heating_secs);
        self.transition_to(BrewStage::Heating, heating_secs)
    }

    fn enter_untimed(&mut self, stage: BrewStage) -> Transition {
        self.run_epoch += 1;
        self.countdown.cancel();
        self.transition_to(stage, 0)
    }

    fn transition_to(&mut self, stage: BrewStage, duration_secs: u32) -> Transition {
        let transition = Transition {
            from: self.stage,
            to: stage,
            steep: self.current_steep,
            duration_secs,
        };
        self.stage = stage;
        transition
    }

    fn require_stage(&self, action: &'static str, expected: BrewStage) -> Result<(), BrewError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(BrewError::InvalidTransition {
                action,
                stage: self.stage,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn run_stage(machine: &mut BrewMachine) -> (u32, Transition) {
        let mut ticks = 0;
        loop {
            ticks += 1;
            match machine.tick() {
                MachineTick::Transitioned(transition) => return (ticks, transition),
                MachineTick::Counted { .. } => {}
                MachineTick::Ignored => panic!("machine stopped counting in {}", machine.stage()),
            }
        }
    }

    fn session_plan(times: Vec<u32>) -> BrewPlan {
        let total = times.len() as u32;
        BrewPlan::new(95, SteepSchedule::Table(times), total, BrewMode::MultiInfusion).unwrap()
    }

    #[test]
    fn single_brew_runs_heating_then_steeping_then_ready() {
        let plan = BrewPlan::new(80, SteepSchedule::Fixed(180), 1, BrewMode::Single).unwrap();
        let mut machine = BrewMachine::new(plan);
        assert_eq!(machine.stage(), BrewStage::Preparation);
        assert_eq!(machine.tick(), MachineTick::Ignored);

        let begin = machine.begin().unwrap();
        assert_eq!(begin.to, BrewStage::Heating);
        assert_eq!(begin.duration_secs, HEATING_SECS);

        let (ticks, transition) = run_stage(&mut machine);
        assert_eq!(ticks, 60);
        assert_eq!(transition.to, BrewStage::Steeping);
        assert_eq!(transition.duration_secs, 180);
        assert_eq!(machine.countdown().remaining_secs(), 180);

        let (ticks, transition) = run_stage(&mut machine);
        assert_eq!(ticks, 180);
        assert_eq!(transition.to, BrewStage::Ready);
        assert!(!machine.is_counting());

        let again = machine.brew_another().unwrap();
        assert_eq!(again.to, BrewStage::Preparation);
        assert!(!machine.countdown().is_active());
        assert_eq!(machine.tick(), MachineTick::Ignored);
    }

    #[test]
    fn session_progresses_through_every_steep() {
        let mut machine = BrewMachine::new(session_plan(vec![10, 15, 20]));
        assert_eq!(machine.current_steep(), 1);

        machine.begin().unwrap();
        run_stage(&mut machine);
        let (ticks, _) = run_stage(&mut machine);
        assert_eq!(ticks, 10);
        assert_eq!(machine.stage(), BrewStage::Ready);
        assert_eq!(machine.current_steep(), 1);

        let next = machine.next_steep().unwrap();
        assert_eq!(next.to, BrewStage::Heating);
        assert_eq!(machine.current_steep(), 2);
        run_stage(&mut machine);
        let (ticks, _) = run_stage(&mut machine);
        assert_eq!(ticks, 15);

        machine.next_steep().unwrap();
        assert_eq!(machine.current_steep(), 3);
        run_stage(&mut machine);
        let (ticks, _) = run_stage(&mut machine);
        assert_eq!(ticks, 20);
        assert_eq!(machine.stage(), BrewStage::Ready);

        assert_matches!(
            machine.next_steep(),
            Err(BrewError::NoMoreSteeps { current: 3, total: 3 })
        );
        let done = machine.complete().unwrap();
        assert_eq!(done.to, BrewStage::Completed);
        assert_eq!(machine.completed_steeps(), &[1, 2, 3]);
        assert!(machine.cancel().is_none());
    }

    #[test]
    fn complete_is_refused_while_steeps_remain() {
        let mut machine = BrewMachine::new(session_plan(vec![10, 15]));
        machine.begin().unwrap();
        run_stage(&mut machine);
        run_stage(&mut machine);
        assert_matches!(
            machine.complete(),
            Err(BrewError::StepsRemaining { current: 1, total: 2 })
        );
        assert_eq!(machine.stage(), BrewStage::Ready);
    }

    #[test]
    fn gongfu_steeps_grow_by_seven_seconds() {
        let params = BrewParameters {
            style: BrewingStyle::Gongfu,
            temperature_c: 93,
            steep_time_secs: 10,
            tea_amount: "6-7g per 100ml".into(),
            max_infusions: 8,
            rinse: None,
        };
        let plan = BrewPlan::from_parameters(&params).unwrap();
        assert_eq!(plan.total_steeps, 8);
        assert_eq!(plan.steep_duration(1), 10);
        assert_eq!(plan.steep_duration(2), 17);
        assert_eq!(plan.steep_duration(8), 59);
    }

    #[test]
    fn duration_table_clamps_to_last_entry() {
        let plan = BrewPlan::new(
            90,
            SteepSchedule::Table(vec![10, 20]),
            4,
            BrewMode::MultiInfusion,
        )
        .unwrap();
        assert_eq!(plan.steep_duration(1), 10);
        assert_eq!(plan.steep_duration(2), 20);
        assert_eq!(plan.steep_duration(3), 20);
        assert_eq!(plan.steep_duration(4), 20);
    }

    #[test]
    fn malformed_plans_are_rejected() {
        assert_eq!(
            BrewPlan::new(80, SteepSchedule::Fixed(0), 1, BrewMode::Single),
            Err(BrewError::ZeroDuration { steep: 1 })
        );
        assert_eq!(
            BrewPlan::new(80, SteepSchedule::Table(vec![]), 1, BrewMode::MultiInfusion),
            Err(BrewError::EmptyDurationTable)
        );
        assert_eq!(
            BrewPlan::new(80, SteepSchedule::Table(vec![5, 0]), 2, BrewMode::MultiInfusion),
            Err(BrewError::ZeroDuration { steep: 2 })
        );
        assert_eq!(
            BrewPlan::new(80, SteepSchedule::Fixed(30), 0, BrewMode::Single),
            Err(BrewError::NoSteeps)
        );
    }

    #[test]
    fn transitions_out_of_order_are_refused() {
        let plan = BrewPlan::new(80, SteepSchedule::Fixed(5), 1, BrewMode::Single).unwrap();
        let mut machine = BrewMachine::new(plan);

        assert_matches!(
            machine.next_steep(),
            Err(BrewError::InvalidTransition { stage: BrewStage::Preparation, .. })
        );
        assert_matches!(machine.complete(), Err(BrewError::InvalidTransition { .. }));

        machine.begin().unwrap();
        assert_matches!(
            machine.begin(),
            Err(BrewError::InvalidTransition { stage: BrewStage::Heating, .. })
        );
    }

    #[test]
    fn single_mode_has_no_next_steep() {
        let plan = BrewPlan::new(80, SteepSchedule::Fixed(2), 1, BrewMode::Single).unwrap();
        let mut machine = BrewMachine::new(plan);
        machine.begin().unwrap();
        run_stage(&mut machine);
        run_stage(&mut machine);
        assert_matches!(machine.next_steep(), Err(BrewError::InvalidTransition { .. }));
        assert_eq!(machine.complete().unwrap().to, BrewStage::Completed);
    }

    #[test]
    fn multi_infusion_cannot_brew_another() {
        let mut machine = BrewMachine::new(session_plan(vec![3]));
        machine.begin().unwrap();
        run_stage(&mut machine);
        run_stage(&mut machine);
        assert_matches!(machine.brew_another(), Err(BrewError::InvalidTransition { .. }));
    }

    #[test]
    fn pause_holds_remaining_time_and_bumps_epoch() {
        let mut machine = BrewMachine::new(session_plan(vec![10]));
        machine.begin().unwrap();
        for _ in 0..20 {
            machine.tick();
        }
        let epoch = machine.epoch();
        machine.pause().unwrap();
        assert!(machine.epoch() > epoch);
        assert!(machine.is_paused());

        for _ in 0..30 {
            assert_eq!(machine.tick(), MachineTick::Ignored);
        }
        assert_eq!(machine.countdown().remaining_secs(), 40);
        assert_matches!(machine.pause(), Err(BrewError::NotCounting));

        machine.resume().unwrap();
        assert_eq!(machine.tick(), MachineTick::Counted { remaining_secs: 39 });
        assert_matches!(machine.resume(), Err(BrewError::NotPaused));
    }

    #[test]
    fn cancel_abandons_countdown() {
        let mut machine = BrewMachine::new(session_plan(vec![10, 12]));
        machine.begin().unwrap();
        machine.tick();
        let epoch = machine.epoch();

        let transition = machine.cancel().unwrap();
        assert_eq!(transition.from, BrewStage::Heating);
        assert_eq!(transition.to, BrewStage::Preparation);
        assert_ne!(machine.epoch(), epoch);
        assert!(!machine.countdown().is_active());
        assert_eq!(machine.current_steep(), 1);
        assert!(machine.cancel().is_none());
    }
}
