pub mod commands;
pub mod controller;
pub mod countdown;
pub mod state;

pub use controller::{status_for, BrewController, BrewEvent};
pub use countdown::{Countdown, CountdownStatus, Tick};
pub use state::{
    BrewMachine, BrewMode, BrewPlan, BrewSnapshot, BrewStage, MachineTick, SteepSchedule,
    Transition, GONGFU_STEEP_INCREMENT_SECS, HEATING_SECS,
};
