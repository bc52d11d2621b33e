pub mod session;

pub use session::{
    default_steep_times, NewSession, SessionPatch, SessionProgress, SessionStatus, TeaSession,
    DEFAULT_MINDFULNESS_THEME,
};
