//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Noisy modules (the countdown ticker, the session store) declare the flag
//! once and route their messages through these macros so the chatter can be
//! silenced per module without touching `RUST_LOG`:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("steep {} ready", steep);
//! ```

/// Logs at an explicit [`log::Level`] when the calling module's
/// `ENABLE_LOGS` constant is `true`.
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::log!($level, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::log_at!(log::Level::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log_at!(log::Level::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log_at!(log::Level::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log_at!(log::Level::Error, $($arg)*)
    };
}

/// Initialises `env_logger` at `Info`, letting `RUST_LOG` override.
/// A second call keeps the installed logger and notes it at debug level.
pub fn init() {
    let result = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
    if let Err(err) = result {
        log::debug!("logger already installed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        // `Builder::init` would panic on the second call.
        init();
        init();
    }
}
