#![deny(missing_docs)]
//! Logging front end for reposcout.
//!
//! Library crates log session admissions, page fetches and service failures
//! through the `scout_*` macros and never pick a backend themselves; the
//! `reposcout` binary installs `simplelog` at startup, and test suites call
//! [`initialize_for_tests`]. Callers need no direct `log` dependency.

#[doc(hidden)]
pub use log;

/// Per-request detail, such as the URL of every search call.
#[macro_export]
macro_rules! scout_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!($($arg)*);
    }};
}

/// Session lifecycle: starts, completed fetches, cursor moves.
#[macro_export]
macro_rules! scout_info {
    ($($arg:tt)*) => {{
        $crate::log::info!($($arg)*);
    }};
}

/// Admission decisions and decoded page sizes.
#[macro_export]
macro_rules! scout_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!($($arg)*);
    }};
}

/// Recoverable trouble: rejected operations, abandoned fetches, lagging subscribers.
#[macro_export]
macro_rules! scout_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!($($arg)*);
    }};
}

/// Failures the session cannot recover from on its own.
#[macro_export]
macro_rules! scout_error {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
    }};
}

/// Routes log output of a test binary to the terminal.
///
/// Each test may call this; only the first call in a process installs the
/// logger. Debug builds log at debug level, release builds at info.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test in the same binary may have installed it already.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
