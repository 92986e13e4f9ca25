// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics for the PageFS crates.
//!
//! Logs are structured `emit` events written to stderr by `emit_term`.
//! They never replace a worker's own output.
//!
//! Usage:
//! - Set PAGEFS_LOG=off (default) - no logs
//! - Set PAGEFS_LOG=info - structural changes
//! - Set PAGEFS_LOG=debug - frame allocation and lock traffic

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable read by [`init_diagnostics`].
pub const LOG_ENV: &str = "PAGEFS_LOG";

static INIT: Once = Once::new();

/// Minimum level of events to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn filter(self) -> Option<emit::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(emit::Level::Error),
            LogLevel::Warn => Some(emit::Level::Warn),
            LogLevel::Info => Some(emit::Level::Info),
            LogLevel::Debug => Some(emit::Level::Debug),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Initialize diagnostics based on the PAGEFS_LOG environment variable.
///
/// Unknown values fall back to `info`. Only the first call has any effect.
pub fn init_diagnostics() {
    let value = std::env::var(LOG_ENV).unwrap_or_default();
    match value.parse::<LogLevel>() {
        Ok(level) => init_with_level(level),
        Err(_) => {
            init_with_level(LogLevel::Info);
            emit::warn!("Unknown PAGEFS_LOG value {value}, using info", value: value);
        }
    }
}

/// Initialize diagnostics at an explicit level. Only the first call of
/// this or [`init_diagnostics`] has any effect.
pub fn init_with_level(level: LogLevel) {
    INIT.call_once(|| {
        let Some(min) = level.filter() else {
            return;
        };
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(min))
            .init();
        // The runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

/// Log structural changes (directories created, files moved or deleted,
/// snapshots saved).
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics such as frame counts and lock waits.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable conditions, e.g. a commit rejected for lack of frames.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log invariant violations.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Re-export the init function for convenience
pub use init_diagnostics as init;
