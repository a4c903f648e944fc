// SPDX-License-Identifier: MIT

use core::fmt;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicU8, Ordering};

use colored::{ColoredString, Colorize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Quiet = 0,
    Normal = 1,
    Debug = 2,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        1 => LogLevel::Normal,
        _ => LogLevel::Debug,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Fatal => "Fatal",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Notice => "Notice",
            Severity::Info => "Info",
            Severity::Debug => "Debug",
        }
    }

    /// Lowest level at which this severity is printed.
    pub fn min_level(self) -> LogLevel {
        match self {
            Severity::Info => LogLevel::Normal,
            Severity::Debug => LogLevel::Debug,
            _ => LogLevel::Quiet,
        }
    }

    fn paint(self) -> ColoredString {
        let label = self.label();
        match self {
            Severity::Fatal => label.red().bold(),
            Severity::Error => label.red(),
            Severity::Warning => label.yellow(),
            Severity::Notice => label.cyan(),
            Severity::Info => label.green(),
            Severity::Debug => label.dimmed(),
        }
    }
}

#[inline]
pub fn enabled(severity: Severity) -> bool {
    log_level() >= severity.min_level()
}

pub fn emit(severity: Severity, args: fmt::Arguments<'_>) {
    if !enabled(severity) {
        return;
    }
    let stderr = std::io::stderr();
    if stderr.is_terminal() {
        eprintln!("{}: {}", severity.paint(), args);
    } else {
        eprintln!("{}: {}", severity.label(), args);
    }
}

#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::Severity::Fatal, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::Severity::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::Severity::Warning, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_notice {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::Severity::Notice, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::Severity::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::utils::log::emit($crate::utils::Severity::Debug, format_args!($($arg)*))
    };
}
