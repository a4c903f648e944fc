// SPDX-License-Identifier: MIT

#[macro_use]
pub mod log;
pub mod string;

pub use log::{LogLevel, Severity, log_level, set_log_level};
pub use string::{pretty_bytes, sep_u64};
