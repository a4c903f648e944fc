// SPDX-License-Identifier: MIT

pub mod checksum;
pub mod time;
