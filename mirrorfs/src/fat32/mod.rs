// SPDX-License-Identifier: MIT

pub mod attr;
pub mod chain;
pub mod constant;
pub mod dir;
pub mod extent;
pub mod formatter;
pub mod layout;
pub mod names;
pub mod region;
pub mod types;

// === Public Interface ===
pub mod traits {
    pub use super::chain::{ChainBuilder, FileChain};
    pub use super::extent::{ExtentResolver, MappingMode, MappingPolicy};
    pub use super::formatter::Fat32Formatter;
    pub use super::layout::Fat32Layout;
    pub use super::region::{MetaRegion, RegionBacking};
}
