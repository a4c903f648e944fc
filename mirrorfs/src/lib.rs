// SPDX-License-Identifier: MIT

//! FAT32 overlay over an existing Linux partition.
//!
//! The FAT32 metadata (boot sector, FAT, root directory) is laid out in the
//! slack in front of the partition and its data clusters alias the blocks of
//! files already stored on the mounted filesystem. No file data is copied.

// Core modules
#[macro_use]
mod macros;
pub mod errors;

pub mod fat32;
pub mod utils;
pub mod volume;

pub mod prelude {
    pub use crate::errors::*;
    pub use crate::fat32::traits::*;
    pub use crate::utils::time::{fat_datetime, now_utc, volume_serial};
    pub use crate::volume::{
        FinishReport, IngestReport, SourceFile, SourceIdentity, VolumeContext,
    };
    pub use mirrorio::prelude::*;
    pub use mirrorpart::{Mbr, MbrScan, PartitionExtent, read_mbr};
}
