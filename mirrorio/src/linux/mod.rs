// SPDX-License-Identifier: MIT

//! Linux-only plumbing: device probing, FIEMAP/FIBMAP and shared mappings.

pub mod device;
mod fiemap;
pub mod ioctl;
mod mapping;

pub use device::{DeviceInfo, DeviceKind, check_sector_size, fs_block_size, sectors_in};
pub use fiemap::FileBlockMapper;
pub use mapping::SharedMapping;
