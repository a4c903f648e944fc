// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::Parser;
use mirrorfs::prelude::MappingPolicy;

use crate::utils::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "fatmirror",
    version,
    about = "Prepends a zero-copy FAT32 view to a Linux partition",
    long_about = "Reads the paths of files stored on the mounted Linux partition from stdin \
                  and builds a FAT32 filesystem in the free sectors in front of it. Each FAT32 \
                  file points at the blocks the Linux filesystem already uses; nothing is copied."
)]
pub struct Cli {
    /// Whole-disk device or image holding the MBR
    #[arg(short = 'd', long = "device", value_name = "DEVICE")]
    pub device: PathBuf,

    /// Mount point of the Linux partition the files live on
    #[arg(short = 'm', long = "mount", value_name = "DIR")]
    pub mount: PathBuf,

    /// Block device of the Linux partition
    #[arg(short = 'p', long = "partition", value_name = "PARTITION")]
    pub partition: PathBuf,

    /// Map every block individually instead of asking for extents
    #[arg(short = 'b', long = "block-map")]
    pub block_map: bool,

    /// Print debug messages
    #[arg(short = 'g', long = "debug", conflicts_with = "quiet")]
    pub debug: bool,

    /// Only print warnings and errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Write the metadata straight into a shared mapping of the device
    #[arg(short = 'w', long = "direct", conflicts_with = "dry_run")]
    pub direct: bool,

    /// Replace an existing FAT32 overlay entry
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Validate and build everything, write nothing
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,
}

/// How the finished metadata region reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Staged in private memory, written with positional writes at the end.
    Buffered,
    /// Built inside a shared mapping of the device, synced at the end.
    Direct,
    /// Staged in private memory and dropped.
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorOptions {
    pub mapping: MappingPolicy,
    pub commit: CommitMode,
    pub replace_existing: bool,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else if self.quiet {
            LogLevel::Quiet
        } else {
            LogLevel::Normal
        }
    }

    pub fn options(&self) -> MirrorOptions {
        let commit = if self.dry_run {
            CommitMode::DryRun
        } else if self.direct {
            CommitMode::Direct
        } else {
            CommitMode::Buffered
        };
        MirrorOptions {
            mapping: if self.block_map {
                MappingPolicy::BlockOnly
            } else {
                MappingPolicy::Auto
            },
            commit,
            replace_existing: self.force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
        let mut args = vec!["fatmirror", "-d", "/dev/sdb", "-m", "/mnt", "-p", "/dev/sdb1"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args)
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.device, PathBuf::from("/dev/sdb"));
        assert_eq!(cli.log_level(), LogLevel::Normal);
        assert_eq!(
            cli.options(),
            MirrorOptions {
                mapping: MappingPolicy::Auto,
                commit: CommitMode::Buffered,
                replace_existing: false,
            }
        );
    }

    #[test]
    fn flags_map_to_options() {
        let cli = parse(&["-b", "-w", "-f", "-g"]).unwrap();
        assert_eq!(cli.log_level(), LogLevel::Debug);
        let opts = cli.options();
        assert_eq!(opts.mapping, MappingPolicy::BlockOnly);
        assert_eq!(opts.commit, CommitMode::Direct);
        assert!(opts.replace_existing);

        assert_eq!(parse(&["-q"]).unwrap().log_level(), LogLevel::Quiet);
        assert_eq!(parse(&["-n"]).unwrap().options().commit, CommitMode::DryRun);
    }

    #[test]
    fn rejects_conflicts_and_missing_paths() {
        assert!(parse(&["-g", "-q"]).is_err());
        assert!(parse(&["-w", "-n"]).is_err());
        assert!(Cli::try_parse_from(["fatmirror", "-d", "/dev/sdb", "-m", "/mnt"]).is_err());
    }
}
