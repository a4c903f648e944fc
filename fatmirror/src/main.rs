// SPDX-License-Identifier: MIT

#[macro_use]
mod utils;

mod cli;
mod ingest;
mod source;
mod target;

use std::process::ExitCode;

use clap::Parser;
use mirrorfs::fat32::constant::FAT32_MIN_CLUSTERS;
use mirrorfs::prelude::*;
use time::OffsetDateTime;

use crate::cli::{Cli, CommitMode, MirrorOptions};
use crate::ingest::ingest_paths;
use crate::target::{OverlayPlan, Target};
use crate::utils::{pretty_bytes, sep_u64, set_log_level};

fn main() -> ExitCode {
    let cli = Cli::parse();
    set_log_level(cli.log_level());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_fatal!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = cli.options();

    let target = Target::open(&cli.device)?;
    log_info!(
        "{}: {} sectors of {} bytes ({})",
        cli.device.display(),
        sep_u64(target.info.total_sectors as u64),
        target.info.sector_size,
        pretty_bytes(target.info.bytes())
    );

    let plan = target.plan(options.replace_existing)?;
    describe_plan(&plan);

    let source = source::probe_mount(&cli.mount, plan.layout.cluster_size)?;
    source::check_partition(&cli.partition, &source, &target.info, &plan.scan.linux)?;
    log_debug!(
        "source device {:#x}, block size {}",
        source.dev_id,
        source.block_size
    );

    let region_bytes = plan.layout.region_bytes().map_err(FsError::from)?;
    let now = now_utc();
    match options.commit {
        CommitMode::Buffered | CommitMode::DryRun => {
            build(&target, &plan, source, &options, vec![0u8; region_bytes], now)
        }
        CommitMode::Direct => {
            let mapping = SharedMapping::map(&target.file, region_bytes)?;
            log_notice!("writing metadata in place, the device changes as files are added");
            build(&target, &plan, source, &options, mapping, now)
        }
    }
}

fn describe_plan(plan: &OverlayPlan) {
    let l = &plan.layout;
    log_info!(
        "Linux partition {} at sector {}, {} sectors",
        plan.scan.linux.index + 1,
        plan.scan.linux.start,
        sep_u64(plan.scan.linux.sectors as u64)
    );
    if plan.scan.fat32_slot == Some(plan.slot) {
        log_notice!("replacing the FAT32 overlay in slot {}", plan.slot + 1);
    }
    log_info!(
        "FAT32: {} clusters of {}, FAT {} sectors, root directory {} clusters, {} reserved sectors",
        sep_u64(l.cluster_count as u64),
        pretty_bytes(l.cluster_size as u64),
        l.fat_sectors,
        l.root_dir_clusters,
        l.rsvd_sectors
    );
    let data_clusters = l.root_dir_clusters + l.cluster_count;
    if data_clusters < FAT32_MIN_CLUSTERS {
        log_warn!(
            "only {} data clusters, some systems will not read this volume as FAT32",
            data_clusters
        );
    }
}

fn build<B: RegionBacking>(
    target: &Target,
    plan: &OverlayPlan,
    source: SourceIdentity,
    options: &MirrorOptions,
    backing: B,
    now: OffsetDateTime,
) -> anyhow::Result<()> {
    let mut volume = VolumeContext::new(
        plan.layout,
        plan.mbr,
        plan.slot,
        source,
        backing,
        options.mapping,
        now,
    )?;

    let totals = ingest_paths(std::io::stdin().lock(), &mut volume)?;
    log_debug!(
        "{} paths read, {} files ingested",
        totals.files + totals.skipped_dirs,
        totals.files
    );
    let report = volume.finish(volume_serial(now))?;

    log_info!(
        "{} files, {} clusters claimed ({}), {} marked bad",
        report.files,
        sep_u64(report.claimed_clusters),
        pretty_bytes(report.claimed_clusters * plan.layout.cluster_size as u64),
        sep_u64(report.bad_clusters as u64)
    );
    log_info!(
        "{} of {} root directory slots used, {} mapping",
        report.dir_slots_used,
        volume.region().dir_slot_count(),
        mode_name(report.mode)
    );
    if totals.skipped_dirs > 0 {
        log_notice!("{} directories skipped", totals.skipped_dirs);
    }

    if options.commit == CommitMode::DryRun {
        log_notice!("dry run, nothing written");
        return Ok(());
    }

    volume.commit(&mut target.io())?;
    log_info!("FAT32 overlay written to slot {}", plan.slot + 1);
    Ok(())
}

fn mode_name(mode: MappingMode) -> &'static str {
    match mode {
        MappingMode::NotYetTried => "no",
        MappingMode::ExtentMapping => "extent",
        MappingMode::BlockMapping => "per-block",
    }
}
