// SPDX-License-Identifier: MIT

//! Feeds the paths listed on stdin into the volume.

use std::ffi::OsStr;
use std::fs::File;
use std::io::BufRead;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, bail};
use mirrorfs::prelude::*;
use mirrorfs::utils::time::from_system_time;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestTotals {
    pub files: u32,
    pub skipped_dirs: u32,
}

/// Reads newline separated paths from `input` and ingests each one.
///
/// Trailing CR/LF is stripped and blank lines are ignored. The first failing
/// path aborts the run.
pub fn ingest_paths<R, B>(input: R, volume: &mut VolumeContext<B>) -> anyhow::Result<IngestTotals>
where
    R: BufRead,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let mut totals = IngestTotals::default();
    for line in input.split(b'\n') {
        let line = line.context("read path list")?;
        let path = trim_line(&line);
        if path.is_empty() {
            continue;
        }
        if ingest_path(path, volume)? {
            totals.files += 1;
        } else {
            totals.skipped_dirs += 1;
        }
    }
    Ok(totals)
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Returns false when `raw` names a directory that was skipped.
fn ingest_path<B>(raw: &[u8], volume: &mut VolumeContext<B>) -> anyhow::Result<bool>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let path = Path::new(OsStr::from_bytes(raw));
    let file = File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    let meta = file
        .metadata()
        .with_context(|| format!("stat '{}'", path.display()))?;

    volume
        .check_device(meta.dev())
        .with_context(|| format!("'{}'", path.display()))?;

    if meta.is_dir() {
        log_warn!("skipping directory '{}'", path.display());
        return Ok(false);
    }
    if !meta.is_file() {
        bail!("'{}' is not a regular file", path.display());
    }

    let source = SourceFile {
        path: raw,
        dev_id: meta.dev(),
        size: meta.len(),
        modified: meta.modified().ok().map(from_system_time),
    };
    let mut mapper = FileBlockMapper::new(&file);
    let report = volume
        .ingest(&source, &mut mapper)
        .with_context(|| format!("'{}'", path.display()))?;

    if report.fell_back {
        log_notice!("extent mapping unavailable, mapping blocks one at a time");
    }
    log_debug!(
        "'{}': {} bytes, {} clusters from {}, dir slots {}..{}",
        path.display(),
        meta.len(),
        report.clusters,
        report.first_cluster,
        report.dir_slot,
        report.dir_slot + report.dir_slots
    );
    Ok(true)
}
