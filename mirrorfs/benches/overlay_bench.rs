// SPDX-License-Identifier: MIT

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use mirrorfs::prelude::*;
use mirrorpart::mbr::{BOOT_FLAG_NONE, MbrEntry, PART_TYPE_LINUX};

criterion_group!(benches, overlay_bench);
criterion_main!(benches);

const START: u32 = 16384;
const SECTORS: u32 = 4_000_000;
const BLOCK: u64 = 4096;
const FILES: u64 = 256;
const BLOCKS_PER_FILE: u64 = 16;

/// Every file is split into four equal extents spread over the partition.
struct Striped {
    base: u64,
}

impl BlockMapper for Striped {
    fn map_extents(&mut self, _start: u64, _len: u64, _max: usize) -> BlockIOResult<Vec<RawExtent>> {
        let part = BLOCKS_PER_FILE / 4;
        Ok((0..4)
            .map(|i| RawExtent {
                logical: i * part * BLOCK,
                physical: (self.base + i * FILES * part) * BLOCK,
                length: part * BLOCK,
                flags: if i == 3 {
                    ExtentFlags::LAST
                } else {
                    ExtentFlags::empty()
                },
            })
            .collect())
    }

    fn map_block(&mut self, _block: u32) -> BlockIOResult<u32> {
        Err(BlockIOError::Unsupported)
    }
}

fn volume(layout: Fat32Layout) -> VolumeContext<Vec<u8>> {
    let mut entries = [MbrEntry::new_empty(); 4];
    entries[0] = MbrEntry::new(BOOT_FLAG_NONE, PART_TYPE_LINUX, START, SECTORS);
    VolumeContext::new(
        layout,
        Mbr::new_from_entries(entries),
        1,
        SourceIdentity {
            dev_id: 1,
            block_size: BLOCK as u32,
        },
        vec![0u8; layout.region_bytes().expect("region")],
        MappingPolicy::Auto,
        now_utc(),
    )
    .expect("volume")
}

pub fn overlay_bench(c: &mut Criterion) {
    let layout = Fat32Layout::compute(512, START, SECTORS).expect("layout");
    let paths: Vec<String> = (0..FILES)
        .map(|i| format!("/mnt/data/Capture {i:04}.raw"))
        .collect();

    c.bench_function("overlay_layout", |b| {
        b.iter(|| Fat32Layout::compute(512, black_box(START), black_box(SECTORS)));
    });

    c.bench_function("overlay_format", |b| {
        b.iter(|| volume(black_box(layout)));
    });

    c.bench_function("overlay_ingest_striped", |b| {
        b.iter(|| {
            let mut vol = volume(layout);
            for (i, path) in paths.iter().enumerate() {
                let file = SourceFile {
                    path: path.as_bytes(),
                    dev_id: 1,
                    size: BLOCKS_PER_FILE * BLOCK,
                    modified: None,
                };
                let base = 1000 + i as u64 * (BLOCKS_PER_FILE / 4);
                vol.ingest(&file, &mut Striped { base }).expect("ingest");
            }
            vol.finish(0x1234_5678).expect("finish")
        });
    });
}
