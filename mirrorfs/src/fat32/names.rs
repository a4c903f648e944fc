// SPDX-License-Identifier: MIT

//! Short (8.3) and long file names derived from a source path.
//!
//! Names are byte strings: bytes above 0x7F pass through untouched and each
//! long-name byte becomes one UTF-16 code unit.

use heapless::Vec as BoundedVec;

use crate::{
    errors::*,
    fat32::{attr::Fat32Attributes, constant::*, types::*},
    utils::checksum::short_name_checksum,
};

pub type LongName = BoundedVec<u8, FAT_LFN_MAX_CHARS>;

/// Final path component.
pub fn basename(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| b == b'/') {
        Some(slash) => &path[slash + 1..],
        None => path,
    }
}

#[inline]
fn is_bad_short_char(ch: u8) -> bool {
    ch <= b' '
        || matches!(
            ch,
            b'"' | b'*' | b'+' | b',' | b'.' | b'/' | b':' | b';' | b'<' | b'=' | b'>' | b'?'
                | b'[' | b'\\' | b']' | b'|'
        )
}

#[inline]
fn is_bad_long_char(ch: u8) -> bool {
    ch < b' ' || matches!(ch, b'"' | b'*' | b'/' | b':' | b'<' | b'>' | b'?' | b'\\' | b'|')
}

fn fill_short_part(name: &mut [u8; FAT_SHORT_NAME_LEN], range: (usize, usize), src: &[u8]) {
    let (mut idx, end) = range;
    for &ch in src {
        if idx >= end || ch == b'.' {
            break;
        }
        if is_bad_short_char(ch) {
            continue;
        }
        name[idx] = match ch {
            FAT_ENTRY_DELETED => FAT_ENTRY_DELETED_ESCAPE,
            _ => ch.to_ascii_uppercase(),
        };
        idx += 1;
    }
}

/// Space padded 8.3 name; `_` stands in when nothing of the stem survives.
///
/// Collisions between different paths are not resolved here.
pub fn short_name(path: &[u8]) -> [u8; FAT_SHORT_NAME_LEN] {
    let mut name = [FAT_SHORT_NAME_PAD; FAT_SHORT_NAME_LEN];
    name[0] = FAT_SHORT_NAME_PLACEHOLDER;

    let base = basename(path);
    fill_short_part(&mut name, (0, FAT_SHORT_STEM_LEN), base);
    if let Some(dot) = base.iter().rposition(|&b| b == b'.') {
        fill_short_part(&mut name, (FAT_SHORT_STEM_LEN, FAT_SHORT_NAME_LEN), &base[dot + 1..]);
    }
    name
}

/// Basename with the characters a long name cannot carry removed.
pub fn long_name(path: &[u8]) -> FsDirResult<LongName> {
    let legal = || basename(path).iter().copied().filter(|&c| !is_bad_long_char(c));
    let len = legal().count();
    if len > FAT_LFN_MAX_CHARS {
        return Err(FsDirError::NameTooLong { len });
    }
    let mut out = LongName::new();
    for ch in legal() {
        out.push(ch).map_err(|_| FsDirError::NameTooLong { len })?;
    }
    Ok(out)
}

/// LFN entries in directory order: highest ordinal first, flagged as last.
pub fn lfn_entries(long: &[u8], checksum: u8) -> Vec<Fat32LfnEntry> {
    let groups: Vec<&[u8]> = long.chunks(FAT_LFN_CHARS_PER_ENTRY).collect();
    let count = groups.len();

    groups
        .iter()
        .enumerate()
        .rev()
        .map(|(i, group)| {
            let mut chars = [FAT_LFN_PADDING; FAT_LFN_CHARS_PER_ENTRY];
            for (slot, &ch) in chars.iter_mut().zip(group.iter()) {
                *slot = ch as u16;
            }
            if group.len() < FAT_LFN_CHARS_PER_ENTRY {
                chars[group.len()] = FAT_LFN_TERMINATOR;
            }
            Fat32LfnEntry::new((i + 1) as u8, i + 1 == count, &chars, checksum)
        })
        .collect()
}

impl Fat32Entries {
    /// Entries for a mirrored file: optional LFN chain plus a read-only short entry.
    pub fn file(
        path: &[u8],
        first_cluster: u32,
        size: u32,
        stamp: (u16, u16, u8),
    ) -> FsDirResult<Self> {
        let short = short_name(path);
        let long = long_name(path)?;
        let lfn = if long.is_empty() {
            Vec::new()
        } else {
            lfn_entries(&long, short_name_checksum(&short))
        };

        Ok(Self {
            lfn,
            entry: Fat32Entry::new(short, Fat32Attributes::MIRRORED_FILE, first_cluster, size, stamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basenames() {
        assert_eq!(basename(b"/mnt/data/file.txt"), b"file.txt");
        assert_eq!(basename(b"file"), b"file");
        assert_eq!(basename(b"/mnt/dir/"), b"");
    }

    #[test]
    fn short_names() {
        assert_eq!(&short_name(b"/mnt/readme.txt"), b"README  TXT");
        assert_eq!(&short_name(b"/mnt/a_very_long_name.jpeg"), b"A_VERY_LJPE");
        assert_eq!(&short_name(b"/mnt/archive.tar.gz"), b"ARCHIVE GZ ");
        assert_eq!(&short_name(b"/mnt/noext"), b"NOEXT      ");
        assert_eq!(&short_name(b"/mnt/.bashrc"), b"_       BAS");
        assert_eq!(&short_name(b"/mnt/my file+1.txt"), b"MYFILE1 TXT");
    }

    #[test]
    fn extension_only_from_basename() {
        assert_eq!(&short_name(b"/mnt/v1.2/makefile"), b"MAKEFILE   ");
    }

    #[test]
    fn deleted_marker_escaped_everywhere() {
        let name = short_name(&[b'/', 0xE5, b'a', 0xE5]);
        assert_eq!(&name[..3], &[0x05, b'A', 0x05]);
        let name = short_name(&[b'/', b'x', b'.', b'r', 0xE5]);
        assert_eq!(&name, b"X       R\x05 ");
        // High bytes are not case mapped.
        assert_eq!(short_name(&[0xE9])[0], 0xE9);
    }

    #[test]
    fn long_name_filtering() {
        assert_eq!(&long_name(b"/mnt/What? Now.txt").unwrap()[..], b"What Now.txt");
        assert!(long_name(b"/mnt/<>|").unwrap().is_empty());

        let long = [b'x'; 256];
        assert_eq!(long_name(&long), Err(FsDirError::NameTooLong { len: 256 }));
        assert_eq!(long_name(&long[..255]).unwrap().len(), 255);
    }

    #[test]
    fn lfn_padding_and_order() {
        let name = b"Hello World Long.txt"; // 20 chars -> 2 entries
        let entries = lfn_entries(name, 0x5A);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].order, 0x42);
        assert_eq!(entries[1].order, 0x01);

        let tail = entries[0].chars();
        assert_eq!(&tail[..7], &b"ong.txt".map(|c| c as u16));
        assert_eq!(tail[7], FAT_LFN_TERMINATOR);
        assert!(tail[8..].iter().all(|&c| c == FAT_LFN_PADDING));
        assert!(entries.iter().all(|e| e.checksum == 0x5A));
    }

    #[test]
    fn lfn_exact_multiple_has_no_terminator() {
        let entries = lfn_entries(b"abcdefghijklm", 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].order, 0x41);
        assert_eq!(entries[0].chars()[12], b'm' as u16);
    }

    #[test]
    fn file_entries_share_checksum() {
        let e = Fat32Entries::file(b"/mnt/photo.jpeg", 1234, 99, (0x21, 0, 0)).unwrap();
        assert_eq!(&e.entry.name, b"PHOTO   JPE");
        assert_eq!(e.entry.attr, 0x01);
        assert_eq!(e.entry.first_cluster(), 1234);
        let sum = short_name_checksum(&e.entry.name);
        assert_eq!(e.lfn.len(), 1);
        assert_eq!(e.lfn[0].checksum, sum);

        let empty = Fat32Entries::file(b"/mnt/:::", 0, 0, (0x21, 0, 0)).unwrap();
        assert!(empty.lfn.is_empty());
        assert_eq!(&empty.entry.name, b"_          ");
    }
}
