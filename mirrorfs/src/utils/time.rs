// SPDX-License-Identifier: MIT

//! FAT timestamps and volume serials from `time` values.

use std::time::SystemTime;

use time::OffsetDateTime;

/// First year a FAT date can encode.
pub const FAT_EPOCH_YEAR: i32 = 1980;
/// Last year a FAT date can encode.
pub const FAT_LAST_YEAR: i32 = 2107;

#[inline]
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

#[inline]
pub fn from_system_time(t: SystemTime) -> OffsetDateTime {
    OffsetDateTime::from(t)
}

/// Encodes `ts` as (date, time, tenths) directory entry fields.
///
/// Years outside 1980..=2107 clamp to the nearest representable instant.
pub fn fat_datetime(ts: OffsetDateTime) -> (u16, u16, u8) {
    let year = ts.year();
    if year < FAT_EPOCH_YEAR {
        return ((1 << 5) | 1, 0, 0);
    }
    if year > FAT_LAST_YEAR {
        return (
            (((FAT_LAST_YEAR - FAT_EPOCH_YEAR) as u16) << 9) | (12 << 5) | 31,
            (23 << 11) | (59 << 5) | 29,
            199,
        );
    }

    let date = (((year - FAT_EPOCH_YEAR) as u16) << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
    let time = ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
    // 10 ms units covering the odd second dropped above
    let fine = (ts.second() % 2) as u16 * 100 + ts.millisecond() / 10;
    (date, time, fine as u8)
}

/// Volume serial number: the UNIX time, truncated to 32 bits.
#[inline]
pub fn volume_serial(ts: OffsetDateTime) -> u32 {
    ts.unix_timestamp() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    fn at(year: i32, month: Month, day: u8, hms_milli: (u8, u8, u8, u16)) -> OffsetDateTime {
        let (h, m, s, ms) = hms_milli;
        Date::from_calendar_date(year, month, day)
            .unwrap()
            .with_hms_milli(h, m, s, ms)
            .unwrap()
            .assume_utc()
    }

    #[test]
    fn encodes_fields() {
        let (date, time, fine) = fat_datetime(at(2024, Month::March, 17, (13, 45, 31, 250)));
        assert_eq!(date >> 9, 44);
        assert_eq!((date >> 5) & 0x0F, 3);
        assert_eq!(date & 0x1F, 17);
        assert_eq!(time >> 11, 13);
        assert_eq!((time >> 5) & 0x3F, 45);
        assert_eq!(time & 0x1F, 15);
        assert_eq!(fine, 125);
    }

    #[test]
    fn clamps_out_of_range_years() {
        assert_eq!(fat_datetime(OffsetDateTime::UNIX_EPOCH), (0x21, 0, 0));
        let (date, _, _) = fat_datetime(at(2200, Month::January, 1, (0, 0, 0, 0)));
        assert_eq!(date >> 9, 127);
    }

    #[test]
    fn serial_is_unix_time() {
        assert_eq!(volume_serial(at(2001, Month::September, 9, (1, 46, 40, 0))), 1_000_000_000);
    }
}
