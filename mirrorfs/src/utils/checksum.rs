// SPDX-License-Identifier: MIT

/// Checksum of an 11-byte short name, stored in each of its LFN entries.
#[inline]
pub fn short_name_checksum(name: &[u8; 11]) -> u8 {
    name.iter()
        .fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert_eq!(short_name_checksum(&[0u8; 11]), 0);
        // Rotate right, then add each name byte.
        let name = *b"README  TXT";
        let mut sum = 0u8;
        for b in name {
            sum = (if sum & 1 != 0 { 0x80 } else { 0 }) + (sum >> 1);
            sum = sum.wrapping_add(b);
        }
        assert_eq!(short_name_checksum(&name), sum);
    }

    #[test]
    fn stable_and_order_sensitive() {
        let a = *b"_          ";
        let b = *b"FOO     BAR";
        assert_eq!(short_name_checksum(&b), short_name_checksum(&b));
        assert_ne!(short_name_checksum(&a), short_name_checksum(&b));
        assert_ne!(
            short_name_checksum(b"AB         "),
            short_name_checksum(b"BA         ")
        );
    }
}
