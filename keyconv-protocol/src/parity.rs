//! Odd parity lookup
//!
//! AT/PS2 frames carry one parity bit chosen so that the eight data bits
//! plus the parity bit contain an odd number of ones.

/// Parity bit for every byte value: `popcount(b) + PARITY_TABLE[b]` is odd
pub const PARITY_TABLE: [u8; 256] = build_parity_table();

const fn build_parity_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let ones = (i as u8).count_ones();
        table[i] = if ones % 2 == 0 { 1 } else { 0 };
        i += 1;
    }
    table
}

/// Odd parity bit for a data byte
#[inline]
pub fn odd_parity_bit(byte: u8) -> bool {
    PARITY_TABLE[byte as usize] != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parity_table_is_odd_for_all_bytes() {
        for b in 0..=255u8 {
            let total = b.count_ones() + PARITY_TABLE[b as usize] as u32;
            assert_eq!(total % 2, 1, "byte {:#04x}", b);
        }
    }

    #[test]
    fn test_known_parity_bits() {
        assert!(odd_parity_bit(0x00));
        assert!(!odd_parity_bit(0x01));
        assert!(odd_parity_bit(0xFF));
        // 0xFA has six ones
        assert!(odd_parity_bit(0xFA));
        // 0xF2 has five ones
        assert!(!odd_parity_bit(0xF2));
    }

    proptest! {
        #[test]
        fn prop_table_entries_are_single_bits(b in any::<u8>()) {
            prop_assert!(PARITY_TABLE[b as usize] <= 1);
        }
    }
}
