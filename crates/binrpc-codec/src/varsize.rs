//! Minimal big-endian widths for variable-length wire integers.
//!
//! Record integers, record size fields and the header's length field are
//! signed quantities and are sized by [`minimal_size`]. The header cookie is
//! an unsigned 32-bit token and is sized by [`minimal_unsigned_size`].

/// Smallest byte count from `{1, 2, 3, 4, 8}` holding `n` in two's-complement
/// big-endian form without truncation.
pub fn minimal_size(n: i64) -> usize {
    match n {
        -0x80..=0x7F => 1,
        -0x8000..=0x7FFF => 2,
        -0x80_0000..=0x7F_FFFF => 3,
        -0x8000_0000..=0x7FFF_FFFF => 4,
        _ => 8,
    }
}

/// Smallest byte count in `1..=8` holding `n` as an unsigned big-endian number.
pub fn minimal_unsigned_size(n: u64) -> usize {
    let significant_bits = u64::BITS - n.leading_zeros();
    (significant_bits as usize).div_ceil(8).max(1)
}

/// Big-endian unsigned accumulation of `bytes`.
pub(crate) fn read_unsigned(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Big-endian two's-complement accumulation of `bytes`, sign-extended.
///
/// An empty slice is 0. Callers bound the length to 8 bytes.
pub(crate) fn read_signed(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let raw = read_unsigned(bytes);
    let shift = 64 - 8 * bytes.len() as u32;
    if shift == 0 {
        raw as i64
    } else {
        ((raw << shift) as i64) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_fit_one_byte() {
        assert_eq!(minimal_size(0), 1);
        assert_eq!(minimal_size(42), 1);
        assert_eq!(minimal_size(127), 1);
        assert_eq!(minimal_size(-128), 1);
    }

    #[test]
    fn boundaries_grow_width() {
        assert_eq!(minimal_size(128), 2);
        assert_eq!(minimal_size(-129), 2);
        assert_eq!(minimal_size(32_767), 2);
        assert_eq!(minimal_size(32_768), 3);
        assert_eq!(minimal_size(8_388_605), 3);
        assert_eq!(minimal_size(8_388_608), 4);
        assert_eq!(minimal_size(i64::from(i32::MAX)), 4);
        assert_eq!(minimal_size(i64::from(i32::MIN)), 4);
    }

    #[test]
    fn beyond_32_bits_needs_eight() {
        assert_eq!(minimal_size(i64::from(i32::MAX) + 1), 8);
        assert_eq!(minimal_size(i64::MIN), 8);
    }

    #[test]
    fn unsigned_width() {
        assert_eq!(minimal_unsigned_size(0), 1);
        assert_eq!(minimal_unsigned_size(0xFF), 1);
        assert_eq!(minimal_unsigned_size(0x100), 2);
        assert_eq!(minimal_unsigned_size(0x6F8D_A297), 4);
        assert_eq!(minimal_unsigned_size(u64::from(u32::MAX)), 4);
        assert_eq!(minimal_unsigned_size(u64::MAX), 8);
    }

    #[test]
    fn signed_accumulation_sign_extends() {
        assert_eq!(read_signed(&[]), 0);
        assert_eq!(read_signed(&[0x2A]), 42);
        assert_eq!(read_signed(&[0xFF]), -1);
        assert_eq!(read_signed(&[0x00, 0x8E]), 142);
        assert_eq!(read_signed(&[0x7F, 0xFF, 0xFD]), 8_388_605);
        assert_eq!(read_signed(&[0x80, 0x00, 0x00, 0x00]), i64::from(i32::MIN));
        assert_eq!(read_signed(&[0xFF; 8]), -1);
    }

    #[test]
    fn unsigned_accumulation() {
        assert_eq!(read_unsigned(&[0x6F, 0x8D, 0xA2, 0x97]), 0x6F8D_A297);
        assert_eq!(read_unsigned(&[0x0B]), 11);
    }
}
