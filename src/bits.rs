//! Low-level span read and write utilities for byte slices.
//!
//! A span is the run of bytes covering a field. It is read as one unsigned
//! integer in the field's byte order, so bit 0 is the least significant bit
//! of that integer regardless of endianness.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::field::Endianness;

/// Longest span a field can have: 7 bits of offset plus 64 bits of width.
pub const MAX_SPAN_BYTES: usize = 9;

/// Number of bytes covering `bit_offset + width` bits.
pub fn span_len(bit_offset: u8, width: usize) -> usize {
    (bit_offset as usize + width).div_ceil(8)
}

/// Mask with the low `width` bits set. `width` must be at most 64.
pub fn low_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Smallest width able to hold `value`. Zero needs one bit.
pub fn bits_needed(value: u64) -> usize {
    (64 - value.leading_zeros() as usize).max(1)
}

/// Reads `span` (1..=16 bytes) as an unsigned integer.
pub fn read_span(span: &[u8], endianness: Endianness) -> u128 {
    match endianness {
        Endianness::Big => BigEndian::read_uint128(span, span.len()),
        Endianness::Little => LittleEndian::read_uint128(span, span.len()),
    }
}

/// Writes `value` over `span` (1..=16 bytes). `value` must fit in the span.
pub fn write_span(span: &mut [u8], endianness: Endianness, value: u128) {
    let len = span.len();
    match endianness {
        Endianness::Big => BigEndian::write_uint128(span, value, len),
        Endianness::Little => LittleEndian::write_uint128(span, value, len),
    }
}

/// Extracts `width` bits starting at `bit_offset` of the span.
pub fn extract(span: &[u8], endianness: Endianness, bit_offset: u8, width: usize) -> u64 {
    let value = read_span(span, endianness) >> bit_offset;
    (value as u64) & low_mask(width)
}

/// Replaces `width` bits starting at `bit_offset` of the span with `raw`,
/// keeping every other bit of the span.
pub fn insert(span: &mut [u8], endianness: Endianness, bit_offset: u8, width: usize, raw: u64) {
    let mask = (low_mask(width) as u128) << bit_offset;
    let current = read_span(span, endianness);
    let updated = (current & !mask) | (((raw & low_mask(width)) as u128) << bit_offset);
    write_span(span, endianness, updated);
}
