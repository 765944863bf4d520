//! Decodes SQLite variable-length integers.
//!
//! From https://www.sqlite.org/fileformat2.html#varint :
//! > A variable-length integer or "varint" is a static Huffman encoding of 64-bit twos-complement integers
//! > that uses less space for small positive values. A varint is between 1 and 9 bytes in length. The varint
//! > consists of either zero or more bytes which have the high-order bit set followed by a single byte with the
//! > high-order bit clear, or nine bytes, whichever is shorter. The lower seven bits of each of the first eight
//! > bytes and all 8 bits of the ninth byte are used to reconstruct the 64-bit twos-complement integer.
//!
//! The same scheme works for any maximum length `n` from 1 to 9: the first `n-1` bytes carry 7 bits each and the
//! `n`th byte, if reached, carries all 8.  The result is a `7n+1` bit twos-complement number.

/// Length of a full width varint, as used for payload sizes, rowids, and record headers.
pub const MAX_VARINT_LEN: usize = 9;

const HIGH_BIT: u8 = 0b1000_0000;
const LOW_SEVEN_BITS: u8 = 0b0111_1111;

/// Decodes a full width (up to 9 byte) varint from the start of `buf`.
pub fn read_varint(buf: &[u8]) -> (i64, usize) {
    decode_varint(buf, MAX_VARINT_LEN)
}

/// Decodes a varint of at most `max_length` bytes from the start of `buf`.
///
/// Returns the signed value and the number of bytes consumed.
///
/// # Arguments
///
/// * `buf` - Bytes starting at the first byte of the varint.
/// * `max_length` - Between 1 and 9.  Values outside that range are clamped.
///
/// The caller is responsible for supplying enough bytes.  If `buf` ends before the varint does, decoding
/// stops at the end of `buf`, and the value and length returned are those of the truncated prefix
/// (0 bytes consumed for an empty buffer).
pub fn decode_varint(buf: &[u8], max_length: usize) -> (i64, usize) {
    let max_length = max_length.clamp(1, MAX_VARINT_LEN);
    let mut unsigned: u64 = 0;
    for (i, &byte) in buf.iter().take(max_length - 1).enumerate() {
        unsigned = (unsigned << 7) | u64::from(byte & LOW_SEVEN_BITS);
        if byte & HIGH_BIT == 0 {
            return (to_signed(unsigned, max_length), i + 1);
        }
    }
    // Every byte so far had the continuation bit set, so the last byte contributes all 8 of its bits.
    match buf.get(max_length - 1) {
        Some(&last) => {
            unsigned = (unsigned << 8) | u64::from(last);
            (to_signed(unsigned, max_length), max_length)
        }
        None => (to_signed(unsigned, max_length), buf.len().min(max_length - 1)),
    }
}

/// Interprets the low `7 * max_length + 1` bits of `unsigned` as a twos-complement number.
fn to_signed(unsigned: u64, max_length: usize) -> i64 {
    let width = 7 * max_length + 1;
    if width >= 64 {
        return unsigned as i64;
    }
    let sign_bit = 1_u64 << (width - 1);
    if unsigned & sign_bit != 0 {
        unsigned as i64 - (1_i64 << width)
    } else {
        unsigned as i64
    }
}

#[cfg(test)]
fn encode_varint(value: i64, len: usize) -> Vec<u8> {
    // Always uses exactly `len` bytes, so the last byte carries 8 bits.
    let width = 7 * len + 1;
    let mut unsigned = if width >= 64 {
        value as u64
    } else {
        (value as u64) & ((1_u64 << width) - 1)
    };
    let mut out = vec![0_u8; len];
    out[len - 1] = (unsigned & 0xff) as u8;
    unsigned >>= 8;
    for i in (0..len - 1).rev() {
        out[i] = HIGH_BIT | (unsigned as u8 & LOW_SEVEN_BITS);
        unsigned >>= 7;
    }
    out
}

#[test]
fn test_single_byte_varints() {
    assert_eq!(read_varint(&[0x00]), (0, 1));
    assert_eq!(read_varint(&[0x01]), (1, 1));
    assert_eq!(read_varint(&[0x7f]), (127, 1));
    assert_eq!(decode_varint(&[0xff], 1), (-1, 1));
    assert_eq!(decode_varint(&[0x7f], 1), (127, 1));
    assert_eq!(decode_varint(&[0x80], 1), (-128, 1));
}

#[test]
fn test_multi_byte_varints() {
    assert_eq!(read_varint(&[0b1000_0001, 0b0000_0000]), (128, 2));
    assert_eq!(read_varint(&[0x81, 0x00, 0xff]), (128, 2)); // Trailing bytes are not consumed.
    assert_eq!(read_varint(&[0x82, 0x2c]), (300, 2));
    assert_eq!(
        read_varint(&[0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00]),
        (1 << 57, 9)
    );
    assert_eq!(read_varint(&[0xff; 9]), (-1, 9));
    assert_eq!(
        read_varint(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
        (1, 9)
    );
}

#[test]
fn test_two_byte_bounded_varints() {
    assert_eq!(decode_varint(&[0xbf, 0xff], 2), (16383, 2));
    assert_eq!(decode_varint(&[0xc0, 0x00], 2), (-16384, 2));
    assert_eq!(decode_varint(&[0x80, 0x81], 2), (129, 2));
    assert_eq!(decode_varint(&[0x81, 0x00], 2), (256, 2));
    assert_eq!(decode_varint(&[0x05], 2), (5, 1));
}

#[test]
fn test_truncated_input_stops_at_end_of_buffer() {
    assert_eq!(read_varint(&[]), (0, 0));
    assert_eq!(read_varint(&[0x81]), (1, 1));
    assert_eq!(decode_varint(&[0x81, 0x81], 3), (129, 2));
}

#[test]
fn test_round_trip_at_every_length() {
    for len in 1..=MAX_VARINT_LEN {
        let width = 7 * len + 1;
        let (min, max) = if width >= 64 {
            (i64::MIN, i64::MAX)
        } else {
            (-(1_i64 << (width - 1)), (1_i64 << (width - 1)) - 1)
        };
        for value in [min, min + 1, -1, 0, 1, max / 3, max - 1, max] {
            let encoded = encode_varint(value, len);
            assert_eq!(
                decode_varint(&encoded, len),
                (value, len),
                "value {} at length {} encoded as {:02x?}",
                value,
                len,
                encoded
            );
        }
    }
}

#[test]
fn test_matches_sqlite_varint_crate() {
    let cases: Vec<Vec<u8>> = vec![
        vec![0x00],
        vec![0x7f],
        vec![0x81, 0x00],
        vec![0xff, 0x7f],
        vec![0x83, 0xff, 0x7f],
        vec![0x81, 0x81, 0x81, 0x81, 0x01],
        vec![0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00],
        vec![0x8f, 0xa0, 0xb0, 0xc0, 0xd0, 0xe0, 0xf0, 0x80, 0x12],
        vec![0xff; 9],
    ];
    for case in cases {
        assert_eq!(read_varint(&case), sqlite_varint::read_varint(&case));
    }
}
