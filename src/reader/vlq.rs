#![doc = r#"
Variable-length quantities

Delta-times and meta/sysex lengths in a Standard MIDI File are stored as
big-endian base-128 integers: each byte contributes its low seven bits,
most significant group first, and a set high bit means another byte follows.

```text
0x00000000 -> 00
0x00000040 -> 40
0x00000080 -> 81 00
0x00003FFF -> FF 7F
0x0FFFFFFF -> FF FF FF 7F
```

The format caps a quantity at four bytes, so [`VLQ_MAX`] is the largest
representable value.
"#]

use alloc::vec::Vec;

/// The largest value a four-byte quantity can hold.
pub const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// Maximum encoded length in bytes.
pub const VLQ_MAX_LEN: usize = 4;

/// Appends the encoding of `value` to `out`.
///
/// # Panics
/// if `value` is greater than [`VLQ_MAX`].
pub fn write_vlq(value: u32, out: &mut Vec<u8>) {
    if value > VLQ_MAX {
        panic!("Value does not fit in a variable-length quantity. See documentation for details.");
    }
    let mut groups = [0u8; VLQ_MAX_LEN];
    let mut len = 0;
    let mut rest = value;
    loop {
        groups[len] = (rest & 0x7F) as u8;
        len += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for i in (0..len).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

/// Decodes one quantity from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if the
/// slice ends mid-quantity or the quantity is longer than four bytes.
pub fn decode_vlq(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, byte) in bytes.iter().take(VLQ_MAX_LEN).enumerate() {
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[test]
fn known_encodings() {
    use pretty_assertions::assert_eq;

    let cases: [(u32, &[u8]); 8] = [
        (0x00, &[0x00]),
        (0x40, &[0x40]),
        (0x7F, &[0x7F]),
        (0x80, &[0x81, 0x00]),
        (0x2000, &[0xC0, 0x00]),
        (0x3FFF, &[0xFF, 0x7F]),
        (0x10_0000, &[0xC0, 0x80, 0x00]),
        (VLQ_MAX, &[0xFF, 0xFF, 0xFF, 0x7F]),
    ];
    for (value, bytes) in cases {
        let mut out = Vec::new();
        write_vlq(value, &mut out);
        assert_eq!(out.as_slice(), bytes);
        assert_eq!(decode_vlq(bytes), Some((value, bytes.len())));
    }
}

#[test]
fn round_trip_across_range() {
    // walk the four-byte range with a stride that hits every length boundary
    let mut value: u32 = 0;
    let mut buf = Vec::new();
    while value <= VLQ_MAX {
        buf.clear();
        write_vlq(value, &mut buf);
        assert_eq!(decode_vlq(&buf), Some((value, buf.len())));
        value = match value.checked_add(value / 3 + 1) {
            Some(v) => v,
            None => break,
        };
    }
    for edge in [0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, VLQ_MAX] {
        buf.clear();
        write_vlq(edge, &mut buf);
        assert_eq!(decode_vlq(&buf), Some((edge, buf.len())));
    }
}

#[test]
fn rejects_unterminated_and_overlong() {
    assert_eq!(decode_vlq(&[0x81]), None);
    assert_eq!(decode_vlq(&[]), None);
    assert_eq!(decode_vlq(&[0x80, 0x80, 0x80, 0x80, 0x00]), None);
}

#[test]
#[should_panic]
fn write_rejects_values_above_max() {
    let mut out = Vec::new();
    write_vlq(VLQ_MAX + 1, &mut out);
}
