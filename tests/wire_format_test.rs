//! Exact-byte assertions for the wire format: minimal-width integer
//! selection, length-tier boundaries, timestamp tier selection, and the
//! canonical small-value encodings.

use bytes::Bytes;
use std::collections::BTreeMap;
use vaultpack::{decode_slice, encode, Timestamp};

fn bytes_of<T: vaultpack::Encode>(value: &T) -> Vec<u8> {
    encode(value).unwrap().to_vec()
}

#[test]
fn minimal_width_unsigned() {
    assert_eq!(bytes_of(&0u64), [0x00]);
    assert_eq!(bytes_of(&5u32), [0x05]);
    assert_eq!(bytes_of(&127u8), [0x7F]);
    assert_eq!(bytes_of(&128u8), [0xCC, 0x80]);
    assert_eq!(bytes_of(&200u64), [0xCC, 0xC8]);
    assert_eq!(bytes_of(&255u16), [0xCC, 0xFF]);
    assert_eq!(bytes_of(&256u16), [0xCD, 0x01, 0x00]);
    assert_eq!(bytes_of(&65535u32), [0xCD, 0xFF, 0xFF]);
    assert_eq!(bytes_of(&65536u32), [0xCE, 0x00, 0x01, 0x00, 0x00]);
    assert_eq!(bytes_of(&(u32::MAX as u64)), [0xCE, 0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(
        bytes_of(&(u32::MAX as u64 + 1)),
        [0xCF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        bytes_of(&u64::MAX),
        [0xCF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
    );
}

#[test]
fn minimal_width_signed() {
    // Non-negative signed values take the unsigned path.
    assert_eq!(bytes_of(&5i64), [0x05]);
    assert_eq!(bytes_of(&200i64), [0xCC, 0xC8]);
    assert_eq!(bytes_of(&-1i32), [0xFF]);
    assert_eq!(bytes_of(&-32i8), [0xE0]);
    assert_eq!(bytes_of(&-33i8), [0xD0, 0xDF]);
    assert_eq!(bytes_of(&-128i64), [0xD0, 0x80]);
    assert_eq!(bytes_of(&-129i64), [0xD1, 0xFF, 0x7F]);
    assert_eq!(bytes_of(&-32768i32), [0xD1, 0x80, 0x00]);
    assert_eq!(bytes_of(&-32769i32), [0xD2, 0xFF, 0xFF, 0x7F, 0xFF]);
    assert_eq!(
        bytes_of(&(i32::MIN as i64 - 1)),
        [0xD3, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF, 0xFF]
    );
}

#[test]
fn floats_keep_source_width() {
    // A float is never range-reduced, even when the value is integral.
    assert_eq!(bytes_of(&1.0f32), [0xCA, 0x3F, 0x80, 0x00, 0x00]);
    assert_eq!(
        bytes_of(&1.0f64),
        [0xCB, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(bytes_of(&1.5f32), [0xCA, 0x3F, 0xC0, 0x00, 0x00]);
}

#[test]
fn string_tier_boundaries() {
    let hello = bytes_of(&"hello".to_string());
    assert_eq!(hello, [0xA5, b'h', b'e', b'l', b'l', b'o']);

    assert_eq!(bytes_of(&String::new()), [0xA0]);

    let s31 = "x".repeat(31);
    let encoded = bytes_of(&s31);
    assert_eq!(encoded[0], 0xBF);
    assert_eq!(encoded.len(), 32);

    let s32 = "x".repeat(32);
    let encoded = bytes_of(&s32);
    assert_eq!(&encoded[..2], [0xD9, 32]);

    let s255 = "x".repeat(255);
    assert_eq!(&bytes_of(&s255)[..2], [0xD9, 0xFF]);

    let s256 = "x".repeat(256);
    assert_eq!(&bytes_of(&s256)[..3], [0xDA, 0x01, 0x00]);

    let s65536 = "x".repeat(65536);
    assert_eq!(&bytes_of(&s65536)[..5], [0xDB, 0x00, 0x01, 0x00, 0x00]);
}

#[test]
fn binary_tier_boundaries() {
    // No fix tier for blobs: even one byte takes the bin8 header.
    let b1 = Bytes::from_static(&[0xAB]);
    assert_eq!(bytes_of(&b1), [0xC4, 0x01, 0xAB]);

    let b255 = Bytes::from(vec![0u8; 255]);
    assert_eq!(&bytes_of(&b255)[..2], [0xC4, 0xFF]);

    let b256 = Bytes::from(vec![0u8; 256]);
    assert_eq!(&bytes_of(&b256)[..3], [0xC5, 0x01, 0x00]);

    let b65536 = Bytes::from(vec![0u8; 65536]);
    assert_eq!(&bytes_of(&b65536)[..5], [0xC6, 0x00, 0x01, 0x00, 0x00]);
}

#[test]
fn array_tier_boundaries() {
    assert_eq!(bytes_of(&Vec::<u32>::new()), [0x90]);
    assert_eq!(bytes_of(&vec![1u32, 2, 3]), [0x93, 0x01, 0x02, 0x03]);

    let v15 = vec![0u8; 15];
    assert_eq!(bytes_of(&v15)[0], 0x9F);

    let v16 = vec![0u8; 16];
    assert_eq!(&bytes_of(&v16)[..3], [0xDC, 0x00, 0x10]);

    let v65536 = vec![0u8; 65536];
    assert_eq!(&bytes_of(&v65536)[..5], [0xDD, 0x00, 0x01, 0x00, 0x00]);
}

#[test]
fn map_tier_boundaries() {
    let empty = BTreeMap::<String, u32>::new();
    assert_eq!(bytes_of(&empty), [0x80]);

    let mut m15 = BTreeMap::new();
    for i in 0..15u32 {
        m15.insert(format!("k{i:02}"), i);
    }
    assert_eq!(bytes_of(&m15)[0], 0x8F);

    let mut m16 = BTreeMap::new();
    for i in 0..16u32 {
        m16.insert(format!("k{i:02}"), i);
    }
    assert_eq!(&bytes_of(&m16)[..3], [0xDE, 0x00, 0x10]);

    let mut m65535 = BTreeMap::new();
    for i in 0..65535u32 {
        m65535.insert(format!("{i:05}"), i);
    }
    assert_eq!(&bytes_of(&m65535)[..3], [0xDE, 0xFF, 0xFF]);

    m65535.insert("65535".to_string(), 65535);
    let encoded = bytes_of(&m65535);
    assert_eq!(&encoded[..5], [0xDF, 0x00, 0x01, 0x00, 0x00]);
    let back: BTreeMap<String, u32> = decode_slice(&encoded).unwrap();
    assert_eq!(back, m65535);
}

#[test]
fn map_key_then_value_layout() {
    let mut map = BTreeMap::new();
    map.insert("id".to_string(), 7u32);
    // fixmap(1), fixstr(2) "id", fixint 7
    assert_eq!(bytes_of(&map), [0x81, 0xA2, b'i', b'd', 0x07]);
}

#[test]
fn timestamp_tier_selection() {
    let epoch = bytes_of(&Timestamp::UNIX_EPOCH);
    assert_eq!(epoch, [0xD6, 0xFF, 0x00, 0x00, 0x00, 0x00]);

    let plain = bytes_of(&Timestamp::new(1_700_000_000, 0));
    assert_eq!(plain[..2], [0xD6, 0xFF]);
    assert_eq!(plain[2..], 1_700_000_000u32.to_be_bytes());

    // Sub-second precision forces the packed 64-bit form.
    let half = bytes_of(&Timestamp::new(0, 500_000_000));
    assert_eq!(half[..2], [0xD7, 0xFF]);
    let packed = (500_000_000u64 << 34).to_be_bytes();
    assert_eq!(half[2..], packed);

    // Seconds at the top of the 34-bit range still fit the 64-bit form.
    let wide = bytes_of(&Timestamp::new((1i64 << 34) - 1, 1));
    assert_eq!(wide[..2], [0xD7, 0xFF]);

    // Past the 34-bit range, or before the epoch, the 96-bit form applies.
    let far = bytes_of(&Timestamp::new(1i64 << 34, 0));
    assert_eq!(far[..3], [0xC7, 12, 0xFF]);

    let before_epoch = bytes_of(&Timestamp::new(-1, 0));
    assert_eq!(
        before_epoch,
        [
            0xC7, 12, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF
        ]
    );
}

#[test]
fn canonical_bytes_decode_back() {
    assert_eq!(decode_slice::<u32>(&[0x05]).unwrap(), 5);
    assert_eq!(decode_slice::<i32>(&[0xFF]).unwrap(), -1);
    assert_eq!(decode_slice::<u32>(&[0xCC, 0xC8]).unwrap(), 200);
    assert_eq!(
        decode_slice::<Vec<u32>>(&[0x93, 0x01, 0x02, 0x03]).unwrap(),
        vec![1, 2, 3]
    );
    assert_eq!(
        decode_slice::<String>(&[0xA5, b'h', b'e', b'l', b'l', b'o']).unwrap(),
        "hello"
    );
    assert_eq!(
        decode_slice::<BTreeMap<String, u32>>(&[0x80]).unwrap(),
        BTreeMap::new()
    );
    assert_eq!(
        decode_slice::<Timestamp>(&[0xD6, 0xFF, 0x00, 0x00, 0x00, 0x00]).unwrap(),
        Timestamp::UNIX_EPOCH
    );
}

#[test]
fn nil_and_bool_bytes() {
    assert_eq!(bytes_of(&Option::<u32>::None), [0xC0]);
    assert_eq!(bytes_of(&Some(3u32)), [0x03]);
    assert_eq!(bytes_of(&false), [0xC2]);
    assert_eq!(bytes_of(&true), [0xC3]);
}

#[test]
fn map_output_is_deterministic() {
    use std::collections::HashMap;

    let mut unordered = HashMap::new();
    let mut ordered = BTreeMap::new();
    for (k, v) in [("zeta", 1u32), ("alpha", 2), ("mid", 3)] {
        unordered.insert(k.to_string(), v);
        ordered.insert(k.to_string(), v);
    }
    // HashMap output is key-sorted, so it matches the BTreeMap encoding and
    // is stable across runs.
    assert_eq!(bytes_of(&unordered), bytes_of(&ordered));
    assert_eq!(bytes_of(&unordered), bytes_of(&unordered));
}
