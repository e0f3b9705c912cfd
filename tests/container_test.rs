//! Driving the containers by hand, the way a manual `Encode`/`Decode`
//! implementation would: nested records and lists, on-demand keyed lookup,
//! element counting, and nil handling.

use bytes::Bytes;
use vaultpack::{
    decode, encode, Decode, DecodeError, Decoder, Encode, EncodeError, Encoder,
};

struct Device {
    model: String,
    firmware: Vec<u32>,
    paired: bool,
}

impl Encode for Device {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        let mut map = encoder.keyed()?;
        map.encode("model", &self.model)?;
        let mut firmware = map.nested_unkeyed("firmware");
        for part in &self.firmware {
            firmware.encode(part)?;
        }
        map.encode("paired", &self.paired)?;
        Ok(())
    }
}

impl Decode for Device {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let map = decoder.keyed()?;
        let mut parts = map.nested_unkeyed("firmware")?;
        let mut firmware = Vec::with_capacity(parts.len());
        while parts.remaining() > 0 {
            firmware.push(parts.decode_next()?);
        }
        Ok(Device {
            model: map.decode("model")?,
            firmware,
            paired: map.decode("paired")?,
        })
    }
}

#[test]
fn manual_nested_containers() {
    let device = Device {
        model: "watch-7".to_string(),
        firmware: vec![2, 14, 1],
        paired: true,
    };
    let mut buf = encode(&device).unwrap();
    let back: Device = decode(&mut buf).unwrap();
    assert_eq!(back.model, "watch-7");
    assert_eq!(back.firmware, vec![2, 14, 1]);
    assert!(back.paired);
}

#[test]
fn keyed_lookup_is_order_independent() {
    let device = Device {
        model: "watch-7".to_string(),
        firmware: vec![1],
        paired: false,
    };
    let mut buf = encode(&device).unwrap();
    let mut decoder = Decoder::new(&mut buf, vaultpack::CodingPath::root());
    let map = decoder.keyed().unwrap();

    // Values decode on demand, in any order, from their recorded ranges.
    let paired: bool = map.decode("paired").unwrap();
    let model: String = map.decode("model").unwrap();
    assert!(!paired);
    assert_eq!(model, "watch-7");
    // A key can even be read twice; the slice is immutable.
    let model_again: String = map.decode("model").unwrap();
    assert_eq!(model_again, model);

    assert_eq!(map.len(), 3);
    assert!(map.contains("firmware"));
    assert!(!map.contains("serial"));
    assert_eq!(
        map.keys().collect::<Vec<_>>(),
        ["model", "firmware", "paired"]
    );
}

#[test]
fn unkeyed_counts_and_exhaustion() {
    let mut buf = encode(&vec![10u8, 20, 30]).unwrap();
    let mut decoder = Decoder::new(&mut buf, vaultpack::CodingPath::root());
    let mut seq = decoder.unkeyed().unwrap();

    assert_eq!(seq.len(), 3);
    assert_eq!(seq.remaining(), 3);
    let _: u8 = seq.decode_next().unwrap();
    let _: u8 = seq.decode_next().unwrap();
    assert_eq!(seq.remaining(), 1);
    let _: u8 = seq.decode_next().unwrap();
    assert_eq!(seq.remaining(), 0);
    assert!(matches!(
        seq.decode_next::<u8>(),
        Err(DecodeError::ArrayExhausted { len: 3, .. })
    ));
}

#[test]
fn keyed_nil_probe() {
    struct WithNil;
    impl Encode for WithNil {
        fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
            let mut map = encoder.keyed()?;
            map.encode_nil("gone")?;
            map.encode("present", &1u8)?;
            Ok(())
        }
    }

    let mut buf = encode(&WithNil).unwrap();
    let mut decoder = Decoder::new(&mut buf, vaultpack::CodingPath::root());
    let map = decoder.keyed().unwrap();
    assert!(map.decode_nil("gone").unwrap());
    assert!(!map.decode_nil("present").unwrap());
    assert!(matches!(
        map.decode_nil("missing"),
        Err(DecodeError::KeyNotFound { .. })
    ));
}

#[test]
fn unkeyed_nil_probe() {
    let mut buf = encode(&vec![Some(1u8), None, Some(3)]).unwrap();
    let mut decoder = Decoder::new(&mut buf, vaultpack::CodingPath::root());
    let mut seq = decoder.unkeyed().unwrap();
    assert!(!seq.decode_nil_next().unwrap());
    let _: u8 = seq.decode_next().unwrap();
    assert!(seq.decode_nil_next().unwrap());
    let last: u8 = seq.decode_next().unwrap();
    assert_eq!(last, 3);
}

#[test]
fn sibling_cursor_stays_in_sync() {
    // Two values back to back in one buffer: the first decode must consume
    // exactly its own bytes so the second one starts clean.
    let mut buf = bytes::BytesMut::new();
    buf.extend_from_slice(&encode(&vec![1u32, 2, 3]).unwrap());
    buf.extend_from_slice(&encode(&"next".to_string()).unwrap());
    let mut cursor = buf.freeze();

    let first: Vec<u32> = decode(&mut cursor).unwrap();
    let second: String = decode(&mut cursor).unwrap();
    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(second, "next");
    assert!(cursor.is_empty());
}

#[test]
fn blob_slices_share_the_buffer() {
    let blob = Bytes::from(vec![7u8; 300]);
    let mut buf = encode(&blob).unwrap();
    let back: Bytes = decode(&mut buf).unwrap();
    assert_eq!(back.len(), 300);
    assert!(back.iter().all(|&b| b == 7));
}

#[test]
fn user_info_reaches_nested_containers() {
    use std::sync::Arc;
    use vaultpack::UserInfo;

    struct Tagged;
    impl Encode for Tagged {
        fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
            let mut map = encoder.keyed()?;
            let origin = map
                .user_info()
                .get("origin")
                .and_then(|v| v.downcast_ref::<String>())
                .cloned()
                .unwrap_or_default();
            map.encode("origin", &origin)?;
            Ok(())
        }
    }
    impl Decode for Tagged {
        fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
            let map = decoder.keyed()?;
            let expected = map
                .user_info()
                .get("origin")
                .and_then(|v| v.downcast_ref::<String>())
                .cloned()
                .unwrap_or_default();
            let origin: String = map.decode("origin")?;
            assert_eq!(origin, expected);
            Ok(Tagged)
        }
    }

    let mut info = UserInfo::new();
    info.insert("origin".to_string(), Arc::new("vault-a".to_string()));
    let info = Arc::new(info);

    let mut buf = vaultpack::encode_with(&Tagged, Arc::clone(&info)).unwrap();
    let _: Tagged = vaultpack::decode_with(&mut buf, info).unwrap();
    assert!(buf.is_empty());
}

#[test]
fn unkeyed_nested_records() {
    struct Batch;
    impl Encode for Batch {
        fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
            let mut seq = encoder.unkeyed()?;
            for revision in 0..2u8 {
                let mut entry = seq.nested_keyed();
                entry.encode("rev", &revision)?;
            }
            Ok(())
        }
    }

    let mut buf = encode(&Batch).unwrap();
    let mut decoder = Decoder::new(&mut buf, vaultpack::CodingPath::root());
    let mut seq = decoder.unkeyed().unwrap();
    assert_eq!(seq.len(), 2);
    for expected in 0..2u8 {
        let entry = seq.nested_keyed_next().unwrap();
        let rev: u8 = entry.decode("rev").unwrap();
        assert_eq!(rev, expected);
    }
}
