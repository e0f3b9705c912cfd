//! `Encode`/`Decode` implementations for primitives and std containers.
//!
//! Scalars route through the single-value container, `Vec` and slices
//! through the unkeyed container, and string-keyed maps through the keyed
//! container. Binary blobs are [`bytes::Bytes`]; a `Vec<u8>` encodes as an
//! integer array like any other `Vec<T>`.

use crate::{Decode, DecodeError, Decoder, Encode, EncodeError, Encoder, Timestamp};
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// --- bool ---
impl Encode for bool {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_bool(*self)
    }
}
impl Decode for bool {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.single_value().decode_bool()
    }
}

// --- Unsigned integers ---
// All widths funnel through the u64 width selector, so a small value of any
// source type lands on the same minimal tag. Decoding accepts any
// integer-family tag and range-checks into the target width.
macro_rules! impl_uint {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
                encoder.single_value().encode_u64(*self as u64)
            }
        }
        impl Decode for $ty {
            fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
                let value = decoder.single_value().decode_u64()?;
                <$ty>::try_from(value).map_err(|_| DecodeError::NumberOutOfRange {
                    value: value as i128,
                    target: stringify!($ty),
                })
            }
        }
    )*};
}
impl_uint!(u8, u16, u32, u64, usize);

// --- Signed integers ---
macro_rules! impl_int {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
                encoder.single_value().encode_i64(*self as i64)
            }
        }
        impl Decode for $ty {
            fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
                let value = decoder.single_value().decode_i64()?;
                <$ty>::try_from(value).map_err(|_| DecodeError::NumberOutOfRange {
                    value: value as i128,
                    target: stringify!($ty),
                })
            }
        }
    )*};
}
impl_int!(i8, i16, i32, i64, isize);

// --- Floats ---
// Never range-reduced: an f32 source always emits float32, an f64 source
// always emits float64, regardless of whether the value would fit narrower.
impl Encode for f32 {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_f32(*self)
    }
}
impl Decode for f32 {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.single_value().decode_f32()
    }
}
impl Encode for f64 {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_f64(*self)
    }
}
impl Decode for f64 {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.single_value().decode_f64()
    }
}

// --- Strings ---
impl Encode for str {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_str(self)
    }
}
impl Encode for String {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_str(self)
    }
}
impl Decode for String {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.single_value().decode_str()
    }
}

// --- Binary blobs ---
impl Encode for Bytes {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_bytes(self)
    }
}
impl Decode for Bytes {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.single_value().decode_bytes()
    }
}

// --- Timestamp ---
impl Encode for Timestamp {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.single_value().encode_timestamp(*self)
    }
}
impl Decode for Timestamp {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.single_value().decode_timestamp()
    }
}

// --- Option ---
// `None` is wire nil; `Some` is the bare value. A nested
// `Option<Option<T>>` therefore collapses on the wire.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            Some(value) => value.encode(encoder),
            None => encoder.single_value().encode_nil(),
        }
    }
}
impl<T: Decode> Decode for Option<T> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        if decoder.single_value().decode_nil()? {
            Ok(None)
        } else {
            T::decode(decoder).map(Some)
        }
    }
}

// --- Sequences ---
impl<T: Encode> Encode for [T] {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        let mut seq = encoder.unkeyed()?;
        for element in self {
            seq.encode(element)?;
        }
        Ok(())
    }
}
impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        self.as_slice().encode(encoder)
    }
}
impl<T: Decode> Decode for Vec<T> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let mut seq = decoder.unkeyed()?;
        let mut out = Vec::with_capacity(seq.len().min(4096));
        while seq.remaining() > 0 {
            out.push(seq.decode_next()?);
        }
        Ok(out)
    }
}

// --- String-keyed maps ---
impl<V: Encode> Encode for IndexMap<String, V> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        let mut map = encoder.keyed()?;
        for (key, value) in self {
            map.encode(key, value)?;
        }
        Ok(())
    }
}
impl<V: Decode> Decode for IndexMap<String, V> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let map = decoder.keyed()?;
        let mut out = IndexMap::with_capacity(map.len().min(4096));
        for key in map.keys() {
            out.insert(key.to_owned(), map.decode(key)?);
        }
        Ok(out)
    }
}
impl<V: Encode> Encode for BTreeMap<String, V> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        let mut map = encoder.keyed()?;
        for (key, value) in self {
            map.encode(key, value)?;
        }
        Ok(())
    }
}
impl<V: Decode> Decode for BTreeMap<String, V> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let map = decoder.keyed()?;
        let mut out = BTreeMap::new();
        for key in map.keys() {
            out.insert(key.to_owned(), map.decode(key)?);
        }
        Ok(out)
    }
}
// HashMap iteration order is arbitrary, which would make wire output
// nondeterministic. Keys are sorted before writing.
impl<V: Encode> Encode for HashMap<String, V> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        let mut keys: Vec<&String> = self.keys().collect();
        keys.sort();
        let mut map = encoder.keyed()?;
        for key in keys {
            if let Some(value) = self.get(key) {
                map.encode(key, value)?;
            }
        }
        Ok(())
    }
}
impl<V: Decode> Decode for HashMap<String, V> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let map = decoder.keyed()?;
        let mut out = HashMap::with_capacity(map.len().min(4096));
        for key in map.keys() {
            out.insert(key.to_owned(), map.decode(key)?);
        }
        Ok(out)
    }
}

// --- Smart pointers and references ---
impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        (**self).encode(encoder)
    }
}
impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        (**self).encode(encoder)
    }
}
impl<T: Decode> Decode for Box<T> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        T::decode(decoder).map(Box::new)
    }
}
impl<T: Encode + ?Sized> Encode for Arc<T> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        (**self).encode(encoder)
    }
}
impl<T: Decode> Decode for Arc<T> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        T::decode(decoder).map(Arc::new)
    }
}
