//! Decoding containers.
//!
//! Decoding walks one immutable buffer behind a shared cursor that only ever
//! advances. Constructing a keyed or unkeyed container consumes its header
//! and slices out the byte range of every child value without materializing
//! it, so a container always advances the cursor by exactly the bytes its
//! format declares and sibling decoding can never desynchronize. Values are
//! decoded on demand from their recorded slices.

use crate::{format, CodingPath, Decode, DecodeError, Format, Timestamp, UserInfo};
use bytes::{Buf, Bytes};
use indexmap::IndexMap;
use std::sync::Arc;

/// The root of one decode call, wrapping the shared cursor.
pub struct Decoder<'a> {
    pub(crate) input: &'a mut Bytes,
    pub(crate) path: CodingPath,
    pub(crate) user_info: Arc<UserInfo>,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a mut Bytes, path: CodingPath) -> Self {
        Self {
            input,
            path,
            user_info: Arc::default(),
        }
    }

    /// Attach caller-supplied configuration, shared with every container of
    /// this decode call.
    pub fn with_user_info(mut self, user_info: Arc<UserInfo>) -> Self {
        self.user_info = user_info;
        self
    }

    /// The path from the root value to this decoder.
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// The family of the next value, without consuming it.
    pub fn peek_format(&self) -> Result<Format, DecodeError> {
        format::classify(format::peek_tag(self.input)?)
    }

    /// A container for a single scalar value.
    pub fn single_value(&mut self) -> SingleValueDecoder<'_> {
        SingleValueDecoder {
            input: &mut *self.input,
            path: self.path.clone(),
            user_info: Arc::clone(&self.user_info),
        }
    }

    /// A container over a wire map, consuming the whole map from the cursor.
    ///
    /// # Errors
    /// Returns a type-mismatch error if the next value is not a map.
    pub fn keyed(&mut self) -> Result<KeyedDecoder, DecodeError> {
        let tag = format::peek_tag(self.input)?;
        let actual = format::classify(tag)?;
        if actual != Format::Map {
            return Err(DecodeError::TypeMismatch {
                expected: "map",
                actual,
                path: self.path.clone(),
            });
        }
        let tag = format::read_tag(self.input)?;
        let len = format::read_map_len(tag, self.input)?;
        // Do not trust a hostile count header for the allocation size.
        let mut entries = IndexMap::with_capacity(len.min(4096));
        for _ in 0..len {
            let key = format::read_str(self.input)?;
            let value = format::split_value(self.input)?;
            entries.insert(key, value);
        }
        Ok(KeyedDecoder {
            entries,
            path: self.path.clone(),
            user_info: Arc::clone(&self.user_info),
        })
    }

    /// A container over a wire array, consuming the whole array from the
    /// cursor.
    ///
    /// # Errors
    /// Returns a type-mismatch error if the next value is not an array.
    pub fn unkeyed(&mut self) -> Result<UnkeyedDecoder, DecodeError> {
        let tag = format::peek_tag(self.input)?;
        let actual = format::classify(tag)?;
        if actual != Format::Array {
            return Err(DecodeError::TypeMismatch {
                expected: "array",
                actual,
                path: self.path.clone(),
            });
        }
        let tag = format::read_tag(self.input)?;
        let len = format::read_array_len(tag, self.input)?;
        let mut elements = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            elements.push(format::split_value(self.input)?);
        }
        Ok(UnkeyedDecoder {
            elements,
            index: 0,
            path: self.path.clone(),
            user_info: Arc::clone(&self.user_info),
        })
    }
}

/// Decode a recorded value slice as `T` at the given path.
fn decode_at<T: Decode>(
    mut slice: Bytes,
    path: CodingPath,
    user_info: Arc<UserInfo>,
) -> Result<T, DecodeError> {
    let mut decoder = Decoder::new(&mut slice, path).with_user_info(user_info);
    T::decode(&mut decoder)
}

/// Decoding container for exactly one scalar value.
///
/// Typed reads check the tag's family before consuming anything, so a
/// mismatch leaves the cursor where it was.
pub struct SingleValueDecoder<'a> {
    input: &'a mut Bytes,
    path: CodingPath,
    user_info: Arc<UserInfo>,
}

impl SingleValueDecoder<'_> {
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    fn expect(&self, expected: &'static str, family: Format) -> Result<u8, DecodeError> {
        let tag = format::peek_tag(self.input)?;
        let actual = format::classify(tag)?;
        if actual != family {
            return Err(DecodeError::TypeMismatch {
                expected,
                actual,
                path: self.path.clone(),
            });
        }
        Ok(tag)
    }

    /// Consume a nil value if one is next; otherwise leave the cursor alone
    /// and report `false`.
    pub fn decode_nil(&mut self) -> Result<bool, DecodeError> {
        if format::peek_tag(self.input)? == format::NIL {
            self.input.advance(1);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn decode_bool(&mut self) -> Result<bool, DecodeError> {
        let tag = self.expect("bool", Format::Bool)?;
        self.input.advance(1);
        Ok(tag == format::TRUE)
    }

    /// Read any integer-family value, widened to `i128` so both `u64` and
    /// `i64` extremes survive.
    fn decode_int_wide(&mut self, expected: &'static str) -> Result<i128, DecodeError> {
        let tag = format::peek_tag(self.input)?;
        let actual = format::classify(tag)?;
        if actual != Format::UInt && actual != Format::Int {
            return Err(DecodeError::TypeMismatch {
                expected,
                actual,
                path: self.path.clone(),
            });
        }
        self.input.advance(1);
        format::read_int_from_tag(tag, self.input)
    }

    pub fn decode_u64(&mut self) -> Result<u64, DecodeError> {
        let value = self.decode_int_wide("u64")?;
        u64::try_from(value).map_err(|_| DecodeError::NumberOutOfRange {
            value,
            target: "u64",
        })
    }

    pub fn decode_i64(&mut self) -> Result<i64, DecodeError> {
        let value = self.decode_int_wide("i64")?;
        i64::try_from(value).map_err(|_| DecodeError::NumberOutOfRange {
            value,
            target: "i64",
        })
    }

    pub fn decode_f32(&mut self) -> Result<f32, DecodeError> {
        self.expect("float32", Format::Float32)?;
        self.input.advance(1);
        format::need(self.input, 4)?;
        Ok(self.input.get_f32())
    }

    /// Decode a `float64` value, or widen a `float32` losslessly.
    pub fn decode_f64(&mut self) -> Result<f64, DecodeError> {
        let tag = format::peek_tag(self.input)?;
        match format::classify(tag)? {
            Format::Float64 => {
                self.input.advance(1);
                format::need(self.input, 8)?;
                Ok(self.input.get_f64())
            }
            Format::Float32 => {
                self.input.advance(1);
                format::need(self.input, 4)?;
                Ok(f64::from(self.input.get_f32()))
            }
            actual => Err(DecodeError::TypeMismatch {
                expected: "float64",
                actual,
                path: self.path.clone(),
            }),
        }
    }

    pub fn decode_str(&mut self) -> Result<String, DecodeError> {
        self.expect("str", Format::Str)?;
        format::read_str(self.input)
    }

    pub fn decode_bytes(&mut self) -> Result<Bytes, DecodeError> {
        self.expect("bin", Format::Bin)?;
        let tag = format::read_tag(self.input)?;
        let len = format::read_bin_len(tag, self.input)?;
        format::need(self.input, len)?;
        Ok(self.input.split_to(len))
    }

    pub fn decode_timestamp(&mut self) -> Result<Timestamp, DecodeError> {
        self.expect("timestamp", Format::Ext)?;
        let tag = format::read_tag(self.input)?;
        format::read_timestamp_from_tag(tag, self.input)
    }
}

/// Decoding container over a wire map.
///
/// Construction records the byte range of every value without decoding it;
/// `decode` materializes a value only when its key is requested.
pub struct KeyedDecoder {
    entries: IndexMap<String, Bytes>,
    path: CodingPath,
    user_info: Arc<UserInfo>,
}

impl KeyedDecoder {
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// Number of key/value pairs the map header declared.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The keys in wire order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn slice(&self, key: &str) -> Result<Bytes, DecodeError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| DecodeError::KeyNotFound {
                key: key.to_owned(),
                path: self.path.clone(),
            })
    }

    /// Decode the value stored under `key`.
    ///
    /// # Errors
    /// Returns `DecodeError::KeyNotFound` if the map has no such key.
    pub fn decode<T: Decode>(&self, key: &str) -> Result<T, DecodeError> {
        decode_at(
            self.slice(key)?,
            self.path.child_key(key),
            Arc::clone(&self.user_info),
        )
    }

    /// Decode the value stored under `key`, or `Default::default()` if the
    /// key is absent. An explicit nil also decodes through `T`.
    pub fn decode_or_default<T: Decode + Default>(&self, key: &str) -> Result<T, DecodeError> {
        if self.contains(key) {
            self.decode(key)
        } else {
            Ok(T::default())
        }
    }

    /// Whether the value under `key` is nil. Missing keys are key-not-found,
    /// not nil.
    pub fn decode_nil(&self, key: &str) -> Result<bool, DecodeError> {
        let slice = self.slice(key)?;
        Ok(format::peek_tag(&slice)? == format::NIL)
    }

    /// The nested record stored under `key`.
    pub fn nested_keyed(&self, key: &str) -> Result<KeyedDecoder, DecodeError> {
        let mut slice = self.slice(key)?;
        Decoder::new(&mut slice, self.path.child_key(key))
            .with_user_info(Arc::clone(&self.user_info))
            .keyed()
    }

    /// The nested list stored under `key`.
    pub fn nested_unkeyed(&self, key: &str) -> Result<UnkeyedDecoder, DecodeError> {
        let mut slice = self.slice(key)?;
        Decoder::new(&mut slice, self.path.child_key(key))
            .with_user_info(Arc::clone(&self.user_info))
            .unkeyed()
    }
}

/// Decoding container over a wire array.
///
/// Elements are pulled sequentially with `decode_next`; requesting more
/// elements than the header declared is an `ArrayExhausted` error.
pub struct UnkeyedDecoder {
    elements: Vec<Bytes>,
    index: usize,
    path: CodingPath,
    user_info: Arc<UserInfo>,
}

impl UnkeyedDecoder {
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// Number of elements the array header declared.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements not yet consumed.
    pub fn remaining(&self) -> usize {
        self.elements.len() - self.index
    }

    fn next_slice(&mut self) -> Result<(Bytes, CodingPath), DecodeError> {
        match self.elements.get(self.index) {
            Some(slice) => {
                let path = self.path.child_index(self.index);
                self.index += 1;
                Ok((slice.clone(), path))
            }
            None => Err(DecodeError::ArrayExhausted {
                len: self.elements.len(),
                path: self.path.clone(),
            }),
        }
    }

    /// Decode the next element.
    pub fn decode_next<T: Decode>(&mut self) -> Result<T, DecodeError> {
        let (slice, path) = self.next_slice()?;
        decode_at(slice, path, Arc::clone(&self.user_info))
    }

    /// Whether the next element is nil, consuming it if so.
    pub fn decode_nil_next(&mut self) -> Result<bool, DecodeError> {
        match self.elements.get(self.index) {
            Some(slice) => {
                if format::peek_tag(slice)? == format::NIL {
                    self.index += 1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            None => Err(DecodeError::ArrayExhausted {
                len: self.elements.len(),
                path: self.path.clone(),
            }),
        }
    }

    /// The next element as a nested record.
    pub fn nested_keyed_next(&mut self) -> Result<KeyedDecoder, DecodeError> {
        let (mut slice, path) = self.next_slice()?;
        Decoder::new(&mut slice, path)
            .with_user_info(Arc::clone(&self.user_info))
            .keyed()
    }

    /// The next element as a nested list.
    pub fn nested_unkeyed_next(&mut self) -> Result<UnkeyedDecoder, DecodeError> {
        let (mut slice, path) = self.next_slice()?;
        Decoder::new(&mut slice, path)
            .with_user_info(Arc::clone(&self.user_info))
            .unkeyed()
    }
}
