//! # vaultpack
//!
//! A compact, deterministic MessagePack-compatible codec for vault sync
//! payloads.
//!
//! Values are serialized through a container-based architecture: a value
//! describes its own shape (a record of named fields, an ordered list, or a
//! single scalar) by requesting exactly one container from the root
//! [`Encoder`] or [`Decoder`] and driving it. The codec itself never learns
//! concrete application types, so vault items, TOTP state, and account models
//! all flow through the same six container types.
//!
//! - Minimal-width integer encoding (fixint through uint64/int64)
//! - Length-tiered strings, binary blobs, arrays, and maps
//! - Timestamps as the reserved MessagePack extension type `-1`
//!   (32/64/96-bit forms selected automatically)
//! - Deterministic map output: keyed containers preserve insertion order
//! - Custom derive macros for application model structs
//!
//! ## Attribute Macros
//!
//! Field behavior on derived structs is controlled with `#[vaultpack(...)]`:
//!
//! - `#[vaultpack(rename = "name")]` — Use the given string as the wire key
//!   instead of the field name.
//! - `#[vaultpack(skip)]` — Never encoded; set to `Default::default()` on
//!   decode.
//! - `#[vaultpack(default)]` — If the key is missing during decoding, the
//!   field is set to `Default::default()` instead of failing with a
//!   key-not-found error.
//!
//! ## Feature Flags
//!
//! - `chrono` — Enables encoding/decoding of `chrono::DateTime<Utc>` and
//!   `chrono::DateTime<Local>` through the timestamp extension.

mod decode;
mod encode;
mod features;
pub mod format;
mod types;

use bytes::{Bytes, BytesMut};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use decode::{Decoder, KeyedDecoder, SingleValueDecoder, UnkeyedDecoder};
pub use encode::{Encoder, KeyedEncoder, SingleValueEncoder, UnkeyedEncoder};
pub use format::Format;
pub use vaultpack_derive::{Decode, Encode};

/// Errors that can occur while encoding a value.
///
/// Encoding failures are either programming errors (a single-value slot
/// written twice, a value that wrote nothing) or structural limits of the
/// wire format itself. There is no partial success; the whole `encode` call
/// aborts.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A single-value container was asked to encode a second value.
    #[error("value already encoded at {path}")]
    ValueAlreadyEncoded { path: CodingPath },
    /// The value's `encode` returned without writing anything.
    #[error("no value was encoded at {path}")]
    NothingEncoded { path: CodingPath },
    /// A string, blob, array, or map length does not fit in 32 bits.
    #[error("length {len} exceeds the maximum the wire format can represent")]
    SizeLimit { len: usize },
    /// Timestamp nanoseconds must be below one billion.
    #[error("timestamp nanoseconds {0} out of range")]
    InvalidTimestamp(u32),
    /// The requested operation has no wire representation.
    ///
    /// Reserved: no current surface constructs this. It exists so a future
    /// container operation can refuse with a typed error instead of
    /// panicking.
    #[error("{0} is not supported by the wire format")]
    Unsupported(&'static str),
}

/// Errors that can occur while decoding a buffer.
///
/// Every variant aborts the whole `decode` call; corrupted input is never
/// retried and never yields a partial value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before a declared header or payload was complete.
    #[error("unexpected end of data")]
    UnexpectedEnd,
    /// The tag byte is unassigned or reserved in the wire format.
    #[error("invalid format tag 0x{tag:02X}")]
    InvalidFormat { tag: u8 },
    /// The tag's family differs from the requested type's family.
    #[error("expected {expected}, found {actual} at {path}")]
    TypeMismatch {
        expected: &'static str,
        actual: Format,
        path: CodingPath,
    },
    /// An integer value is exact on the wire but does not fit the target type.
    #[error("value {value} does not fit in {target}")]
    NumberOutOfRange { value: i128, target: &'static str },
    /// A string payload was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// An extension value is not a timestamp, or has a malformed length.
    #[error("invalid extension: type {ext_type}, length {len}")]
    InvalidExtension { ext_type: i8, len: usize },
    /// The decoded timestamp cannot be represented by the target type.
    #[error("timestamp out of range for the target type")]
    TimestampOutOfRange,
    /// A keyed container has no value for the requested key.
    #[error("key '{key}' not found at {path}")]
    KeyNotFound { key: String, path: CodingPath },
    /// More elements were requested than the array header declared.
    #[error("array of {len} elements exhausted at {path}")]
    ArrayExhausted { len: usize, path: CodingPath },
}

/// One step of a [`CodingPath`]: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

/// The chain of field names and indices from the root to the current
/// container, used for error diagnostics.
///
/// Paths are append-only through the container tree: a child receives its
/// parent's path extended by one element, and no path is mutated after
/// creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodingPath(Vec<PathElement>);

impl CodingPath {
    /// The empty path of a top-level value.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub(crate) fn child_key(&self, key: &str) -> Self {
        let mut elements = self.0.clone();
        elements.push(PathElement::Key(key.to_owned()));
        Self(elements)
    }

    pub(crate) fn child_index(&self, index: usize) -> Self {
        let mut elements = self.0.clone();
        elements.push(PathElement::Index(index));
        Self(elements)
    }
}

impl fmt::Display for CodingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for element in &self.0 {
            match element {
                PathElement::Key(key) => write!(f, ".{key}")?,
                PathElement::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Opaque caller-supplied configuration, shared read-only with every
/// container created during one encode or decode call.
///
/// The codec itself never reads it; manual [`Encode`]/[`Decode`]
/// implementations may downcast entries to steer their own behavior.
pub type UserInfo = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// A point in time as whole seconds since the Unix epoch plus a sub-second
/// nanosecond component.
///
/// Encoded as the reserved MessagePack extension type `-1` in the smallest
/// of the three standard forms that represents the value exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub const UNIX_EPOCH: Timestamp = Timestamp {
        seconds: 0,
        nanoseconds: 0,
    };

    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }
}

/// Trait for values that can describe their own shape to an [`Encoder`].
///
/// An implementation requests exactly one container from the encoder — a
/// keyed container for a record, an unkeyed container for an ordered list,
/// or the single-value container for a scalar — and writes through it.
/// Most application types should use `#[derive(Encode)]` instead of a
/// manual implementation.
pub trait Encode {
    /// Describe this value into the given encoder.
    ///
    /// # Errors
    /// Returns `EncodeError` if the value cannot be represented on the wire.
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError>;
}

/// Trait for values that can be rebuilt from a [`Decoder`].
///
/// The mirror of [`Encode`]: an implementation requests the container
/// matching the shape it encoded with and pulls fields or elements out of
/// it. Most application types should use `#[derive(Decode)]`.
pub trait Decode: Sized {
    /// Rebuild this value from the given decoder.
    ///
    /// # Errors
    /// Returns `DecodeError` if the buffer is truncated, malformed, or of a
    /// different shape than requested.
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError>;
}

/// Encode a value to wire bytes.
///
/// # Example
/// ```rust
/// use vaultpack::{encode, decode, Encode, Decode};
///
/// #[derive(Encode, Decode, PartialEq, Debug)]
/// struct VaultItem {
///     id: u32,
///     name: String,
/// }
///
/// let item = VaultItem { id: 42, name: "hello".to_string() };
/// let mut buf = encode(&item).unwrap();
/// let back: VaultItem = decode(&mut buf).unwrap();
/// assert_eq!(item, back);
/// ```
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Bytes, EncodeError> {
    encode_with(value, Arc::default())
}

/// Encode a value to wire bytes, making the given [`UserInfo`] available to
/// every container of the call.
pub fn encode_with<T: Encode + ?Sized>(
    value: &T,
    user_info: Arc<UserInfo>,
) -> Result<Bytes, EncodeError> {
    let node = encode::to_node(value, CodingPath::root(), user_info)?;
    let mut out = BytesMut::new();
    encode::assemble(&node, &mut out)?;
    Ok(out.freeze())
}

/// Decode a value from a buffer, advancing the cursor past exactly the bytes
/// the value's format declares.
pub fn decode<T: Decode>(reader: &mut Bytes) -> Result<T, DecodeError> {
    let mut decoder = Decoder::new(reader, CodingPath::root());
    T::decode(&mut decoder)
}

/// Decode a value from a buffer, making the given [`UserInfo`] available to
/// every container of the call.
pub fn decode_with<T: Decode>(
    reader: &mut Bytes,
    user_info: Arc<UserInfo>,
) -> Result<T, DecodeError> {
    let mut decoder = Decoder::new(reader, CodingPath::root()).with_user_info(user_info);
    T::decode(&mut decoder)
}

/// Decode a value from a borrowed byte slice.
pub fn decode_slice<T: Decode>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut buf = Bytes::copy_from_slice(bytes);
    decode(&mut buf)
}
