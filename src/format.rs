//! Wire value model: tag bytes, family classification, and the low-level
//! read/write primitives shared by the encoding and decoding containers.
//!
//! The format is the subset of MessagePack the vault sync channel actually
//! uses. Tags are stable and part of the wire contract; all multi-byte
//! quantities are big-endian.

use crate::{DecodeError, EncodeError, Timestamp};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

///< Nil
pub const NIL: u8 = 0xC0;
///< Bool false / true
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;
///< Binary blob with 1/2/4-byte length
pub const BIN8: u8 = 0xC4;
pub const BIN16: u8 = 0xC5;
pub const BIN32: u8 = 0xC6;
///< Extension with 1-byte length (timestamp96 uses this, length 12)
pub const EXT8: u8 = 0xC7;
///< IEEE-754 bit patterns, never range-reduced
pub const FLOAT32: u8 = 0xCA;
pub const FLOAT64: u8 = 0xCB;
///< Unsigned integers, 1/2/4/8-byte payload
pub const UINT8: u8 = 0xCC;
pub const UINT16: u8 = 0xCD;
pub const UINT32: u8 = 0xCE;
pub const UINT64: u8 = 0xCF;
///< Signed integers, 1/2/4/8-byte payload
pub const INT8: u8 = 0xD0;
pub const INT16: u8 = 0xD1;
pub const INT32: u8 = 0xD2;
pub const INT64: u8 = 0xD3;
///< Fixed-size extensions (timestamp32/timestamp64)
pub const FIXEXT4: u8 = 0xD6;
pub const FIXEXT8: u8 = 0xD7;
///< Strings with 1/2/4-byte length
pub const STR8: u8 = 0xD9;
pub const STR16: u8 = 0xDA;
pub const STR32: u8 = 0xDB;
///< Arrays and maps with 2/4-byte counts
pub const ARRAY16: u8 = 0xDC;
pub const ARRAY32: u8 = 0xDD;
pub const MAP16: u8 = 0xDE;
pub const MAP32: u8 = 0xDF;
///< Base tags with the value or length in the low bits
pub const FIXMAP: u8 = 0x80; // 0x80..=0x8F, count in low 4 bits
pub const FIXARRAY: u8 = 0x90; // 0x90..=0x9F, count in low 4 bits
pub const FIXSTR: u8 = 0xA0; // 0xA0..=0xBF, length in low 5 bits
pub const NEGFIXINT: u8 = 0xE0; // 0xE0..=0xFF, two's complement in low 5 bits

/// The reserved extension type for timestamps.
pub const EXT_TIMESTAMP: i8 = -1;

/// Inclusive upper bounds of the small length tiers.
pub const FIXSTR_MAX: usize = 31;
pub const FIXARRAY_MAX: usize = 15;
pub const FIXMAP_MAX: usize = 15;

/// The value family a tag byte belongs to.
///
/// Used for decode dispatch and for `expected`/`actual` diagnostics in
/// type-mismatch errors. Extension sub-types are not distinguished here;
/// only timestamps survive past the family check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Nil,
    Bool,
    UInt,
    Int,
    Float32,
    Float64,
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Nil => "nil",
            Format::Bool => "bool",
            Format::UInt => "uint",
            Format::Int => "int",
            Format::Float32 => "float32",
            Format::Float64 => "float64",
            Format::Str => "str",
            Format::Bin => "bin",
            Format::Array => "array",
            Format::Map => "map",
            Format::Ext => "ext",
        };
        f.write_str(name)
    }
}

/// Classify a tag byte into its value family.
///
/// # Errors
/// Returns `DecodeError::InvalidFormat` for the reserved tag `0xC1`.
pub fn classify(tag: u8) -> Result<Format, DecodeError> {
    match tag {
        0x00..=0x7F => Ok(Format::UInt),
        0x80..=0x8F => Ok(Format::Map),
        0x90..=0x9F => Ok(Format::Array),
        0xA0..=0xBF => Ok(Format::Str),
        NIL => Ok(Format::Nil),
        0xC1 => Err(DecodeError::InvalidFormat { tag }),
        FALSE | TRUE => Ok(Format::Bool),
        BIN8..=BIN32 => Ok(Format::Bin),
        EXT8..=0xC9 => Ok(Format::Ext),
        FLOAT32 => Ok(Format::Float32),
        FLOAT64 => Ok(Format::Float64),
        UINT8..=UINT64 => Ok(Format::UInt),
        INT8..=INT64 => Ok(Format::Int),
        0xD4..=0xD8 => Ok(Format::Ext),
        STR8..=STR32 => Ok(Format::Str),
        ARRAY16 | ARRAY32 => Ok(Format::Array),
        MAP16 | MAP32 => Ok(Format::Map),
        0xE0..=0xFF => Ok(Format::Int),
    }
}

// --- Writers ---

pub fn write_nil(out: &mut BytesMut) {
    out.put_u8(NIL);
}

pub fn write_bool(out: &mut BytesMut, value: bool) {
    out.put_u8(if value { TRUE } else { FALSE });
}

/// Write a non-negative integer with the narrowest tag that represents it
/// exactly: positive fixint, then uint8/16/32/64.
pub fn write_uint(out: &mut BytesMut, value: u64) {
    if value <= 0x7F {
        out.put_u8(value as u8);
    } else if value <= u8::MAX as u64 {
        out.put_u8(UINT8);
        out.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        out.put_u8(UINT16);
        out.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        out.put_u8(UINT32);
        out.put_u32(value as u32);
    } else {
        out.put_u8(UINT64);
        out.put_u64(value);
    }
}

/// Write a signed integer with the narrowest tag that represents it exactly.
///
/// Non-negative values take the unsigned path, so a small positive `i64`
/// still encodes as a single fixint byte. Negative values use negative
/// fixint down to −32, then int8/16/32/64.
pub fn write_int(out: &mut BytesMut, value: i64) {
    if value >= 0 {
        write_uint(out, value as u64);
    } else if value >= -32 {
        out.put_u8(value as u8);
    } else if value >= i8::MIN as i64 {
        out.put_u8(INT8);
        out.put_i8(value as i8);
    } else if value >= i16::MIN as i64 {
        out.put_u8(INT16);
        out.put_i16(value as i16);
    } else if value >= i32::MIN as i64 {
        out.put_u8(INT32);
        out.put_i32(value as i32);
    } else {
        out.put_u8(INT64);
        out.put_i64(value);
    }
}

pub fn write_f32(out: &mut BytesMut, value: f32) {
    out.put_u8(FLOAT32);
    out.put_f32(value);
}

pub fn write_f64(out: &mut BytesMut, value: f64) {
    out.put_u8(FLOAT64);
    out.put_f64(value);
}

/// Write a UTF-8 string with the narrowest length tier:
/// fixstr (≤31), str8 (≤255), str16 (≤65535), str32 (≤2³²−1).
///
/// # Errors
/// Returns `EncodeError::SizeLimit` if the byte length exceeds 32 bits.
pub fn write_str(out: &mut BytesMut, value: &str) -> Result<(), EncodeError> {
    let len = value.len();
    if len <= FIXSTR_MAX {
        out.put_u8(FIXSTR | len as u8);
    } else if len <= u8::MAX as usize {
        out.put_u8(STR8);
        out.put_u8(len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(STR16);
        out.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        out.put_u8(STR32);
        out.put_u32(len as u32);
    } else {
        return Err(EncodeError::SizeLimit { len });
    }
    out.put_slice(value.as_bytes());
    Ok(())
}

/// Write a binary blob with the narrowest length tier:
/// bin8 (≤255), bin16 (≤65535), bin32 (≤2³²−1). There is no fix tier.
pub fn write_bin(out: &mut BytesMut, value: &[u8]) -> Result<(), EncodeError> {
    let len = value.len();
    if len <= u8::MAX as usize {
        out.put_u8(BIN8);
        out.put_u8(len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(BIN16);
        out.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        out.put_u8(BIN32);
        out.put_u32(len as u32);
    } else {
        return Err(EncodeError::SizeLimit { len });
    }
    out.put_slice(value);
    Ok(())
}

/// Write an array count header: fixarray (≤15), array16, array32.
pub fn write_array_header(out: &mut BytesMut, len: usize) -> Result<(), EncodeError> {
    if len <= FIXARRAY_MAX {
        out.put_u8(FIXARRAY | len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(ARRAY16);
        out.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        out.put_u8(ARRAY32);
        out.put_u32(len as u32);
    } else {
        return Err(EncodeError::SizeLimit { len });
    }
    Ok(())
}

/// Write a map pair-count header: fixmap (≤15), map16, map32.
pub fn write_map_header(out: &mut BytesMut, len: usize) -> Result<(), EncodeError> {
    if len <= FIXMAP_MAX {
        out.put_u8(FIXMAP | len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(MAP16);
        out.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        out.put_u8(MAP32);
        out.put_u32(len as u32);
    } else {
        return Err(EncodeError::SizeLimit { len });
    }
    Ok(())
}

/// Write a timestamp in the smallest of the three extension forms:
///
/// - timestamp32 (fixext4): zero nanoseconds and seconds within `u32`
/// - timestamp64 (fixext8): seconds within 34 bits, nanoseconds packed in
///   the high 30 bits of one big-endian word
/// - timestamp96 (ext8, length 12): 4-byte nanoseconds then 8-byte signed
///   seconds, for pre-epoch or far-future instants
pub fn write_timestamp(out: &mut BytesMut, ts: Timestamp) -> Result<(), EncodeError> {
    if ts.nanoseconds >= 1_000_000_000 {
        return Err(EncodeError::InvalidTimestamp(ts.nanoseconds));
    }
    if ts.nanoseconds == 0 && (0..=u32::MAX as i64).contains(&ts.seconds) {
        out.put_u8(FIXEXT4);
        out.put_i8(EXT_TIMESTAMP);
        out.put_u32(ts.seconds as u32);
    } else if (0..1i64 << 34).contains(&ts.seconds) {
        let packed = (u64::from(ts.nanoseconds) << 34) | ts.seconds as u64;
        out.put_u8(FIXEXT8);
        out.put_i8(EXT_TIMESTAMP);
        out.put_u64(packed);
    } else {
        out.put_u8(EXT8);
        out.put_u8(12);
        out.put_i8(EXT_TIMESTAMP);
        out.put_u32(ts.nanoseconds);
        out.put_i64(ts.seconds);
    }
    Ok(())
}

// --- Readers ---

pub(crate) fn need(reader: &Bytes, len: usize) -> Result<(), DecodeError> {
    if reader.remaining() < len {
        Err(DecodeError::UnexpectedEnd)
    } else {
        Ok(())
    }
}

pub(crate) fn peek_tag(reader: &Bytes) -> Result<u8, DecodeError> {
    need(reader, 1)?;
    Ok(reader[0])
}

pub(crate) fn read_tag(reader: &mut Bytes) -> Result<u8, DecodeError> {
    need(reader, 1)?;
    Ok(reader.get_u8())
}

/// Read the payload of any integer-family tag as a widened `i128`.
///
/// `i128` covers both the full `u64` and `i64` ranges, so the typed decode
/// entry points can range-check into their targets after the fact.
pub(crate) fn read_int_from_tag(tag: u8, reader: &mut Bytes) -> Result<i128, DecodeError> {
    match tag {
        0x00..=0x7F => Ok(i128::from(tag)),
        0xE0..=0xFF => Ok(i128::from(tag as i8)),
        UINT8 => {
            need(reader, 1)?;
            Ok(i128::from(reader.get_u8()))
        }
        UINT16 => {
            need(reader, 2)?;
            Ok(i128::from(reader.get_u16()))
        }
        UINT32 => {
            need(reader, 4)?;
            Ok(i128::from(reader.get_u32()))
        }
        UINT64 => {
            need(reader, 8)?;
            Ok(i128::from(reader.get_u64()))
        }
        INT8 => {
            need(reader, 1)?;
            Ok(i128::from(reader.get_i8()))
        }
        INT16 => {
            need(reader, 2)?;
            Ok(i128::from(reader.get_i16()))
        }
        INT32 => {
            need(reader, 4)?;
            Ok(i128::from(reader.get_i32()))
        }
        INT64 => {
            need(reader, 8)?;
            Ok(i128::from(reader.get_i64()))
        }
        _ => Err(DecodeError::InvalidFormat { tag }),
    }
}

pub(crate) fn read_str_len(tag: u8, reader: &mut Bytes) -> Result<usize, DecodeError> {
    match tag {
        0xA0..=0xBF => Ok((tag & 0x1F) as usize),
        STR8 => {
            need(reader, 1)?;
            Ok(reader.get_u8() as usize)
        }
        STR16 => {
            need(reader, 2)?;
            Ok(reader.get_u16() as usize)
        }
        STR32 => {
            need(reader, 4)?;
            Ok(reader.get_u32() as usize)
        }
        _ => Err(DecodeError::InvalidFormat { tag }),
    }
}

pub(crate) fn read_bin_len(tag: u8, reader: &mut Bytes) -> Result<usize, DecodeError> {
    match tag {
        BIN8 => {
            need(reader, 1)?;
            Ok(reader.get_u8() as usize)
        }
        BIN16 => {
            need(reader, 2)?;
            Ok(reader.get_u16() as usize)
        }
        BIN32 => {
            need(reader, 4)?;
            Ok(reader.get_u32() as usize)
        }
        _ => Err(DecodeError::InvalidFormat { tag }),
    }
}

pub(crate) fn read_array_len(tag: u8, reader: &mut Bytes) -> Result<usize, DecodeError> {
    match tag {
        0x90..=0x9F => Ok((tag & 0x0F) as usize),
        ARRAY16 => {
            need(reader, 2)?;
            Ok(reader.get_u16() as usize)
        }
        ARRAY32 => {
            need(reader, 4)?;
            Ok(reader.get_u32() as usize)
        }
        _ => Err(DecodeError::InvalidFormat { tag }),
    }
}

pub(crate) fn read_map_len(tag: u8, reader: &mut Bytes) -> Result<usize, DecodeError> {
    match tag {
        0x80..=0x8F => Ok((tag & 0x0F) as usize),
        MAP16 => {
            need(reader, 2)?;
            Ok(reader.get_u16() as usize)
        }
        MAP32 => {
            need(reader, 4)?;
            Ok(reader.get_u32() as usize)
        }
        _ => Err(DecodeError::InvalidFormat { tag }),
    }
}

/// Read the declared payload length of an extension tag, consuming its
/// length bytes. Fixext tags declare their length in the tag itself.
fn read_ext_len(tag: u8, reader: &mut Bytes) -> Result<usize, DecodeError> {
    match tag {
        0xD4 => Ok(1),
        0xD5 => Ok(2),
        FIXEXT4 => Ok(4),
        FIXEXT8 => Ok(8),
        0xD8 => Ok(16),
        EXT8 => {
            need(reader, 1)?;
            Ok(reader.get_u8() as usize)
        }
        0xC8 => {
            need(reader, 2)?;
            Ok(reader.get_u16() as usize)
        }
        0xC9 => {
            need(reader, 4)?;
            Ok(reader.get_u32() as usize)
        }
        _ => Err(DecodeError::InvalidFormat { tag }),
    }
}

/// Read a timestamp from an extension tag.
///
/// # Errors
/// Returns `DecodeError::InvalidExtension` if the extension type is not the
/// reserved timestamp type, the length is not 4, 8, or 12, or the
/// nanoseconds field is a billion or more.
pub(crate) fn read_timestamp_from_tag(tag: u8, reader: &mut Bytes) -> Result<Timestamp, DecodeError> {
    let len = read_ext_len(tag, reader)?;
    need(reader, 1)?;
    let ext_type = reader.get_i8();
    if ext_type != EXT_TIMESTAMP || !matches!(len, 4 | 8 | 12) {
        return Err(DecodeError::InvalidExtension { ext_type, len });
    }
    need(reader, len)?;
    match len {
        4 => Ok(Timestamp::new(i64::from(reader.get_u32()), 0)),
        8 => {
            let packed = reader.get_u64();
            let seconds = (packed & ((1u64 << 34) - 1)) as i64;
            let nanoseconds = (packed >> 34) as u32;
            if nanoseconds >= 1_000_000_000 {
                return Err(DecodeError::InvalidExtension { ext_type, len });
            }
            Ok(Timestamp::new(seconds, nanoseconds))
        }
        _ => {
            let nanoseconds = reader.get_u32();
            let seconds = reader.get_i64();
            if nanoseconds >= 1_000_000_000 {
                return Err(DecodeError::InvalidExtension { ext_type, len });
            }
            Ok(Timestamp::new(seconds, nanoseconds))
        }
    }
}

/// Read a wire string in full. Used for map keys, which are always eager.
pub(crate) fn read_str(reader: &mut Bytes) -> Result<String, DecodeError> {
    let tag = read_tag(reader)?;
    let len = read_str_len(tag, reader)?;
    need(reader, len)?;
    let payload = reader.split_to(len);
    Ok(String::from_utf8(payload.to_vec())?)
}

fn skip_bytes(reader: &mut Bytes, len: usize) -> Result<(), DecodeError> {
    need(reader, len)?;
    reader.advance(len);
    Ok(())
}

/// Advance the cursor past exactly one encoded value, header and payload,
/// without materializing it. Arrays and maps recurse over their children.
pub(crate) fn skip_value(reader: &mut Bytes) -> Result<(), DecodeError> {
    let tag = read_tag(reader)?;
    match classify(tag)? {
        Format::Nil | Format::Bool => Ok(()),
        Format::UInt | Format::Int => {
            let len = match tag {
                0x00..=0x7F | 0xE0..=0xFF => 0,
                UINT8 | INT8 => 1,
                UINT16 | INT16 => 2,
                UINT32 | INT32 => 4,
                _ => 8,
            };
            skip_bytes(reader, len)
        }
        Format::Float32 => skip_bytes(reader, 4),
        Format::Float64 => skip_bytes(reader, 8),
        Format::Str => {
            let len = read_str_len(tag, reader)?;
            skip_bytes(reader, len)
        }
        Format::Bin => {
            let len = read_bin_len(tag, reader)?;
            skip_bytes(reader, len)
        }
        Format::Array => {
            let len = read_array_len(tag, reader)?;
            for _ in 0..len {
                skip_value(reader)?;
            }
            Ok(())
        }
        Format::Map => {
            let len = read_map_len(tag, reader)?;
            for _ in 0..len {
                skip_value(reader)?;
                skip_value(reader)?;
            }
            Ok(())
        }
        Format::Ext => {
            let len = read_ext_len(tag, reader)?;
            skip_bytes(reader, 1 + len)
        }
    }
}

/// Split off the byte range of exactly one encoded value, advancing the
/// cursor past it. The returned slice shares the underlying buffer.
pub(crate) fn split_value(reader: &mut Bytes) -> Result<Bytes, DecodeError> {
    let mut probe = reader.clone();
    skip_value(&mut probe)?;
    let consumed = reader.remaining() - probe.remaining();
    Ok(reader.split_to(consumed))
}
