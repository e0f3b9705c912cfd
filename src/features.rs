//! Feature-gated interop with external crates.

#[cfg(feature = "chrono")]
use chrono::{DateTime, Local, Utc};

#[allow(unused_imports)]
use crate::{Decode, DecodeError, Decoder, Encode, EncodeError, Encoder, Timestamp};

// --- chrono::DateTime<Utc> ---
/// Encodes a `chrono::DateTime<Utc>` through the timestamp extension, so the
/// wire form is identical to an equivalent [`Timestamp`].
#[cfg(feature = "chrono")]
impl Encode for DateTime<Utc> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        let ts = Timestamp::new(self.timestamp(), self.timestamp_subsec_nanos());
        encoder.single_value().encode_timestamp(ts)
    }
}
#[cfg(feature = "chrono")]
impl Decode for DateTime<Utc> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let ts = decoder.single_value().decode_timestamp()?;
        DateTime::from_timestamp(ts.seconds, ts.nanoseconds)
            .ok_or(DecodeError::TimestampOutOfRange)
    }
}

// --- chrono::DateTime<Local> ---
/// Local datetimes are normalized to UTC on the wire; the zone offset is not
/// transmitted.
#[cfg(feature = "chrono")]
impl Encode for DateTime<Local> {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        self.with_timezone(&Utc).encode(encoder)
    }
}
#[cfg(feature = "chrono")]
impl Decode for DateTime<Local> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let utc = DateTime::<Utc>::decode(decoder)?;
        Ok(utc.with_timezone(&Local))
    }
}
