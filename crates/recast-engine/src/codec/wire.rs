//! Protobuf wire-format primitives.
//!
//! Thin layer over `prost::encoding`; the field-to-JSON mapping lives in the
//! parent module.

use bytes::{Buf, BufMut, BytesMut};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, WireType};
use prost::DecodeError;

pub(crate) fn put_varint_field(number: u32, value: u64, buf: &mut BytesMut) {
    encode_key(number, WireType::Varint, buf);
    encode_varint(value, buf);
}

pub(crate) fn put_len_field(number: u32, payload: &[u8], buf: &mut BytesMut) {
    encode_key(number, WireType::LengthDelimited, buf);
    encode_varint(payload.len() as u64, buf);
    buf.put_slice(payload);
}

pub(crate) fn put_double_field(number: u32, value: f64, buf: &mut BytesMut) {
    encode_key(number, WireType::SixtyFourBit, buf);
    buf.put_f64_le(value);
}

pub(crate) fn put_float_field(number: u32, value: f32, buf: &mut BytesMut) {
    encode_key(number, WireType::ThirtyTwoBit, buf);
    buf.put_f32_le(value);
}

/// One field occurrence read off the wire, value still untyped.
#[derive(Debug)]
pub(crate) enum RawValue {
    Varint(u64),
    SixtyFourBit(u64),
    LengthDelimited(Vec<u8>),
    ThirtyTwoBit(u32),
}

/// Read the next key and raw value from the buffer.
pub(crate) fn read_field(buf: &mut &[u8]) -> Result<(u32, RawValue), DecodeError> {
    let (number, wire_type) = decode_key(buf)?;
    let value = read_value(wire_type, buf)?;
    Ok((number, value))
}

pub(crate) fn read_value(wire_type: WireType, buf: &mut &[u8]) -> Result<RawValue, DecodeError> {
    match wire_type {
        WireType::Varint => Ok(RawValue::Varint(decode_varint(buf)?)),
        WireType::SixtyFourBit => {
            if buf.remaining() < 8 {
                return Err(DecodeError::new("buffer underflow in 64-bit field"));
            }
            Ok(RawValue::SixtyFourBit(buf.get_u64_le()))
        }
        WireType::ThirtyTwoBit => {
            if buf.remaining() < 4 {
                return Err(DecodeError::new("buffer underflow in 32-bit field"));
            }
            Ok(RawValue::ThirtyTwoBit(buf.get_u32_le()))
        }
        WireType::LengthDelimited => {
            let len = decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(DecodeError::new("length-delimited field overruns buffer"));
            }
            let mut payload = vec![0u8; len];
            buf.copy_to_slice(&mut payload);
            Ok(RawValue::LengthDelimited(payload))
        }
        WireType::StartGroup | WireType::EndGroup => {
            Err(DecodeError::new("group wire types are not supported"))
        }
    }
}
