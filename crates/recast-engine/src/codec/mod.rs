//! Structural transcoding between JSON value trees and the binary wire form.
//!
//! Encoding is strict: a candidate schema rejects the tree on any unknown
//! key, missing required field, or type mismatch. Error payloads carry no
//! type discriminator on the wire, so callers pass an ordered candidate list
//! and the first schema that populates wins.

pub mod case;

mod wire;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::{Bytes, BytesMut};
use prost::encoding::WireType;
use prost::DecodeError;
use serde_json::{Map, Value};
use tracing::debug;

use crate::schema::{FieldDescriptor, FieldKind, MessageDescriptor};

use wire::RawValue;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("no candidate schema accepted the payload: [{}]", failures.join("; "))]
    NoCandidate { failures: Vec<String> },
    #[error("message '{message}' does not declare field '{field}'")]
    UnknownField { message: String, field: String },
    #[error("message '{message}' is missing required field '{field}'")]
    MissingField { message: String, field: String },
    #[error("field '{field}' of message '{message}' expects {expected}")]
    FieldType {
        message: String,
        field: String,
        expected: &'static str,
    },
    #[error("payload for message '{message}' must be a JSON object")]
    NotAnObject { message: String },
    #[error("malformed wire payload for message '{message}': {source}")]
    Wire {
        message: String,
        #[source]
        source: DecodeError,
    },
}

/// Encode a value tree with the first candidate schema that accepts it.
///
/// The candidate list is normally a single resolved schema; for non-success
/// responses the caller substitutes the binding's error-schema list.
pub fn encode(tree: &Value, candidates: &[Arc<MessageDescriptor>]) -> Result<Bytes, CodecError> {
    let mut failures = Vec::new();
    for descriptor in candidates {
        match encode_message(tree, descriptor) {
            Ok(bytes) => {
                debug!(schema = %descriptor.full_name(), "payload encoded");
                return Ok(bytes);
            }
            Err(err) => failures.push(format!("{}: {}", descriptor.full_name(), err)),
        }
    }
    Err(CodecError::NoCandidate { failures })
}

/// Decode a wire payload into a JSON tree keyed by the schema's declared
/// field names. Unknown tags are skipped; absent fields are omitted.
pub fn decode(bytes: &[u8], descriptor: &MessageDescriptor) -> Result<Value, CodecError> {
    decode_message(bytes, descriptor).map_err(|source| CodecError::Wire {
        message: descriptor.full_name(),
        source,
    })
}

fn encode_message(tree: &Value, descriptor: &MessageDescriptor) -> Result<Bytes, CodecError> {
    let map = match tree {
        Value::Object(map) => map,
        _ => {
            return Err(CodecError::NotAnObject {
                message: descriptor.full_name(),
            })
        }
    };

    for key in map.keys() {
        if descriptor.field_by_name(key).is_none() {
            return Err(CodecError::UnknownField {
                message: descriptor.full_name(),
                field: key.clone(),
            });
        }
    }

    let mut buf = BytesMut::new();
    for field in &descriptor.fields {
        match map.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(CodecError::MissingField {
                        message: descriptor.full_name(),
                        field: field.name.clone(),
                    });
                }
            }
            Some(value) => encode_field(field, value, descriptor, &mut buf)?,
        }
    }
    Ok(buf.freeze())
}

fn encode_field(
    field: &FieldDescriptor,
    value: &Value,
    owner: &MessageDescriptor,
    buf: &mut BytesMut,
) -> Result<(), CodecError> {
    if field.repeated {
        let items = value
            .as_array()
            .ok_or_else(|| field_type(owner, field, "a JSON array"))?;
        for item in items {
            encode_single(field, item, owner, buf)?;
        }
        return Ok(());
    }
    encode_single(field, value, owner, buf)
}

fn encode_single(
    field: &FieldDescriptor,
    value: &Value,
    owner: &MessageDescriptor,
    buf: &mut BytesMut,
) -> Result<(), CodecError> {
    match &field.kind {
        FieldKind::String => {
            let text = value
                .as_str()
                .ok_or_else(|| field_type(owner, field, "a string"))?;
            wire::put_len_field(field.number, text.as_bytes(), buf);
        }
        FieldKind::Bytes => {
            let encoded = value
                .as_str()
                .ok_or_else(|| field_type(owner, field, "a base64 string"))?;
            let raw = BASE64
                .decode(encoded)
                .map_err(|_| field_type(owner, field, "a base64 string"))?;
            wire::put_len_field(field.number, &raw, buf);
        }
        FieldKind::Bool => {
            let flag = value
                .as_bool()
                .ok_or_else(|| field_type(owner, field, "a boolean"))?;
            wire::put_varint_field(field.number, flag as u64, buf);
        }
        FieldKind::Int32 => {
            let n = json_i64(value)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| field_type(owner, field, "a 32-bit integer"))?;
            wire::put_varint_field(field.number, n as i64 as u64, buf);
        }
        FieldKind::Int64 => {
            let n = json_i64(value).ok_or_else(|| field_type(owner, field, "a 64-bit integer"))?;
            wire::put_varint_field(field.number, n as u64, buf);
        }
        FieldKind::Uint32 => {
            let n = json_u64(value)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| field_type(owner, field, "an unsigned 32-bit integer"))?;
            wire::put_varint_field(field.number, u64::from(n), buf);
        }
        FieldKind::Uint64 => {
            let n =
                json_u64(value).ok_or_else(|| field_type(owner, field, "an unsigned integer"))?;
            wire::put_varint_field(field.number, n, buf);
        }
        FieldKind::Double => {
            let n = json_f64(value).ok_or_else(|| field_type(owner, field, "a number"))?;
            wire::put_double_field(field.number, n, buf);
        }
        FieldKind::Float => {
            let n = json_f64(value).ok_or_else(|| field_type(owner, field, "a number"))?;
            wire::put_float_field(field.number, n as f32, buf);
        }
        FieldKind::Message(inner) => {
            let nested = encode_message(value, inner)?;
            wire::put_len_field(field.number, &nested, buf);
        }
    }
    Ok(())
}

fn field_type(owner: &MessageDescriptor, field: &FieldDescriptor, expected: &'static str) -> CodecError {
    CodecError::FieldType {
        message: owner.full_name(),
        field: field.name.clone(),
        expected,
    }
}

fn json_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        // Protobuf JSON writes 64-bit integers as strings.
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

fn decode_message(bytes: &[u8], descriptor: &MessageDescriptor) -> Result<Value, DecodeError> {
    let mut map = Map::new();
    let mut buf = bytes;
    while !buf.is_empty() {
        let (number, raw) = wire::read_field(&mut buf)?;
        let field = match descriptor.field_by_number(number) {
            Some(field) => field,
            // Unknown tag: the raw value is already consumed, drop it.
            None => continue,
        };

        if field.repeated {
            let slot = map
                .entry(field.name.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = slot {
                match raw {
                    RawValue::LengthDelimited(ref payload) if field.kind.is_packable() => {
                        decode_packed(&field.kind, payload, items)?;
                    }
                    raw => items.push(decode_value(&field.kind, raw)?),
                }
            }
        } else {
            map.insert(field.name.clone(), decode_value(&field.kind, raw)?);
        }
    }
    Ok(Value::Object(map))
}

fn decode_packed(
    kind: &FieldKind,
    payload: &[u8],
    items: &mut Vec<Value>,
) -> Result<(), DecodeError> {
    let wire_type = match kind {
        FieldKind::Double => WireType::SixtyFourBit,
        FieldKind::Float => WireType::ThirtyTwoBit,
        _ => WireType::Varint,
    };
    let mut buf = payload;
    while !buf.is_empty() {
        let raw = wire::read_value(wire_type, &mut buf)?;
        items.push(decode_value(kind, raw)?);
    }
    Ok(())
}

fn decode_value(kind: &FieldKind, raw: RawValue) -> Result<Value, DecodeError> {
    match (kind, raw) {
        (FieldKind::String, RawValue::LengthDelimited(payload)) => String::from_utf8(payload)
            .map(Value::String)
            .map_err(|_| DecodeError::new("invalid UTF-8 in string field")),
        (FieldKind::Bytes, RawValue::LengthDelimited(payload)) => {
            Ok(Value::String(BASE64.encode(payload)))
        }
        (FieldKind::Message(inner), RawValue::LengthDelimited(payload)) => {
            decode_message(&payload, inner)
        }
        (FieldKind::Bool, RawValue::Varint(v)) => Ok(Value::Bool(v != 0)),
        (FieldKind::Int32, RawValue::Varint(v)) => Ok(Value::from(v as i64 as i32)),
        (FieldKind::Int64, RawValue::Varint(v)) => Ok(Value::from(v as i64)),
        (FieldKind::Uint32, RawValue::Varint(v)) => Ok(Value::from(v as u32)),
        (FieldKind::Uint64, RawValue::Varint(v)) => Ok(Value::from(v)),
        (FieldKind::Double, RawValue::SixtyFourBit(bits)) => Ok(json_float(f64::from_bits(bits))),
        (FieldKind::Float, RawValue::ThirtyTwoBit(bits)) => {
            Ok(json_float(f64::from(f32::from_bits(bits))))
        }
        _ => Err(DecodeError::new(
            "wire type does not match declared field kind",
        )),
    }
}

fn json_float(value: f64) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_owned())
    } else if value.is_infinite() {
        Value::String(if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned())
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
