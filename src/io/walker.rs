//! The versioned struct walker: one generic traversal engine that applies
//! the leaf codecs field-by-field according to a schema.
//!
//! Per field, in declaration order:
//! 1. gate check — skip the field (consume/emit nothing) when the current
//!    version context falls outside its gate;
//! 2. version capture — a carrier's value becomes the context for every
//!    later gate check in this traversal;
//! 3. kind dispatch — to the primitive, varint or string codec, or
//!    recursion for nested records;
//! 4. repeated groups — the element count is the sibling field immediately
//!    before the group; on encode that count is derived from the actual
//!    sequence, never from a stored value.
//!
//! Field order is the wire format: decode and encode traverse identically.
//! The first failure aborts the whole call with the failing field's path.

use std::io::{Read, Write};
use std::sync::Arc;

use log::{debug, trace};

use crate::schema::{Field, FieldKind, Schema};
use crate::value::{Record, Value};

use super::utils::{ReadUtils, WriteUtils};
use super::{Error, Result};

/// Decodes one record. The version context starts unset and is scoped to
/// this call.
pub fn decode_record<R: Read + ?Sized>(r: &mut R, schema: &Arc<Schema>) -> Result<Record> {
    decode_with_version(r, schema, None)
}

/// Encodes one record. The version context starts unset and is scoped to
/// this call.
pub fn encode_record<W: Write + ?Sized>(w: &mut W, record: &Record) -> Result<()> {
    encode_with_version(w, record, None)
}

fn gate_admits(field: &Field, version: Option<u32>) -> Result<bool> {
    if field.gate().is_open() {
        return Ok(true);
    }
    match version {
        Some(v) => Ok(field.gate().admits(v)),
        None => Err(Error::UnresolvedVersion),
    }
}

fn capture_version(value: &Value) -> Result<u32> {
    let v = value.as_uint().ok_or(Error::ValueMismatch {
        expected: "uint",
        found: value.kind_name(),
    })?;
    u32::try_from(v).map_err(|_| Error::IntOutOfRange { value: v, width: 4 })
}

fn decode_with_version<R: Read + ?Sized>(
    r: &mut R,
    schema: &Arc<Schema>,
    inherited: Option<u32>,
) -> Result<Record> {
    debug!("decoding record {}", schema.name());
    let mut version = inherited;
    let mut values: Vec<Value> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        if !gate_admits(field, version).map_err(|e| e.at(field.name()))? {
            trace!("> [{}]: skipped (version {:?})", field.name(), version);
            values.push(Value::default_for(field.kind()));
            continue;
        }

        let value = decode_field(r, field, &values, version).map_err(|e| e.at(field.name()))?;
        trace!("> [{}]: {:?}", field.name(), value);

        if field.is_version() {
            version = Some(capture_version(&value).map_err(|e| e.at(field.name()))?);
        }
        values.push(value);
    }

    Ok(Record::from_parts(schema.clone(), values))
}

fn decode_field<R: Read + ?Sized>(
    r: &mut R,
    field: &Field,
    decoded: &[Value],
    version: Option<u32>,
) -> Result<Value> {
    match field.kind() {
        FieldKind::Group { elem, count_field } => {
            let count = group_count(decoded, *count_field)?;
            let mut elems = Vec::with_capacity(count.min(4096));
            for j in 0..count {
                let value =
                    decode_value(r, elem, version).map_err(|e| e.at(&format!("[{j}]")))?;
                elems.push(value);
            }
            Ok(Value::Seq(elems))
        }
        kind => decode_value(r, kind, version),
    }
}

fn decode_value<R: Read + ?Sized>(
    r: &mut R,
    kind: &FieldKind,
    version: Option<u32>,
) -> Result<Value> {
    match kind {
        FieldKind::UInt(width) => Ok(Value::UInt(r.read_uint_le(*width)?)),
        FieldKind::Float(width) => Ok(Value::Float(r.read_float_le(*width)?)),
        FieldKind::Bool => Ok(Value::Bool(r.read_bool()?)),
        FieldKind::Varint => Ok(Value::Varint(r.read_uleb128()?)),
        FieldKind::Str => Ok(Value::Str(r.read_text()?)),
        FieldKind::Record {
            schema,
            inherit_version,
        } => {
            let inherited = if *inherit_version { version } else { None };
            Ok(Value::Record(decode_with_version(r, schema, inherited)?))
        }
        FieldKind::Group { .. } => Err(Error::UnsupportedFieldKind(
            "repeated group as a group element".to_owned(),
        )),
    }
}

/// The element count for a group, taken from the already-decoded sibling
/// count field.
fn group_count(decoded: &[Value], count_field: usize) -> Result<usize> {
    let count = decoded
        .get(count_field)
        .and_then(Value::as_uint)
        .ok_or(Error::ValueMismatch {
            expected: "uint",
            found: "missing count field",
        })?;
    usize::try_from(count).map_err(|_| Error::TooManyElements { len: count })
}

fn encode_with_version<W: Write + ?Sized>(
    w: &mut W,
    record: &Record,
    inherited: Option<u32>,
) -> Result<()> {
    let schema = record.schema();
    debug!("encoding record {}", schema.name());
    let mut version = inherited;

    for (index, field) in schema.fields().iter().enumerate() {
        if !gate_admits(field, version).map_err(|e| e.at(field.name()))? {
            trace!("> [{}]: skipped (version {:?})", field.name(), version);
            continue;
        }

        // A count field is written from the linked group's actual length,
        // not from whatever value the record stores for it.
        if let Some(group_index) = schema.feeds(index) {
            let len = encode_count(w, field, &record.values()[group_index])
                .map_err(|e| e.at(field.name()))?;
            trace!("> [{}]: {} (derived)", field.name(), len);
            continue;
        }

        let value = &record.values()[index];
        if field.is_version() {
            version = Some(capture_version(value).map_err(|e| e.at(field.name()))?);
        }

        trace!("> [{}]: {:?}", field.name(), value);
        encode_field(w, field, value, version).map_err(|e| e.at(field.name()))?;
    }

    Ok(())
}

fn encode_count<W: Write + ?Sized>(w: &mut W, field: &Field, group: &Value) -> Result<usize> {
    let elems = group.as_seq().ok_or(Error::ValueMismatch {
        expected: "group",
        found: group.kind_name(),
    })?;
    let len = elems.len();
    if len > u32::MAX as usize {
        return Err(Error::TooManyElements { len: len as u64 });
    }
    let FieldKind::UInt(width) = field.kind() else {
        return Err(Error::ValueMismatch {
            expected: "uint",
            found: field.kind().name(),
        });
    };
    w.write_uint_le(*width, len as u64)?;
    Ok(len)
}

fn encode_field<W: Write + ?Sized>(
    w: &mut W,
    field: &Field,
    value: &Value,
    version: Option<u32>,
) -> Result<()> {
    match (field.kind(), value) {
        (FieldKind::Group { elem, .. }, Value::Seq(elems)) => {
            for (j, e) in elems.iter().enumerate() {
                encode_value(w, elem, e, version).map_err(|err| err.at(&format!("[{j}]")))?;
            }
            Ok(())
        }
        (FieldKind::Group { .. }, other) => Err(Error::ValueMismatch {
            expected: "group",
            found: other.kind_name(),
        }),
        (kind, value) => encode_value(w, kind, value, version),
    }
}

fn encode_value<W: Write + ?Sized>(
    w: &mut W,
    kind: &FieldKind,
    value: &Value,
    version: Option<u32>,
) -> Result<()> {
    match (kind, value) {
        (FieldKind::UInt(width), Value::UInt(v)) => w.write_uint_le(*width, *v),
        (FieldKind::Float(width), Value::Float(v)) => w.write_float_le(*width, *v),
        (FieldKind::Bool, Value::Bool(v)) => w.write_bool(*v),
        (FieldKind::Varint, Value::Varint(v)) => w.write_uleb128(*v),
        (FieldKind::Str, Value::Str(s)) => w.write_text(s.as_deref()),
        (
            FieldKind::Record {
                schema,
                inherit_version,
            },
            Value::Record(nested),
        ) => {
            if !Arc::ptr_eq(schema, nested.schema()) {
                return Err(Error::ValueMismatch {
                    expected: schema.name(),
                    found: nested.schema().name(),
                });
            }
            let inherited = if *inherit_version { version } else { None };
            encode_with_version(w, nested, inherited)
        }
        (FieldKind::Group { .. }, _) => Err(Error::UnsupportedFieldKind(
            "repeated group as a group element".to_owned(),
        )),
        (kind, value) => Err(Error::ValueMismatch {
            expected: kind.name(),
            found: value.kind_name(),
        }),
    }
}
