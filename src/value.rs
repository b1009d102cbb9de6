//! Dynamic value model for decoded records.
//!
//! The engine is schema-driven, so decoded data is held in an explicit
//! [`Value`] tree rather than in per-format structs. A [`Record`] pairs a
//! schema with one value per field, in declaration order; skipped
//! (version-gated) fields hold their kind's default.

use std::sync::Arc;

use crate::schema::{FieldKind, Schema};

/// One decoded or to-be-encoded field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    UInt(u64),
    Float(f64),
    Bool(bool),
    Varint(u64),
    /// `None` is the absent marker on the wire; an empty string is encoded
    /// the same way.
    Str(Option<String>),
    Record(Record),
    Seq(Vec<Value>),
}

impl Value {
    /// Convenience constructor for present text.
    pub fn str(text: impl Into<String>) -> Value {
        Value::Str(Some(text.into()))
    }

    /// The value a skipped field takes.
    pub(crate) fn default_for(kind: &FieldKind) -> Value {
        match kind {
            FieldKind::UInt(_) => Value::UInt(0),
            FieldKind::Float(_) => Value::Float(0.0),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Varint => Value::Varint(0),
            FieldKind::Str => Value::Str(None),
            FieldKind::Record { schema, .. } => Value::Record(Record::new(schema)),
            FieldKind::Group { .. } => Value::Seq(Vec::new()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Varint(_) => "varint",
            Value::Str(_) => "text",
            Value::Record(_) => "record",
            Value::Seq(_) => "group",
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_varint(&self) -> Option<u64> {
        match self {
            Value::Varint(v) => Some(*v),
            _ => None,
        }
    }

    /// Present text, or `None` for an absent string value (and for any other
    /// value variant).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => s.as_deref(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(v) => Some(v),
            _ => None,
        }
    }
}

/// One structured record: a schema plus one value per field.
#[derive(Clone, Debug)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

impl Record {
    /// A record with every field at its default value.
    pub fn new(schema: &Arc<Schema>) -> Record {
        let values = schema
            .fields()
            .iter()
            .map(|f| Value::default_for(f.kind()))
            .collect();
        Record {
            schema: schema.clone(),
            values,
        }
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, values: Vec<Value>) -> Record {
        Record { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values in field declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.schema.index_of(name).map(|i| &mut self.values[i])
    }

    /// Replaces the value of `name`, returning the previous value, or `None`
    /// if the schema has no such field (the record is left unchanged).
    ///
    /// Setting a repeated group also updates its linked count field to the
    /// sequence's actual length; the encoder would derive that length anyway,
    /// but keeping the pair in sync makes round-trip comparisons exact.
    pub fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        let index = self.schema.index_of(name)?;
        if let (FieldKind::Group { count_field, .. }, Value::Seq(elems)) =
            (self.schema.fields()[index].kind(), &value)
        {
            self.values[*count_field] = Value::UInt(elems.len() as u64);
        }
        let previous = std::mem::replace(&mut self.values[index], value);
        Some(previous)
    }
}
