//! Schema data model: field descriptors, record schemas and the builder
//! that validates them.
//!
//! A [`Schema`] is an immutable, ordered list of [`Field`] descriptors.
//! Declaration order **is** wire order; the walker in [`crate::io::walker`]
//! visits fields in this order on both decode and encode. Schemas are built
//! once (typically into a `static`, see [`crate::catalog`]) and shared as
//! `Arc<Schema>` for the lifetime of the process.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

/// Restricts a field's presence to a sub-range of format versions.
///
/// Boundary semantics, applied identically on decode and encode: a field is
/// present while `since <= version < until`. In other words a field is
/// **excluded once the version reaches or exceeds its end bound**, and while
/// the version is still below its start bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionGate {
    pub since: Option<u32>,
    pub until: Option<u32>,
}

impl VersionGate {
    /// A gate that admits every version.
    pub const OPEN: VersionGate = VersionGate {
        since: None,
        until: None,
    };

    pub fn is_open(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// Whether a record of the given format version carries this field.
    pub fn admits(&self, version: u32) -> bool {
        if let Some(until) = self.until {
            if version >= until {
                return false;
            }
        }
        if let Some(since) = self.since {
            if version < since {
                return false;
            }
        }
        true
    }
}

/// The wire shape of a single field.
#[derive(Clone, Debug)]
pub enum FieldKind {
    /// Unsigned little-endian integer of the given byte width (1, 2, 4 or 8).
    UInt(u8),
    /// IEEE754 little-endian float of the given byte width (4 or 8).
    Float(u8),
    /// One byte, false iff zero.
    Bool,
    /// ULEB128 variable-length unsigned integer.
    Varint,
    /// Marker-prefixed, ULEB128-length-prefixed text.
    Str,
    /// Nested record with its own traversal. The nested traversal starts with
    /// no version context unless `inherit_version` is set, in which case the
    /// parent's current context carries over (used where a nested layout is
    /// gated by the outer file's version).
    Record {
        schema: Arc<Schema>,
        inherit_version: bool,
    },
    /// Repeated group of `elem`. The element count is supplied by the sibling
    /// field at index `count_field`, which is always the field immediately
    /// before the group. The link is resolved once when the schema is built;
    /// use [`SchemaBuilder::counted`] to create the pair.
    Group {
        elem: Box<FieldKind>,
        count_field: usize,
    },
}

impl FieldKind {
    /// Nested record that starts with a fresh version context.
    pub fn record_of(schema: &Arc<Schema>) -> FieldKind {
        FieldKind::Record {
            schema: schema.clone(),
            inherit_version: false,
        }
    }

    /// Nested record that inherits the surrounding version context.
    pub fn inherited_record(schema: &Arc<Schema>) -> FieldKind {
        FieldKind::Record {
            schema: schema.clone(),
            inherit_version: true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::UInt(_) => "uint",
            FieldKind::Float(_) => "float",
            FieldKind::Bool => "bool",
            FieldKind::Varint => "varint",
            FieldKind::Str => "text",
            FieldKind::Record { .. } => "record",
            FieldKind::Group { .. } => "group",
        }
    }
}

// Sentinel until the builder resolves the count link.
const UNLINKED: usize = usize::MAX;

/// A single field descriptor: name, wire shape, version gate.
#[derive(Clone, Debug)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    gate: VersionGate,
    is_version: bool,
}

impl Field {
    pub fn new(name: &'static str, kind: FieldKind) -> Field {
        Field {
            name,
            kind,
            gate: VersionGate::OPEN,
            is_version: false,
        }
    }

    pub fn uint(name: &'static str, width: u8) -> Field {
        Field::new(name, FieldKind::UInt(width))
    }

    pub fn float(name: &'static str, width: u8) -> Field {
        Field::new(name, FieldKind::Float(width))
    }

    pub fn boolean(name: &'static str) -> Field {
        Field::new(name, FieldKind::Bool)
    }

    pub fn varint(name: &'static str) -> Field {
        Field::new(name, FieldKind::Varint)
    }

    pub fn text(name: &'static str) -> Field {
        Field::new(name, FieldKind::Str)
    }

    pub fn record(name: &'static str, schema: &Arc<Schema>) -> Field {
        Field::new(name, FieldKind::record_of(schema))
    }

    /// Repeated group of `elem`; must be added through
    /// [`SchemaBuilder::counted`] so the count link gets resolved.
    pub fn group(name: &'static str, elem: FieldKind) -> Field {
        Field::new(
            name,
            FieldKind::Group {
                elem: Box::new(elem),
                count_field: UNLINKED,
            },
        )
    }

    /// Present only from format version `version` on.
    pub fn since(mut self, version: u32) -> Field {
        self.gate.since = Some(version);
        self
    }

    /// Absent once the format version reaches `version`.
    pub fn until(mut self, version: u32) -> Field {
        self.gate.until = Some(version);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    /// Whether this field is the schema's version carrier.
    pub fn is_version(&self) -> bool {
        self.is_version
    }
}

/// Why a schema failed to build.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate field name {name:?}")]
    DuplicateField { name: &'static str },
    #[error("schema declares more than one version carrier")]
    MultipleVersionCarriers,
    #[error("version carrier {name:?} must be an ungated 4-byte unsigned integer")]
    BadVersionCarrier { name: &'static str },
    #[error("field {name:?} is version-gated but declared before the version carrier")]
    GatedBeforeCarrier { name: &'static str },
    #[error("field {name:?} has an empty version range")]
    EmptyGate { name: &'static str },
    #[error("group {name:?} has a bad count link: {reason}")]
    BadCountLink {
        name: &'static str,
        reason: &'static str,
    },
    #[error("group {name:?} nests another repeated group as its element")]
    NestedGroup { name: &'static str },
}

/// An immutable, ordered record layout.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    fields: Vec<Field>,
    index: IndexMap<&'static str, usize>,
    version_field: Option<usize>,
    feeds: Vec<Option<usize>>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fields in declaration (= wire) order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// Index of the version carrier, if the schema has one.
    pub fn version_field(&self) -> Option<usize> {
        self.version_field
    }

    /// If the field at `index` is a count field, the index of the group it
    /// feeds.
    pub(crate) fn feeds(&self, index: usize) -> Option<usize> {
        self.feeds.get(index).copied().flatten()
    }
}

/// Builds and validates a [`Schema`].
///
/// # Example
/// ```
/// use osu_db_io::schema::{Field, FieldKind, Schema};
///
/// let schema = Schema::builder("Example")
///     .version("Version")
///     .field(Field::text("Name"))
///     .field(Field::uint("Rank", 4).since(20140609))
///     .counted("NumTags", Field::group("Tags", FieldKind::Str))
///     .build()
///     .unwrap();
/// assert_eq!(schema.fields().len(), 5);
/// ```
pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: Field) -> SchemaBuilder {
        self.fields.push(field);
        self
    }

    /// Adds the designated version carrier: a 4-byte unsigned integer whose
    /// value becomes the version context for every gate check that follows.
    pub fn version(mut self, name: &'static str) -> SchemaBuilder {
        self.fields.push(Field {
            name,
            kind: FieldKind::UInt(4),
            gate: VersionGate::OPEN,
            is_version: true,
        });
        self
    }

    /// Adds a 4-byte count field immediately followed by the repeated group
    /// it counts. The count field takes over the group's version gate, so the
    /// pair is always present or absent together.
    pub fn counted(mut self, count_name: &'static str, mut group: Field) -> SchemaBuilder {
        let count_index = self.fields.len();
        self.fields.push(Field {
            name: count_name,
            kind: FieldKind::UInt(4),
            gate: group.gate,
            is_version: false,
        });
        if let FieldKind::Group { count_field, .. } = &mut group.kind {
            *count_field = count_index;
        }
        self.fields.push(group);
        self
    }

    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let fields = self.fields;

        let mut index = IndexMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name, i).is_some() {
                return Err(SchemaError::DuplicateField { name: field.name });
            }
        }

        let mut version_field = None;
        for (i, field) in fields.iter().enumerate() {
            if !field.is_version {
                continue;
            }
            if version_field.is_some() {
                return Err(SchemaError::MultipleVersionCarriers);
            }
            if !matches!(field.kind, FieldKind::UInt(4)) || !field.gate.is_open() {
                return Err(SchemaError::BadVersionCarrier { name: field.name });
            }
            version_field = Some(i);
        }

        for (i, field) in fields.iter().enumerate() {
            if field.gate.is_open() {
                continue;
            }
            if let (Some(since), Some(until)) = (field.gate.since, field.gate.until) {
                if since >= until {
                    return Err(SchemaError::EmptyGate { name: field.name });
                }
            }
            if let Some(carrier) = version_field {
                if i < carrier {
                    return Err(SchemaError::GatedBeforeCarrier { name: field.name });
                }
            }
        }

        let mut feeds = vec![None; fields.len()];
        for (i, field) in fields.iter().enumerate() {
            let FieldKind::Group { elem, count_field } = &field.kind else {
                continue;
            };
            if matches!(**elem, FieldKind::Group { .. }) {
                return Err(SchemaError::NestedGroup { name: field.name });
            }
            if i == 0 || *count_field != i - 1 {
                return Err(SchemaError::BadCountLink {
                    name: field.name,
                    reason: "count field must be the field immediately before the group",
                });
            }
            let count = &fields[*count_field];
            if !matches!(count.kind, FieldKind::UInt(4)) || count.is_version {
                return Err(SchemaError::BadCountLink {
                    name: field.name,
                    reason: "count field must be a plain 4-byte unsigned integer",
                });
            }
            if count.gate != field.gate {
                return Err(SchemaError::BadCountLink {
                    name: field.name,
                    reason: "count field and group must share one version gate",
                });
            }
            feeds[*count_field] = Some(i);
        }

        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            index,
            version_field,
            feeds,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_boundaries() {
        let gate = VersionGate {
            since: Some(10),
            until: Some(20),
        };
        assert!(!gate.admits(9));
        assert!(gate.admits(10));
        assert!(gate.admits(19));
        assert!(!gate.admits(20));
        assert!(!gate.admits(21));
        assert!(VersionGate::OPEN.admits(0));
    }

    #[test]
    fn builder_resolves_count_link() {
        let schema = Schema::builder("T")
            .version("Version")
            .counted("NumItems", Field::group("Items", FieldKind::Str).since(5))
            .build()
            .unwrap();

        let count = schema.field("NumItems").unwrap();
        assert_eq!(count.gate().since, Some(5));
        match schema.field("Items").unwrap().kind() {
            FieldKind::Group { count_field, .. } => assert_eq!(*count_field, 1),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(schema.feeds(1), Some(2));
        assert_eq!(schema.feeds(2), None);
        assert_eq!(schema.version_field(), Some(0));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Schema::builder("T")
            .field(Field::uint("A", 4))
            .field(Field::text("A"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField { name: "A" });
    }

    #[test]
    fn rejects_gated_field_before_carrier() {
        let err = Schema::builder("T")
            .field(Field::uint("Early", 2).since(3))
            .version("Version")
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::GatedBeforeCarrier { name: "Early" });
    }

    #[test]
    fn rejects_unlinked_group() {
        let err = Schema::builder("T")
            .field(Field::group("Items", FieldKind::Str))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::BadCountLink { name: "Items", .. }));
    }

    #[test]
    fn rejects_empty_gate() {
        let err = Schema::builder("T")
            .version("Version")
            .field(Field::uint("A", 1).since(7).until(7))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyGate { name: "A" });
    }

    #[test]
    fn rejects_second_carrier() {
        let err = Schema::builder("T")
            .version("V1")
            .version("V2")
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::MultipleVersionCarriers);
    }

    #[test]
    fn rejects_nested_group_element() {
        let inner = FieldKind::Group {
            elem: Box::new(FieldKind::Str),
            count_field: 0,
        };
        let err = Schema::builder("T")
            .counted("NumOuter", Field::group("Outer", inner))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::NestedGroup { name: "Outer" });
    }
}
