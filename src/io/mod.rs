//! Stream I/O: error taxonomy, leaf codecs and the schema walker.
//!
//! The traits here extend [`Read`] and [`Write`] the same way the codec
//! building blocks in [`utils`] do: blanket-implemented, schema-aware entry
//! points that hand the stream to the walker.
//!
//! # Partial writes
//! Even if an error occurs during serialization, some bytes may already have
//! been written to the stream. Failed calls can leave the output in a
//! partially written state; callers must discard or truncate the destination
//! themselves. Decoding a malformed stream is never retried internally.

use std::io::{self, Read, Write};
use std::sync::Arc;

use thiserror::Error;

use crate::schema::Schema;
use crate::value::Record;

pub mod utils;
pub mod walker;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The stream ended (or failed) before a fixed-width value was complete.
    #[error("unexpected end of stream")]
    ShortRead(#[source] io::Error),

    /// The sink rejected bytes.
    #[error("failed to write to stream")]
    WriteFailure(#[source] io::Error),

    /// A ULEB128 encoding ran past the safety cap of
    /// [`utils::MAX_VARINT_BYTES`] bytes / 64 significant bits.
    #[error("varint exceeds {} bytes", utils::MAX_VARINT_BYTES)]
    MalformedVarint,

    /// A string declared more payload bytes than the stream held.
    #[error("string payload truncated: declared {declared} bytes")]
    TruncatedPayload { declared: usize },

    /// A declared string length that cannot be realized on this platform.
    #[error("declared string length {declared} does not fit in memory")]
    StringLengthMismatch { declared: u64 },

    /// A string payload that is not valid UTF-8.
    #[error("string payload is not valid utf-8")]
    InvalidText(#[source] std::str::Utf8Error),

    /// The schema references a kind the engine cannot dispatch.
    #[error("field kind cannot be dispatched: {0}")]
    UnsupportedFieldKind(String),

    /// A value variant that does not match the field kind the schema
    /// declares for it.
    #[error("field expects a {expected} value, found {found}")]
    ValueMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An integer that does not fit the field's declared byte width.
    #[error("value {value} does not fit in {width} bytes")]
    IntOutOfRange { value: u64, width: u8 },

    /// A sequence longer than the 4-byte count field can carry.
    #[error("sequence of {len} elements does not fit the 4-byte count field")]
    TooManyElements { len: u64 },

    /// A version-gated field was reached before the version carrier resolved
    /// the traversal's version context.
    #[error("version context is unresolved at a gated field")]
    UnresolvedVersion,

    /// Any failure, annotated with the path of the field it occurred at,
    /// e.g. `Beatmaps[3].ArtistName`.
    #[error("{path}: {source}")]
    Field {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Prefixes the error's field path with `segment`. Index segments
    /// (`"[3]"`) attach without a separator.
    pub(crate) fn at(self, segment: &str) -> Error {
        match self {
            Error::Field { path, source } => {
                let path = if path.starts_with('[') {
                    format!("{segment}{path}")
                } else {
                    format!("{segment}.{path}")
                };
                Error::Field { path, source }
            }
            other => Error::Field {
                path: segment.to_owned(),
                source: Box::new(other),
            },
        }
    }

    /// The failing field's path, if the error occurred inside a traversal.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Field { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Trait for reading a schema-described record from a stream.
///
/// # Example
/// ```
/// use osu_db_io::catalog::PRESENCE_DB;
/// use osu_db_io::io::ReadRecord;
///
/// // Version 5, zero players.
/// let bytes = [0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
/// let mut reader = &bytes[..];
/// let record = reader.read_record(&PRESENCE_DB).unwrap();
/// assert_eq!(record.get("Version").unwrap().as_uint(), Some(5));
/// ```
///
/// # Errors
/// Returns the first failure of the traversal, annotated with the failing
/// field's path. There is no partial-record recovery.
pub trait ReadRecord: Read {
    fn read_record(&mut self, schema: &Arc<Schema>) -> Result<Record> {
        walker::decode_record(self, schema)
    }
}

impl<R: Read + ?Sized> ReadRecord for R {}

/// Trait for writing a schema-described record to a stream.
///
/// The record's schema supplies the wire layout; repeated-group counts are
/// derived from the actual sequences, and the version carrier's stored value
/// gates which fields are emitted.
///
/// # Errors
/// Returns the first failure of the traversal, annotated with the failing
/// field's path. Bytes already written are not rolled back.
pub trait WriteRecord: Write {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        walker::encode_record(self, record)
    }
}

impl<W: Write + ?Sized> WriteRecord for W {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_prefixing() {
        let err = Error::MalformedVarint.at("Md5Hash").at("[3]").at("Scores");
        assert_eq!(err.path(), Some("Scores[3].Md5Hash"));
        assert_eq!(err.to_string(), "Scores[3].Md5Hash: varint exceeds 10 bytes");
    }

    #[test]
    fn bare_errors_have_no_path() {
        assert_eq!(Error::MalformedVarint.path(), None);
    }
}
