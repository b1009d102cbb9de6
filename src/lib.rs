//! # osu! Database Serialization Library
//!
//! This library provides **stable schema definitions and versioned
//! serialization/deserialization** for the binary database files written by
//! the osu! game client (`osu!.db`, `collection.db`, `scores.db`,
//! `presence.db`).
//!
//! ## Disclaimer
//!
//! - This library is **not affiliated with the game developer**.
//! - The library is an independent Rust implementation to allow reading and
//!   writing the database files. The layouts were **adapted from available
//!   documentation of the formats**.
//! - Full validation of serialized files can **only be done by opening them
//!   in the game**.
//!
//! ## Purpose
//!
//! - The schemas (`Schema`, `Field`, `FieldKind`) are **plain data
//!   descriptions** of each file's wire layout: field order is wire order,
//!   and fields may be gated to a range of format versions.
//! - One generic engine ([`io::walker`]) interprets a schema against a byte
//!   stream; the concrete layouts in [`catalog`] are data, not code.
//! - All actual I/O should be done via the [`io::ReadRecord`] and
//!   [`io::WriteRecord`] traits.
//!
//! ## Example
//! ```
//! use osu_db_io::catalog::COLLECTION_DB;
//! use osu_db_io::io::{ReadRecord, WriteRecord};
//! use osu_db_io::value::{Record, Value};
//!
//! // Create an empty collection database record.
//! let mut record = Record::new(&COLLECTION_DB);
//! record.set("Version", Value::UInt(20180502));
//!
//! // Serialize it.
//! let mut buffer = Vec::new();
//! buffer.write_record(&record).unwrap();
//!
//! // Deserialize it.
//! let mut reader = buffer.as_slice();
//! let loaded = reader.read_record(&COLLECTION_DB).unwrap();
//! assert_eq!(record, loaded);
//! ```

pub mod catalog;
pub mod io;
pub mod schema;
pub mod value;
