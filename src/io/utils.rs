//! Leaf codecs: fixed-width little-endian scalars, ULEB128 varints and
//! marker-prefixed strings.
//!
//! Everything on the wire is little-endian regardless of host architecture;
//! that is a format contract, not a platform default.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{ErrorKind, Read, Write};

use super::{Error, Result};

/// Longest accepted ULEB128 encoding: 10 bytes carry 64 significant bits.
///
/// The reference format has no such cap, which is a latent unbounded-read
/// risk on malformed input; decoding fails with [`Error::MalformedVarint`]
/// beyond it.
pub const MAX_VARINT_BYTES: usize = 10;

/// String presence marker: no payload follows.
pub const MARKER_ABSENT: u8 = 0x00;
/// String presence marker: a ULEB128 length and payload follow.
pub const MARKER_PRESENT: u8 = 0x0b;

/// Reading side of the three leaf codecs, available on any [`Read`].
pub trait ReadUtils: Read {
    /// Reads an unsigned little-endian integer of 1, 2, 4 or 8 bytes.
    fn read_uint_le(&mut self, width: u8) -> Result<u64> {
        match width {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16::<LE>().map(u64::from),
            4 => self.read_u32::<LE>().map(u64::from),
            8 => self.read_u64::<LE>(),
            _ => {
                return Err(Error::UnsupportedFieldKind(format!(
                    "{width}-byte unsigned integer"
                )))
            }
        }
        .map_err(Error::ShortRead)
    }

    /// Reads an IEEE754 little-endian float of 4 or 8 bytes.
    fn read_float_le(&mut self, width: u8) -> Result<f64> {
        match width {
            4 => self.read_f32::<LE>().map(f64::from),
            8 => self.read_f64::<LE>(),
            _ => return Err(Error::UnsupportedFieldKind(format!("{width}-byte float"))),
        }
        .map_err(Error::ShortRead)
    }

    /// Reads one byte; false iff zero.
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8().map_err(Error::ShortRead)? != 0)
    }

    /// Reads a ULEB128 unsigned integer, capped at [`MAX_VARINT_BYTES`].
    fn read_uleb128(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8().map_err(Error::ShortRead)?;
            // The 10th byte may only carry the 64th bit.
            if i == MAX_VARINT_BYTES - 1 && byte & 0x7e != 0 {
                return Err(Error::MalformedVarint);
            }
            value |= u64::from(byte & 0x7f) << (7 * i as u32);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::MalformedVarint)
    }

    /// Reads a marker-prefixed string.
    ///
    /// Marker [`MARKER_PRESENT`] is followed by a ULEB128 byte length and
    /// exactly that many UTF-8 payload bytes. [`MARKER_ABSENT`] — and, as a
    /// reference-format quirk, any other marker value — means absent, with
    /// nothing further on the wire.
    fn read_text(&mut self) -> Result<Option<String>> {
        let marker = self.read_u8().map_err(Error::ShortRead)?;
        if marker != MARKER_PRESENT {
            return Ok(None);
        }
        let declared = self.read_uleb128()?;
        let len =
            usize::try_from(declared).map_err(|_| Error::StringLengthMismatch { declared })?;
        let mut payload = vec![0u8; len];
        if let Err(e) = self.read_exact(&mut payload) {
            return Err(if e.kind() == ErrorKind::UnexpectedEof {
                Error::TruncatedPayload { declared: len }
            } else {
                Error::ShortRead(e)
            });
        }
        match String::from_utf8(payload) {
            Ok(text) => Ok(Some(text)),
            Err(e) => Err(Error::InvalidText(e.utf8_error())),
        }
    }
}

impl<R: Read + ?Sized> ReadUtils for R {}

/// Writing side of the three leaf codecs, available on any [`Write`].
pub trait WriteUtils: Write {
    /// Writes an unsigned little-endian integer of 1, 2, 4 or 8 bytes.
    fn write_uint_le(&mut self, width: u8, value: u64) -> Result<()> {
        let out_of_range = |_| Error::IntOutOfRange { value, width };
        match width {
            1 => {
                let v = u8::try_from(value).map_err(out_of_range)?;
                self.write_u8(v)
            }
            2 => {
                let v = u16::try_from(value).map_err(out_of_range)?;
                self.write_u16::<LE>(v)
            }
            4 => {
                let v = u32::try_from(value).map_err(out_of_range)?;
                self.write_u32::<LE>(v)
            }
            8 => self.write_u64::<LE>(value),
            _ => {
                return Err(Error::UnsupportedFieldKind(format!(
                    "{width}-byte unsigned integer"
                )))
            }
        }
        .map_err(Error::WriteFailure)
    }

    /// Writes an IEEE754 little-endian float of 4 or 8 bytes.
    fn write_float_le(&mut self, width: u8, value: f64) -> Result<()> {
        match width {
            4 => self.write_f32::<LE>(value as f32),
            8 => self.write_f64::<LE>(value),
            _ => return Err(Error::UnsupportedFieldKind(format!("{width}-byte float"))),
        }
        .map_err(Error::WriteFailure)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8).map_err(Error::WriteFailure)
    }

    /// Writes a minimal-length ULEB128 encoding (no padding zero groups).
    fn write_uleb128(&mut self, mut value: u64) -> Result<()> {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                return self.write_u8(byte).map_err(Error::WriteFailure);
            }
            self.write_u8(byte | 0x80).map_err(Error::WriteFailure)?;
        }
    }

    /// Writes a marker-prefixed string.
    ///
    /// Absent and empty text both use [`MARKER_ABSENT`]. Present text is the
    /// marker, the ULEB128 length of the text's own byte length — never a
    /// separately stored length — and the payload.
    fn write_text(&mut self, text: Option<&str>) -> Result<()> {
        match text {
            Some(s) if !s.is_empty() => {
                self.write_u8(MARKER_PRESENT).map_err(Error::WriteFailure)?;
                self.write_uleb128(s.len() as u64)?;
                self.write_all(s.as_bytes()).map_err(Error::WriteFailure)
            }
            _ => self.write_u8(MARKER_ABSENT).map_err(Error::WriteFailure),
        }
    }
}

impl<W: Write + ?Sized> WriteUtils for W {}
