// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Byte-level helpers shared by the binary and network encodings.
//!
//! Every value is stored as a `u32` little-endian length followed by the
//! bincode encoding of the [`Variant`]. The length prefix is what lets a
//! reader skip a value it cannot decode.

use crate::error::{LoadError, SaveError};
use crate::variant::Variant;
use std::io::{self, Read, Write};

/// A writer that counts the bytes it has written, for error offsets.
pub(crate) struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    written: u64,
    type_name: &'static str,
}

impl<'a> CountingWriter<'a> {
    pub(crate) fn new(inner: &'a mut dyn Write, type_name: &'static str) -> Self {
        Self {
            inner,
            written: 0,
            type_name,
        }
    }

    fn io_error(&self, source: io::Error) -> SaveError {
        SaveError::Io {
            type_name: self.type_name.to_owned(),
            offset: self.written,
            source,
        }
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SaveError> {
        match self.inner.write_all(bytes) {
            Ok(()) => {
                self.written += bytes.len() as u64;
                Ok(())
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> Result<(), SaveError> {
        self.write_bytes(&[value])
    }

    pub(crate) fn write_u32(&mut self, value: u32) -> Result<(), SaveError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a length-prefixed value.
    pub(crate) fn write_variant(&mut self, attribute: &str, value: &Variant) -> Result<(), SaveError> {
        let encode_error = |message: String| SaveError::Encode {
            type_name: self.type_name.to_owned(),
            attribute: attribute.to_owned(),
            message,
        };
        let bytes = encode_variant(value).map_err(encode_error)?;
        let length = u32::try_from(bytes.len())
            .map_err(|_| encode_error(format!("value of {} bytes is too large", bytes.len())))?;
        self.write_u32(length)?;
        self.write_bytes(&bytes)
    }

    /// Writes the zero length that stands for "use the default".
    pub(crate) fn write_default_marker(&mut self) -> Result<(), SaveError> {
        self.write_u32(0)
    }
}

/// A reader that counts the bytes it has consumed, for error offsets.
pub(crate) struct CountingReader<'a> {
    inner: &'a mut dyn Read,
    consumed: u64,
    type_name: &'static str,
}

impl<'a> CountingReader<'a> {
    pub(crate) fn new(inner: &'a mut dyn Read, type_name: &'static str) -> Self {
        Self {
            inner,
            consumed: 0,
            type_name,
        }
    }

    fn error(&self, attribute: Option<&str>, source: io::Error) -> LoadError {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            LoadError::Truncated {
                type_name: self.type_name.to_owned(),
                attribute: attribute.map(str::to_owned),
                offset: self.consumed,
            }
        } else {
            LoadError::Io {
                type_name: self.type_name.to_owned(),
                offset: self.consumed,
                source,
            }
        }
    }

    pub(crate) fn read_exact(&mut self, buf: &mut [u8], attribute: Option<&str>) -> Result<(), LoadError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.consumed += buf.len() as u64;
                Ok(())
            }
            Err(source) => Err(self.error(attribute, source)),
        }
    }

    pub(crate) fn read_u8(&mut self, attribute: Option<&str>) -> Result<u8, LoadError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf, attribute)?;
        Ok(buf[0])
    }

    pub(crate) fn read_u32(&mut self, attribute: Option<&str>) -> Result<u32, LoadError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf, attribute)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a length-prefixed value without decoding it.
    ///
    /// Returns an empty vector for the "use the default" marker. The
    /// payload is read incrementally, so a corrupt length cannot force a
    /// huge allocation.
    pub(crate) fn read_payload(&mut self, attribute: Option<&str>) -> Result<Vec<u8>, LoadError> {
        let length = self.read_u32(attribute)?;
        let mut payload = Vec::new();
        let read = Read::take(&mut *self.inner, u64::from(length)).read_to_end(&mut payload);
        match read {
            Ok(n) => {
                self.consumed += n as u64;
                if n as u64 == u64::from(length) {
                    Ok(payload)
                } else {
                    Err(self.error(attribute, io::ErrorKind::UnexpectedEof.into()))
                }
            }
            Err(source) => Err(self.error(attribute, source)),
        }
    }
}

pub(crate) fn encode_variant(value: &Variant) -> Result<Vec<u8>, String> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| e.to_string())
}

pub(crate) fn decode_variant(bytes: &[u8]) -> Result<Variant, String> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| e.to_string())
}
