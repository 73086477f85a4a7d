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


//! The scene container format.
//!
//! Every saved scene is a fixed-size [`SceneHeader`] followed by a payload.
//! The header names the encoding used for the payload, so the loader can
//! dispatch it to the matching [`SceneStrategy`](crate::strategy::SceneStrategy).

use crate::error::SceneError;
use std::io::{Read, Write};

/// Identifies Dry scene files.
pub const HEADER_MAGIC_BYTES: [u8; 8] = *b"DRYSCENE";
/// The header layout version written by this crate.
pub const FORMAT_VERSION: u8 = 1;
const ENCODING_ID_LEN: usize = 32;

/// The fixed-size header at the beginning of every scene file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneHeader {
    /// Must be [`HEADER_MAGIC_BYTES`].
    pub magic_bytes: [u8; 8],
    /// The version of the header layout.
    pub format_version: u8,
    /// A null-padded UTF-8 id of the payload encoding, e.g. `DRY_BINARY_V1`.
    pub encoding_id: [u8; ENCODING_ID_LEN],
    /// Length of the payload that follows the header, in bytes.
    pub payload_length: u64,
}

// The header is a fixed byte layout, written without serde.
impl SceneHeader {
    /// The total size of the header in bytes.
    pub const SIZE: usize = 8 + 1 + ENCODING_ID_LEN + 8;

    /// Builds a header for a payload of `payload_length` bytes.
    pub fn new(encoding_id: &str, payload_length: u64) -> Result<Self, SceneError> {
        let id = encoding_id.as_bytes();
        if id.is_empty() || id.len() > ENCODING_ID_LEN {
            return Err(SceneError::InvalidHeader(format!(
                "encoding id '{encoding_id}' must be 1 to {ENCODING_ID_LEN} bytes long"
            )));
        }
        let mut padded = [0u8; ENCODING_ID_LEN];
        padded[..id.len()].copy_from_slice(id);
        Ok(Self {
            magic_bytes: HEADER_MAGIC_BYTES,
            format_version: FORMAT_VERSION,
            encoding_id: padded,
            payload_length,
        })
    }

    /// Parses a header from the beginning of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SceneError> {
        if bytes.len() < Self::SIZE {
            return Err(SceneError::InvalidHeader(format!(
                "expected {} bytes, found {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let mut magic_bytes = [0u8; 8];
        magic_bytes.copy_from_slice(&bytes[0..8]);
        if magic_bytes != HEADER_MAGIC_BYTES {
            return Err(SceneError::InvalidHeader(
                "invalid magic bytes; not a Dry scene file".to_owned(),
            ));
        }

        let format_version = bytes[8];
        if format_version == 0 || format_version > FORMAT_VERSION {
            return Err(SceneError::InvalidHeader(format!(
                "unsupported format version {format_version}"
            )));
        }

        let mut encoding_id = [0u8; ENCODING_ID_LEN];
        encoding_id.copy_from_slice(&bytes[9..9 + ENCODING_ID_LEN]);

        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[9 + ENCODING_ID_LEN..Self::SIZE]);

        let header = Self {
            magic_bytes,
            format_version,
            encoding_id,
            payload_length: u64::from_le_bytes(length),
        };
        header.encoding()?;
        Ok(header)
    }

    /// The fixed byte layout of this header.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&self.magic_bytes);
        bytes[8] = self.format_version;
        bytes[9..9 + ENCODING_ID_LEN].copy_from_slice(&self.encoding_id);
        bytes[9 + ENCODING_ID_LEN..].copy_from_slice(&self.payload_length.to_le_bytes());
        bytes
    }

    /// The payload encoding id, without its padding.
    pub fn encoding(&self) -> Result<&str, SceneError> {
        let id = std::str::from_utf8(&self.encoding_id)
            .map_err(|_| SceneError::InvalidHeader("encoding id is not UTF-8".to_owned()))?
            .trim_end_matches('\0');
        if id.is_empty() {
            return Err(SceneError::InvalidHeader("encoding id is empty".to_owned()));
        }
        Ok(id)
    }
}

/// A full scene file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFile {
    /// The parsed header.
    pub header: SceneHeader,
    /// The encoded objects.
    pub payload: Vec<u8>,
}

impl SceneFile {
    /// Wraps `payload` in a header naming `encoding_id`.
    pub fn new(encoding_id: &str, payload: Vec<u8>) -> Result<Self, SceneError> {
        let header = SceneHeader::new(encoding_id, payload.len() as u64)?;
        Ok(Self { header, payload })
    }

    /// Writes the header and payload.
    pub fn write_to(&self, dest: &mut impl Write) -> Result<(), SceneError> {
        dest.write_all(&self.header.to_bytes())?;
        dest.write_all(&self.payload)?;
        Ok(())
    }

    /// Reads a header and exactly the payload it announces.
    pub fn read_from(source: &mut impl Read) -> Result<Self, SceneError> {
        let mut header = [0u8; SceneHeader::SIZE];
        source.read_exact(&mut header)?;
        let header = SceneHeader::from_bytes(&header)?;

        let mut payload = Vec::new();
        source.by_ref().take(header.payload_length).read_to_end(&mut payload)?;
        if payload.len() as u64 != header.payload_length {
            return Err(SceneError::InvalidHeader(format!(
                "payload is {} bytes, header announces {}",
                payload.len(),
                header.payload_length
            )));
        }
        Ok(Self { header, payload })
    }

    /// The serialized file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SceneHeader::SIZE + self.payload.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parses a serialized file.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, SceneError> {
        Self::read_from(&mut bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = SceneHeader::new("DRY_RON_V1", 1234).unwrap();
        let parsed = SceneHeader::from_bytes(&header.to_bytes()).unwrap();

        assert_eq!(parsed, header);
        assert_eq!(parsed.encoding().unwrap(), "DRY_RON_V1");
        assert_eq!(parsed.payload_length, 1234);
    }

    #[test]
    fn test_header_rejects_bad_input() {
        assert!(matches!(
            SceneHeader::from_bytes(&[0u8; 10]),
            Err(SceneError::InvalidHeader(_))
        ));

        let mut bytes = SceneHeader::new("DRY_RON_V1", 0).unwrap().to_bytes();
        bytes[0] = b'X';
        assert!(SceneHeader::from_bytes(&bytes).is_err());

        let mut bytes = SceneHeader::new("DRY_RON_V1", 0).unwrap().to_bytes();
        bytes[8] = FORMAT_VERSION + 1;
        assert!(SceneHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_encoding_id_length_is_checked() {
        assert!(SceneHeader::new("", 0).is_err());
        assert!(SceneHeader::new(&"X".repeat(33), 0).is_err());
        assert!(SceneHeader::new(&"X".repeat(32), 0).is_ok());
    }

    #[test]
    fn test_file_round_trip_and_truncation() {
        let file = SceneFile::new("DRY_BINARY_V1", vec![1, 2, 3, 4]).unwrap();
        let bytes = file.to_bytes();
        assert_eq!(bytes.len(), SceneHeader::SIZE + 4);
        assert_eq!(SceneFile::from_bytes(&bytes).unwrap(), file);

        assert!(matches!(
            SceneFile::from_bytes(&bytes[..bytes.len() - 1]),
            Err(SceneError::InvalidHeader(_))
        ));
    }
}
