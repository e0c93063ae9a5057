//! Index container for ALICE-Score models
//!
//! Layout:
//!
//! ```text
//! MAGIC "ALICE-LM" (8) + VERSION (2) + HEADER (16)
//! + TAG_LEN u16 LE (2) + TAG (UTF-8)
//! + PAYLOAD zstd(bincode(model))
//! ```
//!
//! The type tag sits before the payload, so dispatch only needs the first
//! few bytes of the file. Loading memory-maps the file and decodes the
//! payload straight from the mapping.

use crate::model::ModelType;
use crate::{ALICEScoreError, Result, ALICE_LM_MAGIC, ALICE_LM_VERSION};
use memmap2::Mmap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

/// Payload compression mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionMode {
    /// Fast mode (zstd level 3)
    Fast = 0,
    /// Balanced mode (zstd level 10)
    Balanced = 1,
    /// Best compression (zstd level 19)
    Best = 2,
}

impl CompressionMode {
    fn zstd_level(self) -> i32 {
        match self {
            Self::Fast => 3,
            Self::Balanced => 10,
            Self::Best => 19,
        }
    }
}

impl Default for CompressionMode {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Fixed-size index header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Highest n-gram order
    pub order: u8,
    /// Vocabulary size
    pub vocab_size: u32,
    /// Total n-grams over all orders
    pub ngram_count: u64,
}

impl IndexHeader {
    /// Header size in bytes (fixed)
    pub const SIZE: usize = 16;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];

        bytes[0] = self.order;
        bytes[1..4].fill(0); // reserved
        bytes[4..8].copy_from_slice(&self.vocab_size.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.ngram_count.to_le_bytes());

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(ALICEScoreError::InvalidHeader("Header too short".to_string()));
        }

        let to_err = || ALICEScoreError::InvalidHeader("Header slice error".to_string());
        let header = Self {
            order: bytes[0],
            vocab_size: u32::from_le_bytes(bytes[4..8].try_into().map_err(|_| to_err())?),
            ngram_count: u64::from_le_bytes(bytes[8..16].try_into().map_err(|_| to_err())?),
        };
        if header.order == 0 {
            return Err(ALICEScoreError::InvalidHeader("Order must be at least 1".to_string()));
        }
        Ok(header)
    }
}

/// Everything in front of the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Raw type tag, not necessarily a registered type
    pub model_type: String,
    pub header: IndexHeader,
    /// Byte offset of the compressed payload
    pub payload_offset: usize,
}

/// Write a model into the container format, returning the bytes written
pub fn write_index<W: Write, M: Serialize>(
    writer: &mut W,
    model_type: ModelType,
    header: &IndexHeader,
    model: &M,
    mode: CompressionMode,
) -> Result<u64> {
    let serialized = bincode::serialize(model)
        .map_err(|e| ALICEScoreError::EncodingError(format!("Bincode error: {}", e)))?;

    let compressed = zstd::stream::encode_all(Cursor::new(&serialized), mode.zstd_level())
        .map_err(|e| ALICEScoreError::EncodingError(format!("Zstd error: {}", e)))?;

    let tag = model_type.tag().as_bytes();

    writer.write_all(ALICE_LM_MAGIC)?;
    writer.write_all(&[ALICE_LM_VERSION.0, ALICE_LM_VERSION.1])?;
    writer.write_all(&header.to_bytes())?;
    writer.write_all(&(tag.len() as u16).to_le_bytes())?;
    writer.write_all(tag)?;
    writer.write_all(&compressed)?;

    let written = (8 + 2 + IndexHeader::SIZE + 2 + tag.len() + compressed.len()) as u64;
    log::debug!(
        "Wrote {} index: {} bytes serialized, {} bytes on disk",
        model_type,
        serialized.len(),
        written
    );
    Ok(written)
}

/// Read magic, version, header and tag
pub fn read_index_info<R: Read>(reader: &mut R) -> Result<IndexInfo> {
    // Read magic
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != ALICE_LM_MAGIC {
        return Err(ALICEScoreError::InvalidMagic);
    }

    // Read version
    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    if version[0] != ALICE_LM_VERSION.0 {
        return Err(ALICEScoreError::InvalidVersion(version[0], version[1]));
    }

    // Read header
    let mut header_bytes = [0u8; IndexHeader::SIZE];
    reader.read_exact(&mut header_bytes)?;
    let header = IndexHeader::from_bytes(&header_bytes)?;

    // Read type tag
    let mut tag_len = [0u8; 2];
    reader.read_exact(&mut tag_len)?;
    let tag_len = u16::from_le_bytes(tag_len) as usize;
    let mut tag = vec![0u8; tag_len];
    reader.read_exact(&mut tag)?;
    let model_type = String::from_utf8(tag)
        .map_err(|_| ALICEScoreError::InvalidHeader("Type tag is not UTF-8".to_string()))?;

    Ok(IndexInfo {
        model_type,
        header,
        payload_offset: 8 + 2 + IndexHeader::SIZE + 2 + tag_len,
    })
}

/// Read only the type tag of an index file
pub fn read_model_type<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path)?;
    Ok(read_index_info(&mut file)?.model_type)
}

/// Memory-mapped index file
pub struct MappedIndex {
    mmap: Mmap,
    info: IndexInfo,
}

impl MappedIndex {
    /// Map an index file and parse its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and the index is not modified while scoring
        let mmap = unsafe { Mmap::map(&file)? };
        let info = read_index_info(&mut Cursor::new(&mmap[..]))?;
        Ok(Self { mmap, info })
    }

    pub fn info(&self) -> &IndexInfo {
        &self.info
    }

    /// Compressed payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.mmap[self.info.payload_offset..]
    }

    /// Decompress and deserialize the payload
    pub fn decode<M: DeserializeOwned>(&self) -> Result<M> {
        let serialized = zstd::stream::decode_all(Cursor::new(self.payload()))
            .map_err(|e| ALICEScoreError::DecodingError(format!("Zstd error: {}", e)))?;
        bincode::deserialize(&serialized)
            .map_err(|e| ALICEScoreError::DecodingError(format!("Bincode error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_header() -> IndexHeader {
        IndexHeader {
            order: 3,
            vocab_size: 42,
            ngram_count: 1_000,
        }
    }

    fn write_sample(mode: CompressionMode) -> Vec<u8> {
        let mut payload: HashMap<String, f32> = HashMap::new();
        payload.insert("the".to_string(), -0.5);
        let mut buffer = Vec::new();
        write_index(&mut buffer, ModelType::SortedArray, &sample_header(), &payload, mode).unwrap();
        buffer
    }

    #[test]
    fn test_header_serialization() {
        let header = sample_header();
        let restored = IndexHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(header, restored);
    }

    #[test]
    fn test_header_too_short() {
        let err = IndexHeader::from_bytes(&[3, 0, 0]).unwrap_err();
        assert!(matches!(err, ALICEScoreError::InvalidHeader(_)));
    }

    #[test]
    fn test_header_zero_order() {
        let mut bytes = sample_header().to_bytes();
        bytes[0] = 0;
        assert!(IndexHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_info_layout() {
        let buffer = write_sample(CompressionMode::Fast);

        assert_eq!(&buffer[0..8], ALICE_LM_MAGIC);
        assert_eq!(buffer[8], ALICE_LM_VERSION.0);
        assert_eq!(buffer[9], ALICE_LM_VERSION.1);

        let info = read_index_info(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(info.model_type, "sorted_array");
        assert_eq!(info.header, sample_header());
        assert_eq!(info.payload_offset, 8 + 2 + 16 + 2 + "sorted_array".len());
    }

    #[test]
    fn test_written_size_matches() {
        let payload = vec![1u32, 2, 3];
        let mut buffer = Vec::new();
        let written = write_index(
            &mut buffer,
            ModelType::ProbingHash,
            &sample_header(),
            &payload,
            CompressionMode::Best,
        )
        .unwrap();
        assert_eq!(written, buffer.len() as u64);
    }

    #[test]
    fn test_bad_magic() {
        let mut buffer = write_sample(CompressionMode::Fast);
        buffer[0] = b'X';
        let err = read_index_info(&mut Cursor::new(&buffer)).unwrap_err();
        assert!(matches!(err, ALICEScoreError::InvalidMagic));
    }

    #[test]
    fn test_bad_version() {
        let mut buffer = write_sample(CompressionMode::Fast);
        buffer[8] = 9;
        let err = read_index_info(&mut Cursor::new(&buffer)).unwrap_err();
        assert!(matches!(err, ALICEScoreError::InvalidVersion(9, 0)));
    }

    #[test]
    fn test_truncated_file() {
        let buffer = write_sample(CompressionMode::Fast);
        let err = read_index_info(&mut Cursor::new(&buffer[..20])).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Io(_)));
    }

    #[test]
    fn test_mapped_decode() {
        let buffer = write_sample(CompressionMode::Balanced);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buffer).unwrap();
        file.flush().unwrap();

        assert_eq!(read_model_type(file.path()).unwrap(), "sorted_array");

        let index = MappedIndex::open(file.path()).unwrap();
        let payload: HashMap<String, f32> = index.decode().unwrap();
        assert_eq!(payload.get("the"), Some(&-0.5));
    }

    #[test]
    fn test_corrupt_payload() {
        let mut buffer = write_sample(CompressionMode::Fast);
        let len = buffer.len();
        buffer.truncate(len - 4);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buffer).unwrap();
        file.flush().unwrap();

        let index = MappedIndex::open(file.path()).unwrap();
        let result: Result<HashMap<String, f32>> = index.decode();
        assert!(matches!(result, Err(ALICEScoreError::DecodingError(_))));
    }
}
