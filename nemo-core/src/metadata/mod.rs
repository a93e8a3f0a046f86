//! Per-directory view settings persisted between sessions.

mod record;

pub use record::{DirectoryMetadata, METADATA_MAGIC, METADATA_VERSION};

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{NemoError, Result};

/// magic(4) + version(4) + payload_len(4) + checksum(4)
const MIN_FILE_SIZE: usize = 16;

/// Get the metadata file path for a given directory
pub fn metadata_path_for(directory: &Path, metadata_dir: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    directory.hash(&mut hasher);
    metadata_dir.join(format!("{:016x}.nmv", hasher.finish()))
}

/// Save view settings
///
/// File format:
/// [4B] Magic "NMVM"
/// [4B] Version (u32 LE)
/// [4B] Payload length (u32 LE)
/// [NB] Payload (postcard)
/// [4B] CRC32 checksum of all preceding bytes
pub fn save_metadata(path: &Path, meta: &DirectoryMetadata) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| NemoError::at(parent, e))?;
    }

    let payload = postcard::to_allocvec(meta)
        .map_err(|e| NemoError::Metadata(format!("Failed to serialize metadata: {}", e)))?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| NemoError::Metadata("Metadata too large".to_string()))?;

    let mut data = Vec::with_capacity(MIN_FILE_SIZE + payload.len());
    data.extend_from_slice(&METADATA_MAGIC);
    data.extend_from_slice(&METADATA_VERSION.to_le_bytes());
    data.extend_from_slice(&payload_len.to_le_bytes());
    data.extend_from_slice(&payload);
    let checksum = crc32fast::hash(&data);
    data.extend_from_slice(&checksum.to_le_bytes());

    // Write atomically by writing to temp file then renaming
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).map_err(|e| NemoError::at(&temp_path, e))?;
    file.write_all(&data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&temp_path, path).map_err(|e| NemoError::at(path, e))?;

    debug!(path = %path.display(), directory = %meta.directory.display(), "Saved view metadata");
    Ok(())
}

/// Load view settings written by [`save_metadata`] for `directory`
pub fn load_metadata(path: &Path, directory: &Path) -> Result<DirectoryMetadata> {
    let mut file = File::open(path).map_err(|e| NemoError::at(path, e))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    if data.len() < MIN_FILE_SIZE {
        return Err(NemoError::Metadata("Metadata file too small".to_string()));
    }

    let checksum_offset = data.len() - 4;
    let stored_checksum = read_u32(&data, checksum_offset)?;
    if stored_checksum != crc32fast::hash(&data[..checksum_offset]) {
        return Err(NemoError::Metadata("Metadata checksum mismatch".to_string()));
    }

    if data[..4] != METADATA_MAGIC {
        return Err(NemoError::Metadata("Invalid metadata magic".to_string()));
    }

    let version = read_u32(&data, 4)?;
    if version != METADATA_VERSION {
        return Err(NemoError::Metadata(format!(
            "Metadata version mismatch: expected {}, got {}",
            METADATA_VERSION, version
        )));
    }

    let payload_len = read_u32(&data, 8)? as usize;
    let offset = 12;
    if offset + payload_len != checksum_offset {
        return Err(NemoError::Metadata("Invalid payload length".to_string()));
    }

    let meta: DirectoryMetadata = postcard::from_bytes(&data[offset..checksum_offset])
        .map_err(|e| NemoError::Metadata(format!("Failed to deserialize metadata: {}", e)))?;

    if meta.version != METADATA_VERSION {
        return Err(NemoError::Metadata("Record version mismatch".to_string()));
    }
    if !meta.is_for(directory) {
        return Err(NemoError::Metadata(format!(
            "Metadata belongs to {}",
            meta.directory.display()
        )));
    }

    Ok(meta)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| NemoError::Metadata("Truncated metadata".to_string()))
}
