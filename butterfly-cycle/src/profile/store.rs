//! `<name>.rider` profile files
//!
//! Format (little-endian):
//!
//! Header (16 bytes):
//!   magic:     u32 = 0x52444952  // "RIDR"
//!   version:   u16 = 1
//!   reserved:  u16 = 0
//!   body_len:  u64
//!
//! Body:
//!   bincode-encoded `RidersProfile`
//!
//! Footer (8 bytes):
//!   body_crc32:  u32
//!   file_crc32:  u32  // header + body

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use butterfly_common::{Error, Result};

use super::RidersProfile;

pub const PROFILE_EXTENSION: &str = "rider";

const MAGIC: u32 = 0x52444952; // "RIDR"
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 16; // 4 + 2 + 2 + 8
const FOOTER_SIZE: usize = 8;

/// Persistence of rider profiles by name.
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when no profile of that name exists.
    fn load(&self, name: &str) -> Result<Option<RidersProfile>>;

    fn save(&self, name: &str, profile: &RidersProfile) -> Result<()>;
}

/// One file per rider in a directory.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(['/', '\\'])
        {
            return Err(Error::InvalidInput(format!("profile name {:?}", name)));
        }
        Ok(self.dir.join(format!("{}.{}", name, PROFILE_EXTENSION)))
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self, name: &str) -> Result<Option<RidersProfile>> {
        let path = self.path_for(name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(name, path = %path.display(), "No stored profile");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let profile = decode(&bytes).map_err(|reason| Error::CorruptProfile {
            name: name.to_string(),
            reason,
        })?;
        tracing::info!(
            name,
            total_distance = profile.total_distance(),
            "Loaded rider profile"
        );
        Ok(Some(profile))
    }

    fn save(&self, name: &str, profile: &RidersProfile) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        let body =
            bincode::serialize(profile).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // reserved
        header.extend_from_slice(&(body.len() as u64).to_le_bytes());

        let body_crc = crc32fast::hash(&body);
        let mut file_hasher = crc32fast::Hasher::new();
        file_hasher.update(&header);
        file_hasher.update(&body);
        let file_crc = file_hasher.finalize();

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(&header)?;
        writer.write_all(&body)?;
        writer.write_all(&body_crc.to_le_bytes())?;
        writer.write_all(&file_crc.to_le_bytes())?;
        writer.flush()?;

        tracing::info!(
            name,
            path = %path.display(),
            bytes = HEADER_SIZE + body.len() + FOOTER_SIZE,
            "Saved rider profile"
        );
        Ok(())
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn decode(bytes: &[u8]) -> std::result::Result<RidersProfile, String> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(format!("file too short: {} bytes", bytes.len()));
    }

    let magic = read_u32(bytes, 0);
    if magic != MAGIC {
        return Err(format!(
            "invalid magic: expected 0x{:08x}, got 0x{:08x}",
            MAGIC, magic
        ));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(format!("unsupported version {}", version));
    }

    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[8..16]);
    let body_len = u64::from_le_bytes(len);
    let available = (bytes.len() - HEADER_SIZE - FOOTER_SIZE) as u64;
    if body_len != available {
        return Err(format!(
            "size mismatch: header declares a {} byte body, file holds {} bytes",
            body_len, available
        ));
    }

    let body_end = HEADER_SIZE + body_len as usize;
    let body = &bytes[HEADER_SIZE..body_end];
    if crc32fast::hash(body) != read_u32(bytes, body_end) {
        return Err("body checksum mismatch".to_string());
    }
    if crc32fast::hash(&bytes[..body_end]) != read_u32(bytes, body_end + 4) {
        return Err("file checksum mismatch".to_string());
    }

    let profile: RidersProfile = bincode::deserialize(body).map_err(|e| e.to_string())?;
    profile.validate()?;
    Ok(profile)
}
