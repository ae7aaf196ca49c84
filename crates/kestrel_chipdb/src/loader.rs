//! Binary database file format: save and load.
//!
//! A database file is a small header followed by a gzip-compressed bincode
//! payload:
//!
//! ```text
//! offset 0   magic   b"KSDB"
//! offset 4   version u32 little-endian
//! offset 8   xxh3-128 checksum of the compressed payload (16 bytes)
//! offset 24  payload (gzip-wrapped bincode of ChipDb)
//! ```
//!
//! Files are memory-mapped on load; magic, version, and checksum are
//! verified before the payload is touched. The database is immutable after
//! load and all handles returned by its accessors are valid for its
//! lifetime.

use crate::types::ChipDb;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kestrel_common::ContentHash;
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// File magic at offset zero.
const MAGIC: &[u8; 4] = b"KSDB";

/// Current database format version.
const FORMAT_VERSION: u32 = 1;

/// Header length: magic + version + checksum.
const HEADER_LEN: usize = 4 + 4 + 16;

/// Errors from loading or saving a chip database.
#[derive(Debug, thiserror::Error)]
pub enum ChipDbError {
    /// The database file could not be opened.
    #[error("chip database missing: {path}: {source}")]
    Missing {
        /// The path that could not be opened.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file exists but its magic, version, checksum, or payload is
    /// invalid.
    #[error("chip database corrupt: {path}: {reason}")]
    Corrupt {
        /// The offending file.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// A write failed while saving.
    #[error("chip database write failed: {path}: {source}")]
    Write {
        /// The destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ChipDb {
    /// Loads a database from `path`, verifying magic, version, and checksum.
    pub fn load(path: &Path) -> Result<Self, ChipDbError> {
        let file = File::open(path).map_err(|source| ChipDbError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: the mapping is read-only and lives only for this call;
        // database files are not expected to be mutated while mapped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ChipDbError::Missing {
            path: path.to_path_buf(),
            source,
        })?;

        let corrupt = |reason: String| ChipDbError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        if mmap.len() < HEADER_LEN {
            return Err(corrupt(format!("file too short ({} bytes)", mmap.len())));
        }
        if &mmap[0..4] != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
        if version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {version}, expected {FORMAT_VERSION}"
            )));
        }
        let mut stored = [0u8; 16];
        stored.copy_from_slice(&mmap[8..24]);
        let stored = ContentHash::from_raw(stored);
        let payload = &mmap[HEADER_LEN..];
        let computed = ContentHash::from_bytes(payload);
        if stored != computed {
            return Err(corrupt(format!(
                "checksum mismatch: header {stored}, payload {computed}"
            )));
        }

        let mut decoder = GzDecoder::new(payload);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| corrupt(format!("decompression failed: {e}")))?;

        let (db, _len): (ChipDb, usize) =
            bincode::serde::decode_from_slice(&raw, bincode::config::standard())
                .map_err(|e| corrupt(format!("payload decode failed: {e}")))?;
        Ok(db)
    }

    /// Saves the database to `path` in the format read by [`ChipDb::load`].
    pub fn save(&self, path: &Path) -> Result<(), ChipDbError> {
        let write_err = |source: std::io::Error| ChipDbError::Write {
            path: path.to_path_buf(),
            source,
        };

        let raw = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| ChipDbError::Write {
                path: path.to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            },
        )?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).map_err(write_err)?;
        let payload = encoder.finish().map_err(write_err)?;
        let checksum = ContentHash::from_bytes(&payload);

        let mut file = File::create(path).map_err(write_err)?;
        file.write_all(MAGIC).map_err(write_err)?;
        file.write_all(&FORMAT_VERSION.to_le_bytes())
            .map_err(write_err)?;
        file.write_all(checksum.as_bytes()).map_err(write_err)?;
        file.write_all(&payload).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChipDbBuilder;
    use crate::types::{Delay, PipClass};

    fn sample_db() -> ChipDb {
        let mut b = ChipDbBuilder::new("roundtrip", 2, 2);
        let tt = b.add_tile_type("T");
        let w0 = b.add_wire(tt, "w0");
        let w1 = b.add_wire(tt, "w1");
        b.add_pip(tt, w0, w1, PipClass::Regular, Delay::new(0.1, 0.2, 0.3));
        for y in 0..2 {
            for x in 0..2 {
                b.set_tile(x, y, tt);
            }
        }
        b.add_node(&[(0, w1), (1, w0)]);
        b.finish()
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.ksdb");
        let db = sample_db();
        db.save(&path).unwrap();

        let loaded = ChipDb::load(&path).unwrap();
        assert_eq!(loaded.name, "roundtrip");
        assert_eq!(loaded.num_tiles(), 4);
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.canonical_wire(0, 1), loaded.canonical_wire(1, 0));
    }

    #[test]
    fn missing_file() {
        let err = ChipDb::load(Path::new("/nonexistent/dev.ksdb")).unwrap_err();
        assert!(matches!(err, ChipDbError::Missing { .. }));
    }

    #[test]
    fn bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ksdb");
        std::fs::write(&path, b"NOTKESTRELDB_PADDING_BYTES").unwrap();
        let err = ChipDb::load(&path).unwrap_err();
        match err {
            ChipDbError::Corrupt { reason, .. } => assert!(reason.contains("magic")),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.ksdb");
        std::fs::write(&path, b"KSDB").unwrap();
        let err = ChipDb::load(&path).unwrap_err();
        match err {
            ChipDbError::Corrupt { reason, .. } => assert!(reason.contains("too short")),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ver.ksdb");
        let db = sample_db();
        db.save(&path).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4] = 0xFF;
        std::fs::write(&path, &bytes).unwrap();
        let err = ChipDb::load(&path).unwrap_err();
        match err {
            ChipDbError::Corrupt { reason, .. } => assert!(reason.contains("version")),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn corrupted_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chk.ksdb");
        let db = sample_db();
        db.save(&path).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();
        let err = ChipDb::load(&path).unwrap_err();
        match err {
            ChipDbError::Corrupt { reason, .. } => assert!(reason.contains("checksum")),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }
}
