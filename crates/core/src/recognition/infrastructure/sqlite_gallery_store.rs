//! SQLite-backed gallery: one `players` row per identity.
//!
//! Opening is self-healing. A file SQLite cannot read is moved aside to
//! `<path>.backup` and a fresh store is created; a `players` table without
//! the `face_features` column is dropped and recreated.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::recognition::domain::feature_vector::FeatureVector;
use crate::recognition::domain::gallery_store::{
    GalleryEntry, GalleryError, GalleryStore, Identity,
};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    face_features BLOB,
    played BOOLEAN DEFAULT FALSE
);
";

const FEATURE_COLUMN: &str = "face_features";

pub struct SqliteGalleryStore {
    conn: Connection,
}

impl SqliteGalleryStore {
    /// Opens (bootstrapping or recovering if needed) the store at `path`.
    ///
    /// Fails only when recovery itself fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if path.exists() {
            if let Err(e) = prepare_existing(path) {
                log::warn!(
                    "Gallery store {} is unreadable ({e}); starting a new one",
                    path.display()
                );
                let backup = move_aside(path)?;
                log::warn!("Previous store kept at {}", backup.display());
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, GalleryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }
}

impl GalleryStore for SqliteGalleryStore {
    fn lookup_all(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, face_features, played FROM players ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<Vec<u8>>>(1)?,
                row.get::<_, Option<bool>>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, blob, played) = row?;
            let identity = to_identity(id)?;
            let Some(blob) = blob else {
                continue;
            };
            match decode_feature_blob(&blob) {
                Ok(feature) => entries.push(GalleryEntry {
                    identity,
                    feature,
                    played: played.unwrap_or(false),
                }),
                Err(e) => log::warn!("Skipping identity {identity}: {e}"),
            }
        }
        Ok(entries)
    }

    fn insert(&mut self, feature: &FeatureVector) -> Result<Identity, GalleryError> {
        self.conn.execute(
            "INSERT INTO players (face_features, played) VALUES (?1, FALSE)",
            params![encode_feature_blob(feature)],
        )?;
        to_identity(self.conn.last_insert_rowid())
    }

    fn set_played(&mut self, identity: Identity) -> Result<(), GalleryError> {
        self.conn.execute(
            "UPDATE players SET played = TRUE WHERE id = ?1",
            params![identity],
        )?;
        Ok(())
    }

    fn is_played(&self, identity: Identity) -> Result<bool, GalleryError> {
        let played = self
            .conn
            .query_row(
                "SELECT played FROM players WHERE id = ?1",
                params![identity],
                |row| row.get::<_, Option<bool>>(0),
            )
            .optional()?;
        Ok(played.flatten().unwrap_or(false))
    }

    fn len(&self) -> Result<usize, GalleryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| GalleryError::InvalidValue(format!("row count {count}")))
    }
}

/// Checks an existing file is a healthy SQLite database and drops a
/// `players` table that lacks the feature column.
fn prepare_existing(path: &Path) -> Result<(), GalleryError> {
    let conn = Connection::open(path)?;
    let status: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
    if status != "ok" {
        return Err(GalleryError::InvalidValue(format!(
            "integrity check failed: {status}"
        )));
    }

    let columns: Vec<String> = {
        let mut stmt = conn.prepare("PRAGMA table_info(players)")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        names.collect::<Result<_, _>>()?
    };
    if !columns.is_empty() && !columns.iter().any(|c| c == FEATURE_COLUMN) {
        log::warn!("players table has no {FEATURE_COLUMN} column; recreating it");
        conn.execute_batch("DROP TABLE IF EXISTS players")?;
    }
    Ok(())
}

/// Renames `path` to `<path>.backup`, replacing an older backup.
fn move_aside(path: &Path) -> Result<PathBuf, GalleryError> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".backup");
    let backup = PathBuf::from(backup);

    let backup_err = |source| GalleryError::Backup {
        path: path.to_path_buf(),
        source,
    };
    if backup.exists() {
        fs::remove_file(&backup).map_err(backup_err)?;
    }
    fs::rename(path, &backup).map_err(backup_err)?;
    Ok(backup)
}

fn to_identity(id: i64) -> Result<Identity, GalleryError> {
    Identity::try_from(id).map_err(|_| GalleryError::InvalidValue(format!("identity {id}")))
}

fn encode_feature_blob(feature: &FeatureVector) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(feature.values()));
    for &value in feature.values() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_feature_blob(blob: &[u8]) -> Result<FeatureVector, GalleryError> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return Err(GalleryError::InvalidValue(format!(
            "feature blob of {} bytes",
            blob.len()
        )));
    }
    let mut values = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            return Err(GalleryError::InvalidValue(
                "feature contains non-finite values".to_string(),
            ));
        }
        values.push(value);
    }
    Ok(FeatureVector::new(values))
}
