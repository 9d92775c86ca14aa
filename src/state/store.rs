/// Persisted grant store
///
/// The GrantStore manages the SQLite settings database. It remembers the
/// last approved storage location across process restarts and keeps
/// per-book reading positions.

use rusqlite::{Connection, OptionalExtension, Result as SqlResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data::StorageGrant;

/// Settings key holding the approved directory identifier
const KEY_SCOPED_STORAGE_URI: &str = "scopedStorageUri";

/// Settings key holding the grant's approval timestamp
const KEY_SCOPED_STORAGE_GRANTED_AT: &str = "scopedStorageGrantedAt";

/// A reading position inside one book, stored as JSON
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReadingPosition {
    /// Renderer-issued location string (e.g., "page 3 of 120")
    pub location: String,
    /// Page number backing the location string
    pub page: u32,
}

/// Durable key/value store for the storage grant and reading positions
pub struct GrantStore {
    conn: Connection,
    db_path: PathBuf,
}

impl GrantStore {
    /// Create a new GrantStore and initialize the database.
    ///
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/folio-reader/folio_reader.db
    /// - macOS: ~/Library/Application Support/folio-reader/folio_reader.db
    /// - Windows: %APPDATA%\folio-reader\folio_reader.db
    pub fn new() -> SqlResult<Self> {
        let db_path = Self::get_db_path();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .expect("Failed to create application data directory");
        }

        Self::open_at(db_path)
    }

    /// Open (or create) the store at an explicit path
    pub fn open_at(db_path: PathBuf) -> SqlResult<Self> {
        let conn = Connection::open(&db_path)?;

        println!("📁 Settings database initialized at: {}", db_path.display());

        let store = GrantStore { conn, db_path };
        store.init_schema()?;

        Ok(store)
    }

    /// Get the path where the database should be stored
    fn get_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine user data directory");

        path.push("folio-reader");
        path.push("folio_reader.db");
        path
    }

    /// Initialize the database schema.
    /// Creates all necessary tables if they don't exist.
    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS reading_positions (
                document        TEXT PRIMARY KEY,
                position_json   TEXT NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Remember the approved storage location, overwriting any prior grant
    ///
    /// Each write is a single INSERT OR REPLACE, so a load never observes
    /// a partially written grant.
    pub fn save_grant(&self, grant: &StorageGrant) -> SqlResult<()> {
        self.set_value(KEY_SCOPED_STORAGE_URI, &grant.location_id)?;
        self.set_value(
            KEY_SCOPED_STORAGE_GRANTED_AT,
            &grant.granted_at.to_string(),
        )?;

        println!("💾 Saved directory grant: {}", grant.location_id);

        Ok(())
    }

    /// Load the remembered grant, if any
    ///
    /// `Ok(None)` is the normal first-run outcome, not an error.
    pub fn load_grant(&self) -> SqlResult<Option<StorageGrant>> {
        let Some(location_id) = self.get_value(KEY_SCOPED_STORAGE_URI)? else {
            return Ok(None);
        };

        let granted_at = self
            .get_value(KEY_SCOPED_STORAGE_GRANTED_AT)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Some(StorageGrant {
            location_id,
            granted_at,
        }))
    }

    /// Forget the remembered grant (used when the platform revokes it)
    pub fn clear_grant(&self) -> SqlResult<()> {
        self.conn.execute(
            "DELETE FROM settings WHERE key IN (?1, ?2)",
            [KEY_SCOPED_STORAGE_URI, KEY_SCOPED_STORAGE_GRANTED_AT],
        )?;

        println!("🗑️  Cleared stored directory grant");

        Ok(())
    }

    /// Save the reading position for one book
    pub fn save_position(&self, document: &str, position: &ReadingPosition) -> SqlResult<()> {
        let json = serde_json::to_string(position)
            .expect("ReadingPosition always serializes");

        let now = chrono::Utc::now().timestamp();

        self.conn.execute(
            "INSERT OR REPLACE INTO reading_positions (document, position_json, updated_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![document, json, now],
        )?;

        Ok(())
    }

    /// Load the reading position for one book, if one was saved
    pub fn load_position(&self, document: &str) -> SqlResult<Option<ReadingPosition>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT position_json FROM reading_positions WHERE document = ?1",
                [document],
                |row| row.get(0),
            )
            .optional()?;

        Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
    }

    fn set_value(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    fn get_value(&self, key: &str) -> SqlResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for GrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
