/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the storage layer, the access state machine and the UI layer.

use std::path::PathBuf;

/// A durable permission token for a user-approved storage location
///
/// At most one grant is remembered at a time; requesting a new one
/// overwrites the previous record. The platform may silently revoke a
/// grant, which surfaces later as a resolution failure.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageGrant {
    /// Opaque identifier of the approved directory
    pub location_id: String,
    /// Unix timestamp of when the user approved the directory
    pub granted_at: i64,
}

/// A single entry produced by listing a granted directory
///
/// Transient: reflects directory contents at listing time, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    /// Filename only (e.g., "book1.epub")
    pub name: String,
    /// Openable reference to the entry's content
    pub handle: PathBuf,
    /// Whether the entry is a subdirectory
    pub is_directory: bool,
}

/// A document located inside a granted directory, ready to open
///
/// Owned by the reader session for the duration of one reading session
/// and discarded when the session ends or a new resolution occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDocument {
    /// Openable reference to the document content
    pub handle: PathBuf,
    /// Name shown in the reader chrome (e.g., "book1.epub")
    pub display_name: String,
}
