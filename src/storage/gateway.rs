/// Platform storage gateway
///
/// Wraps the native folder picker dialog and the directory listing call
/// behind the `StorageGateway` capability trait. The real implementation
/// talks to the OS through rfd and the filesystem; tests substitute mocks.

use std::path::Path;

use chrono::Utc;
use rfd::FileDialog;
use tokio::task;
use walkdir::WalkDir;

use super::AccessError;
use crate::state::data::{DirectoryEntry, StorageGrant};

/// Capability interface over the platform's scoped-storage surface
///
/// Implementations:
/// - `NativeGateway` for the real OS picker and filesystem
/// - mock gateways in tests
#[allow(async_fn_in_trait)]
pub trait StorageGateway {
    /// Show the directory picker and return a grant for the approved folder
    ///
    /// # Errors
    /// - `PermissionDenied` if the user cancels or the platform refuses
    /// - `PlatformUnavailable` if the picker cannot be invoked at all
    async fn request_directory_grant(&self) -> Result<StorageGrant, AccessError>;

    /// List the granted directory: one pass, contents at call time
    ///
    /// # Errors
    /// - `GrantRevoked` if the stored location is no longer valid; the
    ///   caller must clear the persisted grant so the user is re-prompted
    ///   instead of looping on a dead grant
    async fn list_directory(
        &self,
        grant: &StorageGrant,
    ) -> Result<Vec<DirectoryEntry>, AccessError>;
}

/// The real gateway: rfd dialog + filesystem listing
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeGateway;

impl StorageGateway for NativeGateway {
    async fn request_directory_grant(&self) -> Result<StorageGrant, AccessError> {
        // The dialog blocks until the user answers (no timeout, user-paced),
        // so it runs off the UI loop. A dead picker task is the one case we
        // can distinguish from a plain cancel.
        let folder = task::spawn_blocking(|| {
            FileDialog::new()
                .set_title("Select Folder with EPUB Books")
                .pick_folder()
        })
        .await
        .map_err(|e| AccessError::PlatformUnavailable(e.to_string()))?;

        match folder {
            Some(folder_path) => {
                println!("📁 Directory approved: {}", folder_path.display());
                Ok(StorageGrant {
                    location_id: folder_path.to_string_lossy().to_string(),
                    granted_at: Utc::now().timestamp(),
                })
            }
            None => Err(AccessError::PermissionDenied),
        }
    }

    async fn list_directory(
        &self,
        grant: &StorageGrant,
    ) -> Result<Vec<DirectoryEntry>, AccessError> {
        let location = grant.location_id.clone();

        task::spawn_blocking(move || list_directory_blocking(&location))
            .await
            .map_err(|e| AccessError::PlatformUnavailable(e.to_string()))?
    }
}

/// Blocking implementation of the single-level directory listing
fn list_directory_blocking(location: &str) -> Result<Vec<DirectoryEntry>, AccessError> {
    let root = Path::new(location);

    // A vanished or unreadable directory means the grant is dead
    if !root.is_dir() {
        eprintln!("⚠️  Saved folder is gone or unreadable: {}", location);
        return Err(AccessError::GrantRevoked);
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|_| AccessError::GrantRevoked)?;

        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            handle: entry.path().to_path_buf(),
            is_directory: entry.file_type().is_dir(),
        });
    }

    println!("🔍 Listed {} entries in {}", entries.len(), root.display());

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn grant_for(path: &Path) -> StorageGrant {
        StorageGrant {
            location_id: path.to_string_lossy().to_string(),
            granted_at: 0,
        }
    }

    #[tokio::test]
    async fn test_list_directory_returns_files_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("book1.epub"), b"not really an epub").unwrap();
        fs::create_dir(dir.path().join("covers")).unwrap();

        let entries = NativeGateway
            .list_directory(&grant_for(dir.path()))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);

        let book = entries.iter().find(|e| e.name == "book1.epub").unwrap();
        assert!(!book.is_directory);
        assert_eq!(book.handle, dir.path().join("book1.epub"));

        let covers = entries.iter().find(|e| e.name == "covers").unwrap();
        assert!(covers.is_directory);
    }

    #[tokio::test]
    async fn test_list_directory_is_single_level() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.epub"), b"x").unwrap();

        let entries = NativeGateway
            .list_directory(&grant_for(dir.path()))
            .await
            .unwrap();

        // Only the directory itself shows up, not its contents
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "nested");
    }

    #[tokio::test]
    async fn test_list_directory_reports_revoked_for_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let grant = grant_for(&dir.path().join("deleted-later"));

        let result = NativeGateway.list_directory(&grant).await;

        assert_eq!(result, Err(AccessError::GrantRevoked));
    }
}
