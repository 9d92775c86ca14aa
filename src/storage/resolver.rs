/// Document resolver
///
/// Maps a target filename to an openable document handle within a granted
/// directory. Listing goes through the gateway so the resolver never
/// touches the platform directly.

use super::{AccessError, StorageGateway};
use crate::state::data::{ResolvedDocument, StorageGrant};

/// Find `target_name` inside the granted directory
///
/// The match is exact and case-sensitive; if several entries share the
/// name (platform quirk), the first one in listing order wins.
///
/// # Errors
/// - `DocumentNotFound` if no entry matches the target name
/// - gateway errors (`GrantRevoked`, `PermissionDenied`,
///   `PlatformUnavailable`) propagate unchanged — they are never coerced
///   into `DocumentNotFound`
pub async fn resolve<G: StorageGateway>(
    gateway: &G,
    grant: &StorageGrant,
    target_name: &str,
) -> Result<ResolvedDocument, AccessError> {
    let entries = gateway.list_directory(grant).await?;

    for entry in entries {
        if entry.name == target_name {
            println!("📖 File found: {}", entry.handle.display());
            return Ok(ResolvedDocument {
                handle: entry.handle,
                display_name: entry.name,
            });
        }
    }

    Err(AccessError::DocumentNotFound {
        name: target_name.to_string(),
    })
}
