/// Scoped-storage access module
///
/// This module handles everything between "the user owns a folder" and
/// "we hold an openable document":
/// - The platform gateway: folder picker + directory listing (gateway.rs)
/// - The document resolver: target name → openable handle (resolver.rs)
///
/// Both are capability interfaces so alternative storage backends can be
/// substituted without touching the access state machine.

pub mod gateway;
pub mod resolver;

pub use gateway::{NativeGateway, StorageGateway};

use thiserror::Error;

/// Failure kinds for grant acquisition and document resolution
///
/// Gateway and resolver errors propagate unmodified to the access
/// lifecycle controller, which is the only component that decides
/// between retry and terminal failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// The user cancelled the folder picker or the platform refused access
    #[error("Directory access was denied")]
    PermissionDenied,

    /// The native folder picker could not be invoked at all
    #[error("The folder picker is unavailable on this platform: {0}")]
    PlatformUnavailable(String),

    /// The stored grant no longer opens the directory it points to
    #[error("Access to the saved folder was revoked")]
    GrantRevoked,

    /// The directory listed fine, but no entry matched the target name
    #[error("The file '{name}' was not found in the selected directory")]
    DocumentNotFound { name: String },
}

impl AccessError {
    /// Whether a manual retry should go back through the folder picker
    /// (as opposed to re-running resolution with the existing grant)
    pub fn needs_permission(&self) -> bool {
        match self {
            AccessError::PermissionDenied
            | AccessError::PlatformUnavailable(_)
            | AccessError::GrantRevoked => true,
            AccessError::DocumentNotFound { .. } => false,
        }
    }
}
