/// Access lifecycle state machine
///
/// The controller owns the single UI-observable `AccessState` and decides
/// every transition of the grant/resolve flow. It is deliberately pure:
/// instead of touching the store, the picker or the filesystem it returns
/// an `Effect` that the shell executes, which keeps every transition unit
/// testable without dialogs or disk.

use super::data::{ResolvedDocument, StorageGrant};
use crate::storage::AccessError;

/// How many times a revoked grant may automatically re-open the picker
/// before the failure is surfaced to the user
const MAX_AUTO_REPROMPTS: u8 = 1;

/// The single source of truth for what the UI should render
///
/// Exactly one variant is active at any time; impossible combinations
/// (loading while a document is already resolved, etc.) cannot be
/// represented.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessState {
    /// Nothing started yet
    Idle,
    /// Looking up a previously persisted grant
    CheckingStoredGrant,
    /// Waiting on the user in the folder picker
    RequestingPermission,
    /// Listing the granted directory and searching for the target file
    ResolvingDocument { grant: StorageGrant },
    /// Document resolved; handed to the reader session
    Ready { document: ResolvedDocument },
    /// Terminal until the user retries
    Failed { reason: AccessError },
}

/// Work the shell must perform after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing to do
    None,
    /// Ask the persisted store for an existing grant
    LoadStoredGrant,
    /// Open the folder picker
    RequestGrant,
    /// Persist a freshly approved grant, then resolve the document
    PersistAndResolve { grant: StorageGrant },
    /// Resolve the document with an already-persisted grant
    Resolve { grant: StorageGrant },
    /// Drop the dead persisted grant, then open the folder picker
    ClearGrantAndRequest,
    /// Drop the dead persisted grant; the failure is terminal
    ClearGrant,
}

/// Drives the grant/resolve flow, one transition at a time
///
/// Results delivered for a step the controller already left are ignored,
/// so a stale or duplicate completion can never clobber the state.
#[derive(Debug)]
pub struct AccessController {
    state: AccessState,
    /// Last grant we held, for resolution-only retries
    last_grant: Option<StorageGrant>,
    /// Automatic re-prompts consumed this session
    auto_reprompts: u8,
}

impl AccessController {
    /// Create a controller in the initial `Idle` state
    pub fn new() -> Self {
        AccessController {
            state: AccessState::Idle,
            last_grant: None,
            auto_reprompts: 0,
        }
    }

    /// The currently active state
    pub fn state(&self) -> &AccessState {
        &self.state
    }

    /// Begin the session: check whether a grant is already stored
    pub fn start(&mut self) -> Effect {
        if self.state != AccessState::Idle {
            return self.ignore("start");
        }

        self.state = AccessState::CheckingStoredGrant;
        Effect::LoadStoredGrant
    }

    /// The store answered the grant lookup
    ///
    /// A stored grant goes straight to resolution — the picker is never
    /// shown before resolution has been attempted at least once.
    pub fn grant_checked(&mut self, stored: Option<StorageGrant>) -> Effect {
        if self.state != AccessState::CheckingStoredGrant {
            return self.ignore("grant_checked");
        }

        match stored {
            Some(grant) => {
                println!("📖 Found saved directory grant: {}", grant.location_id);
                self.last_grant = Some(grant.clone());
                self.state = AccessState::ResolvingDocument {
                    grant: grant.clone(),
                };
                Effect::Resolve { grant }
            }
            None => {
                self.state = AccessState::RequestingPermission;
                Effect::RequestGrant
            }
        }
    }

    /// The folder picker finished
    pub fn permission_result(
        &mut self,
        result: Result<StorageGrant, AccessError>,
    ) -> Effect {
        if self.state != AccessState::RequestingPermission {
            return self.ignore("permission_result");
        }

        match result {
            Ok(grant) => {
                self.last_grant = Some(grant.clone());
                self.state = AccessState::ResolvingDocument {
                    grant: grant.clone(),
                };
                Effect::PersistAndResolve { grant }
            }
            Err(reason) => {
                eprintln!("❌ Permission request failed: {}", reason);
                self.state = AccessState::Failed { reason };
                Effect::None
            }
        }
    }

    /// The resolver finished
    ///
    /// A revoked grant re-opens the picker automatically at most
    /// `MAX_AUTO_REPROMPTS` times per session; after that the revocation
    /// is terminal. Either way the dead grant is dropped from the store.
    pub fn resolution_result(
        &mut self,
        result: Result<ResolvedDocument, AccessError>,
    ) -> Effect {
        if !matches!(self.state, AccessState::ResolvingDocument { .. }) {
            return self.ignore("resolution_result");
        }

        match result {
            Ok(document) => {
                self.state = AccessState::Ready { document };
                Effect::None
            }
            Err(AccessError::GrantRevoked) if self.auto_reprompts < MAX_AUTO_REPROMPTS => {
                eprintln!("⚠️  Saved grant was revoked, asking the user again");
                self.auto_reprompts += 1;
                self.last_grant = None;
                self.state = AccessState::RequestingPermission;
                Effect::ClearGrantAndRequest
            }
            Err(AccessError::GrantRevoked) => {
                eprintln!("❌ Grant revoked again, giving up for this session");
                self.state = AccessState::Failed {
                    reason: AccessError::GrantRevoked,
                };
                Effect::ClearGrant
            }
            Err(reason) => {
                eprintln!("❌ Resolution failed: {}", reason);
                self.state = AccessState::Failed { reason };
                Effect::None
            }
        }
    }

    /// User-initiated retry from a terminal failure
    ///
    /// Permission-flavored failures go back through the picker;
    /// resolution-only failures re-run resolution with the grant we
    /// already hold.
    pub fn retry(&mut self) -> Effect {
        let AccessState::Failed { reason } = &self.state else {
            return self.ignore("retry");
        };

        if !reason.needs_permission() {
            if let Some(grant) = self.last_grant.clone() {
                self.state = AccessState::ResolvingDocument {
                    grant: grant.clone(),
                };
                return Effect::Resolve { grant };
            }
        }

        self.state = AccessState::RequestingPermission;
        Effect::RequestGrant
    }

    fn ignore(&self, event: &str) -> Effect {
        eprintln!(
            "⚠️  Ignoring stale '{}' event in state {:?}",
            event, self.state
        );
        Effect::None
    }
}

impl Default for AccessController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn grant(id: &str) -> StorageGrant {
        StorageGrant {
            location_id: id.to_string(),
            granted_at: 1_700_000_000,
        }
    }

    fn document(name: &str) -> ResolvedDocument {
        ResolvedDocument {
            handle: PathBuf::from(format!("/books/{}", name)),
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_store_approved_picker_ends_ready() {
        let mut c = AccessController::new();

        assert_eq!(c.start(), Effect::LoadStoredGrant);
        assert_eq!(c.state(), &AccessState::CheckingStoredGrant);

        assert_eq!(c.grant_checked(None), Effect::RequestGrant);
        assert_eq!(c.state(), &AccessState::RequestingPermission);

        let g = grant("/books");
        assert_eq!(
            c.permission_result(Ok(g.clone())),
            Effect::PersistAndResolve { grant: g.clone() }
        );
        assert_eq!(c.state(), &AccessState::ResolvingDocument { grant: g });

        assert_eq!(c.resolution_result(Ok(document("book1.epub"))), Effect::None);

        let AccessState::Ready { document } = c.state() else {
            panic!("expected Ready, got {:?}", c.state());
        };
        assert_eq!(document.display_name, "book1.epub");
    }

    #[test]
    fn test_empty_store_cancelled_picker_ends_failed() {
        let mut c = AccessController::new();
        c.start();
        c.grant_checked(None);

        assert_eq!(
            c.permission_result(Err(AccessError::PermissionDenied)),
            Effect::None
        );
        assert_eq!(
            c.state(),
            &AccessState::Failed {
                reason: AccessError::PermissionDenied
            }
        );
    }

    #[test]
    fn test_stored_grant_resolves_without_picker() {
        let mut c = AccessController::new();
        c.start();

        // A stored grant must go to resolution, never to the picker
        let g = grant("/books");
        assert_eq!(
            c.grant_checked(Some(g.clone())),
            Effect::Resolve { grant: g.clone() }
        );
        assert_eq!(c.state(), &AccessState::ResolvingDocument { grant: g });
    }

    #[test]
    fn test_stored_grant_missing_document_ends_failed() {
        let mut c = AccessController::new();
        c.start();
        c.grant_checked(Some(grant("/books")));

        let reason = AccessError::DocumentNotFound {
            name: "book1.epub".to_string(),
        };
        assert_eq!(c.resolution_result(Err(reason.clone())), Effect::None);
        assert_eq!(c.state(), &AccessState::Failed { reason });
    }

    #[test]
    fn test_revoked_grant_reprompts_once_then_succeeds() {
        let mut c = AccessController::new();
        c.start();
        c.grant_checked(Some(grant("/dead")));

        // First revocation: clear the dead grant and re-open the picker
        assert_eq!(
            c.resolution_result(Err(AccessError::GrantRevoked)),
            Effect::ClearGrantAndRequest
        );
        assert_eq!(c.state(), &AccessState::RequestingPermission);

        // The fresh approval resolves normally
        let g = grant("/alive");
        c.permission_result(Ok(g));
        c.resolution_result(Ok(document("book1.epub")));
        assert!(matches!(c.state(), AccessState::Ready { .. }));
    }

    #[test]
    fn test_second_revocation_is_terminal() {
        let mut c = AccessController::new();
        c.start();
        c.grant_checked(Some(grant("/dead")));

        c.resolution_result(Err(AccessError::GrantRevoked));
        c.permission_result(Ok(grant("/also-dead")));

        assert_eq!(
            c.resolution_result(Err(AccessError::GrantRevoked)),
            Effect::ClearGrant
        );
        assert_eq!(
            c.state(),
            &AccessState::Failed {
                reason: AccessError::GrantRevoked
            }
        );
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let mut c = AccessController::new();
        c.start();
        c.grant_checked(None);

        // A resolution result arriving while we wait on the picker is stale
        assert_eq!(
            c.resolution_result(Ok(document("book1.epub"))),
            Effect::None
        );
        assert_eq!(c.state(), &AccessState::RequestingPermission);

        // So is a duplicate start
        assert_eq!(c.start(), Effect::None);
        assert_eq!(c.state(), &AccessState::RequestingPermission);

        // And a duplicate picker answer after the first one settled
        c.permission_result(Err(AccessError::PermissionDenied));
        let before = c.state().clone();
        assert_eq!(c.permission_result(Ok(grant("/late"))), Effect::None);
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn test_retry_after_not_found_reresolves_with_same_grant() {
        let mut c = AccessController::new();
        c.start();
        let g = grant("/books");
        c.grant_checked(Some(g.clone()));
        c.resolution_result(Err(AccessError::DocumentNotFound {
            name: "book1.epub".to_string(),
        }));

        assert_eq!(c.retry(), Effect::Resolve { grant: g.clone() });
        assert_eq!(c.state(), &AccessState::ResolvingDocument { grant: g });
    }

    #[test]
    fn test_retry_after_permission_failure_reopens_picker() {
        let mut c = AccessController::new();
        c.start();
        c.grant_checked(None);
        c.permission_result(Err(AccessError::PermissionDenied));

        assert_eq!(c.retry(), Effect::RequestGrant);
        assert_eq!(c.state(), &AccessState::RequestingPermission);
    }

    #[test]
    fn test_retry_outside_failed_is_ignored() {
        let mut c = AccessController::new();
        c.start();

        assert_eq!(c.retry(), Effect::None);
        assert_eq!(c.state(), &AccessState::CheckingStoredGrant);
    }
}
