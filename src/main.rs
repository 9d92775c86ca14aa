use iced::widget::{button, column, container, row, text, Column};
use iced::{Alignment, Element, Length, Task, Theme};

// Declare the application modules
mod reader;
mod state;
mod storage;

use reader::{
    DisplayError, EpubRenderer, OpenedBook, ReaderSession, Renderer, SessionPhase, Viewport,
};
use state::access::{AccessController, AccessState, Effect};
use state::data::{ResolvedDocument, StorageGrant};
use state::store::GrantStore;
use storage::{resolver, AccessError, NativeGateway, StorageGateway};

/// Document opened when no name is given on the command line
const DEFAULT_TARGET: &str = "book1.epub";

/// Main application state
struct FolioReader {
    /// Durable grant + reading-position store
    store: GrantStore,
    /// The access lifecycle state machine
    controller: AccessController,
    /// Active reading session, once a document is resolved
    session: Option<ReaderSession>,
    /// Filename we are looking for inside the granted directory
    target_name: String,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// The folder picker finished
    PermissionResult(Result<StorageGrant, AccessError>),
    /// The document resolver finished
    ResolutionResult(Result<ResolvedDocument, AccessError>),
    /// The renderer opened the book (or failed to display it)
    RendererOpened(Result<OpenedBook, DisplayError>),
    /// User turned to the next page
    NextPage,
    /// User turned to the previous page
    PreviousPage,
    /// User asked to retry after an access failure
    Retry,
    /// User asked to re-open the book after a display error
    ReopenBook,
}

impl FolioReader {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        // If this fails, we panic because the app cannot function without
        // its settings database
        let store = GrantStore::new()
            .expect("Failed to initialize settings database. Check permissions and disk space.");

        let target_name = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());

        println!("📚 Folio Reader starting, looking for '{}'", target_name);

        let mut app = FolioReader {
            store,
            controller: AccessController::new(),
            session: None,
            target_name,
            status: String::from("Loading..."),
        };

        let effect = app.controller.start();
        let task = app.run_effect(effect);

        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PermissionResult(result) => {
                let effect = self.controller.permission_result(result);
                self.run_effect(effect)
            }
            Message::ResolutionResult(result) => {
                let effect = self.controller.resolution_result(result);
                let task = self.run_effect(effect);

                // A fresh resolution starts a reading session
                if let AccessState::Ready { document } = self.controller.state() {
                    let document = document.clone();
                    return self.open_book(document);
                }

                task
            }
            Message::RendererOpened(result) => {
                let Some(session) = self.session.as_mut() else {
                    // The session was discarded while the renderer worked
                    return Task::none();
                };

                match result {
                    Ok(book) => {
                        let resume = self
                            .store
                            .load_position(&session.document().display_name)
                            .ok()
                            .flatten();
                        session.on_ready(book, resume);
                        self.status =
                            format!("Reading {}", session.document().display_name);
                    }
                    Err(error) => {
                        // The document resolved fine; only rendering failed.
                        // The access state stays Ready.
                        session.on_display_error(error);
                        self.status =
                            String::from("There was an issue loading the EPUB file.");
                    }
                }

                Task::none()
            }
            Message::NextPage => self.turn_page(1),
            Message::PreviousPage => self.turn_page(-1),
            Message::Retry => {
                self.session = None;
                let effect = self.controller.retry();
                self.run_effect(effect)
            }
            Message::ReopenBook => {
                let Some(document) =
                    self.session.as_ref().map(|s| s.document().clone())
                else {
                    return Task::none();
                };
                self.open_book(document)
            }
        }
    }

    /// Execute the work a controller transition asked for
    fn run_effect(&mut self, effect: Effect) -> Task<Message> {
        match effect {
            Effect::None => Task::none(),

            Effect::LoadStoredGrant => {
                // The store answers synchronously; a failed read means no grant
                let stored = self.store.load_grant().unwrap_or_else(|e| {
                    eprintln!("⚠️  Could not read the saved grant: {}", e);
                    None
                });

                let next = self.controller.grant_checked(stored);
                self.run_effect(next)
            }

            Effect::RequestGrant => {
                self.status = String::from("Waiting for you to approve a folder...");

                Task::perform(
                    async { NativeGateway.request_directory_grant().await },
                    Message::PermissionResult,
                )
            }

            Effect::PersistAndResolve { grant } => {
                if let Err(e) = self.store.save_grant(&grant) {
                    // The in-memory grant still works for this session; the
                    // next start will simply re-prompt
                    eprintln!("⚠️  Could not save the directory grant: {}", e);
                }

                self.spawn_resolve(grant)
            }

            Effect::Resolve { grant } => self.spawn_resolve(grant),

            Effect::ClearGrantAndRequest => {
                if let Err(e) = self.store.clear_grant() {
                    eprintln!("⚠️  Could not clear the dead grant: {}", e);
                }

                self.run_effect(Effect::RequestGrant)
            }

            Effect::ClearGrant => {
                if let Err(e) = self.store.clear_grant() {
                    eprintln!("⚠️  Could not clear the dead grant: {}", e);
                }

                Task::none()
            }
        }
    }

    /// Launch the async document search with the given grant
    fn spawn_resolve(&mut self, grant: StorageGrant) -> Task<Message> {
        self.status = format!("Searching for '{}'...", self.target_name);
        let target = self.target_name.clone();

        Task::perform(
            async move { resolver::resolve(&NativeGateway, &grant, &target).await },
            Message::ResolutionResult,
        )
    }

    /// Start a reading session and open the document in the renderer
    fn open_book(&mut self, document: ResolvedDocument) -> Task<Message> {
        self.status = format!("Opening {}...", document.display_name);
        self.session = Some(ReaderSession::new(document.clone()));

        Task::perform(
            async move { EpubRenderer.open(&document, Viewport::default()).await },
            Message::RendererOpened,
        )
    }

    /// Turn the page and persist the new reading position
    fn turn_page(&mut self, delta: i32) -> Task<Message> {
        if let Some(session) = self.session.as_mut() {
            if let Some(position) = session.turn_page(delta) {
                // Position updates are informational; a failed save only logs
                let document = session.document().display_name.clone();
                if let Err(e) = self.store.save_position(&document, &position) {
                    eprintln!("⚠️  Could not save reading position: {}", e);
                }
            }
        }

        Task::none()
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let content = match self.controller.state() {
            AccessState::Idle | AccessState::CheckingStoredGrant => column![
                text("Folio Reader").size(48),
                text("Loading...").size(16),
            ],

            AccessState::RequestingPermission => column![
                text("Folio Reader").size(48),
                text("Select the folder that contains your books.").size(16),
                text(&self.status).size(16),
            ],

            AccessState::ResolvingDocument { .. } => column![
                text("Folio Reader").size(48),
                text(&self.status).size(16),
            ],

            AccessState::Failed { reason } => column![
                text("Folio Reader").size(48),
                text(reason.to_string()).size(16),
                button("Retry").on_press(Message::Retry).padding(10),
            ],

            AccessState::Ready { .. } => self.reader_view(),
        }
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    /// The reading-session portion of the UI
    fn reader_view(&self) -> Column<Message> {
        let Some(session) = &self.session else {
            return column![text("Folio Reader").size(48)];
        };

        match session.phase() {
            SessionPhase::Opening => column![
                text(&session.document().display_name).size(32),
                text(&self.status).size(16),
            ],

            SessionPhase::Reading { position, .. } => column![
                text(&session.document().display_name).size(32),
                text(&position.location).size(16),
                row![
                    button("Previous").on_press(Message::PreviousPage).padding(10),
                    button("Next").on_press(Message::NextPage).padding(10),
                ]
                .spacing(20),
            ],

            SessionPhase::DisplayFailed { error } => column![
                text(&session.document().display_name).size(32),
                text(error.to_string()).size(16),
                button("Try Again").on_press(Message::ReopenBook).padding(10),
            ],
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    iced::application("Folio Reader", FolioReader::update, FolioReader::view)
        .theme(FolioReader::theme)
        .centered()
        .run_with(FolioReader::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> (tempfile::TempDir, FolioReader) {
        let dir = tempfile::tempdir().unwrap();
        let store = GrantStore::open_at(dir.path().join("test.db")).unwrap();

        let app = FolioReader {
            store,
            controller: AccessController::new(),
            session: None,
            target_name: DEFAULT_TARGET.to_string(),
            status: String::new(),
        };

        (dir, app)
    }

    fn grant(id: &str) -> StorageGrant {
        StorageGrant {
            location_id: id.to_string(),
            granted_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_approved_grant_is_persisted_before_resolution() {
        let (_dir, mut app) = test_app();
        app.controller.start();
        app.controller.grant_checked(None);

        let approved = grant("/books");
        let effect = app.controller.permission_result(Ok(approved.clone()));
        let _task = app.run_effect(effect);

        assert_eq!(app.store.load_grant().unwrap(), Some(approved));
    }

    #[test]
    fn test_revoked_grant_is_cleared_from_the_store() {
        let (_dir, mut app) = test_app();
        app.store.save_grant(&grant("/dead")).unwrap();

        app.controller.start();
        app.controller.grant_checked(Some(grant("/dead")));
        let effect = app
            .controller
            .resolution_result(Err(AccessError::GrantRevoked));
        let _task = app.run_effect(effect);

        // The dead grant is gone, and the user is being re-prompted
        assert_eq!(app.store.load_grant().unwrap(), None);
        assert_eq!(
            app.controller.state(),
            &AccessState::RequestingPermission
        );
    }
}
