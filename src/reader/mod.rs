/// Reader lifecycle module
///
/// Bridges a resolved document into the rendering engine's lifecycle:
/// ready, location changes, display errors. The engine sits behind the
/// `Renderer` capability trait so real rendering engines can be swapped
/// in without touching the access flow; the bundled `EpubRenderer` only
/// validates the container and estimates a page count.

use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::state::data::ResolvedDocument;
use crate::state::store::ReadingPosition;

/// ZIP local-file-header magic; every EPUB container starts with it
const EPUB_CONTAINER_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Rough bytes-per-page used for the page count estimate
const BYTES_PER_PAGE: u64 = 2048;

/// Renderer-level failures, distinct from resolution failures
///
/// A display error never reverts a successful resolution — the document
/// was correctly resolved, only its rendering failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisplayError {
    /// The file could not be opened or read
    #[error("Could not open '{name}': {message}")]
    OpenFailed { name: String, message: String },

    /// The file opened but is not a readable EPUB container
    #[error("'{name}' is not a readable EPUB file")]
    CorruptDocument { name: String },
}

/// Viewport dimensions handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 800,
            height: 1000,
        }
    }
}

/// The renderer's open result: first content is visible
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedBook {
    pub size_bytes: u64,
    /// Size-based estimate; real engines report exact pagination
    pub page_estimate: u32,
}

/// Capability interface over the rendering engine
#[allow(async_fn_in_trait)]
pub trait Renderer {
    /// Open a resolved document and render its first content
    ///
    /// # Errors
    /// Returns a `DisplayError` if the file cannot be opened or its
    /// content is not a valid EPUB container.
    async fn open(
        &self,
        document: &ResolvedDocument,
        viewport: Viewport,
    ) -> Result<OpenedBook, DisplayError>;
}

/// Minimal bundled renderer: container sniff + page estimate
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubRenderer;

impl Renderer for EpubRenderer {
    async fn open(
        &self,
        document: &ResolvedDocument,
        _viewport: Viewport,
    ) -> Result<OpenedBook, DisplayError> {
        let open_failed = |e: &dyn std::fmt::Display| DisplayError::OpenFailed {
            name: document.display_name.clone(),
            message: e.to_string(),
        };

        let mut file = tokio::fs::File::open(&document.handle)
            .await
            .map_err(|e| open_failed(&e))?;

        let size_bytes = file
            .metadata()
            .await
            .map_err(|e| open_failed(&e))?
            .len();

        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).await.is_err() || magic != EPUB_CONTAINER_MAGIC {
            eprintln!(
                "❌ '{}' does not start with a ZIP header",
                document.display_name
            );
            return Err(DisplayError::CorruptDocument {
                name: document.display_name.clone(),
            });
        }

        let page_estimate = (size_bytes / BYTES_PER_PAGE).max(1) as u32;

        println!(
            "📖 Opened '{}' ({} bytes, ~{} pages)",
            document.display_name, size_bytes, page_estimate
        );

        Ok(OpenedBook {
            size_bytes,
            page_estimate,
        })
    }
}

/// Where one reading session currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Waiting for the renderer's first content
    Opening,
    /// Rendering succeeded; tracking the reading position
    Reading {
        book: OpenedBook,
        position: ReadingPosition,
    },
    /// The renderer failed; the resolved document is still valid
    DisplayFailed { error: DisplayError },
}

/// One reading session: a resolved document plus its renderer lifecycle
///
/// The session owns the `ResolvedDocument` until the reader is closed.
/// Display errors switch the session to an error presentation but never
/// discard the document or the access state behind it.
#[derive(Debug)]
pub struct ReaderSession {
    document: ResolvedDocument,
    phase: SessionPhase,
}

impl ReaderSession {
    /// Start a session for a freshly resolved document
    pub fn new(document: ResolvedDocument) -> Self {
        ReaderSession {
            document,
            phase: SessionPhase::Opening,
        }
    }

    pub fn document(&self) -> &ResolvedDocument {
        &self.document
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The renderer produced first content
    ///
    /// Resumes at `resume_at` when a position was saved for this book,
    /// otherwise at page one.
    pub fn on_ready(&mut self, book: OpenedBook, resume_at: Option<ReadingPosition>) {
        if !matches!(self.phase, SessionPhase::Opening) {
            return;
        }

        let position = resume_at
            .filter(|p| p.page <= book.page_estimate)
            .unwrap_or_else(|| page_position(1, book.page_estimate));

        println!(
            "📖 Book ready: {} at {}",
            self.document.display_name, position.location
        );

        self.phase = SessionPhase::Reading { book, position };
    }

    /// Informational position update; never blocks the caller
    pub fn on_location_change(&mut self, new_position: ReadingPosition) {
        if let SessionPhase::Reading { position, .. } = &mut self.phase {
            *position = new_position;
        }
    }

    /// Renderer-level failure: switch to the error presentation
    pub fn on_display_error(&mut self, error: DisplayError) {
        eprintln!(
            "❌ Display error for '{}': {}",
            self.document.display_name, error
        );
        self.phase = SessionPhase::DisplayFailed { error };
    }

    /// Turn the page by `delta` and return the new position (for the
    /// caller to persist), clamped to the book's bounds
    pub fn turn_page(&mut self, delta: i32) -> Option<ReadingPosition> {
        let SessionPhase::Reading { book, position } = &self.phase else {
            return None;
        };

        let page = (position.page as i64 + delta as i64)
            .clamp(1, book.page_estimate as i64) as u32;
        if page == position.page {
            return None;
        }

        let new_position = page_position(page, book.page_estimate);
        self.on_location_change(new_position.clone());
        Some(new_position)
    }
}

/// Build the renderer-style location string for a page
fn page_position(page: u32, page_count: u32) -> ReadingPosition {
    ReadingPosition {
        location: format!("page {} of {}", page, page_count),
        page,
    }
}
