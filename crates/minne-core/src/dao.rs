use crate::{Error, Note, Notebook, Subscription};

/// Data access operations over the notes table.
///
/// Multi-row reads return a [`Subscription`] that re-emits the full result
/// set after every write affecting the table. Single-row reads and all
/// writes are one-shot async operations.
#[async_trait::async_trait]
pub trait NoteDao: Send + Sync {
    /// Notes that are neither trashed nor archived, most recently updated first.
    async fn get_all_notes(&self) -> Result<Subscription<Note>, Error>;

    /// Active favorite notes.
    async fn get_favorite_notes(&self) -> Result<Subscription<Note>, Error>;

    /// Archived notes that are not trashed.
    async fn get_archived_notes(&self) -> Result<Subscription<Note>, Error>;

    /// Trashed notes, archived or not.
    async fn get_deleted_notes(&self) -> Result<Subscription<Note>, Error>;

    /// Active notes whose title or content contains `query`
    /// (case-insensitive substring match, consistent across both columns).
    async fn search_notes(&self, query: &str) -> Result<Subscription<Note>, Error>;

    /// Get a note by id. Returns `None` for a missing id.
    async fn get_note_by_id(&self, id: &str) -> Result<Option<Note>, Error>;

    /// One-shot read of all notes with the sync flag cleared.
    async fn get_unsynced_notes(&self) -> Result<Vec<Note>, Error>;

    /// Insert-or-replace by id.
    async fn insert_note(&self, note: Note) -> Result<(), Error>;

    /// Bulk insert-or-replace.
    async fn insert_notes(&self, notes: Vec<Note>) -> Result<(), Error>;

    /// Replace the full record. The caller merges computed fields first.
    async fn update_note(&self, note: Note) -> Result<(), Error>;

    /// Targeted flag write; no-op for a missing id.
    async fn update_note_deleted_status(&self, id: &str, is_deleted: bool) -> Result<(), Error>;

    async fn update_note_archived_status(&self, id: &str, is_archived: bool) -> Result<(), Error>;

    async fn update_note_favorite_status(&self, id: &str, is_favorite: bool) -> Result<(), Error>;

    async fn update_note_sync_status(&self, id: &str, is_synced: bool) -> Result<(), Error>;

    /// Remove the row. Returns the affected count (0 or 1).
    async fn delete_note_permanently(&self, id: &str) -> Result<usize, Error>;

    /// Remove every trashed row. Returns the purged count.
    async fn empty_trash(&self) -> Result<usize, Error>;
}

/// Data access operations over the notebooks table.
#[async_trait::async_trait]
pub trait NotebookDao: Send + Sync {
    /// All notebooks, by name ascending.
    async fn get_all_notebooks(&self) -> Result<Subscription<Notebook>, Error>;

    async fn get_notebook_by_id(&self, id: &str) -> Result<Option<Notebook>, Error>;

    /// The notebook flagged as default, if any.
    async fn get_default_notebook(&self) -> Result<Option<Notebook>, Error>;

    /// Insert-or-replace by id.
    async fn insert_notebook(&self, notebook: Notebook) -> Result<(), Error>;

    /// Replace the full record.
    async fn update_notebook(&self, notebook: Notebook) -> Result<(), Error>;

    /// Remove the row unless it is the default notebook. Returns the
    /// affected count (0 or 1).
    async fn delete_notebook(&self, id: &str) -> Result<usize, Error>;

    /// Point every note in `old_notebook_id` at `new_notebook_id`.
    async fn reassign_notes(
        &self,
        old_notebook_id: &str,
        new_notebook_id: &str,
    ) -> Result<usize, Error>;

    async fn count_notes_in_notebook(&self, notebook_id: &str) -> Result<i64, Error>;

    /// Atomically reassign the notebook's notes to `target_notebook_id` and
    /// remove the notebook row, in one transaction. Returns whether a row
    /// was deleted; a refused delete (default or missing notebook) rolls
    /// the reassignment back.
    async fn delete_notebook_reassigning(
        &self,
        id: &str,
        target_notebook_id: &str,
    ) -> Result<bool, Error>;
}
