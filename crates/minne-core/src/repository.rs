use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{Error, Note, NoteDao, Notebook, NotebookDao, Subscription};

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Business logic over the notes table.
///
/// Assigns ids and timestamps on save and keeps the sync flag honest on
/// edits; everything else passes through to the DAO.
pub struct NotesRepository<D: NoteDao> {
    dao: Arc<D>,
}

impl<D: NoteDao> Clone for NotesRepository<D> {
    fn clone(&self) -> Self {
        Self {
            dao: Arc::clone(&self.dao),
        }
    }
}

impl<D: NoteDao> NotesRepository<D> {
    pub fn new(dao: Arc<D>) -> Self {
        Self { dao }
    }

    pub async fn get_all_notes(&self) -> Result<Subscription<Note>, Error> {
        self.dao.get_all_notes().await
    }

    pub async fn get_favorite_notes(&self) -> Result<Subscription<Note>, Error> {
        self.dao.get_favorite_notes().await
    }

    pub async fn get_archived_notes(&self) -> Result<Subscription<Note>, Error> {
        self.dao.get_archived_notes().await
    }

    pub async fn get_deleted_notes(&self) -> Result<Subscription<Note>, Error> {
        self.dao.get_deleted_notes().await
    }

    pub async fn search_notes(&self, query: &str) -> Result<Subscription<Note>, Error> {
        self.dao.search_notes(query).await
    }

    pub async fn get_note_by_id(&self, id: &str) -> Result<Option<Note>, Error> {
        self.dao.get_note_by_id(id).await
    }

    /// Save a note, returning the id used.
    ///
    /// A blank id gets a freshly generated one and both timestamps stamped
    /// to now; an existing id is preserved and only `updated_at` moves.
    /// Title and content are not validated here.
    pub async fn save_note(&self, note: Note) -> Result<String, Error> {
        let now = now_millis();
        let note = if note.id.trim().is_empty() {
            Note {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
                ..note
            }
        } else {
            Note {
                updated_at: now,
                ..note
            }
        };
        let id = note.id.clone();
        self.dao.insert_note(note).await?;
        Ok(id)
    }

    /// Bulk variant of [`save_note`](Self::save_note) for imports.
    pub async fn save_notes(&self, notes: Vec<Note>) -> Result<Vec<String>, Error> {
        let now = now_millis();
        let notes: Vec<Note> = notes
            .into_iter()
            .map(|note| {
                if note.id.trim().is_empty() {
                    Note {
                        id: Uuid::new_v4().to_string(),
                        created_at: now,
                        updated_at: now,
                        ..note
                    }
                } else {
                    Note {
                        updated_at: now,
                        ..note
                    }
                }
            })
            .collect();
        let ids = notes.iter().map(|n| n.id.clone()).collect();
        self.dao.insert_notes(notes).await?;
        Ok(ids)
    }

    /// Replace a note's record, stamping `updated_at` and clearing the sync
    /// flag: any edit invalidates prior sync state.
    pub async fn update_note(&self, note: Note) -> Result<(), Error> {
        let note = Note {
            updated_at: now_millis(),
            is_synced: false,
            ..note
        };
        self.dao.update_note(note).await
    }

    pub async fn move_note_to_trash(&self, id: &str) -> Result<(), Error> {
        self.dao.update_note_deleted_status(id, true).await
    }

    /// Clears the trash flag only; an archived note returns to the archive.
    pub async fn restore_note(&self, id: &str) -> Result<(), Error> {
        self.dao.update_note_deleted_status(id, false).await
    }

    pub async fn archive_note(&self, id: &str) -> Result<(), Error> {
        self.dao.update_note_archived_status(id, true).await
    }

    pub async fn unarchive_note(&self, id: &str) -> Result<(), Error> {
        self.dao.update_note_archived_status(id, false).await
    }

    /// Set the favorite flag to the explicit value passed; the caller
    /// computes the new state.
    pub async fn toggle_note_favorite(&self, id: &str, is_favorite: bool) -> Result<(), Error> {
        self.dao.update_note_favorite_status(id, is_favorite).await
    }

    /// Irreversible row removal.
    pub async fn delete_note_permanently(&self, id: &str) -> Result<(), Error> {
        let affected = self.dao.delete_note_permanently(id).await?;
        tracing::debug!(id, affected, "permanently deleted note");
        Ok(())
    }

    /// Irreversibly remove every trashed note. Returns the purged count.
    pub async fn empty_trash(&self) -> Result<usize, Error> {
        let purged = self.dao.empty_trash().await?;
        tracing::info!(purged, "emptied trash");
        Ok(purged)
    }

    pub async fn get_unsynced_notes(&self) -> Result<Vec<Note>, Error> {
        self.dao.get_unsynced_notes().await
    }

    /// Sync-flag bookkeeping hook for an external sync collaborator.
    pub async fn mark_note_synced(&self, id: &str, is_synced: bool) -> Result<(), Error> {
        self.dao.update_note_sync_status(id, is_synced).await
    }
}

/// Business logic over the notebooks table.
///
/// Owns the default-notebook invariant: lazily recreates the default row
/// under a guard and refuses to delete it.
pub struct NotebooksRepository<D: NotebookDao> {
    dao: Arc<D>,
    // Serializes the check-then-create of the default notebook. Shared
    // across clones so concurrent first calls cannot both take the create
    // path.
    default_init: Arc<tokio::sync::Mutex<()>>,
}

impl<D: NotebookDao> Clone for NotebooksRepository<D> {
    fn clone(&self) -> Self {
        Self {
            dao: Arc::clone(&self.dao),
            default_init: Arc::clone(&self.default_init),
        }
    }
}

impl<D: NotebookDao> NotebooksRepository<D> {
    pub fn new(dao: Arc<D>) -> Self {
        Self {
            dao,
            default_init: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub async fn get_all_notebooks(&self) -> Result<Subscription<Notebook>, Error> {
        self.dao.get_all_notebooks().await
    }

    pub async fn get_notebook_by_id(&self, id: &str) -> Result<Option<Notebook>, Error> {
        self.dao.get_notebook_by_id(id).await
    }

    /// The default notebook, created on first access if missing.
    pub async fn get_default_notebook(&self) -> Result<Notebook, Error> {
        if let Some(notebook) = self.dao.get_default_notebook().await? {
            return Ok(notebook);
        }

        let _guard = self.default_init.lock().await;
        // Re-check: another caller may have created it while we waited.
        if let Some(notebook) = self.dao.get_default_notebook().await? {
            return Ok(notebook);
        }

        let notebook = Notebook::default_notebook();
        // Insert-or-replace by the reserved id keeps this idempotent even
        // if a racing writer got here first.
        self.dao.insert_notebook(notebook.clone()).await?;
        tracing::info!(id = %notebook.id, "created default notebook");
        Ok(notebook)
    }

    /// Save a notebook, returning the id used. Same blank-id rules as
    /// [`NotesRepository::save_note`]. The name must be non-blank.
    pub async fn save_notebook(&self, notebook: Notebook) -> Result<String, Error> {
        if notebook.name.trim().is_empty() {
            return Err(Error::Validation("notebook name cannot be empty".into()));
        }

        let now = now_millis();
        let notebook = if notebook.id.trim().is_empty() {
            Notebook {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
                ..notebook
            }
        } else {
            Notebook {
                updated_at: now,
                ..notebook
            }
        };
        let id = notebook.id.clone();
        self.dao.insert_notebook(notebook).await?;
        Ok(id)
    }

    /// Replace a notebook's record, stamping `updated_at`.
    pub async fn update_notebook(&self, notebook: Notebook) -> Result<(), Error> {
        if notebook.name.trim().is_empty() {
            return Err(Error::Validation("notebook name cannot be empty".into()));
        }

        let notebook = Notebook {
            updated_at: now_millis(),
            ..notebook
        };
        self.dao.update_notebook(notebook).await
    }

    /// Delete a notebook, moving its notes to the default notebook first.
    ///
    /// Returns `Ok(false)` without touching anything when `id` is the
    /// default notebook or no such row exists. The reassign-and-delete runs
    /// as one storage transaction.
    pub async fn delete_notebook(&self, id: &str) -> Result<bool, Error> {
        let default = self.get_default_notebook().await?;
        if id == default.id {
            tracing::debug!(id, "refused to delete default notebook");
            return Ok(false);
        }

        let deleted = self.dao.delete_notebook_reassigning(id, &default.id).await?;
        tracing::debug!(id, deleted, "deleted notebook");
        Ok(deleted)
    }

    pub async fn get_notes_count_in_notebook(&self, notebook_id: &str) -> Result<i64, Error> {
        self.dao.count_notes_in_notebook(notebook_id).await
    }
}
