//! SQLite implementation of the minne DAO traits.
//!
//! One `SqliteStore` owns the connection and the watcher registries for
//! live queries. Every write re-evaluates the registered queries for the
//! affected table and pushes a fresh snapshot into each subscription.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::watch;

use minne_core::{
    get_pending_migrations, Error, Note, NoteDao, Notebook, NotebookDao, Subscription,
    SCHEMA_VERSION,
};

const SELECT_NOTES: &str = "SELECT id, title, content, created_at, updated_at, is_synced, tags, \
     is_favorite, is_archived, is_deleted, notebook_id FROM notes";

const SELECT_NOTEBOOKS: &str =
    "SELECT id, name, description, created_at, updated_at, is_default FROM notebooks";

/// The query a note subscription was registered with.
#[derive(Debug, Clone)]
enum NoteQueryShape {
    Active,
    Favorites,
    Archived,
    Deleted,
    Search(String),
}

struct NoteWatcher {
    shape: NoteQueryShape,
    tx: watch::Sender<Vec<Note>>,
}

/// SQLite-backed store implementing both DAO traits.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    note_watchers: Mutex<Vec<NoteWatcher>>,
    notebook_watchers: Mutex<Vec<watch::Sender<Vec<Notebook>>>>,
}

impl SqliteStore {
    /// Open a database at the given path and run any pending migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let conn = Connection::open(path).map_err(|e| Error::Database(e.to_string()))?;
        let store = Self::from_connection(conn);
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory database and run migrations.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Database(e.to_string()))?;
        let store = Self::from_connection(conn);
        store.run_migrations()?;
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            note_watchers: Mutex::new(Vec::new()),
            notebook_watchers: Mutex::new(Vec::new()),
        }
    }

    /// Run any pending database migrations.
    fn run_migrations(&self) -> Result<(), Error> {
        let conn = self.conn.lock().unwrap();

        // Ensure _minne_meta table exists
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _minne_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        // Get current schema version
        let current_version: i64 = conn
            .query_row(
                "SELECT value FROM _minne_meta WHERE key = 'schema_version'",
                [],
                |row| {
                    let val: String = row.get(0)?;
                    Ok(val.parse().unwrap_or(0))
                },
            )
            .unwrap_or(0);

        // Already up to date
        if current_version >= SCHEMA_VERSION {
            return Ok(());
        }

        // Run pending migrations
        for migration in get_pending_migrations(current_version) {
            for statement in migration.statements {
                // Skip _minne_meta creation (already done above)
                if statement.contains("_minne_meta") {
                    continue;
                }
                // ALTER TABLE doesn't support IF NOT EXISTS, so ignore errors for those
                if statement.starts_with("ALTER TABLE") {
                    let _ = conn.execute(statement, []);
                } else {
                    conn.execute(statement, []).map_err(|e| {
                        Error::Database(format!("Migration {} failed: {}", migration.name, e))
                    })?;
                }
            }
        }

        // Update schema version
        conn.execute(
            "INSERT OR REPLACE INTO _minne_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    fn split_tags(raw: String) -> Vec<String> {
        if raw.trim().is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(String::from).collect()
        }
    }

    fn join_tags(tags: &[String]) -> String {
        tags.join(",")
    }

    fn note_from_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            is_synced: row.get(5)?,
            tags: Self::split_tags(row.get(6)?),
            is_favorite: row.get(7)?,
            is_archived: row.get(8)?,
            is_deleted: row.get(9)?,
            notebook_id: row.get(10)?,
        })
    }

    fn notebook_from_row(row: &rusqlite::Row) -> rusqlite::Result<Notebook> {
        Ok(Notebook {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            is_default: row.get(5)?,
        })
    }

    fn run_note_query(conn: &Connection, shape: &NoteQueryShape) -> Result<Vec<Note>, Error> {
        let (where_clause, params_vec): (&str, Vec<&dyn rusqlite::ToSql>) = match shape {
            NoteQueryShape::Active => ("WHERE is_deleted = 0 AND is_archived = 0", Vec::new()),
            NoteQueryShape::Favorites => (
                "WHERE is_deleted = 0 AND is_archived = 0 AND is_favorite = 1",
                Vec::new(),
            ),
            NoteQueryShape::Archived => ("WHERE is_deleted = 0 AND is_archived = 1", Vec::new()),
            NoteQueryShape::Deleted => ("WHERE is_deleted = 1", Vec::new()),
            // LIKE is case-insensitive here, for both columns
            NoteQueryShape::Search(query) => (
                "WHERE is_deleted = 0 AND is_archived = 0 \
                 AND (title LIKE '%' || ?1 || '%' OR content LIKE '%' || ?1 || '%')",
                vec![query],
            ),
        };

        let sql = format!("{} {} ORDER BY updated_at DESC", SELECT_NOTES, where_clause);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;

        let notes = stmt
            .query_map(params_vec.as_slice(), Self::note_from_row)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(notes)
    }

    fn run_notebook_query(conn: &Connection) -> Result<Vec<Notebook>, Error> {
        let sql = format!("{} ORDER BY name ASC", SELECT_NOTEBOOKS);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;

        let notebooks = stmt
            .query_map([], Self::notebook_from_row)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(notebooks)
    }

    /// Register a live note query seeded with the current result set.
    fn watch_notes(&self, shape: NoteQueryShape) -> Result<Subscription<Note>, Error> {
        let rows = {
            let conn = self.conn.lock().unwrap();
            Self::run_note_query(&conn, &shape)?
        };
        let (tx, rx) = watch::channel(rows);
        self.note_watchers
            .lock()
            .unwrap()
            .push(NoteWatcher { shape, tx });
        Ok(Subscription::new(rx))
    }

    /// Push fresh snapshots to all live note queries, pruning dead ones.
    fn notify_note_watchers(&self) {
        let conn = self.conn.lock().unwrap();
        let mut watchers = self.note_watchers.lock().unwrap();
        watchers.retain(|w| !w.tx.is_closed());
        for watcher in watchers.iter() {
            match Self::run_note_query(&conn, &watcher.shape) {
                Ok(rows) => {
                    let _ = watcher.tx.send(rows);
                }
                Err(e) => tracing::warn!(error = %e, "note watcher re-query failed"),
            }
        }
    }

    fn notify_notebook_watchers(&self) {
        let conn = self.conn.lock().unwrap();
        let mut watchers = self.notebook_watchers.lock().unwrap();
        watchers.retain(|tx| !tx.is_closed());
        for tx in watchers.iter() {
            match Self::run_notebook_query(&conn) {
                Ok(rows) => {
                    let _ = tx.send(rows);
                }
                Err(e) => tracing::warn!(error = %e, "notebook watcher re-query failed"),
            }
        }
    }
}

#[async_trait::async_trait]
impl NoteDao for SqliteStore {
    async fn get_all_notes(&self) -> Result<Subscription<Note>, Error> {
        self.watch_notes(NoteQueryShape::Active)
    }

    async fn get_favorite_notes(&self) -> Result<Subscription<Note>, Error> {
        self.watch_notes(NoteQueryShape::Favorites)
    }

    async fn get_archived_notes(&self) -> Result<Subscription<Note>, Error> {
        self.watch_notes(NoteQueryShape::Archived)
    }

    async fn get_deleted_notes(&self) -> Result<Subscription<Note>, Error> {
        self.watch_notes(NoteQueryShape::Deleted)
    }

    async fn search_notes(&self, query: &str) -> Result<Subscription<Note>, Error> {
        self.watch_notes(NoteQueryShape::Search(query.to_string()))
    }

    async fn get_note_by_id(&self, id: &str) -> Result<Option<Note>, Error> {
        let conn = self.conn.lock().unwrap();

        let note = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_NOTES),
                params![id],
                Self::note_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(note)
    }

    async fn get_unsynced_notes(&self) -> Result<Vec<Note>, Error> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!("{} WHERE is_synced = 0", SELECT_NOTES))
            .map_err(|e| Error::Database(e.to_string()))?;

        let notes = stmt
            .query_map([], Self::note_from_row)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(notes)
    }

    async fn insert_note(&self, note: Note) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO notes (id, title, content, created_at, updated_at, \
                 is_synced, tags, is_favorite, is_archived, is_deleted, notebook_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    note.id,
                    note.title,
                    note.content,
                    note.created_at,
                    note.updated_at,
                    note.is_synced,
                    Self::join_tags(&note.tags),
                    note.is_favorite,
                    note.is_archived,
                    note.is_deleted,
                    note.notebook_id,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn insert_notes(&self, notes: Vec<Note>) -> Result<(), Error> {
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn
                .transaction()
                .map_err(|e| Error::Database(e.to_string()))?;
            for note in &notes {
                tx.execute(
                    "INSERT OR REPLACE INTO notes (id, title, content, created_at, updated_at, \
                     is_synced, tags, is_favorite, is_archived, is_deleted, notebook_id) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        note.id,
                        note.title,
                        note.content,
                        note.created_at,
                        note.updated_at,
                        note.is_synced,
                        Self::join_tags(&note.tags),
                        note.is_favorite,
                        note.is_archived,
                        note.is_deleted,
                        note.notebook_id,
                    ],
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            }
            tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn update_note(&self, note: Note) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notes SET title = ?2, content = ?3, created_at = ?4, updated_at = ?5, \
                 is_synced = ?6, tags = ?7, is_favorite = ?8, is_archived = ?9, is_deleted = ?10, \
                 notebook_id = ?11 WHERE id = ?1",
                params![
                    note.id,
                    note.title,
                    note.content,
                    note.created_at,
                    note.updated_at,
                    note.is_synced,
                    Self::join_tags(&note.tags),
                    note.is_favorite,
                    note.is_archived,
                    note.is_deleted,
                    note.notebook_id,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn update_note_deleted_status(&self, id: &str, is_deleted: bool) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notes SET is_deleted = ?2 WHERE id = ?1",
                params![id, is_deleted],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn update_note_archived_status(&self, id: &str, is_archived: bool) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notes SET is_archived = ?2 WHERE id = ?1",
                params![id, is_archived],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn update_note_favorite_status(&self, id: &str, is_favorite: bool) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notes SET is_favorite = ?2 WHERE id = ?1",
                params![id, is_favorite],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn update_note_sync_status(&self, id: &str, is_synced: bool) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notes SET is_synced = ?2 WHERE id = ?1",
                params![id, is_synced],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_note_watchers();
        Ok(())
    }

    async fn delete_note_permanently(&self, id: &str) -> Result<usize, Error> {
        let rows = {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM notes WHERE id = ?1", params![id])
                .map_err(|e| Error::Database(e.to_string()))?
        };
        self.notify_note_watchers();
        Ok(rows)
    }

    async fn empty_trash(&self) -> Result<usize, Error> {
        let rows = {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM notes WHERE is_deleted = 1", [])
                .map_err(|e| Error::Database(e.to_string()))?
        };
        self.notify_note_watchers();
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl NotebookDao for SqliteStore {
    async fn get_all_notebooks(&self) -> Result<Subscription<Notebook>, Error> {
        let rows = {
            let conn = self.conn.lock().unwrap();
            Self::run_notebook_query(&conn)?
        };
        let (tx, rx) = watch::channel(rows);
        self.notebook_watchers.lock().unwrap().push(tx);
        Ok(Subscription::new(rx))
    }

    async fn get_notebook_by_id(&self, id: &str) -> Result<Option<Notebook>, Error> {
        let conn = self.conn.lock().unwrap();

        let notebook = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_NOTEBOOKS),
                params![id],
                Self::notebook_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(notebook)
    }

    async fn get_default_notebook(&self) -> Result<Option<Notebook>, Error> {
        let conn = self.conn.lock().unwrap();

        let notebook = conn
            .query_row(
                &format!("{} WHERE is_default = 1 LIMIT 1", SELECT_NOTEBOOKS),
                [],
                Self::notebook_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(notebook)
    }

    async fn insert_notebook(&self, notebook: Notebook) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO notebooks (id, name, description, created_at, \
                 updated_at, is_default) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    notebook.id,
                    notebook.name,
                    notebook.description,
                    notebook.created_at,
                    notebook.updated_at,
                    notebook.is_default,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_notebook_watchers();
        Ok(())
    }

    async fn update_notebook(&self, notebook: Notebook) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notebooks SET name = ?2, description = ?3, created_at = ?4, \
                 updated_at = ?5, is_default = ?6 WHERE id = ?1",
                params![
                    notebook.id,
                    notebook.name,
                    notebook.description,
                    notebook.created_at,
                    notebook.updated_at,
                    notebook.is_default,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        self.notify_notebook_watchers();
        Ok(())
    }

    async fn delete_notebook(&self, id: &str) -> Result<usize, Error> {
        let rows = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM notebooks WHERE id = ?1 AND is_default = 0",
                params![id],
            )
            .map_err(|e| Error::Database(e.to_string()))?
        };
        self.notify_notebook_watchers();
        Ok(rows)
    }

    async fn reassign_notes(
        &self,
        old_notebook_id: &str,
        new_notebook_id: &str,
    ) -> Result<usize, Error> {
        let rows = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE notes SET notebook_id = ?2 WHERE notebook_id = ?1",
                params![old_notebook_id, new_notebook_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?
        };
        self.notify_note_watchers();
        Ok(rows)
    }

    async fn count_notes_in_notebook(&self, notebook_id: &str) -> Result<i64, Error> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notes WHERE notebook_id = ?1",
                params![notebook_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(count)
    }

    async fn delete_notebook_reassigning(
        &self,
        id: &str,
        target_notebook_id: &str,
    ) -> Result<bool, Error> {
        let deleted = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn
                .transaction()
                .map_err(|e| Error::Database(e.to_string()))?;

            let count: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM notes WHERE notebook_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| Error::Database(e.to_string()))?;

            if count > 0 {
                tx.execute(
                    "UPDATE notes SET notebook_id = ?2 WHERE notebook_id = ?1",
                    params![id, target_notebook_id],
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            }

            // The is_default guard keeps even a direct call from removing
            // the default notebook; a refused delete drops the transaction
            // and rolls the reassignment back.
            let rows = tx
                .execute(
                    "DELETE FROM notebooks WHERE id = ?1 AND is_default = 0",
                    params![id],
                )
                .map_err(|e| Error::Database(e.to_string()))?;

            if rows > 0 {
                tx.commit().map_err(|e| Error::Database(e.to_string()))?;
                true
            } else {
                false
            }
        };

        if deleted {
            self.notify_note_watchers();
            self.notify_notebook_watchers();
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minne_core::{
        NoteFeed, Notebook, NotebooksRepository, NotesRepository, SortKey, ViewSelector,
        DEFAULT_NOTEBOOK_ID,
    };
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (
        Arc<SqliteStore>,
        NotesRepository<SqliteStore>,
        NotebooksRepository<SqliteStore>,
    ) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let notes = NotesRepository::new(store.clone());
        let notebooks = NotebooksRepository::new(store.clone());
        (store, notes, notebooks)
    }

    fn draft(title: &str, content: &str) -> Note {
        Note {
            title: title.to_string(),
            content: content.to_string(),
            ..Note::draft()
        }
    }

    fn id_set(notes: &[Note]) -> HashSet<String> {
        notes.iter().map(|n| n.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_open_on_disk_seeds_default_notebook() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("minne.db");

        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let notebooks = NotebooksRepository::new(store);

        let default = notebooks.get_default_notebook().await.unwrap();
        assert_eq!(default.id, DEFAULT_NOTEBOOK_ID);
        assert!(default.is_default);
        assert_eq!(default.name, "Default");
    }

    #[tokio::test]
    async fn test_save_note_blank_id_generates_unique_ids() {
        let (_store, notes, _notebooks) = setup();

        let first = notes.save_note(draft("One", "")).await.unwrap();
        let second = notes.save_note(draft("Two", "")).await.unwrap();

        assert!(!first.is_empty());
        assert!(!second.is_empty());
        assert_ne!(first, second);

        let saved = notes.get_note_by_id(&first).await.unwrap().unwrap();
        assert_eq!(saved.created_at, saved.updated_at);
    }

    #[tokio::test]
    async fn test_save_note_preserves_id_and_created_at() {
        let (_store, notes, _notebooks) = setup();

        let id = notes.save_note(draft("Original", "text")).await.unwrap();
        let saved = notes.get_note_by_id(&id).await.unwrap().unwrap();

        let edited = Note {
            title: "Edited".to_string(),
            ..saved.clone()
        };
        let resaved_id = notes.save_note(edited).await.unwrap();
        assert_eq!(resaved_id, id);

        let resaved = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert_eq!(resaved.created_at, saved.created_at);
        assert_eq!(resaved.title, "Edited");
        assert!(resaved.updated_at >= resaved.created_at);
    }

    #[tokio::test]
    async fn test_update_note_clears_sync_flag() {
        let (_store, notes, _notebooks) = setup();

        let id = notes.save_note(draft("Synced", "")).await.unwrap();
        notes.mark_note_synced(&id, true).await.unwrap();
        let synced = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert!(synced.is_synced);

        notes.update_note(synced).await.unwrap();
        let updated = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert!(!updated.is_synced);
    }

    #[tokio::test]
    async fn test_unsynced_notes_bookkeeping() {
        let (_store, notes, _notebooks) = setup();

        let a = notes.save_note(draft("A", "")).await.unwrap();
        let b = notes.save_note(draft("B", "")).await.unwrap();

        let unsynced = notes.get_unsynced_notes().await.unwrap();
        assert_eq!(unsynced.len(), 2);

        notes.mark_note_synced(&a, true).await.unwrap();
        let unsynced = notes.get_unsynced_notes().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id, b);
    }

    #[tokio::test]
    async fn test_favorite_round_trip() {
        let (_store, notes, _notebooks) = setup();

        let id = notes.save_note(draft("Fav", "")).await.unwrap();

        notes.toggle_note_favorite(&id, true).await.unwrap();
        let favorites = notes.get_favorite_notes().await.unwrap().snapshot();
        assert_eq!(favorites.len(), 1);
        assert!(favorites[0].is_favorite);

        notes.toggle_note_favorite(&id, false).await.unwrap();
        let note = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert!(!note.is_favorite);
        assert!(notes.get_favorite_notes().await.unwrap().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_trash_and_restore() {
        let (_store, notes, _notebooks) = setup();

        let id = notes.save_note(draft("Ephemeral", "")).await.unwrap();

        notes.move_note_to_trash(&id).await.unwrap();
        assert!(notes.get_all_notes().await.unwrap().snapshot().is_empty());
        let trashed = notes.get_deleted_notes().await.unwrap().snapshot();
        assert_eq!(trashed.len(), 1);

        notes.restore_note(&id).await.unwrap();
        assert!(notes.get_deleted_notes().await.unwrap().snapshot().is_empty());
        assert_eq!(notes.get_all_notes().await.unwrap().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_wins_over_archived() {
        let (_store, notes, _notebooks) = setup();

        let id = notes.save_note(draft("Old project", "")).await.unwrap();
        notes.archive_note(&id).await.unwrap();

        assert!(notes.get_all_notes().await.unwrap().snapshot().is_empty());
        assert_eq!(notes.get_archived_notes().await.unwrap().snapshot().len(), 1);

        // Trashing an archived note moves it to the trash view
        notes.move_note_to_trash(&id).await.unwrap();
        assert!(notes.get_archived_notes().await.unwrap().snapshot().is_empty());
        let trashed = notes.get_deleted_notes().await.unwrap().snapshot();
        assert_eq!(trashed.len(), 1);
        assert!(trashed[0].is_archived);

        // Restoring clears only the trash flag; the note stays archived
        notes.restore_note(&id).await.unwrap();
        assert_eq!(notes.get_archived_notes().await.unwrap().snapshot().len(), 1);
        assert!(notes.get_all_notes().await.unwrap().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_unarchive_is_idempotent() {
        let (_store, notes, _notebooks) = setup();

        let id = notes.save_note(draft("Keep", "")).await.unwrap();
        notes.archive_note(&id).await.unwrap();
        notes.archive_note(&id).await.unwrap();
        notes.unarchive_note(&id).await.unwrap();
        notes.unarchive_note(&id).await.unwrap();

        let note = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert!(!note.is_archived);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_over_title_and_content() {
        let (_store, notes, _notebooks) = setup();

        let pie = notes
            .save_note(draft("Apple Pie Recipe", "flour, butter"))
            .await
            .unwrap();
        let list = notes
            .save_note(draft("Shopping List", "Buy apples"))
            .await
            .unwrap();
        notes
            .save_note(draft("Meeting Notes", "quarterly review"))
            .await
            .unwrap();

        let hits = notes.search_notes("apple").await.unwrap().snapshot();
        let hit_ids = id_set(&hits);
        assert_eq!(hit_ids, HashSet::from([pie, list]));
    }

    #[tokio::test]
    async fn test_search_excludes_archived_and_deleted() {
        let (_store, notes, _notebooks) = setup();

        let kept = notes.save_note(draft("apple one", "")).await.unwrap();
        let archived = notes.save_note(draft("apple two", "")).await.unwrap();
        let trashed = notes.save_note(draft("apple three", "")).await.unwrap();
        notes.archive_note(&archived).await.unwrap();
        notes.move_note_to_trash(&trashed).await.unwrap();

        let hits = notes.search_notes("apple").await.unwrap().snapshot();
        assert_eq!(id_set(&hits), HashSet::from([kept]));
    }

    #[tokio::test]
    async fn test_empty_trash_only_removes_deleted_rows() {
        let (_store, notes, _notebooks) = setup();

        let kept = notes.save_note(draft("Keep", "")).await.unwrap();
        let archived = notes.save_note(draft("Archive", "")).await.unwrap();
        let gone_a = notes.save_note(draft("Trash A", "")).await.unwrap();
        let gone_b = notes.save_note(draft("Trash B", "")).await.unwrap();
        notes.archive_note(&archived).await.unwrap();
        notes.move_note_to_trash(&gone_a).await.unwrap();
        notes.move_note_to_trash(&gone_b).await.unwrap();

        let purged = notes.empty_trash().await.unwrap();
        assert_eq!(purged, 2);

        assert!(notes.get_note_by_id(&gone_a).await.unwrap().is_none());
        assert!(notes.get_note_by_id(&gone_b).await.unwrap().is_none());
        assert!(notes.get_note_by_id(&kept).await.unwrap().is_some());
        assert!(notes.get_note_by_id(&archived).await.unwrap().is_some());
        assert_eq!(notes.get_all_notes().await.unwrap().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_note_is_not_an_error() {
        let (_store, notes, _notebooks) = setup();

        assert!(notes.get_note_by_id("no-such-id").await.unwrap().is_none());
        notes.delete_note_permanently("no-such-id").await.unwrap();
        notes.move_note_to_trash("no-such-id").await.unwrap();
    }

    #[tokio::test]
    async fn test_tags_survive_storage_round_trip() {
        let (_store, notes, _notebooks) = setup();

        let tagged = Note {
            tags: vec!["work".to_string(), "urgent".to_string()],
            ..draft("Tagged", "")
        };
        let id = notes.save_note(tagged).await.unwrap();
        let saved = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert_eq!(saved.tags, vec!["work", "urgent"]);

        let untagged = notes.save_note(draft("Untagged", "")).await.unwrap();
        let saved = notes.get_note_by_id(&untagged).await.unwrap().unwrap();
        assert!(saved.tags.is_empty());
    }

    #[tokio::test]
    async fn test_exactly_one_default_notebook_across_lifecycle() {
        let (_store, _notes, notebooks) = setup();

        let work = notebooks
            .save_notebook(Notebook::draft("Work"))
            .await
            .unwrap();
        notebooks
            .save_notebook(Notebook::draft("Personal"))
            .await
            .unwrap();
        assert!(notebooks.delete_notebook(&work).await.unwrap());
        assert!(!notebooks.delete_notebook(DEFAULT_NOTEBOOK_ID).await.unwrap());

        let all = notebooks.get_all_notebooks().await.unwrap().snapshot();
        assert_eq!(all.iter().filter(|n| n.is_default).count(), 1);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_default_notebook_leaves_notes_untouched() {
        let (_store, notes, notebooks) = setup();

        let id = notes.save_note(draft("Home", "")).await.unwrap();
        assert!(!notebooks.delete_notebook(DEFAULT_NOTEBOOK_ID).await.unwrap());

        let note = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert_eq!(note.notebook_id, DEFAULT_NOTEBOOK_ID);
        assert!(notebooks
            .get_notebook_by_id(DEFAULT_NOTEBOOK_ID)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_notebook_reassigns_notes_to_default() {
        let (_store, notes, notebooks) = setup();

        let work = notebooks
            .save_notebook(Notebook::draft("Work"))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let note = Note {
                notebook_id: work.clone(),
                ..draft(&format!("Task {}", i), "")
            };
            ids.push(notes.save_note(note).await.unwrap());
        }
        assert_eq!(
            notebooks.get_notes_count_in_notebook(&work).await.unwrap(),
            3
        );

        assert!(notebooks.delete_notebook(&work).await.unwrap());

        assert!(notebooks.get_notebook_by_id(&work).await.unwrap().is_none());
        assert_eq!(
            notebooks.get_notes_count_in_notebook(&work).await.unwrap(),
            0
        );
        for id in ids {
            let note = notes.get_note_by_id(&id).await.unwrap().unwrap();
            assert_eq!(note.notebook_id, DEFAULT_NOTEBOOK_ID);
        }
    }

    #[tokio::test]
    async fn test_dao_reassign_and_guarded_delete() {
        let (store, notes, notebooks) = setup();

        let work = notebooks
            .save_notebook(Notebook::draft("Work"))
            .await
            .unwrap();
        let id = notes
            .save_note(Note {
                notebook_id: work.clone(),
                ..draft("Task", "")
            })
            .await
            .unwrap();

        let moved = store.reassign_notes(&work, DEFAULT_NOTEBOOK_ID).await.unwrap();
        assert_eq!(moved, 1);
        let note = notes.get_note_by_id(&id).await.unwrap().unwrap();
        assert_eq!(note.notebook_id, DEFAULT_NOTEBOOK_ID);

        // The DELETE itself refuses the default row
        assert_eq!(NotebookDao::delete_notebook(&*store, &work).await.unwrap(), 1);
        assert_eq!(
            NotebookDao::delete_notebook(&*store, DEFAULT_NOTEBOOK_ID)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_missing_notebook_returns_false() {
        let (_store, _notes, notebooks) = setup();
        assert!(!notebooks.delete_notebook("no-such-notebook").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_notebook_stamps_updated_at() {
        let (_store, _notes, notebooks) = setup();

        let id = notebooks
            .save_notebook(Notebook::draft("Ideas"))
            .await
            .unwrap();
        let saved = notebooks.get_notebook_by_id(&id).await.unwrap().unwrap();

        let renamed = Notebook {
            name: "Better ideas".to_string(),
            ..saved.clone()
        };
        notebooks.update_notebook(renamed).await.unwrap();

        let updated = notebooks.get_notebook_by_id(&id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Better ideas");
        assert_eq!(updated.created_at, saved.created_at);
        assert!(updated.updated_at >= saved.updated_at);
    }

    #[tokio::test]
    async fn test_subscription_sees_later_writes() {
        let (_store, notes, _notebooks) = setup();

        let mut all = notes.get_all_notes().await.unwrap();
        assert!(all.snapshot().is_empty());

        let id = notes.save_note(draft("Pushed", "")).await.unwrap();
        let rows = all.next().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);

        notes.move_note_to_trash(&id).await.unwrap();
        let rows = all.next().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_notebook_subscription_sees_later_writes() {
        let (_store, _notes, notebooks) = setup();

        let mut all = notebooks.get_all_notebooks().await.unwrap();
        assert_eq!(all.snapshot().len(), 1);

        notebooks
            .save_notebook(Notebook::draft("Archive"))
            .await
            .unwrap();
        let rows = all.next().await.unwrap();
        assert_eq!(rows.len(), 2);
        // name ascending
        assert_eq!(rows[0].name, "Archive");
    }

    #[tokio::test]
    async fn test_feed_sort_change_reorders_without_refetch() {
        let (_store, notes, _notebooks) = setup();

        notes.save_note(draft("cherry", "")).await.unwrap();
        notes.save_note(draft("Apple", "")).await.unwrap();
        notes.save_note(draft("banana", "")).await.unwrap();

        let mut feed = NoteFeed::new(notes.clone()).await.unwrap();
        let before = feed.notes();
        assert_eq!(before.len(), 3);

        feed.set_sort(SortKey::TitleAsc);
        let after = feed.notes();

        assert_eq!(id_set(&before), id_set(&after));
        let titles: Vec<&str> = after.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
    }

    #[tokio::test]
    async fn test_feed_search_overrides_view_selector() {
        let (_store, notes, _notebooks) = setup();

        notes
            .save_note(draft("Apple Pie Recipe", "flour"))
            .await
            .unwrap();
        notes
            .save_note(draft("Shopping List", "Buy apples"))
            .await
            .unwrap();
        notes
            .save_note(draft("Meeting Notes", "quarterly review"))
            .await
            .unwrap();

        let mut feed = NoteFeed::new(notes.clone()).await.unwrap();
        feed.set_view(ViewSelector::Favorites).await.unwrap();
        assert!(feed.notes().is_empty());

        feed.set_search_active(true).await.unwrap();
        feed.set_search_query("apple").await.unwrap();
        assert_eq!(feed.notes().len(), 2);

        // Deactivating clears the query and falls back to the view
        feed.set_search_active(false).await.unwrap();
        assert_eq!(feed.search_query(), "");
        assert!(feed.notes().is_empty());
    }

    #[tokio::test]
    async fn test_feed_notebook_filter_applies_only_in_all_view() {
        let (_store, notes, notebooks) = setup();

        let work = notebooks
            .save_notebook(Notebook::draft("Work"))
            .await
            .unwrap();
        let work_note = notes
            .save_note(Note {
                notebook_id: work.clone(),
                ..draft("Standup", "")
            })
            .await
            .unwrap();
        notes.save_note(draft("Groceries", "")).await.unwrap();
        let trashed = notes.save_note(draft("Scrap", "")).await.unwrap();
        notes.move_note_to_trash(&trashed).await.unwrap();

        let mut feed = NoteFeed::new(notes.clone()).await.unwrap();
        feed.set_notebook(Some(work.clone())).await.unwrap();
        let visible = feed.notes();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, work_note);

        // The trash view ignores the notebook filter
        feed.set_view(ViewSelector::Trash).await.unwrap();
        let visible = feed.notes();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, trashed);
    }

    #[tokio::test]
    async fn test_feed_poll_change_picks_up_new_rows() {
        let (_store, notes, _notebooks) = setup();

        let mut feed = NoteFeed::new(notes.clone()).await.unwrap();
        assert!(feed.notes().is_empty());

        let id = notes.save_note(draft("Fresh", "")).await.unwrap();
        assert!(feed.poll_change().await);
        let visible = feed.notes();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, id);
    }

    #[tokio::test]
    async fn test_bulk_save_assigns_ids_and_inserts_all() {
        let (_store, notes, _notebooks) = setup();

        let ids = notes
            .save_notes(vec![draft("One", ""), draft("Two", ""), draft("Three", "")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);

        assert_eq!(notes.get_all_notes().await.unwrap().snapshot().len(), 3);
    }
}
