//! Minne core library - shared types, traits, and repositories.
//!
//! This crate contains no I/O and is independent of the storage backend.

mod dao;
mod error;
mod feed;
mod migrations;
mod note;
mod notebook;
mod repository;
mod subscription;

pub use dao::{NoteDao, NotebookDao};
pub use error::Error;
pub use feed::{sort_notes, NoteFeed, SortKey, ViewSelector};
pub use migrations::{get_pending_migrations, Migration, MIGRATIONS, SCHEMA_VERSION};
pub use note::Note;
pub use notebook::{Notebook, DEFAULT_NOTEBOOK_ID};
pub use repository::{NotebooksRepository, NotesRepository};
pub use subscription::Subscription;
