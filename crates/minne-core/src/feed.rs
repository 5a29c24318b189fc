use crate::{Error, Note, NoteDao, NotesRepository, Subscription};

/// Which list of notes the caller is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewSelector {
    #[default]
    All,
    Favorites,
    Archived,
    Trash,
}

/// Sort order for a note list. Title comparisons are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most recently updated first (default).
    #[default]
    UpdatedDesc,
    UpdatedAsc,
    CreatedDesc,
    CreatedAsc,
    TitleAsc,
    TitleDesc,
}

/// Sort notes in place by the given key. Pure; stable for equal keys.
pub fn sort_notes(notes: &mut [Note], key: SortKey) {
    match key {
        SortKey::UpdatedDesc => notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        SortKey::UpdatedAsc => notes.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        SortKey::CreatedDesc => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::CreatedAsc => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::TitleAsc => {
            notes.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
        SortKey::TitleDesc => {
            notes.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
    }
}

/// A composed, continuously-updating note list.
///
/// Combines a view selector, an optional search, an optional notebook
/// filter, and a sort key into one result list backed by a single store
/// subscription:
///
/// 1. active non-empty search wins over the view selector;
/// 2. otherwise the view selector picks the subscription;
/// 3. the notebook filter applies only in the All view;
/// 4. the sort key orders the filtered rows in memory.
///
/// Changing the sort key never re-issues the subscription; it re-sorts the
/// cached snapshot. Every other input change resolves the subscription
/// anew, exactly once.
pub struct NoteFeed<D: NoteDao> {
    repo: NotesRepository<D>,
    view: ViewSelector,
    search_query: String,
    search_active: bool,
    notebook_id: Option<String>,
    sort: SortKey,
    subscription: Subscription<Note>,
    rows: Vec<Note>,
}

impl<D: NoteDao> NoteFeed<D> {
    /// Open a feed on the All view with the default sort.
    pub async fn new(repo: NotesRepository<D>) -> Result<Self, Error> {
        let subscription = repo.get_all_notes().await?;
        let rows = subscription.snapshot();
        Ok(Self {
            repo,
            view: ViewSelector::default(),
            search_query: String::new(),
            search_active: false,
            notebook_id: None,
            sort: SortKey::default(),
            subscription,
            rows,
        })
    }

    /// The current filtered, sorted list.
    pub fn notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = match (&self.notebook_id, self.view) {
            (Some(notebook_id), ViewSelector::All) => self
                .rows
                .iter()
                .filter(|n| &n.notebook_id == notebook_id)
                .cloned()
                .collect(),
            _ => self.rows.clone(),
        };
        sort_notes(&mut notes, self.sort);
        notes
    }

    pub fn view(&self) -> ViewSelector {
        self.view
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn notebook_id(&self) -> Option<&str> {
        self.notebook_id.as_deref()
    }

    pub async fn set_view(&mut self, view: ViewSelector) -> Result<(), Error> {
        self.view = view;
        self.resubscribe().await
    }

    pub async fn set_search_query(&mut self, query: impl Into<String>) -> Result<(), Error> {
        self.search_query = query.into();
        self.resubscribe().await
    }

    /// Deactivating the search also clears the query text.
    pub async fn set_search_active(&mut self, active: bool) -> Result<(), Error> {
        self.search_active = active;
        if !active {
            self.search_query.clear();
        }
        self.resubscribe().await
    }

    pub async fn set_notebook(&mut self, notebook_id: Option<String>) -> Result<(), Error> {
        self.notebook_id = notebook_id;
        self.resubscribe().await
    }

    /// Pure re-sort of the already-fetched rows; no store round trip.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    /// Wait for the next snapshot from the store and take it. Returns
    /// `false` once the store is gone.
    pub async fn poll_change(&mut self) -> bool {
        match self.subscription.next().await {
            Some(rows) => {
                self.rows = rows;
                true
            }
            None => false,
        }
    }

    async fn resubscribe(&mut self) -> Result<(), Error> {
        let subscription = if self.search_active && !self.search_query.is_empty() {
            self.repo.search_notes(&self.search_query).await?
        } else {
            match self.view {
                ViewSelector::Favorites => self.repo.get_favorite_notes().await?,
                ViewSelector::Archived => self.repo.get_archived_notes().await?,
                ViewSelector::Trash => self.repo.get_deleted_notes().await?,
                ViewSelector::All => self.repo.get_all_notes().await?,
            }
        };
        self.rows = subscription.snapshot();
        self.subscription = subscription;
        Ok(())
    }
}
