//! Embedded database migrations for minne.
//!
//! Migrations are versioned and run automatically on first database access.
//! The schema version is tracked in the `_minne_meta` table.

/// Current schema version. Increment when adding new migrations.
pub const SCHEMA_VERSION: i64 = 2;

/// A database migration with version number and SQL statements.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// All migrations in order. Each migration should be idempotent where possible.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        statements: &[
            "CREATE TABLE IF NOT EXISTS _minne_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT NOT NULL PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                is_synced INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '',
                is_favorite INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE INDEX IF NOT EXISTS idx_notes_updated_at ON notes(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_notes_flags ON notes(is_deleted, is_archived)",
        ],
    },
    Migration {
        version: 2,
        name: "add_notebooks",
        statements: &[
            "CREATE TABLE IF NOT EXISTS notebooks (
                id TEXT NOT NULL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                is_default INTEGER NOT NULL DEFAULT 0
            )",
            // ALTER TABLE doesn't support IF NOT EXISTS, so we check in code
            "ALTER TABLE notes ADD COLUMN notebook_id TEXT NOT NULL DEFAULT 'default'",
            "INSERT OR IGNORE INTO notebooks (id, name, description, created_at, updated_at, is_default)
             VALUES ('default', 'Default', 'Default notebook',
                     CAST(strftime('%s', 'now') AS INTEGER) * 1000,
                     CAST(strftime('%s', 'now') AS INTEGER) * 1000,
                     1)",
        ],
    },
];

/// Get migrations that need to be applied given the current version.
pub fn get_pending_migrations(current_version: i64) -> Vec<&'static Migration> {
    MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_migrations() {
        assert_eq!(get_pending_migrations(0).len(), MIGRATIONS.len());
        assert_eq!(get_pending_migrations(SCHEMA_VERSION).len(), 0);
        let pending = get_pending_migrations(1);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "add_notebooks");
    }
}
