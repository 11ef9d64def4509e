use rusqlite::{Connection, Result};

/// Initialise transcript tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_messages_table(conn)?;
    create_archive_table(conn)?;
    Ok(())
}

/// Active transcript. `INSERT OR IGNORE` on the primary key makes a
/// duplicate save report zero affected rows instead of failing loudly.
fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            chat_id        INTEGER NOT NULL,
            message_id     INTEGER NOT NULL,
            from_id        INTEGER NOT NULL,
            from_username  TEXT NOT NULL DEFAULT '',
            text           TEXT NOT NULL,
            time_stamp     TEXT NOT NULL,
            db_time_stamp  TEXT NOT NULL,
            PRIMARY KEY (chat_id, message_id)
        );",
    )
}

/// Rows moved out of `messages` by a restart. Same shape plus `archived_at`;
/// no primary key because a chat can be archived repeatedly.
fn create_archive_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages_archive (
            chat_id        INTEGER NOT NULL,
            message_id     INTEGER NOT NULL,
            from_id        INTEGER NOT NULL,
            from_username  TEXT NOT NULL DEFAULT '',
            text           TEXT NOT NULL,
            time_stamp     TEXT NOT NULL,
            db_time_stamp  TEXT NOT NULL,
            archived_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_archive_chat
            ON messages_archive(chat_id, archived_at);",
    )
}
