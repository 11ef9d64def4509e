use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use tgrelay_core::types::TranscriptMessage;

use crate::error::TranscriptError;

/// Persistence interface used by the message pipeline.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Append one row. Exactly one row must be written.
    async fn save(&self, message: &TranscriptMessage) -> Result<(), TranscriptError>;

    /// All message ids currently stored for a chat, oldest first.
    async fn message_ids(&self, chat_id: i64) -> Result<Vec<i32>, TranscriptError>;

    /// Move every row of a chat into the archive. Returns whether anything moved.
    async fn move_to_archive(&self, chat_id: i64) -> Result<bool, TranscriptError>;
}

/// SQLite-backed transcript.
///
/// Thread-safe: the connection sits behind a Mutex. Lock waits on the
/// database file are bounded by SQLite's busy timeout.
pub struct SqliteTranscript {
    db: Mutex<Connection>,
}

impl SqliteTranscript {
    /// Wrap an open connection. Tables must already exist (see [`crate::db::init_db`]).
    pub fn new(conn: Connection, busy_timeout: Duration) -> Result<Self, TranscriptError> {
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file and run the schema migration.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, TranscriptError> {
        let conn = Connection::open(path)?;
        crate::db::init_db(&conn)?;
        Self::new(conn, busy_timeout)
    }

    /// Most recent rows for a chat, oldest first.
    pub fn history(
        &self,
        chat_id: i64,
        limit: usize,
    ) -> Result<Vec<TranscriptMessage>, TranscriptError> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT chat_id, message_id, from_id, from_username, text, time_stamp
             FROM messages
             WHERE chat_id = ?1
             ORDER BY message_id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![chat_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (chat_id, message_id, sender_id, sender_name, text, ts) = row?;
            out.push(TranscriptMessage {
                chat_id,
                message_id,
                sender_id,
                sender_name,
                text,
                sent_at: parse_timestamp(&ts)?,
            });
        }
        // Reverse so oldest first
        out.reverse();
        Ok(out)
    }

    /// Number of archived rows for a chat.
    pub fn archived_count(&self, chat_id: i64) -> Result<usize, TranscriptError> {
        let db = self.conn()?;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM messages_archive WHERE chat_id = ?1",
            rusqlite::params![chat_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, TranscriptError> {
        self.db.lock().map_err(|_| TranscriptError::Poisoned)
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscript {
    async fn save(&self, message: &TranscriptMessage) -> Result<(), TranscriptError> {
        let db = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let affected = db.execute(
            "INSERT OR IGNORE INTO messages
             (chat_id, message_id, from_id, from_username, text, time_stamp, db_time_stamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                message.chat_id,
                message.message_id,
                message.sender_id,
                message.sender_name,
                message.text,
                message.sent_at.to_rfc3339(),
                now,
            ],
        )?;
        check_affected(affected)?;
        debug!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            "transcript row saved"
        );
        Ok(())
    }

    async fn message_ids(&self, chat_id: i64) -> Result<Vec<i32>, TranscriptError> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT message_id FROM messages WHERE chat_id = ?1 ORDER BY message_id",
        )?;
        let ids = stmt
            .query_map(rusqlite::params![chat_id], |row| row.get::<_, i32>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    async fn move_to_archive(&self, chat_id: i64) -> Result<bool, TranscriptError> {
        let mut db = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO messages_archive
             (chat_id, message_id, from_id, from_username, text, time_stamp,
              db_time_stamp, archived_at)
             SELECT chat_id, message_id, from_id, from_username, text, time_stamp,
                    db_time_stamp, ?2
             FROM messages WHERE chat_id = ?1",
            rusqlite::params![chat_id, now],
        )?;
        let moved = tx.execute(
            "DELETE FROM messages WHERE chat_id = ?1",
            rusqlite::params![chat_id],
        )?;
        tx.commit()?;
        debug!(chat_id, moved, "transcript moved to archive");
        Ok(moved > 0)
    }
}

/// A save is only valid when exactly one row was written.
pub fn check_affected(affected: usize) -> Result<(), TranscriptError> {
    if affected == 1 {
        Ok(())
    } else {
        Err(TranscriptError::UnexpectedRowCount { affected })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TranscriptError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TranscriptError::BadTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> SqliteTranscript {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        SqliteTranscript::new(conn, Duration::from_millis(500)).unwrap()
    }

    fn row(chat_id: i64, message_id: i32, text: &str) -> TranscriptMessage {
        TranscriptMessage {
            chat_id,
            message_id,
            sender_id: 1001,
            sender_name: "alice".to_string(),
            text: text.to_string(),
            sent_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn check_affected_accepts_only_one_row() {
        assert!(check_affected(1).is_ok());
        assert!(matches!(
            check_affected(0),
            Err(TranscriptError::UnexpectedRowCount { affected: 0 })
        ));
        assert!(matches!(
            check_affected(2),
            Err(TranscriptError::UnexpectedRowCount { affected: 2 })
        ));
    }

    #[tokio::test]
    async fn save_then_read_back() {
        let s = store();
        s.save(&row(10, 1, "hello")).await.unwrap();

        let history = s.history(10, 50).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], row(10, 1, "hello"));
    }

    #[tokio::test]
    async fn duplicate_save_reports_zero_rows() {
        let s = store();
        s.save(&row(10, 1, "hello")).await.unwrap();
        let err = s.save(&row(10, 1, "hello again")).await.unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::UnexpectedRowCount { affected: 0 }
        ));
    }

    #[tokio::test]
    async fn message_ids_are_scoped_to_chat_and_sorted() {
        let s = store();
        for id in [3, 1, 2] {
            s.save(&row(10, id, "a")).await.unwrap();
        }
        s.save(&row(20, 9, "other chat")).await.unwrap();

        assert_eq!(s.message_ids(10).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(s.message_ids(20).await.unwrap(), vec![9]);
        assert!(s.message_ids(30).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_to_archive_moves_only_that_chat() {
        let s = store();
        for id in 1..=5 {
            s.save(&row(10, id, "a")).await.unwrap();
        }
        s.save(&row(20, 1, "keep")).await.unwrap();

        assert!(s.move_to_archive(10).await.unwrap());
        assert!(s.message_ids(10).await.unwrap().is_empty());
        assert_eq!(s.message_ids(20).await.unwrap(), vec![1]);
        assert_eq!(s.archived_count(10).unwrap(), 5);
        assert_eq!(s.archived_count(20).unwrap(), 0);
    }

    #[tokio::test]
    async fn move_to_archive_on_empty_chat_reports_false() {
        let s = store();
        assert!(!s.move_to_archive(10).await.unwrap());
    }

    #[tokio::test]
    async fn archived_chat_can_reuse_message_ids() {
        let s = store();
        s.save(&row(10, 1, "first life")).await.unwrap();
        assert!(s.move_to_archive(10).await.unwrap());
        s.save(&row(10, 1, "second life")).await.unwrap();
        assert!(s.move_to_archive(10).await.unwrap());
        assert_eq!(s.archived_count(10).unwrap(), 2);
    }

    #[test]
    fn unreadable_timestamp_fails_history() {
        let s = store();
        s.db.lock()
            .unwrap()
            .execute(
                "INSERT INTO messages
                 (chat_id, message_id, from_id, from_username, text, time_stamp, db_time_stamp)
                 VALUES (10, 1, 1001, 'alice', 'hi', 'yesterday', 'now')",
                [],
            )
            .unwrap();

        let err = s.history(10, 50).unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::BadTimestamp { ref value, .. } if value == "yesterday"
        ));
    }

    #[test]
    fn open_creates_schema_on_disk() {
        let dir = std::env::temp_dir().join(format!("tgrelay-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("transcript.db");
        let _ = std::fs::remove_file(&path);

        let s = SqliteTranscript::open(&path, Duration::from_millis(100)).unwrap();
        assert!(s.history(1, 10).unwrap().is_empty());

        drop(s);
        let _ = std::fs::remove_file(&path);
    }
}
