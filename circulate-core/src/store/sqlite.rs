use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{BookStore, MemberStore, StoreError};
use crate::models::{Book, Member};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    loaned_to TEXT,
    due_date TEXT,
    reservation_queue JSON NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS members (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_loaned_to ON books(loaned_to);
"#;

/// SQLite-backed implementation of both store contracts.
///
/// A single connection behind a mutex: every statement here is a point read
/// or a single-row upsert, so there is nothing to gain from a pool.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens the database at the platform data directory, creating the
    /// directory on first use.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("", "", "circulate")
            .ok_or(StoreError::DataDirUnavailable)?;
        Ok(dirs.data_dir().join("circulate.db"))
    }

    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.conn.lock().unwrap().execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn get_book(&self, id: &str) -> Result<Option<Book>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, loaned_to, due_date, reservation_queue FROM books WHERE id = ?1",
        )?;
        let raw = stmt
            .query_row(params![id], |row| {
                Ok(BookRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    loaned_to: row.get(2)?,
                    due_date: row.get(3)?,
                    reservation_queue: row.get(4)?,
                })
            })
            .optional()?;
        raw.map(BookRow::into_book).transpose()
    }

    pub fn all_books(&self) -> Result<Vec<Book>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, loaned_to, due_date, reservation_queue FROM books ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(BookRow {
                id: row.get(0)?,
                title: row.get(1)?,
                loaned_to: row.get(2)?,
                due_date: row.get(3)?,
                reservation_queue: row.get(4)?,
            })
        })?;
        let mut books = Vec::new();
        for row in rows {
            books.push(row?.into_book()?);
        }
        Ok(books)
    }

    pub fn upsert_book(&self, book: &Book) -> Result<(), StoreError> {
        let queue = serde_json::to_string(&book.reservation_queue)?;
        self.conn.lock().unwrap().execute(
            "INSERT INTO books (id, title, loaned_to, due_date, reservation_queue)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 loaned_to = excluded.loaned_to,
                 due_date = excluded.due_date,
                 reservation_queue = excluded.reservation_queue",
            params![
                book.id,
                book.title,
                book.loaned_to,
                book.due_date.map(|d| d.to_string()),
                queue
            ],
        )?;
        Ok(())
    }

    pub fn delete_book(&self, id: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn book_exists(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM books WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn count_loaned_to(&self, member_id: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM books WHERE loaned_to = ?1",
            params![member_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn get_member(&self, id: &str) -> Result<Option<Member>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let member = conn
            .query_row(
                "SELECT id, name FROM members WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Member {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(member)
    }

    pub fn all_members(&self) -> Result<Vec<Member>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM members ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Member {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    pub fn upsert_member(&self, member: &Member) -> Result<(), StoreError> {
        self.conn.lock().unwrap().execute(
            "INSERT INTO members (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![member.id, member.name],
        )?;
        Ok(())
    }

    pub fn delete_member(&self, id: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute("DELETE FROM members WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn member_exists(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM members WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

/// Raw row as stored; dates and the queue decode outside the rusqlite
/// closure so their failures surface as [`StoreError`], not as sqlite ones.
struct BookRow {
    id: String,
    title: String,
    loaned_to: Option<String>,
    due_date: Option<String>,
    reservation_queue: String,
}

impl BookRow {
    fn into_book(self) -> Result<Book, StoreError> {
        let due_date = self
            .due_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id: self.id.clone(),
                detail: format!("bad due date: {}", e),
            })?;
        let reservation_queue = serde_json::from_str(&self.reservation_queue)?;
        Ok(Book {
            id: self.id,
            title: self.title,
            loaned_to: self.loaned_to,
            due_date,
            reservation_queue,
        })
    }
}

impl BookStore for Database {
    fn find_by_id(&self, id: &str) -> Result<Option<Book>, StoreError> {
        self.get_book(id)
    }

    fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        self.all_books()
    }

    fn save(&self, book: &Book) -> Result<(), StoreError> {
        self.upsert_book(book)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_book(id)
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.book_exists(id)
    }

    fn count_loaned_to(&self, member_id: &str) -> Result<usize, StoreError> {
        Database::count_loaned_to(self, member_id)
    }
}

impl MemberStore for Database {
    fn find_by_id(&self, id: &str) -> Result<Option<Member>, StoreError> {
        self.get_member(id)
    }

    fn find_all(&self) -> Result<Vec<Member>, StoreError> {
        self.all_members()
    }

    fn save(&self, member: &Member) -> Result<(), StoreError> {
        self.upsert_member(member)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_member(id)
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.member_exists(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn round_trips_a_book_with_queue_and_due_date() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();

        let mut book = Book::new("b1", "Clean Code");
        book.loaned_to = Some("m1".into());
        book.due_date = Some(ymd(2026, 8, 21));
        book.reservation_queue = vec!["m2".into(), "m3".into()];
        db.upsert_book(&book).unwrap();

        let loaded = db.get_book("b1").unwrap().expect("book should exist");
        assert_eq!(loaded.title, "Clean Code");
        assert_eq!(loaded.loaned_to.as_deref(), Some("m1"));
        assert_eq!(loaded.due_date, Some(ymd(2026, 8, 21)));
        assert_eq!(loaded.reservation_queue, vec!["m2", "m3"]);
    }

    #[test]
    fn upsert_replaces_an_existing_row() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();

        db.upsert_book(&Book::new("b1", "First Title")).unwrap();
        let mut renamed = db.get_book("b1").unwrap().unwrap();
        renamed.title = "Second Title".into();
        db.upsert_book(&renamed).unwrap();

        assert_eq!(db.all_books().unwrap().len(), 1);
        assert_eq!(db.get_book("b1").unwrap().unwrap().title, "Second Title");
    }

    #[test]
    fn counts_loans_per_member() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();

        for i in 0..3 {
            let mut book = Book::new(format!("b{}", i), "Filler");
            if i < 2 {
                book.loaned_to = Some("m1".into());
            }
            db.upsert_book(&book).unwrap();
        }

        assert_eq!(db.count_loaned_to("m1").unwrap(), 2);
        assert_eq!(db.count_loaned_to("m2").unwrap(), 0);
    }

    #[test]
    fn persists_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circulate.db");

        {
            let db = Database::open(&path).unwrap();
            db.migrate().unwrap();
            db.upsert_member(&Member::new("m1", "Kertu")).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.member_exists("m1").unwrap());
        assert_eq!(db.get_member("m1").unwrap().unwrap().name, "Kertu");
    }

    #[test]
    fn delete_is_a_noop_for_missing_rows() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();

        db.delete_book("nope").unwrap();
        db.delete_member("nope").unwrap();
        assert!(db.all_books().unwrap().is_empty());
        assert!(db.all_members().unwrap().is_empty());
    }
}
