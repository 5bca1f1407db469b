//! Store contracts the engine operates against, plus the two shipped
//! implementations: in-memory (tests, ephemeral runs) and SQLite.

mod memory;
mod sqlite;

pub use memory::{InMemoryBooks, InMemoryMembers};
pub use sqlite::{Database, SCHEMA};

use thiserror::Error;

use crate::models::{Book, Member};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("queue encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record for book {id}: {detail}")]
    Corrupt { id: String, detail: String },

    #[error("no platform data directory available")]
    DataDirUnavailable,
}

/// Book persistence contract. Implementations are shared behind `Arc` by the
/// engine and the HTTP state, so they must be `Send + Sync`.
pub trait BookStore: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<Book>, StoreError>;
    fn find_all(&self) -> Result<Vec<Book>, StoreError>;
    fn save(&self, book: &Book) -> Result<(), StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    fn exists(&self, id: &str) -> Result<bool, StoreError>;
    /// Number of books currently loaned to `member_id`. The eligibility
    /// hot path; implementations should answer this without a full scan.
    fn count_loaned_to(&self, member_id: &str) -> Result<usize, StoreError>;
}

/// Member persistence contract.
pub trait MemberStore: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<Member>, StoreError>;
    fn find_all(&self) -> Result<Vec<Member>, StoreError>;
    fn save(&self, member: &Member) -> Result<(), StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    fn exists(&self, id: &str) -> Result<bool, StoreError>;
}
