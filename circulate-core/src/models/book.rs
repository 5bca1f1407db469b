use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A catalog title together with its lending state.
///
/// `loaned_to` absent means the book is available. `due_date` is only
/// meaningful while `loaned_to` is set. The reservation queue is strict
/// FIFO arrival order: front (index 0) is next in line, and the queue never
/// contains the current holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub loaned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub reservation_queue: Vec<String>,
}

impl Book {
    /// A freshly cataloged book: available, no due date, empty queue.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            loaned_to: None,
            due_date: None,
            reservation_queue: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.loaned_to.is_none()
    }

    pub fn is_loaned_to(&self, member_id: &str) -> bool {
        self.loaned_to.as_deref() == Some(member_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookInput {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookInput {
    pub title: Option<String>,
}
