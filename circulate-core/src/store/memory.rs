use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{BookStore, MemberStore, StoreError};
use crate::models::{Book, Member};

/// In-memory book store backed by a `BTreeMap` for deterministic iteration
/// order. Used by tests and `--in-memory` runs.
#[derive(Debug, Default)]
pub struct InMemoryBooks {
    inner: RwLock<BTreeMap<String, Book>>,
}

impl InMemoryBooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookStore for InMemoryBooks {
    fn find_by_id(&self, id: &str) -> Result<Option<Book>, StoreError> {
        Ok(self.inner.read().unwrap().get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.inner.read().unwrap().values().cloned().collect())
    }

    fn save(&self, book: &Book) -> Result<(), StoreError> {
        self.inner
            .write()
            .unwrap()
            .insert(book.id.clone(), book.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.write().unwrap().remove(id);
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().unwrap().contains_key(id))
    }

    fn count_loaned_to(&self, member_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .values()
            .filter(|b| b.loaned_to.as_deref() == Some(member_id))
            .count())
    }
}

/// In-memory member store.
#[derive(Debug, Default)]
pub struct InMemoryMembers {
    inner: RwLock<BTreeMap<String, Member>>,
}

impl InMemoryMembers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemberStore for InMemoryMembers {
    fn find_by_id(&self, id: &str) -> Result<Option<Member>, StoreError> {
        Ok(self.inner.read().unwrap().get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Member>, StoreError> {
        Ok(self.inner.read().unwrap().values().cloned().collect())
    }

    fn save(&self, member: &Member) -> Result<(), StoreError> {
        self.inner
            .write()
            .unwrap()
            .insert(member.id.clone(), member.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.write().unwrap().remove(id);
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().unwrap().contains_key(id))
    }
}
