//! Catalog record maintenance: plain create/update/delete over books and
//! members. None of these touch lending state; a rename leaves `loaned_to`
//! and the reservation queue alone, and deleting a member leaves their
//! loans and queue entries dangling (the engine treats a missing member as
//! ineligible wherever it finds one).

use std::sync::Arc;

use crate::models::{Book, Member};
use crate::outcome::{DenialReason, Verdict};
use crate::store::{BookStore, MemberStore, StoreError};

#[derive(Clone)]
pub struct Catalog {
    books: Arc<dyn BookStore>,
    members: Arc<dyn MemberStore>,
}

impl Catalog {
    pub fn new(books: Arc<dyn BookStore>, members: Arc<dyn MemberStore>) -> Self {
        Self { books, members }
    }

    pub fn create_book(&self, id: &str, title: &str) -> Result<Verdict, StoreError> {
        if id.trim().is_empty() || title.trim().is_empty() {
            return Ok(Verdict::Denied(DenialReason::InvalidRequest));
        }
        self.books.save(&Book::new(id, title))?;
        Ok(Verdict::Approved)
    }

    pub fn update_book(&self, id: &str, title: Option<&str>) -> Result<Verdict, StoreError> {
        let Some(mut book) = self.books.find_by_id(id)? else {
            return Ok(Verdict::Denied(DenialReason::BookNotFound));
        };
        let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
            return Ok(Verdict::Denied(DenialReason::InvalidRequest));
        };
        book.title = title.to_string();
        self.books.save(&book)?;
        Ok(Verdict::Approved)
    }

    pub fn delete_book(&self, id: &str) -> Result<Verdict, StoreError> {
        if !self.books.exists(id)? {
            return Ok(Verdict::Denied(DenialReason::BookNotFound));
        }
        self.books.delete(id)?;
        Ok(Verdict::Approved)
    }

    pub fn create_member(&self, id: &str, name: &str) -> Result<Verdict, StoreError> {
        if id.trim().is_empty() || name.trim().is_empty() {
            return Ok(Verdict::Denied(DenialReason::InvalidRequest));
        }
        self.members.save(&Member::new(id, name))?;
        Ok(Verdict::Approved)
    }

    pub fn update_member(&self, id: &str, name: Option<&str>) -> Result<Verdict, StoreError> {
        let Some(mut member) = self.members.find_by_id(id)? else {
            return Ok(Verdict::Denied(DenialReason::MemberNotFound));
        };
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            return Ok(Verdict::Denied(DenialReason::InvalidRequest));
        };
        member.name = name.to_string();
        self.members.save(&member)?;
        Ok(Verdict::Approved)
    }

    pub fn delete_member(&self, id: &str) -> Result<Verdict, StoreError> {
        if !self.members.exists(id)? {
            return Ok(Verdict::Denied(DenialReason::MemberNotFound));
        }
        self.members.delete(id)?;
        Ok(Verdict::Approved)
    }

    pub fn book(&self, id: &str) -> Result<Option<Book>, StoreError> {
        self.books.find_by_id(id)
    }

    pub fn books(&self) -> Result<Vec<Book>, StoreError> {
        self.books.find_all()
    }

    pub fn members(&self) -> Result<Vec<Member>, StoreError> {
        self.members.find_all()
    }
}
