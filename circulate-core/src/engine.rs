//! The circulation engine: every lending-state transition lives here.
//!
//! Each operation is a total function from one valid `(loaned_to, queue)`
//! pair to another, or a denial that leaves the pair unchanged. Denials are
//! ordinary return values; [`StoreError`] is reserved for the storage
//! backend itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};

use crate::models::Book;
use crate::outcome::{DenialReason, MemberSummary, ReservationPosition, ReturnOutcome, Verdict};
use crate::policy::LendingPolicy;
use crate::store::{BookStore, MemberStore, StoreError};

/// Filters for [`Circulation::search_books`]. `available: Some(false)`
/// selects books currently on loan.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub title_contains: Option<String>,
    pub available: Option<bool>,
    pub loaned_to: Option<String>,
}

/// Per-book mutex registry. Mutations on the same book id serialize so each
/// operation sees a consistent snapshot; unrelated books proceed in
/// parallel.
#[derive(Clone, Default)]
struct BookLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl BookLocks {
    fn for_book(&self, id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(id.to_string()).or_default().clone()
    }
}

/// The lending engine. Stateless between calls; all state lives in the two
/// stores.
#[derive(Clone)]
pub struct Circulation {
    books: Arc<dyn BookStore>,
    members: Arc<dyn MemberStore>,
    policy: LendingPolicy,
    locks: BookLocks,
}

impl Circulation {
    pub fn new(
        books: Arc<dyn BookStore>,
        members: Arc<dyn MemberStore>,
        policy: LendingPolicy,
    ) -> Self {
        Self {
            books,
            members,
            policy,
            locks: BookLocks::default(),
        }
    }

    pub fn policy(&self) -> LendingPolicy {
        self.policy
    }

    /// A member may receive a loan iff they still exist and hold fewer than
    /// `max_loans` books. Checked fresh at every decision point — limits
    /// change as loans complete, so the answer is never cached.
    pub fn can_borrow(&self, member_id: &str) -> Result<bool, StoreError> {
        if !self.members.exists(member_id)? {
            return Ok(false);
        }
        Ok(self.books.count_loaned_to(member_id)? < self.policy.max_loans as usize)
    }

    pub fn borrow(&self, book_id: &str, member_id: &str) -> Result<Verdict, StoreError> {
        let lock = self.locks.for_book(book_id);
        let _guard = lock.lock().unwrap();

        let Some(mut book) = self.books.find_by_id(book_id)? else {
            return Ok(Verdict::Denied(DenialReason::BookNotFound));
        };
        if !self.members.exists(member_id)? {
            return Ok(Verdict::Denied(DenialReason::MemberNotFound));
        }
        if book.loaned_to.is_some() {
            return Ok(Verdict::Denied(DenialReason::AlreadyLoaned));
        }

        // While others are waiting, only the queue head may borrow.
        let mut consumed_reservation = false;
        if let Some(head) = book.reservation_queue.first() {
            if head != member_id {
                return Ok(Verdict::Denied(DenialReason::ReservationQueue));
            }
            book.reservation_queue.remove(0);
            consumed_reservation = true;
        }

        if !self.can_borrow(member_id)? {
            if consumed_reservation {
                // The head's reservation is spent by the borrow attempt even
                // when the limit check turns the loan down.
                self.books.save(&book)?;
            }
            return Ok(Verdict::Denied(DenialReason::BorrowLimit));
        }

        book.loaned_to = Some(member_id.to_string());
        book.due_date = Some(self.policy.due_date_from(today()));
        self.books.save(&book)?;
        tracing::debug!("loaned book {} to member {}", book_id, member_id);
        Ok(Verdict::Approved)
    }

    /// Returns a book and hands it to the next eligible reserver, if any.
    /// Only the current holder can return; anyone else is refused with the
    /// loan untouched.
    pub fn return_book(&self, book_id: &str, member_id: &str) -> Result<ReturnOutcome, StoreError> {
        let lock = self.locks.for_book(book_id);
        let _guard = lock.lock().unwrap();

        let Some(mut book) = self.books.find_by_id(book_id)? else {
            return Ok(ReturnOutcome::Refused);
        };
        if book.loaned_to.as_deref() != Some(member_id) {
            return Ok(ReturnOutcome::Refused);
        }

        book.loaned_to = None;
        book.due_date = None;

        // Hand off to the first eligible reserver in order. Everyone skipped
        // along the way is dropped for good, not re-queued.
        let mut handed_to = None;
        while !book.reservation_queue.is_empty() {
            let candidate = book.reservation_queue.remove(0);
            if !self.can_borrow(&candidate)? {
                tracing::debug!(
                    "dropping ineligible reserver {} from book {}",
                    candidate,
                    book_id
                );
                continue;
            }
            book.loaned_to = Some(candidate.clone());
            book.due_date = Some(self.policy.due_date_from(today()));
            handed_to = Some(candidate);
            break;
        }

        self.books.save(&book)?;
        Ok(ReturnOutcome::Accepted { handed_to })
    }

    pub fn reserve(&self, book_id: &str, member_id: &str) -> Result<Verdict, StoreError> {
        let lock = self.locks.for_book(book_id);
        let _guard = lock.lock().unwrap();

        let Some(mut book) = self.books.find_by_id(book_id)? else {
            return Ok(Verdict::Denied(DenialReason::BookNotFound));
        };
        if !self.members.exists(member_id)? {
            return Ok(Verdict::Denied(DenialReason::MemberNotFound));
        }
        if book.reservation_queue.iter().any(|m| m == member_id) {
            return Ok(Verdict::Denied(DenialReason::AlreadyReserved));
        }

        if book.loaned_to.is_none() && !book.reservation_queue.is_empty() {
            // An available book with waiting reservers means borrow/return
            // stopped keeping the two in sync upstream. Queue the request
            // rather than letting it jump the line.
            tracing::warn!(
                "available book {} has a non-empty reservation queue",
                book_id
            );
            book.reservation_queue.push(member_id.to_string());
            self.books.save(&book)?;
            return Ok(Verdict::Approved);
        }

        if book.loaned_to.is_none() {
            // Reserving an available book is an immediate loan; the member
            // never enters the queue.
            if !self.can_borrow(member_id)? {
                return Ok(Verdict::Denied(DenialReason::BorrowLimit));
            }
            book.loaned_to = Some(member_id.to_string());
            book.due_date = Some(self.policy.due_date_from(today()));
            self.books.save(&book)?;
            return Ok(Verdict::Approved);
        }

        book.reservation_queue.push(member_id.to_string());
        self.books.save(&book)?;
        Ok(Verdict::Approved)
    }

    pub fn cancel_reservation(&self, book_id: &str, member_id: &str) -> Result<Verdict, StoreError> {
        let lock = self.locks.for_book(book_id);
        let _guard = lock.lock().unwrap();

        let Some(mut book) = self.books.find_by_id(book_id)? else {
            return Ok(Verdict::Denied(DenialReason::BookNotFound));
        };
        if !self.members.exists(member_id)? {
            return Ok(Verdict::Denied(DenialReason::MemberNotFound));
        }
        let Some(position) = book.reservation_queue.iter().position(|m| m == member_id) else {
            return Ok(Verdict::Denied(DenialReason::NotReserved));
        };
        book.reservation_queue.remove(position);
        self.books.save(&book)?;
        Ok(Verdict::Approved)
    }

    /// Moves the due date by `days` (negative values shorten the loan).
    /// Zero is rejected as a no-op request.
    pub fn extend_loan(&self, book_id: &str, days: i64) -> Result<Verdict, StoreError> {
        if days == 0 {
            return Ok(Verdict::Denied(DenialReason::InvalidExtension));
        }

        let lock = self.locks.for_book(book_id);
        let _guard = lock.lock().unwrap();

        let Some(mut book) = self.books.find_by_id(book_id)? else {
            return Ok(Verdict::Denied(DenialReason::BookNotFound));
        };
        if book.loaned_to.is_none() {
            return Ok(Verdict::Denied(DenialReason::NotLoaned));
        }

        let base = book
            .due_date
            .unwrap_or_else(|| self.policy.due_date_from(today()));
        book.due_date = Some(base + chrono::Duration::days(days));
        self.books.save(&book)?;
        Ok(Verdict::Approved)
    }

    pub fn search_books(&self, filter: &BookFilter) -> Result<Vec<Book>, StoreError> {
        let needle = filter.title_contains.as_ref().map(|t| t.to_lowercase());
        Ok(self
            .books
            .find_all()?
            .into_iter()
            .filter(|b| {
                needle
                    .as_ref()
                    .map_or(true, |n| b.title.to_lowercase().contains(n))
            })
            .filter(|b| {
                filter
                    .loaned_to
                    .as_ref()
                    .map_or(true, |m| b.loaned_to.as_ref() == Some(m))
            })
            .filter(|b| {
                filter
                    .available
                    .map_or(true, |available| b.loaned_to.is_none() == available)
            })
            .collect())
    }

    /// Loaned books whose due date is strictly before `as_of`.
    pub fn overdue_books(&self, as_of: NaiveDate) -> Result<Vec<Book>, StoreError> {
        Ok(self
            .books
            .find_all()?
            .into_iter()
            .filter(|b| b.loaned_to.is_some())
            .filter(|b| b.due_date.map_or(false, |due| due < as_of))
            .collect())
    }

    /// Full-scan report of a member's loans and queue positions. `None` for
    /// an unknown member.
    pub fn member_summary(&self, member_id: &str) -> Result<Option<MemberSummary>, StoreError> {
        if !self.members.exists(member_id)? {
            return Ok(None);
        }

        let mut loans = Vec::new();
        let mut reservations = Vec::new();
        for book in self.books.find_all()? {
            if let Some(position) = book.reservation_queue.iter().position(|m| m == member_id) {
                reservations.push(ReservationPosition {
                    book_id: book.id.clone(),
                    position,
                });
            }
            if book.is_loaned_to(member_id) {
                loans.push(book);
            }
        }
        Ok(Some(MemberSummary {
            loans,
            reservations,
        }))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
