use serde::{Deserialize, Serialize};

use crate::models::Book;

/// Machine-readable reason for a refused operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    BookNotFound,
    MemberNotFound,
    AlreadyLoaned,
    ReservationQueue,
    BorrowLimit,
    AlreadyReserved,
    NotReserved,
    InvalidRequest,
    InvalidExtension,
    NotLoaned,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookNotFound => "BOOK_NOT_FOUND",
            Self::MemberNotFound => "MEMBER_NOT_FOUND",
            Self::AlreadyLoaned => "ALREADY_LOANED",
            Self::ReservationQueue => "RESERVATION_QUEUE",
            Self::BorrowLimit => "BORROW_LIMIT",
            Self::AlreadyReserved => "ALREADY_RESERVED",
            Self::NotReserved => "NOT_RESERVED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidExtension => "INVALID_EXTENSION",
            Self::NotLoaned => "NOT_LOANED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BOOK_NOT_FOUND" => Some(Self::BookNotFound),
            "MEMBER_NOT_FOUND" => Some(Self::MemberNotFound),
            "ALREADY_LOANED" => Some(Self::AlreadyLoaned),
            "RESERVATION_QUEUE" => Some(Self::ReservationQueue),
            "BORROW_LIMIT" => Some(Self::BorrowLimit),
            "ALREADY_RESERVED" => Some(Self::AlreadyReserved),
            "NOT_RESERVED" => Some(Self::NotReserved),
            "INVALID_REQUEST" => Some(Self::InvalidRequest),
            "INVALID_EXTENSION" => Some(Self::InvalidExtension),
            "NOT_LOANED" => Some(Self::NotLoaned),
            _ => None,
        }
    }
}

/// Outcome of borrow, reserve, cancel, extend, and catalog operations.
/// Precondition failures are ordinary values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Denied(DenialReason),
}

impl Verdict {
    pub fn ok(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            Self::Approved => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}

/// Outcome of a return. Refusals carry no reason code; acceptance carries
/// the hand-off recipient, if the queue produced one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    Accepted { handed_to: Option<String> },
    Refused,
}

impl ReturnOutcome {
    pub fn ok(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn handed_to(&self) -> Option<&str> {
        match self {
            Self::Accepted { handed_to } => handed_to.as_deref(),
            Self::Refused => None,
        }
    }
}

/// A member's current loans plus every queue position they hold.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub loans: Vec<Book>,
    pub reservations: Vec<ReservationPosition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationPosition {
    pub book_id: String,
    pub position: usize,
}
