//! Core library for Circulate.
//!
//! This crate provides the lending rules, store contracts, and catalog
//! operations for Circulate, independent of any transport layer.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use circulate_core::store::Database;
//! use circulate_core::{Circulation, LendingPolicy};
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let store = Arc::new(db);
//! let circulation = Circulation::new(store.clone(), store, LendingPolicy::default());
//! let verdict = circulation.borrow("b1", "m1")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod engine;
pub mod models;
pub mod outcome;
pub mod policy;
pub mod store;

// Re-export commonly used types at crate root
pub use catalog::Catalog;
pub use engine::{BookFilter, Circulation};
pub use outcome::{DenialReason, MemberSummary, ReservationPosition, ReturnOutcome, Verdict};
pub use policy::LendingPolicy;
