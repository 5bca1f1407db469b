//! Server crate for Circulate: the HTTP API over the `circulate-core`
//! engine. All lending rules live in the core crate; this one only maps
//! requests and outcomes.

pub mod api;
