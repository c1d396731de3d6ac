//! Persistent history store.
//!
//! Keeps the mined commit table and the results of the last analysis run in
//! a local SQLite database, so repeated analyses skip re-walking git history.

pub mod store;
