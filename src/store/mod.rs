//! Persistence for tracked activities.
//! The basic idea is:
//!  - Everything lives in one JSON document owned by [document_store::JsonDocumentStore].
//!  - Finalized records sit in a flat list, partitioned by the local calendar
//!    day of their start when read back.
//!  - The single open record occupies its own slot next to the list, so
//!    rewriting a day can never touch it.

pub mod document_store;
pub mod entities;
pub mod repository;
pub mod settings;
