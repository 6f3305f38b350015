//! SQLite persistence for timelines and flashcards
//!
//! Segment sequences and cards are stored as JSON columns; the exact
//! shape on disk is deliberately opaque to everything but this module.

pub mod cards;
pub mod init;
pub mod timelines;

pub use init::init_database;
