//! # Shadowplay Common Library
//!
//! Shared code for the Shadowplay workspace services including:
//! - Subtitle segment model and pure edit operations
//! - Timeline (per-media segment sequence with cursor and loop region)
//! - Event types (ZoneEvent enum) and the EventBus
//! - Remote-control wire protocol (observer commands / owner updates)
//! - SM-2 spaced-repetition scheduler and flashcard model
//! - Configuration loading
//! - SQLite persistence for timelines and flashcards

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod remote;
pub mod segment;
pub mod srs;
pub mod timeline;

pub use error::{Error, Result};
pub use segment::Segment;
pub use timeline::Timeline;
