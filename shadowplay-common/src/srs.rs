//! Spaced-repetition scheduling (SM-2) and the flashcard model
//!
//! [`schedule`] is a pure function from (card, grade, now) to the next
//! review; persisting the result is the caller's concern.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::segment::Segment;

/// Floor for the ease factor; SM-2 never lets a card get harder than this
pub const MIN_EFACTOR: f64 = 1.3;

/// Review quality, 0 (blackout) through 5 (perfect recall)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade(u8);

impl Grade {
    pub fn new(value: u8) -> Result<Self> {
        if value > 5 {
            return Err(Error::InvalidInput(format!("grade must be 0..=5, got {}", value)));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Grades below 3 count as a failed recall
    pub fn is_failure(self) -> bool {
        self.0 < 3
    }
}

/// A vocabulary flashcard
///
/// Created on first lookup of a new keyword; grows by appended subtitle
/// clips and notes; rescheduled on every review. Never deleted here;
/// deletion is a collaborator concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashCard {
    pub id: Uuid,
    /// The looked-up keyword (front of the card)
    pub word: String,
    /// Subtitle excerpts captured when the word was encountered
    pub clips: Vec<Segment>,
    /// Free-form notes (PDF excerpts, dictionary snippets)
    pub notes: Vec<String>,
    /// Back of the card
    pub back: String,
    /// Collection (deck) this card belongs to
    pub collection: String,
    pub due_date: DateTime<Utc>,
    pub interval_days: u32,
    pub repetition: u32,
    pub efactor: f64,
}

impl FlashCard {
    /// New card, due immediately
    pub fn new(word: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            word: word.into(),
            clips: Vec::new(),
            notes: Vec::new(),
            back: String::new(),
            collection: collection.into(),
            due_date: Utc::now(),
            interval_days: 0,
            repetition: 0,
            efactor: 2.5,
        }
    }

    /// Append a subtitle excerpt to the front of the card
    pub fn add_clip(&mut self, clip: Segment) {
        self.clips.push(clip);
    }

    /// Append a note to the front of the card
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Apply a computed review to this card
    pub fn apply_review(&mut self, review: Review) {
        self.interval_days = review.interval_days;
        self.repetition = review.repetition;
        self.efactor = review.efactor;
        self.due_date = review.due_date;
    }
}

/// The outcome of grading a card: its next schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub interval_days: u32,
    pub repetition: u32,
    pub efactor: f64,
    pub due_date: DateTime<Utc>,
}

/// SM-2: map (card, grade) to the next review schedule.
///
/// A failed recall (grade < 3) resets repetition to 0 and the interval to
/// one day. A pass grows the repetition count and the interval: 1 day,
/// then 6, then `round(previous * efactor)`. The ease factor is adjusted
/// on every answer and floored at [`MIN_EFACTOR`].
pub fn schedule(card: &FlashCard, grade: Grade, now: DateTime<Utc>) -> Review {
    let q = f64::from(grade.value());
    let efactor = (card.efactor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02))).max(MIN_EFACTOR);

    let (repetition, interval_days) = if grade.is_failure() {
        (0, 1)
    } else {
        let repetition = card.repetition + 1;
        let interval_days = match repetition {
            1 => 1,
            2 => 6,
            _ => (f64::from(card.interval_days) * efactor).round() as u32,
        };
        (repetition, interval_days)
    };

    Review {
        interval_days,
        repetition,
        efactor,
        due_date: now + Duration::days(i64::from(interval_days)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_with(interval: u32, repetition: u32, efactor: f64) -> FlashCard {
        let mut card = FlashCard::new("猫", "animals");
        card.interval_days = interval;
        card.repetition = repetition;
        card.efactor = efactor;
        card
    }

    #[test]
    fn worked_example_grade_four() {
        let card = card_with(6, 2, 2.5);
        let now = Utc::now();
        let review = schedule(&card, Grade::new(4).unwrap(), now);
        assert_eq!(review.repetition, 3);
        assert_eq!(review.interval_days, 15, "round(6 * 2.5)");
        assert!((review.efactor - 2.5).abs() < 1e-9, "grade 4 leaves efactor at 2.5 here");
        assert_eq!(review.due_date, now + Duration::days(15));
    }

    #[test]
    fn failing_grades_reset_regardless_of_history() {
        let now = Utc::now();
        for g in 0..3 {
            let card = card_with(120, 9, 2.8);
            let review = schedule(&card, Grade::new(g).unwrap(), now);
            assert_eq!(review.repetition, 0, "grade {} must reset repetition", g);
            assert_eq!(review.interval_days, 1, "grade {} must reset interval", g);
        }
    }

    #[test]
    fn repeated_perfect_recall_grows_monotonically() {
        let mut card = card_with(0, 0, 2.5);
        let now = Utc::now();
        let mut last_interval = 0;
        let mut last_efactor = 0.0;
        for _ in 0..8 {
            let review = schedule(&card, Grade::new(5).unwrap(), now);
            assert!(review.interval_days > last_interval, "interval strictly increasing");
            assert!(review.efactor >= last_efactor, "efactor non-decreasing");
            assert!(review.efactor >= MIN_EFACTOR);
            last_interval = review.interval_days;
            last_efactor = review.efactor;
            card.apply_review(review);
        }
    }

    #[test]
    fn efactor_floors_at_minimum() {
        let mut card = card_with(1, 0, 1.3);
        let now = Utc::now();
        for _ in 0..5 {
            let review = schedule(&card, Grade::new(3).unwrap(), now);
            assert!(review.efactor >= MIN_EFACTOR);
            card.apply_review(review);
        }
        assert!((card.efactor - MIN_EFACTOR).abs() < 1e-9);
    }

    #[test]
    fn early_intervals_follow_the_table() {
        let mut card = card_with(0, 0, 2.5);
        let now = Utc::now();
        let first = schedule(&card, Grade::new(4).unwrap(), now);
        assert_eq!(first.interval_days, 1);
        card.apply_review(first);
        let second = schedule(&card, Grade::new(4).unwrap(), now);
        assert_eq!(second.interval_days, 6);
    }

    #[test]
    fn grade_validation_rejects_out_of_range() {
        assert!(Grade::new(6).is_err());
        assert!(Grade::new(5).is_ok());
    }
}
