//! Flashcard persistence and collection search

use crate::srs::FlashCard;
use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Load a card by its keyword, if one exists
pub async fn load_card(pool: &SqlitePool, word: &str) -> Result<Option<FlashCard>> {
    let row = sqlx::query_as::<_, (String,)>("SELECT card FROM cards WHERE word = ?")
        .bind(word)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((json,)) => {
            let card: FlashCard = serde_json::from_str(&json)
                .map_err(|e| Error::Internal(format!("corrupt card for {}: {}", word, e)))?;
            Ok(Some(card))
        }
        None => Ok(None),
    }
}

/// Persist a card (upsert, keyed by word)
pub async fn save_card(pool: &SqlitePool, card: &FlashCard) -> Result<()> {
    let json = serde_json::to_string(card)
        .map_err(|e| Error::Internal(format!("serialize card for {}: {}", card.word, e)))?;

    sqlx::query(
        r#"
        INSERT INTO cards (word, collection, card, due_date, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(word) DO UPDATE SET
            collection = excluded.collection,
            card = excluded.card,
            due_date = excluded.due_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&card.word)
    .bind(&card.collection)
    .bind(&json)
    .bind(card.due_date.to_rfc3339())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    debug!("Saved card {}", card.word);
    Ok(())
}

/// All collection names, alphabetically
pub async fn list_collections(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT DISTINCT collection FROM cards ORDER BY collection")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(c,)| c).collect())
}

/// Collection names matching `query`, best match first: exact, then
/// prefix, then substring, alphabetical within each tier
pub async fn search_collections(pool: &SqlitePool, query: &str) -> Result<Vec<String>> {
    let all = list_collections(pool).await?;
    let needle = query.to_lowercase();

    let mut ranked: Vec<(u8, String)> = all
        .into_iter()
        .filter_map(|name| {
            let lower = name.to_lowercase();
            let rank = if lower == needle {
                0
            } else if lower.starts_with(&needle) {
                1
            } else if lower.contains(&needle) {
                2
            } else {
                return None;
            };
            Some((rank, name))
        })
        .collect();

    ranked.sort();
    Ok(ranked.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::segment::Segment;
    use crate::srs::{schedule, Grade};

    #[tokio::test]
    async fn card_round_trip() {
        let pool = init_memory_database().await.unwrap();

        let mut card = FlashCard::new("勉強", "vocab");
        card.add_clip(Segment::new(1000, 2500, vec!["勉強します".into()], "ep01.srt"));
        card.add_note("to study");
        save_card(&pool, &card).await.unwrap();

        let loaded = load_card(&pool, "勉強").await.unwrap().expect("card should exist");
        assert_eq!(loaded, card);
        assert!(load_card(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn review_then_save_updates_schedule() {
        let pool = init_memory_database().await.unwrap();
        let mut card = FlashCard::new("猫", "animals");
        save_card(&pool, &card).await.unwrap();

        let review = schedule(&card, Grade::new(5).unwrap(), chrono::Utc::now());
        card.apply_review(review);
        save_card(&pool, &card).await.unwrap();

        let loaded = load_card(&pool, "猫").await.unwrap().unwrap();
        assert_eq!(loaded.repetition, 1);
        assert_eq!(loaded.interval_days, 1);
    }

    #[tokio::test]
    async fn collection_search_ranks_exact_before_prefix_before_substring() {
        let pool = init_memory_database().await.unwrap();
        for (word, collection) in [
            ("a", "verbs"),
            ("b", "verb-forms"),
            ("c", "irregular-verbs"),
            ("d", "nouns"),
        ] {
            let card = FlashCard::new(word, collection);
            save_card(&pool, &card).await.unwrap();
        }

        let hits = search_collections(&pool, "verbs").await.unwrap();
        assert_eq!(hits, vec!["verbs".to_string(), "irregular-verbs".to_string()]);

        let hits = search_collections(&pool, "verb").await.unwrap();
        assert_eq!(hits[0], "verb-forms");
        assert!(hits.contains(&"verbs".to_string()));
        assert!(!hits.contains(&"nouns".to_string()));

        let all = list_collections(&pool).await.unwrap();
        assert_eq!(all.len(), 4);
    }
}
