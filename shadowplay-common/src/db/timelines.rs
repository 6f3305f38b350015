//! Timeline (segment sequence) persistence

use crate::segment::Segment;
use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Load the stored segment sequence for a media file, if one exists
pub async fn load_segments(pool: &SqlitePool, media_id: &str) -> Result<Option<Vec<Segment>>> {
    let row = sqlx::query_as::<_, (String,)>("SELECT segments FROM timelines WHERE media_id = ?")
        .bind(media_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((json,)) => {
            let segments: Vec<Segment> = serde_json::from_str(&json)
                .map_err(|e| Error::Internal(format!("corrupt segments for {}: {}", media_id, e)))?;
            Ok(Some(segments))
        }
        None => Ok(None),
    }
}

/// Persist the segment sequence for a media file (upsert)
pub async fn save_segments(pool: &SqlitePool, media_id: &str, source_file: &str, segments: &[Segment]) -> Result<()> {
    let json = serde_json::to_string(segments)
        .map_err(|e| Error::Internal(format!("serialize segments for {}: {}", media_id, e)))?;

    sqlx::query(
        r#"
        INSERT INTO timelines (media_id, source_file, segments, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(media_id) DO UPDATE SET
            source_file = excluded.source_file,
            segments = excluded.segments,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(media_id)
    .bind(source_file)
    .bind(&json)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    debug!("Saved {} segments for {}", segments.len(), media_id);
    Ok(())
}

/// Replace the stored sequence with a freshly re-parsed one, discarding
/// edits. Parsing the subtitle source is the collaborator's job; this
/// takes the parsed result and makes it authoritative.
pub async fn reload_segments(pool: &SqlitePool, media_id: &str, source_file: &str, parsed: Vec<Segment>) -> Result<Vec<Segment>> {
    save_segments(pool, media_id, source_file, &parsed).await?;
    Ok(parsed)
}
