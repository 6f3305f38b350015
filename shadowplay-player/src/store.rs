//! Debounced persistence
//!
//! Segment edits and card mutations arrive in bursts (drag a boundary,
//! type a note). Writers submit the full latest value; a background task
//! waits out the burst and persists only the final state. Latest-wins:
//! intermediate values submitted during the quiet window are dropped.

use std::future::Future;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::warn;

use shadowplay_common::db;
use shadowplay_common::segment::Segment;
use shadowplay_common::srs::FlashCard;
use shadowplay_common::Result;

/// Quiet window before a submitted value is persisted
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Latest-wins debouncer over an arbitrary save function
///
/// Cloneable handle; the worker task exits when every handle is dropped,
/// flushing any pending value first.
pub struct Debounced<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Debounced<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Send + 'static> Debounced<T> {
    pub fn spawn<F, Fut>(delay: Duration, mut save: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                match pending.take() {
                    None => match rx.recv().await {
                        Some(value) => pending = Some(value),
                        None => break,
                    },
                    Some(value) => match tokio::time::timeout(delay, rx.recv()).await {
                        // A newer value arrived inside the window; the
                        // older one is superseded
                        Ok(Some(newer)) => pending = Some(newer),
                        Ok(None) => {
                            if let Err(e) = save(value).await {
                                warn!("debounced save on shutdown failed: {}", e);
                            }
                            break;
                        }
                        Err(_) => {
                            if let Err(e) = save(value).await {
                                warn!("debounced save failed: {}", e);
                            }
                        }
                    },
                }
            }
        });
        Self { tx }
    }

    /// Submit the latest full value; returns immediately
    pub fn submit(&self, value: T) {
        let _ = self.tx.send(value);
    }
}

/// Pending timeline write: the full segment sequence for one media file
pub struct TimelineWrite {
    pub media_id: String,
    pub source_file: String,
    pub segments: Vec<Segment>,
}

/// Debounced writer for timelines
#[derive(Clone)]
pub struct TimelineSaver {
    inner: Debounced<TimelineWrite>,
}

impl TimelineSaver {
    pub fn new(pool: SqlitePool) -> Self {
        let inner = Debounced::spawn(SAVE_DEBOUNCE, move |w: TimelineWrite| {
            let pool = pool.clone();
            async move { db::timelines::save_segments(&pool, &w.media_id, &w.source_file, &w.segments).await }
        });
        Self { inner }
    }

    pub fn submit(&self, media_id: impl Into<String>, source_file: impl Into<String>, segments: Vec<Segment>) {
        self.inner.submit(TimelineWrite {
            media_id: media_id.into(),
            source_file: source_file.into(),
            segments,
        });
    }
}

/// Debounced writer for flashcards
#[derive(Clone)]
pub struct CardSaver {
    inner: Debounced<FlashCard>,
}

impl CardSaver {
    pub fn new(pool: SqlitePool) -> Self {
        let inner = Debounced::spawn(SAVE_DEBOUNCE, move |card: FlashCard| {
            let pool = pool.clone();
            async move { db::cards::save_card(&pool, &card).await }
        });
        Self { inner }
    }

    pub fn submit(&self, card: FlashCard) {
        self.inner.submit(card);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn debounce_keeps_only_the_latest_value() {
        let saves = Arc::new(Mutex::new(Vec::new()));
        let count = Arc::new(AtomicUsize::new(0));
        let (saves2, count2) = (saves.clone(), count.clone());

        let debounced = Debounced::spawn(Duration::from_millis(50), move |v: u32| {
            let (saves, count) = (saves2.clone(), count2.clone());
            async move {
                saves.lock().unwrap().push(v);
                count.fetch_add(1, Ordering::SeqCst);
                Ok::<_, shadowplay_common::Error>(())
            }
        });

        for v in 1..=5 {
            debounced.submit(v);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1, "burst collapses to one save");
        assert_eq!(*saves.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn separate_bursts_each_persist() {
        let saves = Arc::new(Mutex::new(Vec::new()));
        let saves2 = saves.clone();

        let debounced = Debounced::spawn(Duration::from_millis(30), move |v: u32| {
            let saves = saves2.clone();
            async move {
                saves.lock().unwrap().push(v);
                Ok::<_, shadowplay_common::Error>(())
            }
        });

        debounced.submit(1);
        tokio::time::sleep(Duration::from_millis(120)).await;
        debounced.submit(2);
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(*saves.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn timeline_saver_writes_through_to_the_database() {
        let pool = db::init::init_memory_database().await.expect("init db");
        let saver = TimelineSaver::new(pool.clone());

        let segments = vec![Segment::new(0, 1000, vec!["hello".into()], "ep01.srt")];
        saver.submit("ep01", "ep01.srt", segments.clone());
        tokio::time::sleep(SAVE_DEBOUNCE + Duration::from_millis(300)).await;

        let loaded = db::timelines::load_segments(&pool, "ep01")
            .await
            .expect("load")
            .expect("row exists");
        assert_eq!(loaded, segments);
    }
}
