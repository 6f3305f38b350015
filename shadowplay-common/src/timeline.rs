//! Timeline: the ordered segment sequence for one media file
//!
//! Owns the cursor (currently highlighted segment) and the optional loop
//! region. Edit operations delegate to the pure functions in
//! [`crate::segment`] and always leave the sequence sorted by start time.

use serde::{Deserialize, Serialize};

use crate::segment::{self, Segment, ShiftBound};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Media file this timeline belongs to
    pub media_id: String,
    segments: Vec<Segment>,
    /// Currently highlighted segment, if any
    pub cursor_index: Option<usize>,
    /// Loop target for looping playback, if armed
    pub loop_region: Option<Segment>,
}

impl Timeline {
    pub fn new(media_id: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            media_id: media_id.into(),
            segments: segment::sort_segments(segments),
            cursor_index: None,
            loop_region: None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Replace the whole sequence (reload-from-source, remote setSubtitles).
    /// Clears the cursor; a stale index into the old sequence has no meaning
    /// in the new one.
    pub fn replace_segments(&mut self, segments: Vec<Segment>) {
        self.segments = segment::sort_segments(segments);
        self.cursor_index = None;
    }

    /// Index of the segment whose `[start, end]` span contains `time_ms`
    pub fn segment_at(&self, time_ms: u64) -> Option<usize> {
        self.segments.iter().position(|s| s.contains(time_ms))
    }

    /// Shift every segment at position >= `index` by `delta_ms`
    pub fn shift_from(&mut self, index: usize, delta_ms: i64, bound: ShiftBound) {
        self.segments = segment::shift_from(&self.segments, index, delta_ms, bound);
    }

    /// Trim the start of one segment to `start_ms`
    pub fn trim_start(&mut self, index: usize, start_ms: u64) {
        let mut next = self.segments.clone();
        if let Some(seg) = next.get_mut(index) {
            seg.start_ms = start_ms.min(seg.end_ms);
        }
        self.segments = segment::sort_segments(next);
    }

    /// Trim the end of one segment to `end_ms`
    pub fn trim_end(&mut self, index: usize, end_ms: u64) {
        let mut next = self.segments.clone();
        if let Some(seg) = next.get_mut(index) {
            seg.end_ms = end_ms.max(seg.start_ms);
        }
        self.segments = segment::sort_segments(next);
    }

    /// Merge the segment at `index` with its successor
    pub fn merge_with_next(&mut self, index: usize) {
        if index + 1 >= self.segments.len() {
            return;
        }
        let merged = segment::merge(&self.segments[index], &self.segments[index + 1]);
        let mut next = self.segments.clone();
        next.splice(index..=index + 1, [merged]);
        self.segments = segment::sort_segments(next);
    }

    /// Delete one segment
    pub fn delete(&mut self, index: usize) {
        if index >= self.segments.len() {
            return;
        }
        let mut next = self.segments.clone();
        next.remove(index);
        self.segments = next;
        if self.cursor_index == Some(index) {
            self.cursor_index = None;
        }
    }

    /// Run [`segment::auto_merge`] over the sequence; returns the number of
    /// merges performed (0 means the timeline was already clean)
    pub fn auto_merge(&mut self) -> usize {
        let (merged, count) = segment::auto_merge(&self.segments);
        if count > 0 {
            self.segments = merged;
            self.cursor_index = None;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: u64, end: u64) -> Segment {
        Segment::new(start, end, vec!["line".into()], "ep01.srt")
    }

    #[test]
    fn new_sorts_segments_by_start() {
        let tl = Timeline::new("ep01", vec![seg(5000, 6000), seg(0, 1000)]);
        assert_eq!(tl.segments()[0].start_ms, 0);
        assert_eq!(tl.segments()[1].start_ms, 5000);
    }

    #[test]
    fn segment_at_finds_containing_span() {
        let tl = Timeline::new("ep01", vec![seg(0, 1000), seg(2000, 3000)]);
        assert_eq!(tl.segment_at(500), Some(0));
        assert_eq!(tl.segment_at(2500), Some(1));
        assert_eq!(tl.segment_at(1500), None);
    }

    #[test]
    fn replace_segments_clears_cursor() {
        let mut tl = Timeline::new("ep01", vec![seg(0, 1000)]);
        tl.cursor_index = Some(0);
        tl.replace_segments(vec![seg(100, 900), seg(1000, 2000)]);
        assert_eq!(tl.cursor_index, None);
        assert_eq!(tl.len(), 2);
    }

    #[test]
    fn merge_with_next_collapses_pair() {
        let mut tl = Timeline::new("ep01", vec![seg(0, 1000), seg(1500, 3000), seg(4000, 5000)]);
        tl.merge_with_next(0);
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.segments()[0].start_ms, 0);
        assert_eq!(tl.segments()[0].end_ms, 3000);
    }

    #[test]
    fn delete_clears_cursor_on_deleted_segment() {
        let mut tl = Timeline::new("ep01", vec![seg(0, 1000), seg(2000, 3000)]);
        tl.cursor_index = Some(1);
        tl.delete(1);
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.cursor_index, None);
    }

    #[test]
    fn trim_clamps_to_keep_span_well_formed() {
        let mut tl = Timeline::new("ep01", vec![seg(1000, 2000)]);
        tl.trim_start(0, 2500);
        assert_eq!(tl.segments()[0].start_ms, 2000);
        tl.trim_end(0, 100);
        assert_eq!(tl.segments()[0].end_ms, 2000);
    }
}
