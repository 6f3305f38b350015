//! Subtitle segment model and pure edit operations
//!
//! All operations return new segment sequences and never mutate their
//! arguments. Consumers holding a reference to an old sequence (remote
//! observers, in-flight saves) keep a consistent view.
//!
//! Contract: `start_ms <= end_ms` for every well-formed segment. The
//! operations here are total over well-formed input; callers must not
//! construct inverted segments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum duration an accumulator may reach and still absorb the next
/// segment during [`auto_merge`].
pub const AUTO_MERGE_MAX_DURATION_MS: u64 = 10_000;

/// Gap inserted on each side of an overlapping boundary that does not
/// qualify for merging.
pub const OVERLAP_NUDGE_MS: u64 = 50;

/// A timestamped subtitle unit with one or more text lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Stable segment identity, preserved across shifts and trims
    pub id: Uuid,
    /// Start of the spoken span (milliseconds from media start)
    pub start_ms: u64,
    /// End of the spoken span (milliseconds from media start)
    pub end_ms: u64,
    /// Text lines, one per language/track
    pub lines: Vec<String>,
    /// Subtitle file this segment was parsed from
    pub source_file: String,
}

impl Segment {
    pub fn new(start_ms: u64, end_ms: u64, lines: Vec<String>, source_file: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_ms,
            end_ms,
            lines,
            source_file: source_file.into(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Whether `time_ms` falls inside this segment's `[start, end]` span
    pub fn contains(&self, time_ms: u64) -> bool {
        self.start_ms <= time_ms && time_ms <= self.end_ms
    }
}

/// Which timestamps [`shift_from`] moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftBound {
    /// Shift start times only, clamped at 0
    Start,
    /// Shift both start and end times
    Both,
}

/// Sort a segment sequence by start time. Every mutation re-establishes
/// this ordering before the sequence is handed to any consumer.
pub fn sort_segments(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by_key(|s| s.start_ms);
    segments
}

/// Add `delta_ms` to every segment at position >= `index`.
///
/// Segments before `index` are returned unchanged. Results that would go
/// negative saturate at 0.
pub fn shift_from(segments: &[Segment], index: usize, delta_ms: i64, bound: ShiftBound) -> Vec<Segment> {
    let shifted = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            if i < index {
                return seg.clone();
            }
            let mut seg = seg.clone();
            seg.start_ms = seg.start_ms.saturating_add_signed(delta_ms);
            if bound == ShiftBound::Both {
                seg.end_ms = seg.end_ms.saturating_add_signed(delta_ms);
            }
            seg
        })
        .collect();
    sort_segments(shifted)
}

/// Merge two adjacent segments into one spanning `[a.start, b.end]`.
///
/// Lines are concatenated pairwise; the shorter line list is padded with
/// empty strings, so line `i` of the result is `lines[i](a) + " " +
/// lines[i](b)` and the result has `max(len(a), len(b))` lines.
pub fn merge(a: &Segment, b: &Segment) -> Segment {
    let line_count = a.lines.len().max(b.lines.len());
    let lines = (0..line_count)
        .map(|i| {
            let la = a.lines.get(i).map(String::as_str).unwrap_or("");
            let lb = b.lines.get(i).map(String::as_str).unwrap_or("");
            format!("{} {}", la, lb)
        })
        .collect();
    Segment {
        id: Uuid::new_v4(),
        start_ms: a.start_ms,
        end_ms: b.end_ms,
        lines,
        source_file: a.source_file.clone(),
    }
}

/// Collapse overlapping short segments in a single left-to-right pass.
///
/// The next segment is merged into the running accumulator when the
/// accumulator is still under the 10 s ceiling and the spans touch
/// (`acc.end >= next.start` or `acc.end > next.end`). An overlap that no
/// longer qualifies for merging is resolved by nudging both sides of the
/// boundary apart by 50 ms instead.
///
/// Returns the reduced sequence and the number of merges performed; a
/// second application always reports 0.
pub fn auto_merge(segments: &[Segment]) -> (Vec<Segment>, usize) {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut merges = 0usize;

    for seg in segments {
        let Some(acc) = out.last_mut() else {
            out.push(seg.clone());
            continue;
        };

        let touching = acc.end_ms >= seg.start_ms || acc.end_ms > seg.end_ms;
        if touching && acc.duration_ms() < AUTO_MERGE_MAX_DURATION_MS {
            *acc = merge(acc, seg);
            merges += 1;
        } else if acc.end_ms >= seg.start_ms {
            // Overlap too long to merge: pull the boundary apart by a
            // fixed gap on each side. Clamped so start <= end survives
            // even for pathologically short segments.
            let boundary = seg.start_ms;
            let mut next = seg.clone();
            acc.end_ms = boundary.saturating_sub(OVERLAP_NUDGE_MS).max(acc.start_ms);
            next.start_ms = (boundary + OVERLAP_NUDGE_MS).min(next.end_ms);
            out.push(next);
        } else {
            out.push(seg.clone());
        }
    }

    (out, merges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: u64, end: u64, lines: &[&str]) -> Segment {
        Segment::new(start, end, lines.iter().map(|s| s.to_string()).collect(), "ep01.srt")
    }

    #[test]
    fn merge_spans_first_start_to_second_end() {
        let a = seg(0, 2000, &["hello", "こんにちは"]);
        let b = seg(2500, 4000, &["world"]);
        let m = merge(&a, &b);
        assert_eq!(m.start_ms, 0);
        assert_eq!(m.end_ms, 4000);
        assert_eq!(m.lines.len(), 2);
        assert_eq!(m.lines[0], "hello world");
        // Shorter list padded with an empty string
        assert_eq!(m.lines[1], "こんにちは ");
    }

    #[test]
    fn shift_from_leaves_prefix_untouched() {
        let segs = vec![seg(0, 1000, &["a"]), seg(2000, 3000, &["b"]), seg(4000, 5000, &["c"])];
        let shifted = shift_from(&segs, 1, 500, ShiftBound::Both);
        assert_eq!(shifted[0].start_ms, 0);
        assert_eq!(shifted[0].end_ms, 1000);
        assert_eq!(shifted[1].start_ms, 2500);
        assert_eq!(shifted[1].end_ms, 3500);
        assert_eq!(shifted[2].start_ms, 4500);
        assert_eq!(shifted[2].end_ms, 5500);
        // Originals untouched
        assert_eq!(segs[1].start_ms, 2000);
    }

    #[test]
    fn shift_from_start_only_clamps_at_zero() {
        let segs = vec![seg(100, 1000, &["a"]), seg(2000, 3000, &["b"])];
        let shifted = shift_from(&segs, 0, -500, ShiftBound::Start);
        assert_eq!(shifted[0].start_ms, 0);
        assert_eq!(shifted[0].end_ms, 1000, "start-only shift must not move ends");
        assert_eq!(shifted[1].start_ms, 1500);
        assert_eq!(shifted[1].end_ms, 3000);
    }

    #[test]
    fn auto_merge_overlapping_short_segments() {
        // The worked example: durations and overlap qualify for merging
        let segs = vec![seg(0, 9000, &["first"]), seg(8000, 20000, &["second"])];
        let (merged, count) = auto_merge(&segs);
        assert_eq!(count, 1);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_ms, 0);
        assert_eq!(merged[0].end_ms, 20000);
        assert_eq!(merged[0].lines[0], "first second");
    }

    #[test]
    fn auto_merge_nudges_when_accumulator_too_long() {
        // Accumulator already >= 10 s: overlap resolved by the 50 ms nudge
        let segs = vec![seg(0, 12000, &["long"]), seg(11000, 15000, &["next"])];
        let (out, count) = auto_merge(&segs);
        assert_eq!(count, 0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].end_ms, 10950);
        assert_eq!(out[1].start_ms, 11050);
    }

    #[test]
    fn auto_merge_is_idempotent() {
        let segs = vec![
            seg(0, 9000, &["a"]),
            seg(8000, 20000, &["b"]),
            seg(19500, 21000, &["c"]),
            seg(30000, 31000, &["d"]),
        ];
        let (once, first_count) = auto_merge(&segs);
        assert!(first_count > 0);
        let (twice, second_count) = auto_merge(&once);
        assert_eq!(second_count, 0, "second pass must be a no-op");
        assert_eq!(twice, once);
    }

    #[test]
    fn auto_merge_nudge_clamps_pathologically_short_segments() {
        // A 40 ms segment overlapping a long accumulator: the nudge would
        // push start past end without clamping
        let segs = vec![seg(0, 12000, &["long"]), seg(11980, 12020, &["tiny"])];
        let (out, count) = auto_merge(&segs);
        assert_eq!(count, 0);
        for s in &out {
            assert!(s.start_ms <= s.end_ms, "nudge must never invert a segment");
        }
        assert_eq!(out[1].start_ms, out[1].end_ms);
    }

    #[test]
    fn auto_merge_disjoint_sequence_is_untouched() {
        let segs = vec![seg(0, 1000, &["a"]), seg(2000, 3000, &["b"])];
        let (out, count) = auto_merge(&segs);
        assert_eq!(count, 0);
        assert_eq!(out, segs);
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let s = seg(1000, 2000, &["a"]);
        assert!(s.contains(1000));
        assert!(s.contains(2000));
        assert!(!s.contains(999));
        assert!(!s.contains(2001));
    }
}
