//! Review scheduler.
//!
//! Recomputes a repetition record after one answer. Intervals are not
//! free-running: every computed interval snaps to a fixed ladder of
//! 1, 7, 16 or 35 days. The ease factor grows by 0.1 on success and
//! shrinks by 0.2 on failure, bounded to [1.3, 2.5].

use chrono::{DateTime, Duration, Utc};

use super::models::{RepetitionRecord, DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS};

/// Allowed review intervals in days, ascending.
pub const INTERVAL_LADDER: [i64; 4] = [1, 7, 16, 35];

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Maximum ease factor allowed
pub const MAX_EASE_FACTOR: f64 = 2.5;

const EASE_REWARD: f64 = 0.1;
const EASE_PENALTY: f64 = 0.2;

/// Compute the updated record for one answer.
///
/// Pure function of `(record, is_correct, now)`: no storage access and
/// no side effects, so replaying the same inputs yields the same output.
///
/// The very first review (no `last_reviewed_at`) always schedules one
/// day out with a reset ease factor, regardless of correctness. That
/// mirrors the original product behavior; an incorrect first answer
/// still flags the record and counts the mistake.
pub fn schedule(record: &RepetitionRecord, is_correct: bool, now: DateTime<Utc>) -> RepetitionRecord {
    let (interval_days, ease_factor) = if record.last_reviewed_at.is_none() {
        (DEFAULT_INTERVAL_DAYS, DEFAULT_EASE_FACTOR)
    } else if is_correct {
        let raw = (record.interval_days as f64 * record.ease_factor).round() as i64;
        let ease = (record.ease_factor + EASE_REWARD).min(MAX_EASE_FACTOR);
        (quantize_interval(raw), ease)
    } else {
        let raw = ((record.interval_days as f64) / 2.0).round() as i64;
        let ease = (record.ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR);
        (quantize_interval(raw.max(1)), ease)
    };

    let mut updated = record.clone();
    updated.interval_days = interval_days;
    updated.ease_factor = ease_factor;
    updated.last_reviewed_at = Some(now);
    updated.next_review_at = Some(now + Duration::days(interval_days));
    // A correct answer always clears the flag, whatever it was before.
    updated.needs_review = !is_correct;
    if !is_correct {
        updated.mistake_count += 1;
    }
    updated
}

/// Snap a raw interval to the nearest ladder rung. An exact tie
/// resolves to the smaller rung, which keeps the mapping deterministic.
pub fn quantize_interval(raw: i64) -> i64 {
    let mut best = INTERVAL_LADDER[0];
    for &rung in &INTERVAL_LADDER[1..] {
        if (raw - rung).abs() < (raw - best).abs() {
            best = rung;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(interval: i64, ease: f64) -> RepetitionRecord {
        let mut r = RepetitionRecord::fresh(1, "block-1", "lesson-1", "course-1");
        r.interval_days = interval;
        r.ease_factor = ease;
        r.last_reviewed_at = Some(Utc::now() - Duration::days(interval));
        r
    }

    #[test]
    fn test_first_review_ignores_correctness_for_interval() {
        let fresh = RepetitionRecord::fresh(1, "block-1", "lesson-1", "course-1");
        let now = Utc::now();

        for is_correct in [true, false] {
            let updated = schedule(&fresh, is_correct, now);
            assert_eq!(updated.interval_days, 1);
            assert_eq!(updated.ease_factor, 2.5);
            assert_eq!(updated.last_reviewed_at, Some(now));
            assert_eq!(updated.next_review_at, Some(now + Duration::days(1)));
        }
    }

    #[test]
    fn test_first_review_still_tracks_mistakes_and_flag() {
        let fresh = RepetitionRecord::fresh(1, "block-1", "lesson-1", "course-1");
        let now = Utc::now();

        let wrong = schedule(&fresh, false, now);
        assert!(wrong.needs_review);
        assert_eq!(wrong.mistake_count, 1);

        let right = schedule(&fresh, true, now);
        assert!(!right.needs_review);
        assert_eq!(right.mistake_count, 0);
    }

    #[test]
    fn test_correct_answer_grows_interval_along_ladder() {
        // 7 * 2.5 = 17.5 -> round 18 -> nearest rung is 16
        let updated = schedule(&record(7, 2.5), true, Utc::now());
        assert_eq!(updated.interval_days, 16);
        assert_eq!(updated.ease_factor, 2.5);
        assert!(!updated.needs_review);
    }

    #[test]
    fn test_incorrect_answer_shrinks_interval_and_ease() {
        // max(1, round(1 / 2)) = 1, ease 2.5 - 0.2 = 2.3
        let updated = schedule(&record(1, 2.5), false, Utc::now());
        assert_eq!(updated.interval_days, 1);
        assert!((updated.ease_factor - 2.3).abs() < 1e-9);
        assert!(updated.needs_review);
        assert_eq!(updated.mistake_count, 1);
    }

    #[test]
    fn test_incorrect_never_increases_interval() {
        for &interval in &INTERVAL_LADDER {
            for ease in [1.3, 1.7, 2.1, 2.5] {
                let updated = schedule(&record(interval, ease), false, Utc::now());
                assert!(updated.interval_days <= interval);
                assert!(updated.needs_review);
            }
        }
    }

    #[test]
    fn test_outputs_stay_in_bounds() {
        for &interval in &INTERVAL_LADDER {
            for ease in [1.3, 1.5, 1.9, 2.3, 2.5] {
                for is_correct in [true, false] {
                    let updated = schedule(&record(interval, ease), is_correct, Utc::now());
                    assert!(INTERVAL_LADDER.contains(&updated.interval_days));
                    assert!(updated.ease_factor >= MIN_EASE_FACTOR - 1e-9);
                    assert!(updated.ease_factor <= MAX_EASE_FACTOR + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_correct_clears_flag_set_by_earlier_failure() {
        let mut flagged = record(7, 2.0);
        flagged.needs_review = true;
        flagged.mistake_count = 3;

        let updated = schedule(&flagged, true, Utc::now());
        assert!(!updated.needs_review);
        assert_eq!(updated.mistake_count, 3);
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let r = record(16, 1.9);
        let now = Utc::now();
        assert_eq!(schedule(&r, true, now), schedule(&r, true, now));
        assert_eq!(schedule(&r, false, now), schedule(&r, false, now));
    }

    #[test]
    fn test_quantize_prefers_smaller_rung_on_tie() {
        // 4 is equidistant from 1 and 7
        assert_eq!(quantize_interval(4), 1);
        assert_eq!(quantize_interval(5), 7);
        assert_eq!(quantize_interval(11), 7);
        assert_eq!(quantize_interval(12), 16);
        assert_eq!(quantize_interval(18), 16);
        assert_eq!(quantize_interval(26), 35);
        assert_eq!(quantize_interval(500), 35);
        assert_eq!(quantize_interval(1), 1);
    }
}
