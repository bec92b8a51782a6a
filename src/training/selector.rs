//! Card selector.
//!
//! Builds one training batch from a single pass over the learner's
//! repetition records plus the catalog, partitioned into three tiers:
//!
//! 1. flagged records (`needs_review`), capped at 5
//! 2. due records (`next_review_at <= now`), capped at 5
//! 3. fresh blocks with no record yet, filling the remaining capacity
//!
//! Tiers concatenate in that order and the result truncates to `limit`.
//! A batch shorter than `limit` just means the learner is out of due
//! material.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::models::RepetitionRecord;

/// Per-batch cap on flagged cards.
const FLAGGED_CAP: usize = 5;

/// Per-batch cap on due cards.
const DUE_CAP: usize = 5;

/// Fresh cards are offered even when the flagged and due tiers already
/// fill the batch budget.
const FRESH_FLOOR: usize = 2;

/// Select up to `limit` block ids for one training batch.
///
/// `records` is the learner's full repetition set, `catalog_ids` every
/// block id in catalog order. Deterministic for a fixed snapshot and
/// instant: flagged and due tiers order by ascending record id, the
/// fresh tier follows catalog order.
pub fn select_cards(
    records: &[RepetitionRecord],
    catalog_ids: &[String],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<String> {
    let mut by_id: Vec<&RepetitionRecord> = records.iter().collect();
    by_id.sort_by_key(|r| r.id);

    // Every block the learner has a record for, whether or not it gets
    // picked. The fresh tier must exclude all of these.
    let seen: HashSet<&str> = records.iter().map(|r| r.block_id.as_str()).collect();

    let mut selected: Vec<String> = Vec::with_capacity(limit);
    let mut chosen: HashSet<&str> = HashSet::new();

    // Tier 1: flagged for review.
    for record in by_id.iter().filter(|r| r.needs_review).take(FLAGGED_CAP) {
        if chosen.insert(record.block_id.as_str()) {
            selected.push(record.block_id.clone());
        }
    }

    // Tier 2: review time reached, not flagged.
    let mut due_taken = 0;
    for record in by_id.iter().filter(|r| r.is_due(now)) {
        if due_taken == DUE_CAP {
            break;
        }
        if chosen.insert(record.block_id.as_str()) {
            selected.push(record.block_id.clone());
            due_taken += 1;
        }
    }

    // Tier 3: never-seen blocks backfill the batch up to `limit`, with a
    // small floor so new material still appears when review work alone
    // would fill the budget.
    let fresh_cap = FRESH_FLOOR.max(limit.saturating_sub(selected.len()));
    let mut fresh_taken = 0;
    for id in catalog_ids {
        if fresh_taken == fresh_cap {
            break;
        }
        if seen.contains(id.as_str()) || chosen.contains(id.as_str()) {
            continue;
        }
        chosen.insert(id.as_str());
        selected.push(id.clone());
        fresh_taken += 1;
    }

    selected.truncate(limit);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: i64, block_id: &str, needs_review: bool, due: Option<i64>) -> RepetitionRecord {
        let now = Utc::now();
        let mut r = RepetitionRecord::fresh(1, block_id, "lesson-1", "course-1");
        r.id = id;
        r.needs_review = needs_review;
        r.last_reviewed_at = Some(now - Duration::days(7));
        r.next_review_at = due.map(|days| now + Duration::days(days));
        r
    }

    fn catalog(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("fresh-{i}")).collect()
    }

    #[test]
    fn test_flagged_then_due_then_fresh_fills_limit() {
        let now = Utc::now();
        let mut records = vec![
            record(1, "flag-a", true, None),
            record(2, "flag-b", true, None),
            record(3, "flag-c", true, None),
            record(4, "due-a", false, Some(-1)),
            record(5, "due-b", false, Some(-2)),
        ];
        // Not-yet-due records must not appear anywhere.
        records.push(record(6, "later", false, Some(3)));

        let mut ids = catalog(10);
        ids.extend(records.iter().map(|r| r.block_id.clone()));

        let selected = select_cards(&records, &ids, now, 10);

        assert_eq!(selected.len(), 10);
        assert_eq!(&selected[..3], &["flag-a", "flag-b", "flag-c"]);
        assert_eq!(&selected[3..5], &["due-a", "due-b"]);
        assert_eq!(
            &selected[5..],
            &["fresh-0", "fresh-1", "fresh-2", "fresh-3", "fresh-4"]
        );
    }

    #[test]
    fn test_single_fresh_item_yields_short_batch() {
        let selected = select_cards(&[], &catalog(1), Utc::now(), 10);
        assert_eq!(selected, vec!["fresh-0"]);
    }

    #[test]
    fn test_tier_caps_apply() {
        let now = Utc::now();
        let mut records = Vec::new();
        for i in 0..8 {
            records.push(record(i, &format!("flag-{i}"), true, None));
        }
        for i in 0..8 {
            records.push(record(100 + i, &format!("due-{i}"), false, Some(-1)));
        }

        let selected = select_cards(&records, &catalog(4), now, 20);

        let flagged: Vec<_> = selected.iter().filter(|id| id.starts_with("flag-")).collect();
        let due: Vec<_> = selected.iter().filter(|id| id.starts_with("due-")).collect();
        assert_eq!(flagged.len(), 5);
        assert_eq!(due.len(), 5);
        // Flagged and due tiers keep ascending record-id order.
        assert_eq!(&selected[..2], &["flag-0", "flag-1"]);
        assert_eq!(selected[5], "due-0");
    }

    #[test]
    fn test_fresh_floor_survives_a_full_review_load_then_truncates() {
        let now = Utc::now();
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(record(i, &format!("flag-{i}"), true, None));
        }
        for i in 0..5 {
            records.push(record(100 + i, &format!("due-{i}"), false, Some(-1)));
        }

        // 5 flagged + 5 due already hit limit 10; the two floor fresh
        // cards are cut by the final truncation.
        let selected = select_cards(&records, &catalog(10), now, 10);
        assert_eq!(selected.len(), 10);
        assert!(selected.iter().all(|id| !id.starts_with("fresh-")));

        // With a larger budget the floor keeps fresh material at 2.
        let selected = select_cards(&records, &catalog(10), now, 12);
        assert_eq!(selected.len(), 12);
        assert_eq!(&selected[10..], &["fresh-0", "fresh-1"]);
    }

    #[test]
    fn test_blocks_with_records_never_reach_fresh_tier() {
        let now = Utc::now();
        // A record that is neither flagged nor due: its block is "seen"
        // and must not come back through the fresh tier.
        let records = vec![record(1, "fresh-0", false, Some(5))];

        let selected = select_cards(&records, &catalog(3), now, 10);
        assert_eq!(selected, vec!["fresh-1", "fresh-2"]);
    }

    #[test]
    fn test_same_snapshot_same_batch() {
        let now = Utc::now();
        let records = vec![
            record(2, "flag-b", true, None),
            record(1, "flag-a", true, None),
            record(3, "due-a", false, Some(-1)),
        ];
        let ids = catalog(5);

        let first = select_cards(&records, &ids, now, 10);
        let second = select_cards(&records, &ids, now, 10);
        assert_eq!(first, second);
        // Ordering follows record id, not slice order.
        assert_eq!(&first[..2], &["flag-a", "flag-b"]);
    }
}
