//! Spaced repetition training loop.
//!
//! Two cooperating pieces: the card selector picks which blocks a
//! learner should see next, and the review scheduler recomputes a
//! repetition record after each answer. Both are pure functions of
//! their inputs; persistence lives in `storage`.

pub mod models;
pub mod scheduler;
pub mod selector;
pub mod storage;

pub use models::RepetitionRecord;
pub use scheduler::schedule;
pub use selector::select_cards;
pub use storage::RepetitionStorage;

use chrono::{DateTime, Utc};

use crate::catalog::{Block, CatalogStorage};
use crate::db::Result;

/// Default size of one training batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Build a training batch for a learner: snapshot the learner's
/// repetition records and the catalog once, classify into tiers, then
/// hydrate the chosen ids into full blocks.
pub fn training_cards(
    repetition: &RepetitionStorage,
    catalog: &CatalogStorage,
    user_id: i64,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Block>> {
    let records = repetition.list_records(user_id)?;
    let catalog_ids = catalog.list_block_ids()?;

    let selected = select_cards(&records, &catalog_ids, now, limit);

    let mut blocks = Vec::with_capacity(selected.len());
    for id in &selected {
        blocks.push(catalog.get_block(id)?);
    }
    Ok(blocks)
}

/// Apply one answer: load (or default) the learner's record for the
/// block, run the scheduler, and persist through the transactional
/// upsert. Returns the updated record.
pub fn submit_answer(
    repetition: &RepetitionStorage,
    user_id: i64,
    block_id: &str,
    lesson_id: &str,
    course_id: &str,
    is_correct: bool,
    now: DateTime<Utc>,
) -> Result<RepetitionRecord> {
    let record = repetition
        .get_record(user_id, block_id)?
        .unwrap_or_else(|| RepetitionRecord::fresh(user_id, block_id, lesson_id, course_id));

    let updated = schedule(&record, is_correct, now);
    repetition.upsert_record(&updated)
}
