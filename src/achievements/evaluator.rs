//! Achievement evaluator.
//!
//! Runs after each completion event (a submitted answer or a completed
//! block/lesson). Reads progress and repetition counts, writes unlock
//! flags. Fire-and-forget from the caller's point of view: the training
//! core never consumes its result, and its failure must not fail the
//! request that triggered it.

use chrono::{DateTime, Utc};

use crate::db::Result;
use crate::progress::ProgressStorage;
use crate::training::RepetitionStorage;
use crate::users::UserStorage;

use super::storage::AchievementStorage;

/// Evaluate all achievements for a learner, persisting progress and
/// unlocking any whose condition now holds. Returns the ids unlocked by
/// this call.
pub fn evaluate(
    achievements: &AchievementStorage,
    users: &UserStorage,
    progress: &ProgressStorage,
    repetition: &RepetitionStorage,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let user = users.get_by_id(user_id)?;
    let mut unlocked = Vec::new();

    for achievement in achievements.list_achievements()? {
        let existing = achievements.get_user_achievement(user_id, &achievement.id)?;
        if existing.as_ref().is_some_and(|ua| ua.unlocked_at.is_some()) {
            continue;
        }

        let (current, should_unlock) = match achievement.id.as_str() {
            "first_step" => {
                let completed = progress.count_blocks(user_id)?;
                (completed.min(1), completed > 0)
            }
            "seven_days" => (user.streak, user.streak >= 7),
            "persistence" => (user.streak, user.streak >= 30),
            "hundred_cards" => {
                let reviewed = repetition.count_records(user_id)?;
                (reviewed, reviewed >= 100)
            }
            "excellent" => {
                let accuracy = clean_record_share(repetition, user_id)?;
                (accuracy, accuracy >= 90)
            }
            "perfect" => {
                let accuracy = clean_record_share(repetition, user_id)?;
                (accuracy, accuracy >= 100)
            }
            "fast_start" => {
                let lessons = progress.count_distinct_lessons(user_id)?;
                (lessons, lessons >= 5)
            }
            "all_courses" => {
                let mine = progress.count_distinct_courses(user_id)?;
                let total = progress.count_courses_touched()?;
                (mine, total > 0 && mine >= total)
            }
            other => {
                log::debug!("no evaluator for achievement {other}, skipping");
                continue;
            }
        };

        let unlocked_at = should_unlock.then_some(now);
        achievements.upsert_user_achievement(user_id, &achievement.id, current, unlocked_at)?;

        if should_unlock {
            log::info!("user {user_id} unlocked achievement {}", achievement.id);
            unlocked.push(achievement.id);
        }
    }

    Ok(unlocked)
}

/// Percentage of the learner's repetition records with zero mistakes.
/// Zero records count as zero percent, so empty histories unlock nothing.
fn clean_record_share(repetition: &RepetitionStorage, user_id: i64) -> Result<i64> {
    let total = repetition.count_records(user_id)?;
    if total == 0 {
        return Ok(0);
    }
    let clean = repetition.count_clean_records(user_id)?;
    Ok(clean * 100 / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::storage::tests::seed_catalog;
    use crate::db::Db;
    use crate::training::submit_answer;
    use crate::users::storage::tests::seed_user;
    use crate::users::UserUpdate;

    struct Fixture {
        achievements: AchievementStorage,
        users: UserStorage,
        progress: ProgressStorage,
        repetition: RepetitionStorage,
        user: i64,
    }

    fn fixture(blocks: usize) -> Fixture {
        let db = Db::open_in_memory().unwrap();
        seed_catalog(&db, blocks);
        let user = seed_user(&db);
        let achievements = AchievementStorage::new(db.clone());
        achievements.ensure_catalog().unwrap();
        Fixture {
            achievements,
            users: UserStorage::new(db.clone()),
            progress: ProgressStorage::new(db.clone()),
            repetition: RepetitionStorage::new(db),
            user,
        }
    }

    fn run(f: &Fixture) -> Vec<String> {
        evaluate(
            &f.achievements,
            &f.users,
            &f.progress,
            &f.repetition,
            f.user,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_nothing_unlocks_for_a_new_user() {
        let f = fixture(1);
        assert!(run(&f).is_empty());
    }

    #[test]
    fn test_first_block_unlocks_first_step_and_all_courses() {
        let f = fixture(1);
        f.progress
            .mark_block(f.user, "block-0", "lesson-1", "course-1", Utc::now())
            .unwrap();

        let mut unlocked = run(&f);
        unlocked.sort();
        // The learner has now touched every course anyone has touched.
        assert_eq!(unlocked, vec!["all_courses", "first_step"]);

        // Second run does not unlock again.
        assert!(run(&f).is_empty());

        let ua = f
            .achievements
            .get_user_achievement(f.user, "first_step")
            .unwrap()
            .unwrap();
        assert!(ua.unlocked_at.is_some());
        assert_eq!(ua.progress, 1);
    }

    #[test]
    fn test_streak_achievements_follow_profile() {
        let f = fixture(1);
        f.users
            .update_user(
                f.user,
                &UserUpdate {
                    streak: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(run(&f), vec!["seven_days"]);

        f.users
            .update_user(
                f.user,
                &UserUpdate {
                    streak: Some(30),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(run(&f), vec!["persistence"]);
    }

    #[test]
    fn test_accuracy_achievements_use_clean_record_share() {
        let f = fixture(3);
        let now = Utc::now();
        submit_answer(&f.repetition, f.user, "block-0", "lesson-1", "course-1", true, now)
            .unwrap();
        submit_answer(&f.repetition, f.user, "block-1", "lesson-1", "course-1", true, now)
            .unwrap();

        let unlocked = run(&f);
        assert!(unlocked.contains(&"excellent".to_string()));
        assert!(unlocked.contains(&"perfect".to_string()));

        // A mistake on a third card drops the share to 66%; nothing new
        // unlocks and previous unlocks stay.
        submit_answer(&f.repetition, f.user, "block-2", "lesson-1", "course-1", false, now)
            .unwrap();
        assert!(run(&f).is_empty());
        let ua = f
            .achievements
            .get_user_achievement(f.user, "perfect")
            .unwrap()
            .unwrap();
        assert!(ua.unlocked_at.is_some());
    }
}
