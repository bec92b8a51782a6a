//! Achievements: catalog, per-user unlock state and the evaluator that
//! runs after each completion event.

pub mod evaluator;
pub mod models;
pub mod storage;

pub use evaluator::evaluate;
pub use models::{Achievement, AchievementView, UserAchievement};
pub use storage::AchievementStorage;
