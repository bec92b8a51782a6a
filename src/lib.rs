//! Learnify: learning platform backend.
//!
//! Courses, lessons and practice blocks over HTTP, with a spaced
//! repetition training loop at the center. The `training` module holds
//! the scheduling core; everything else is bookkeeping around the
//! SQLite store.

pub mod achievements;
pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod progress;
pub mod training;
pub mod users;
