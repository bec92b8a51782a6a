//! Course catalog: categories, courses, lessons and content blocks.
//!
//! The catalog is read-only from the training core's point of view;
//! blocks are the items the card selector hands out.

pub mod models;
pub mod storage;

pub use models::{Block, BlockKind, Category, Course, Lesson};
pub use storage::CatalogStorage;
