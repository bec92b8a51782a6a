//! Storage operations for the course catalog

use rusqlite::{params, Connection, Row};

use crate::db::{string_list_from_sql, string_list_to_sql, Db, Result, StorageError};

use super::models::{Block, BlockKind, Category, Course, Lesson};

/// Read side of the catalog collaborator. The insert operations exist for
/// seeding and fixtures; nothing in the request path mutates the catalog.
#[derive(Clone)]
pub struct CatalogStorage {
    db: Db,
}

impl CatalogStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    // ==================== Categories ====================

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, icon FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                icon: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn insert_category(&self, category: &Category) -> Result<()> {
        self.db.with_retry("insert category", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO categories (id, name, icon) VALUES (?1, ?2, ?3)",
                params![category.id, category.name, category.icon],
            )
        })?;
        Ok(())
    }

    // ==================== Courses ====================

    pub fn list_courses(&self, category_id: Option<&str>) -> Result<Vec<Course>> {
        let conn = self.db.lock()?;
        let mut courses = Vec::new();

        match category_id {
            Some(category) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COURSE_COLUMNS} FROM courses WHERE category_id = ?1 ORDER BY course_id"
                ))?;
                let rows = stmt.query_map(params![category], row_to_course)?;
                for course in rows {
                    courses.push(course?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COURSE_COLUMNS} FROM courses ORDER BY course_id"
                ))?;
                let rows = stmt.query_map([], row_to_course)?;
                for course in rows {
                    courses.push(course?);
                }
            }
        }

        Ok(courses)
    }

    pub fn get_course(&self, course_id: &str) -> Result<Course> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = ?1"),
            params![course_id],
            row_to_course,
        )
        .map_err(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::NotFound("course", course_id.to_string())
            }
            other => other.into(),
        })
    }

    pub fn insert_course(&self, course: &Course) -> Result<()> {
        let tags = string_list_to_sql(&course.tags)?;
        self.db.with_retry("insert course", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO courses (course_id, title, category_id, subcategory,
                     level, difficulty_score, total_lessons, total_practice_tasks, tags, author,
                     status, language, short_description, full_description, cover_image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    course.course_id,
                    course.title,
                    course.category_id,
                    course.subcategory,
                    course.level,
                    course.difficulty_score,
                    course.total_lessons,
                    course.total_practice_tasks,
                    tags,
                    course.author,
                    course.status,
                    course.language,
                    course.short_description,
                    course.full_description,
                    course.cover_image_url,
                ],
            )
        })?;
        Ok(())
    }

    // ==================== Lessons ====================

    pub fn list_course_lessons(&self, course_id: &str) -> Result<Vec<Lesson>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, course_id, position, title, description
             FROM lessons WHERE course_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![course_id], row_to_lesson)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_lesson(&self, lesson_id: &str) -> Result<Lesson> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, course_id, position, title, description FROM lessons WHERE id = ?1",
            params![lesson_id],
            row_to_lesson,
        )
        .map_err(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::NotFound("lesson", lesson_id.to_string())
            }
            other => other.into(),
        })
    }

    pub fn insert_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.db.with_retry("insert lesson", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO lessons (id, course_id, position, title, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    lesson.id,
                    lesson.course_id,
                    lesson.position,
                    lesson.title,
                    lesson.description,
                ],
            )
        })?;
        Ok(())
    }

    // ==================== Blocks ====================

    /// Ordered blocks of one lesson.
    pub fn list_blocks_by_lesson(&self, lesson_id: &str) -> Result<Vec<Block>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM blocks WHERE lesson_id = ?1 ORDER BY position"
        ))?;
        let rows = stmt.query_map(params![lesson_id], row_to_block)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_block(&self, block_id: &str) -> Result<Block> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE id = ?1"),
            params![block_id],
            row_to_block,
        )
        .map_err(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::NotFound("block", block_id.to_string())
            }
            other => other.into(),
        })
    }

    /// Every block id in catalog order. Feeds the fresh tier of the
    /// card selector.
    pub fn list_block_ids(&self) -> Result<Vec<String>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM blocks ORDER BY lesson_id, position")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn insert_block(&self, block: &Block) -> Result<()> {
        let options = block
            .options
            .as_deref()
            .map(string_list_to_sql)
            .transpose()?;
        let hints = string_list_to_sql(&block.hints)?;

        self.db.with_retry("insert block", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO blocks (id, lesson_id, kind, subtype, position, title,
                     content, question, options, hints, correct_answer, explanation,
                     sample_answer, answer, visualization_hint)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    block.id,
                    block.lesson_id,
                    block.kind.as_str(),
                    block.subtype,
                    block.position,
                    block.title,
                    block.content,
                    block.question,
                    options,
                    hints,
                    block.correct_answer,
                    block.explanation,
                    block.sample_answer,
                    block.answer,
                    block.visualization_hint,
                ],
            )
        })?;
        Ok(())
    }

    /// Enroll a user into a course. Returns false if already enrolled.
    pub fn enroll(&self, user_id: i64, course_id: &str, enrolled_at: &str) -> Result<bool> {
        // Existence check keeps a clean 404 for unknown courses.
        self.get_course(course_id)?;

        let inserted = self.db.with_retry("enroll course", |conn: &Connection| {
            conn.execute(
                "INSERT OR IGNORE INTO user_courses (user_id, course_id, enrolled_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, course_id, enrolled_at],
            )
        })?;
        Ok(inserted > 0)
    }
}

const COURSE_COLUMNS: &str = "course_id, title, category_id, subcategory, level, \
    difficulty_score, total_lessons, total_practice_tasks, tags, author, status, language, \
    short_description, full_description, cover_image_url";

const BLOCK_COLUMNS: &str = "id, lesson_id, kind, subtype, position, title, content, question, \
    options, hints, correct_answer, explanation, sample_answer, answer, visualization_hint";

fn row_to_course(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        course_id: row.get(0)?,
        title: row.get(1)?,
        category_id: row.get(2)?,
        subcategory: row.get(3)?,
        level: row.get(4)?,
        difficulty_score: row.get(5)?,
        total_lessons: row.get(6)?,
        total_practice_tasks: row.get(7)?,
        tags: string_list_from_sql(8, row.get(8)?)?,
        author: row.get(9)?,
        status: row.get(10)?,
        language: row.get(11)?,
        short_description: row.get(12)?,
        full_description: row.get(13)?,
        cover_image_url: row.get(14)?,
    })
}

fn row_to_lesson(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        id: row.get(0)?,
        course_id: row.get(1)?,
        position: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
    })
}

fn row_to_block(row: &Row<'_>) -> rusqlite::Result<Block> {
    let kind: String = row.get(2)?;
    let kind = BlockKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown block kind: {kind}").into(),
        )
    })?;

    Ok(Block {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        kind,
        subtype: row.get(3)?,
        position: row.get(4)?,
        title: row.get(5)?,
        content: row.get(6)?,
        question: row.get(7)?,
        options: match row.get::<_, Option<String>>(8)? {
            Some(raw) => Some(string_list_from_sql(8, Some(raw))?),
            None => None,
        },
        hints: string_list_from_sql(9, row.get(9)?)?,
        correct_answer: row.get(10)?,
        explanation: row.get(11)?,
        sample_answer: row.get(12)?,
        answer: row.get(13)?,
        visualization_hint: row.get(14)?,
    })
}
