// ==========================================
// Pharmaflow - quality-control repositories
// ==========================================
// Questions and options are manager configuration; forms and answers are
// worker submissions. A form stores one answer per question.
// ==========================================

use crate::domain::quality::{
    QcAnswer, QcConfig, QcForm, QcOption, QcQuestion, QcQuestionWithOptions,
};
use crate::domain::types::QcFieldKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{decimal_from_db, enum_from_db};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// QcQuestionRepository
// ==========================================
struct QuestionRow {
    question_id: String,
    prompt: String,
    field_kind: String,
    description: String,
    position: i32,
    required: bool,
    active: bool,
    created_at: NaiveDateTime,
}

fn question_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<QuestionRow> {
    Ok(QuestionRow {
        question_id: row.get(0)?,
        prompt: row.get(1)?,
        field_kind: row.get(2)?,
        description: row.get(3)?,
        position: row.get(4)?,
        required: row.get::<_, i32>(5)? != 0,
        active: row.get::<_, i32>(6)? != 0,
        created_at: row.get(7)?,
    })
}

fn question_from_raw(raw: QuestionRow) -> RepositoryResult<QcQuestion> {
    Ok(QcQuestion {
        question_id: raw.question_id,
        prompt: raw.prompt,
        field_kind: enum_from_db("field_kind", &raw.field_kind, QcFieldKind::parse)?,
        description: raw.description,
        position: raw.position,
        required: raw.required,
        active: raw.active,
        created_at: raw.created_at,
    })
}

const QUESTION_COLUMNS: &str =
    "question_id, prompt, field_kind, description, position, required, active, created_at";

pub struct QcQuestionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QcQuestionRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_tables()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_tables()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS qc_question (
              question_id TEXT PRIMARY KEY,
              prompt TEXT NOT NULL,
              field_kind TEXT NOT NULL,
              description TEXT NOT NULL DEFAULT '',
              position INTEGER NOT NULL DEFAULT 0,
              required INTEGER NOT NULL DEFAULT 1,
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS qc_option (
              option_id TEXT PRIMARY KEY,
              question_id TEXT NOT NULL REFERENCES qc_question(question_id),
              label TEXT NOT NULL,
              position INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_qc_option_question ON qc_option(question_id);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, question: &QcQuestion) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO qc_question (question_id, prompt, field_kind, description, position, \
             required, active, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                question.question_id,
                question.prompt,
                question.field_kind.as_str(),
                question.description,
                question.position,
                question.required as i32,
                question.active as i32,
                question.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn insert_option(&self, option: &QcOption) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO qc_option (option_id, question_id, label, position) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                option.option_id,
                option.question_id,
                option.label,
                option.position,
            ],
        )?;
        Ok(())
    }

    /// Active questions with their options, in display order.
    pub fn list_active(&self) -> RepositoryResult<Vec<QcQuestionWithOptions>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUESTION_COLUMNS} FROM qc_question \
             WHERE active = 1 ORDER BY position ASC, created_at ASC"
        ))?;
        let raws = stmt
            .query_map([], question_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut opt_stmt = conn.prepare(
            "SELECT option_id, question_id, label, position FROM qc_option \
             WHERE question_id = ?1 ORDER BY position ASC",
        )?;

        let mut result = Vec::with_capacity(raws.len());
        for raw in raws {
            let options = opt_stmt
                .query_map(params![raw.question_id], |row| {
                    Ok(QcOption {
                        option_id: row.get(0)?,
                        question_id: row.get(1)?,
                        label: row.get(2)?,
                        position: row.get(3)?,
                    })
                })?
                .collect::<SqliteResult<Vec<_>>>()?;
            result.push(QcQuestionWithOptions {
                question: question_from_raw(raw)?,
                options,
            });
        }
        Ok(result)
    }

    pub fn find_by_id(&self, question_id: &str) -> RepositoryResult<Option<QcQuestion>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {QUESTION_COLUMNS} FROM qc_question WHERE question_id = ?1"),
                params![question_id],
                question_from_row,
            )
            .optional()?;
        raw.map(question_from_raw).transpose()
    }
}

// ==========================================
// QcFormRepository
// ==========================================
struct FormRow {
    form_id: String,
    worker_id: String,
    item_name: String,
    item_code: String,
    points: String,
    submitted_at: NaiveDateTime,
    order_id: Option<String>,
}

fn form_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<FormRow> {
    Ok(FormRow {
        form_id: row.get(0)?,
        worker_id: row.get(1)?,
        item_name: row.get(2)?,
        item_code: row.get(3)?,
        points: row.get(4)?,
        submitted_at: row.get(5)?,
        order_id: row.get(6)?,
    })
}

fn form_from_raw(raw: FormRow) -> RepositoryResult<QcForm> {
    Ok(QcForm {
        form_id: raw.form_id,
        worker_id: raw.worker_id,
        item_name: raw.item_name,
        item_code: raw.item_code,
        points: decimal_from_db("points", &raw.points)?,
        submitted_at: raw.submitted_at,
        order_id: raw.order_id,
    })
}

const FORM_COLUMNS: &str =
    "form_id, worker_id, item_name, item_code, points, submitted_at, order_id";

pub struct QcFormRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QcFormRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_tables()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_tables()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS qc_form (
              form_id TEXT PRIMARY KEY,
              worker_id TEXT NOT NULL REFERENCES worker(worker_id),
              item_name TEXT NOT NULL,
              item_code TEXT NOT NULL DEFAULT '',
              points TEXT NOT NULL DEFAULT '0',
              submitted_at TEXT NOT NULL,
              order_id TEXT REFERENCES work_order(order_id)
            );

            CREATE TABLE IF NOT EXISTS qc_answer (
              answer_id TEXT PRIMARY KEY,
              form_id TEXT NOT NULL REFERENCES qc_form(form_id),
              question_id TEXT NOT NULL REFERENCES qc_question(question_id),
              answer_text TEXT NOT NULL DEFAULT '',
              option_id TEXT REFERENCES qc_option(option_id),
              UNIQUE(form_id, question_id)
            );

            CREATE INDEX IF NOT EXISTS idx_qc_form_worker ON qc_form(worker_id, submitted_at);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, form: &QcForm) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO qc_form (form_id, worker_id, item_name, item_code, points, \
             submitted_at, order_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                form.form_id,
                form.worker_id,
                form.item_name,
                form.item_code,
                form.points.to_string(),
                form.submitted_at,
                form.order_id,
            ],
        )?;
        Ok(())
    }

    pub fn insert_answer(&self, answer: &QcAnswer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO qc_answer (answer_id, form_id, question_id, answer_text, option_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                answer.answer_id,
                answer.form_id,
                answer.question_id,
                answer.answer_text,
                answer.option_id,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, form_id: &str) -> RepositoryResult<Option<QcForm>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {FORM_COLUMNS} FROM qc_form WHERE form_id = ?1"),
                params![form_id],
                form_from_row,
            )
            .optional()?;
        raw.map(form_from_raw).transpose()
    }

    pub fn list_for_worker(&self, worker_id: &str) -> RepositoryResult<Vec<QcForm>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FORM_COLUMNS} FROM qc_form \
             WHERE worker_id = ?1 ORDER BY submitted_at DESC"
        ))?;
        let raws = stmt
            .query_map(params![worker_id], form_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(form_from_raw).collect()
    }

    pub fn list_answers(&self, form_id: &str) -> RepositoryResult<Vec<QcAnswer>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT answer_id, form_id, question_id, answer_text, option_id FROM qc_answer \
             WHERE form_id = ?1",
        )?;
        let answers = stmt
            .query_map(params![form_id], |row| {
                Ok(QcAnswer {
                    answer_id: row.get(0)?,
                    form_id: row.get(1)?,
                    question_id: row.get(2)?,
                    answer_text: row.get(3)?,
                    option_id: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(answers)
    }
}

// ==========================================
// QcConfigRepository
// ==========================================
pub struct QcConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QcConfigRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_tables()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_tables()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS qc_config (
              config_id TEXT PRIMARY KEY,
              points_per_form TEXT NOT NULL DEFAULT '0',
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, config: &QcConfig) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO qc_config (config_id, points_per_form, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                config.config_id,
                config.points_per_form.to_string(),
                config.active as i32,
                config.created_at,
                config.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Newest active config; None means form submissions earn no points.
    pub fn active(&self) -> RepositoryResult<Option<QcConfig>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                "SELECT config_id, points_per_form, active, created_at, updated_at \
                 FROM qc_config WHERE active = 1 ORDER BY created_at DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i32>(2)?,
                        row.get::<_, NaiveDateTime>(3)?,
                        row.get::<_, NaiveDateTime>(4)?,
                    ))
                },
            )
            .optional()?;
        match raw {
            Some((config_id, points_per_form, active, created_at, updated_at)) => {
                Ok(Some(QcConfig {
                    config_id,
                    points_per_form: decimal_from_db("points_per_form", &points_per_form)?,
                    active: active != 0,
                    created_at,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }
}
