use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use uuid::Uuid;
use chrono::Utc;
use log::{info, error};

use super::{QuizStore, StoreError, Result};
use super::models::*;
use crate::editions::Edition;

/// Postgres-backed store. Row-level security on the server decides which
/// answer and completion rows a connection may see, so the queries here
/// never filter by counterpart identity themselves.
#[derive(Debug)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub async fn new() -> Result<Self> {
        let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()).parse().unwrap_or(5432);
        let dbname = std::env::var("DB_NAME").unwrap_or_else(|_| "pairquiz_db".to_string());
        let user = std::env::var("DB_USER").unwrap_or_else(|_| "pairquiz_user".to_string());
        let password = std::env::var("DB_PASSWORD").unwrap_or_else(|_| "".to_string());

        let database_url = format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, dbname);

        info!("Connecting to database: {}@{}:{}/{}", user, host, port, dbname);

        let mut cfg = Config::new();
        cfg.url = Some(database_url);
        cfg.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::ConnectionFailed(format!("Pool creation failed: {}", e)))?;

        // Test connection
        let _client = pool.get().await
            .map_err(|e| StoreError::ConnectionFailed(format!("Connection test failed: {}", e)))?;

        info!("Database connection established successfully");

        Ok(PostgresStore { pool })
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))
    }

    fn question_from_row(row: &tokio_postgres::Row) -> Result<Question> {
        let edition_tag: String = row.get(1);
        let edition = Edition::parse(&edition_tag)
            .ok_or_else(|| StoreError::QueryFailed(format!("Unknown edition tag: {}", edition_tag)))?;
        Ok(Question {
            id: row.get(0),
            edition,
            order_num: row.get(2),
            intensity: row.get(3),
            intensity_emoji: row.get(4),
            title: row.get(5),
            scenario: row.get(6),
        })
    }
}

#[async_trait]
impl QuizStore for PostgresStore {
    async fn questions_for_edition(&self, edition: Edition) -> Result<Vec<Question>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT id, edition, order_num, intensity, intensity_emoji, title, scenario
                FROM questions
                WHERE edition = $1
                ORDER BY order_num
                "#,
                &[&edition.as_str()],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch questions for edition {}: {}", edition.as_str(), e);
                StoreError::QueryFailed(format!("Failed to fetch questions: {}", e))
            })?;

        rows.iter().map(Self::question_from_row).collect()
    }

    async fn all_questions(&self) -> Result<Vec<Question>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT id, edition, order_num, intensity, intensity_emoji, title, scenario
                FROM questions
                ORDER BY order_num
                "#,
                &[],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch questions: {}", e);
                StoreError::QueryFailed(format!("Failed to fetch questions: {}", e))
            })?;

        rows.iter().map(Self::question_from_row).collect()
    }

    async fn all_options(&self) -> Result<Vec<QuestionOption>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT id, question_id, label, option_text, is_other, order_num
                FROM question_options
                ORDER BY question_id, order_num
                "#,
                &[],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch question options: {}", e);
                StoreError::QueryFailed(format!("Failed to fetch options: {}", e))
            })?;

        Ok(rows
            .iter()
            .map(|row| QuestionOption {
                id: row.get(0),
                question_id: row.get(1),
                label: row.get(2),
                option_text: row.get(3),
                is_other: row.get(4),
                order_num: row.get(5),
            })
            .collect())
    }

    async fn answers_for_user(&self, user_id: Uuid) -> Result<Vec<AnswerRow>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT user_id, question_id, selected_option_id, other_text
                FROM answers
                WHERE user_id = $1
                "#,
                &[&user_id],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch answers for user {}: {}", user_id, e);
                StoreError::QueryFailed(format!("Failed to fetch answers: {}", e))
            })?;

        Ok(rows
            .iter()
            .map(|row| AnswerRow {
                user_id: row.get(0),
                question_id: row.get(1),
                selected_option_id: row.get(2),
                other_text: row.get(3),
            })
            .collect())
    }

    async fn visible_answers(&self) -> Result<Vec<AnswerRow>> {
        let client = self.client().await?;

        // RLS decides whose rows come back, so no user filter here.
        let rows = client
            .query(
                r#"
                SELECT user_id, question_id, selected_option_id, other_text
                FROM answers
                "#,
                &[],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch visible answers: {}", e);
                StoreError::QueryFailed(format!("Failed to fetch answers: {}", e))
            })?;

        Ok(rows
            .iter()
            .map(|row| AnswerRow {
                user_id: row.get(0),
                question_id: row.get(1),
                selected_option_id: row.get(2),
                other_text: row.get(3),
            })
            .collect())
    }

    async fn upsert_answer(&self, answer: &AnswerRow) -> Result<()> {
        let client = self.client().await?;

        client
            .execute(
                r#"
                INSERT INTO answers (user_id, question_id, selected_option_id, other_text)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, question_id)
                DO UPDATE SET selected_option_id = EXCLUDED.selected_option_id,
                              other_text = EXCLUDED.other_text
                "#,
                &[
                    &answer.user_id,
                    &answer.question_id,
                    &answer.selected_option_id,
                    &answer.other_text,
                ],
            )
            .await
            .map_err(|e| {
                error!("Failed to upsert answer for question {}: {}", answer.question_id, e);
                StoreError::WriteFailed(format!("Failed to save answer: {}", e))
            })?;

        Ok(())
    }

    async fn completion_for_user(&self, user_id: Uuid) -> Result<Option<CompletionRow>> {
        let client = self.client().await?;

        let row = client
            .query_opt(
                r#"
                SELECT user_id, completed_at
                FROM completion_status
                WHERE user_id = $1
                "#,
                &[&user_id],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch completion status for user {}: {}", user_id, e);
                StoreError::QueryFailed(format!("Failed to fetch completion status: {}", e))
            })?;

        Ok(row.map(|row| CompletionRow {
            user_id: row.get(0),
            completed_at: row.get(1),
        }))
    }

    async fn completions(&self) -> Result<Vec<CompletionRow>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT user_id, completed_at
                FROM completion_status
                "#,
                &[],
            )
            .await
            .map_err(|e| {
                error!("Failed to fetch completion rows: {}", e);
                StoreError::QueryFailed(format!("Failed to fetch completion status: {}", e))
            })?;

        Ok(rows
            .iter()
            .map(|row| CompletionRow {
                user_id: row.get(0),
                completed_at: row.get(1),
            })
            .collect())
    }

    async fn insert_completion(&self, user_id: Uuid) -> Result<()> {
        let client = self.client().await?;

        let now = Utc::now();

        client
            .execute(
                r#"
                INSERT INTO completion_status (user_id, completed_at)
                VALUES ($1, $2)
                "#,
                &[&user_id, &now],
            )
            .await
            .map_err(|e| {
                error!("Failed to record completion for user {}: {}", user_id, e);
                StoreError::WriteFailed(format!("Failed to record completion: {}", e))
            })?;

        info!("Completion recorded for user {}", user_id);
        Ok(())
    }
}
