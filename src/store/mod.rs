pub mod models;
pub mod postgres;

pub use models::{AnswerRow, CompletionRow, Question, QuestionOption};
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::editions::Edition;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Data store boundary for the four quiz record sets. Row visibility
/// (who may read whose answers) is enforced by the backing store, not
/// by callers of this trait.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Questions for one edition, ordered by order number.
    async fn questions_for_edition(&self, edition: Edition) -> Result<Vec<Question>>;

    /// Questions from both editions, ordered by order number.
    async fn all_questions(&self) -> Result<Vec<Question>>;

    /// Every option row visible to the caller.
    async fn all_options(&self) -> Result<Vec<QuestionOption>>;

    /// Answer rows owned by the given user.
    async fn answers_for_user(&self, user_id: Uuid) -> Result<Vec<AnswerRow>>;

    /// Every answer row the store lets the caller see. Before the caller
    /// completes their own quiz this is only their rows; afterwards it
    /// includes the counterpart's.
    async fn visible_answers(&self) -> Result<Vec<AnswerRow>>;

    /// Insert-or-update keyed on (user_id, question_id). A later write
    /// for the same key overwrites the earlier one.
    async fn upsert_answer(&self, row: &AnswerRow) -> Result<()>;

    /// The caller's completion row, if one exists.
    async fn completion_for_user(&self, user_id: Uuid) -> Result<Option<CompletionRow>>;

    /// Every completion row the store lets the caller see.
    async fn completions(&self) -> Result<Vec<CompletionRow>>;

    /// Records that the user finished their question set. Called at most
    /// once per user in normal flow.
    async fn insert_completion(&self, user_id: Uuid) -> Result<()>;
}
