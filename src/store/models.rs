use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::editions::Edition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub edition: Edition,
    pub order_num: i32,
    pub intensity: String,
    pub intensity_emoji: String,
    pub title: String,
    pub scenario: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub label: String,
    pub option_text: String,
    pub is_other: bool,
    pub order_num: i32,
}

/// One row per (user, question). The two payload fields are mutually
/// exclusive: a selected option clears the free text and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub other_text: Option<String>,
}

impl AnswerRow {
    /// A row with both payload fields empty does not count as an answer,
    /// even though it exists. `other_text` of `Some("")` does count.
    pub fn is_answered(&self) -> bool {
        self.selected_option_id.is_some() || self.other_text.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRow {
    pub user_id: Uuid,
    pub completed_at: DateTime<Utc>,
}
