pub mod engine;

pub use engine::{QuizEngine, QuizEntry};

use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::store::{AnswerRow, StoreError};

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("No question edition is assigned to this account")]
    NoEditionAssigned,
    #[error("{0} question(s) still unanswered")]
    RemainingAnswers(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type Result<T> = std::result::Result<T, QuizError>;

/// In-memory draft of a response, held before and independently of
/// persistence. Mirrors the answer row's dual payload: selecting an
/// option clears the free text and selecting "other" clears the option.
#[derive(Debug, Clone)]
pub struct AnswerDraft {
    pub question_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub other_text: Option<String>,
}

impl AnswerDraft {
    pub fn empty(question_id: Uuid) -> Self {
        Self {
            question_id,
            selected_option_id: None,
            other_text: None,
        }
    }

    /// `Some("")` for the free text counts as a selection; two `None`s do
    /// not, even when a persisted row exists in that state.
    pub fn has_selection(&self) -> bool {
        self.selected_option_id.is_some() || self.other_text.is_some()
    }

    pub fn to_row(&self, user_id: Uuid) -> AnswerRow {
        AnswerRow {
            user_id,
            question_id: self.question_id,
            selected_option_id: self.selected_option_id,
            other_text: self.other_text.clone(),
        }
    }
}
