#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use pairquiz::auth::{AuthError, AuthUser, IdentityProvider};
use pairquiz::editions::Edition;
use pairquiz::store::{AnswerRow, CompletionRow, Question, QuestionOption, QuizStore, StoreError};

/// HashMap-backed store standing in for Postgres. Visibility rules are
/// trivial (everything is visible), which matches the post-completion
/// view the aggregator tests exercise. Write failures can be injected
/// and completion reads are counted so tests can assert the poll stopped.
pub struct MemoryStore {
    pub questions: Vec<Question>,
    pub options: Vec<QuestionOption>,
    answers: Mutex<HashMap<(Uuid, Uuid), AnswerRow>>,
    completions: Mutex<Vec<CompletionRow>>,
    pub completion_reads: AtomicUsize,
    pub fail_answer_writes: AtomicBool,
    pub fail_completion_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(questions: Vec<Question>, options: Vec<QuestionOption>) -> Self {
        Self {
            questions,
            options,
            answers: Mutex::new(HashMap::new()),
            completions: Mutex::new(Vec::new()),
            completion_reads: AtomicUsize::new(0),
            fail_answer_writes: AtomicBool::new(false),
            fail_completion_writes: AtomicBool::new(false),
        }
    }

    pub fn seed_answer(&self, row: AnswerRow) {
        self.answers
            .lock()
            .insert((row.user_id, row.question_id), row);
    }

    pub fn seed_completion(&self, user_id: Uuid) {
        self.completions.lock().push(CompletionRow {
            user_id,
            completed_at: Utc::now(),
        });
    }

    pub fn answer(&self, user_id: Uuid, question_id: Uuid) -> Option<AnswerRow> {
        self.answers.lock().get(&(user_id, question_id)).cloned()
    }

    pub fn answer_count(&self) -> usize {
        self.answers.lock().len()
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().len()
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn questions_for_edition(&self, edition: Edition) -> Result<Vec<Question>, StoreError> {
        let mut questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| q.edition == edition)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_num);
        Ok(questions)
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StoreError> {
        let mut questions = self.questions.clone();
        questions.sort_by_key(|q| q.order_num);
        Ok(questions)
    }

    async fn all_options(&self) -> Result<Vec<QuestionOption>, StoreError> {
        Ok(self.options.clone())
    }

    async fn answers_for_user(&self, user_id: Uuid) -> Result<Vec<AnswerRow>, StoreError> {
        Ok(self
            .answers
            .lock()
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn visible_answers(&self) -> Result<Vec<AnswerRow>, StoreError> {
        Ok(self.answers.lock().values().cloned().collect())
    }

    async fn upsert_answer(&self, row: &AnswerRow) -> Result<(), StoreError> {
        if self.fail_answer_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("injected write failure".to_string()));
        }
        self.answers
            .lock()
            .insert((row.user_id, row.question_id), row.clone());
        Ok(())
    }

    async fn completion_for_user(&self, user_id: Uuid) -> Result<Option<CompletionRow>, StoreError> {
        Ok(self
            .completions
            .lock()
            .iter()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn completions(&self) -> Result<Vec<CompletionRow>, StoreError> {
        self.completion_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.completions.lock().clone())
    }

    async fn insert_completion(&self, user_id: Uuid) -> Result<(), StoreError> {
        if self.fail_completion_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("injected write failure".to_string()));
        }
        let mut completions = self.completions.lock();
        if completions.iter().any(|c| c.user_id == user_id) {
            return Err(StoreError::WriteFailed(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        completions.push(CompletionRow {
            user_id,
            completed_at: Utc::now(),
        });
        Ok(())
    }
}

/// Identity provider with a fixed session, no HTTP involved.
pub struct StubIdentity {
    user: Mutex<Option<AuthUser>>,
}

impl StubIdentity {
    pub fn signed_in(user: AuthUser) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: Mutex::new(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.user.lock().clone())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthUser, AuthError> {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        *self.user.lock() = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.user.lock().take();
        Ok(())
    }
}

pub fn user(email: &str) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: email.to_string(),
    }
}

/// Builds `orders` paired questions per edition. Every question gets
/// regular options labeled "A" and "B" plus one "other" option.
pub fn seed_questions(orders: i32) -> (Vec<Question>, Vec<QuestionOption>) {
    let mut questions = Vec::new();
    let mut options = Vec::new();

    for order_num in 1..=orders {
        for edition in [Edition::Her, Edition::His] {
            let question_id = Uuid::new_v4();
            questions.push(Question {
                id: question_id,
                edition,
                order_num,
                intensity: "mild".to_string(),
                intensity_emoji: "🌶".to_string(),
                title: format!("Question {}", order_num),
                scenario: format!("Scenario {} ({})", order_num, edition.as_str()),
            });
            for (idx, label) in ["A", "B"].iter().enumerate() {
                options.push(QuestionOption {
                    id: Uuid::new_v4(),
                    question_id,
                    label: label.to_string(),
                    option_text: format!("Option {} for {}", label, order_num),
                    is_other: false,
                    order_num: idx as i32,
                });
            }
            options.push(QuestionOption {
                id: Uuid::new_v4(),
                question_id,
                label: "other".to_string(),
                option_text: "Other".to_string(),
                is_other: true,
                order_num: 2,
            });
        }
    }

    (questions, options)
}

/// Looks up the option with the given label on one question.
pub fn option_id(options: &[QuestionOption], question_id: Uuid, label: &str) -> Uuid {
    options
        .iter()
        .find(|o| o.question_id == question_id && o.label == label)
        .map(|o| o.id)
        .expect("option not seeded")
}

/// The seeded question for an edition at an order number.
pub fn question_at<'a>(questions: &'a [Question], edition: Edition, order_num: i32) -> &'a Question {
    questions
        .iter()
        .find(|q| q.edition == edition && q.order_num == order_num)
        .expect("question not seeded")
}
