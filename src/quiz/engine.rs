use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn, error};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{AnswerDraft, QuizError, Result};
use crate::auth::{AuthUser, IdentityProvider};
use crate::editions::EditionMap;
use crate::routing::Destination;
use crate::store::{Question, QuestionOption, QuizStore, StoreError};

/// Outcome of the quiz entry protocol.
pub enum QuizEntry {
    /// No active session; the caller should navigate to login.
    RedirectLogin,
    /// This user already has a completion row; the quiz is never
    /// re-entered once finished.
    RedirectResults,
    Ready(QuizEngine),
}

/// Drives one participant through their edition's question list: holds
/// the ordered questions, per-question draft answers, and the cursor,
/// and decides when answers are persisted and when submission may
/// create the completion row.
pub struct QuizEngine {
    store: Arc<dyn QuizStore>,
    user: AuthUser,
    questions: Vec<Question>,
    options_by_question: HashMap<Uuid, Vec<QuestionOption>>,
    drafts: HashMap<Uuid, AnswerDraft>,
    cursor: usize,
    save_tasks: Vec<JoinHandle<()>>,
    save_errors: Arc<Mutex<Vec<String>>>,
}

impl QuizEngine {
    /// Entry protocol: identity, completion short-circuit, edition
    /// resolution, question/option/answer fetch, resume cursor.
    pub async fn load(
        store: Arc<dyn QuizStore>,
        identity: &dyn IdentityProvider,
        editions: &EditionMap,
    ) -> Result<QuizEntry> {
        let user = match identity.current_user().await? {
            Some(user) => user,
            None => return Ok(QuizEntry::RedirectLogin),
        };

        if store.completion_for_user(user.id).await?.is_some() {
            info!("User {} already completed their quiz", user.id);
            return Ok(QuizEntry::RedirectResults);
        }

        let edition = editions
            .resolve(Some(&user.email))
            .ok_or(QuizError::NoEditionAssigned)?;

        let questions = store.questions_for_edition(edition).await?;
        let options = store.all_options().await?;
        let existing = store.answers_for_user(user.id).await?;

        let mut options_by_question: HashMap<Uuid, Vec<QuestionOption>> = HashMap::new();
        for option in options {
            options_by_question
                .entry(option.question_id)
                .or_default()
                .push(option);
        }

        let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let mut drafts: HashMap<Uuid, AnswerDraft> = HashMap::new();
        for row in existing {
            if !question_ids.contains(&row.question_id) {
                continue;
            }
            drafts.insert(
                row.question_id,
                AnswerDraft {
                    question_id: row.question_id,
                    selected_option_id: row.selected_option_id,
                    other_text: row.other_text,
                },
            );
        }

        // Resume at the first unanswered question; a partially completed
        // quiz never restarts from the top. A persisted row with both
        // payload fields empty still counts as unanswered here.
        let cursor = questions
            .iter()
            .position(|q| !drafts.get(&q.id).map(AnswerDraft::has_selection).unwrap_or(false))
            .unwrap_or_else(|| questions.len().saturating_sub(1));

        info!(
            "Quiz loaded for {}: {} questions ({} edition), resuming at {}",
            user.email,
            questions.len(),
            edition.as_str(),
            cursor + 1
        );

        Ok(QuizEntry::Ready(QuizEngine {
            store,
            user,
            questions,
            options_by_question,
            drafts,
            cursor,
            save_tasks: Vec::new(),
            save_errors: Arc::new(Mutex::new(Vec::new())),
        }))
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn current_options(&self) -> &[QuestionOption] {
        self.current_question()
            .and_then(|q| self.options_by_question.get(&q.id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// (current 1-based position, total question count).
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor + 1, self.questions.len())
    }

    pub fn is_last(&self) -> bool {
        !self.questions.is_empty() && self.cursor == self.questions.len() - 1
    }

    pub fn draft(&self, question_id: Uuid) -> Option<&AnswerDraft> {
        self.drafts.get(&question_id)
    }

    /// Enablement gate for Next/Submit, evaluated per question: an option
    /// id is set, or the free text is defined (empty string included).
    pub fn has_selection(&self, question_id: Uuid) -> bool {
        self.drafts
            .get(&question_id)
            .map(AnswerDraft::has_selection)
            .unwrap_or(false)
    }

    /// Records an option choice for the current question. Choosing a
    /// regular option persists immediately without blocking; choosing the
    /// "other" option defers the write until free text exists and the user
    /// navigates or submits, so typing never produces a write per keystroke.
    pub fn select_option(&mut self, option_id: Uuid) {
        let Some(question) = self.current_question() else {
            return;
        };
        let question_id = question.id;

        let is_other = match self
            .options_by_question
            .get(&question_id)
            .and_then(|opts| opts.iter().find(|o| o.id == option_id))
        {
            Some(option) => option.is_other,
            None => {
                warn!("Ignoring unknown option {} for question {}", option_id, question_id);
                return;
            }
        };

        let draft = self
            .drafts
            .entry(question_id)
            .or_insert_with(|| AnswerDraft::empty(question_id));

        if is_other {
            draft.selected_option_id = None;
            if draft.other_text.is_none() {
                draft.other_text = Some(String::new());
            }
        } else {
            draft.selected_option_id = Some(option_id);
            draft.other_text = None;
            let row = draft.to_row(self.user.id);
            self.spawn_save(row);
        }
    }

    /// Updates only the free-text field of the current draft. No write is
    /// issued here; the text rides along with the next navigation save.
    pub fn set_other_text(&mut self, text: impl Into<String>) {
        let Some(question) = self.current_question() else {
            return;
        };
        let question_id = question.id;
        let draft = self
            .drafts
            .entry(question_id)
            .or_insert_with(|| AnswerDraft::empty(question_id));
        draft.other_text = Some(text.into());
    }

    /// Persists the current draft in the background and advances the
    /// cursor. Never blocks on write latency; a no-op at the last question.
    pub fn go_next(&mut self) {
        if self.questions.is_empty() || self.cursor + 1 >= self.questions.len() {
            return;
        }
        self.save_current_in_background();
        self.cursor += 1;
    }

    /// Persists the current draft in the background and moves back one
    /// question. A no-op at the first question.
    pub fn go_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.save_current_in_background();
        self.cursor -= 1;
    }

    /// Final submission: the current draft is saved synchronously, any
    /// background save failure collected since load is surfaced, every
    /// question must carry an answered draft, and only then is the
    /// completion row created. On any failure the engine stays where it
    /// is and the user may retry.
    pub async fn submit(&mut self) -> Result<Destination> {
        if let Some(question) = self.current_question() {
            if let Some(draft) = self.drafts.get(&question.id) {
                let row = draft.to_row(self.user.id);
                self.store.upsert_answer(&row).await?;
            }
        }

        // Synchronization point for the fire-and-forget saves: wait out
        // anything still in flight, then surface the first failure.
        self.flush_saves().await;
        let failed = {
            let mut errors = self.save_errors.lock();
            let first = errors.drain(..).next();
            first
        };
        if let Some(message) = failed {
            return Err(QuizError::Store(StoreError::WriteFailed(message)));
        }

        let remaining = self
            .questions
            .iter()
            .filter(|q| !self.has_selection(q.id))
            .count();
        if remaining > 0 {
            return Err(QuizError::RemainingAnswers(remaining));
        }

        self.store.insert_completion(self.user.id).await?;
        info!("Quiz submitted by {}", self.user.email);

        Ok(Destination::Results)
    }

    /// Awaits all outstanding background saves. Useful on teardown; submit
    /// calls this before checking for write failures.
    pub async fn flush_saves(&mut self) {
        let tasks: Vec<_> = self.save_tasks.drain(..).collect();
        for result in futures::future::join_all(tasks).await {
            let _ = result;
        }
    }

    fn save_current_in_background(&mut self) {
        let Some(question) = self.current_question() else {
            return;
        };
        if let Some(draft) = self.drafts.get(&question.id) {
            let row = draft.to_row(self.user.id);
            self.spawn_save(row);
        }
    }

    fn spawn_save(&mut self, row: crate::store::AnswerRow) {
        let store = self.store.clone();
        let errors = self.save_errors.clone();
        let question_id = row.question_id;
        self.save_tasks.push(tokio::spawn(async move {
            if let Err(e) = store.upsert_answer(&row).await {
                error!("Background save failed for question {}: {}", question_id, e);
                errors.lock().push(e.to_string());
            }
        }));
    }
}
