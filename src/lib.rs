pub mod auth;
pub mod editions;
pub mod quiz;
pub mod results;
pub mod routing;
pub mod store;

pub use auth::{AuthClient, AuthError, AuthUser, IdentityProvider};
pub use editions::{Edition, EditionMap};
pub use quiz::{AnswerDraft, QuizEngine, QuizEntry, QuizError};
pub use results::{fetch_results, ComparisonCard, ResultsPoller, ResultsState};
pub use routing::{entry_destination, Destination};
pub use store::{AnswerRow, CompletionRow, PostgresStore, Question, QuestionOption, QuizStore, StoreError};

/// Loads `.env` (when present) and initializes logging. Call once at
/// startup before constructing any component.
pub fn init() {
    let _ = dotenvy::dotenv();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
