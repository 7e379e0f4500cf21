use serde::{Deserialize, Serialize};

/// Navigation intents issued by the core. The presentation layer owns the
/// actual router; the core only ever says where the user belongs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    Login,
    Quiz,
    Results,
}

/// Entry redirect rule: unauthenticated users go to login, users with a
/// completion row go straight to results, everyone else to the quiz.
pub fn entry_destination(authenticated: bool, completed: bool) -> Destination {
    if !authenticated {
        Destination::Login
    } else if completed {
        Destination::Results
    } else {
        Destination::Quiz
    }
}
