use std::env;

use log::warn;
use serde::{Deserialize, Serialize};

/// One of the two fixed question sets. Each participant is assigned
/// exactly one edition; questions from both editions pair up across
/// editions by their order number.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Her,
    His,
}

impl Edition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::Her => "her",
            Edition::His => "his",
        }
    }

    pub fn parse(s: &str) -> Option<Edition> {
        match s {
            "her" => Some(Edition::Her),
            "his" => Some(Edition::His),
            _ => None,
        }
    }
}

/// Maps participant emails to their question edition. Each user only
/// ever sees questions from their assigned edition while answering.
#[derive(Clone, Debug)]
pub struct EditionMap {
    her_email: String,
    his_email: String,
}

impl EditionMap {
    pub fn new(her_email: impl Into<String>, his_email: impl Into<String>) -> Self {
        Self {
            her_email: her_email.into().to_lowercase(),
            his_email: his_email.into().to_lowercase(),
        }
    }

    /// Reads `EDITION_HER_EMAIL` / `EDITION_HIS_EMAIL` from the environment.
    pub fn from_env() -> Self {
        let her_email = env::var("EDITION_HER_EMAIL").unwrap_or_else(|_| {
            warn!("EDITION_HER_EMAIL not set; 'her' edition has no assigned user");
            String::new()
        });
        let his_email = env::var("EDITION_HIS_EMAIL").unwrap_or_else(|_| {
            warn!("EDITION_HIS_EMAIL not set; 'his' edition has no assigned user");
            String::new()
        });
        Self::new(her_email, his_email)
    }

    /// Resolves an email to its edition. Case-insensitive; `None` when the
    /// email is absent or not assigned to either edition. Callers must treat
    /// `None` as a fatal configuration error for the session.
    pub fn resolve(&self, email: Option<&str>) -> Option<Edition> {
        let email = email?.to_lowercase();
        if email.is_empty() {
            return None;
        }
        if email == self.her_email {
            Some(Edition::Her)
        } else if email == self.his_email {
            Some(Edition::His)
        } else {
            None
        }
    }
}
