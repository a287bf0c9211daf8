//! Identity shapes consumed from the external session and profile services.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder first name assigned at sign-up before onboarding
pub const PLACEHOLDER_FIRST_NAME: &str = "New User";

/// The user a mutation is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
}

impl Actor {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// The signed-in session as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub actor_id: Uuid,
    pub email: String,
}

impl From<&Session> for Actor {
    fn from(session: &Session) -> Self {
        Actor::new(session.actor_id, session.email.clone())
    }
}

/// Profile record kept by the external profile service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: Option<String>,
    pub avatar_ref: Option<String>,
}

impl Profile {
    /// "First Last", or whichever half exists; `None` when both are blank
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// A profile without a real first name has not finished onboarding
    pub fn needs_onboarding(&self) -> bool {
        match self.first_name.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(name) => name == PLACEHOLDER_FIRST_NAME,
        }
    }
}
