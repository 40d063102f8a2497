//! Chat domain models.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single conversation message as reported by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    pub text: String,
}

impl Message {
    /// A reply payload: text only, no role.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            role: String::new(),
            text: text.into(),
        }
    }
}

/// The party on whose behalf a thread operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    /// Registered user; the thread id is also recorded on the durable user row.
    User(Uuid),
    /// Anonymous chat session; the cache entry is the only state.
    Anonymous(Uuid),
}

impl Principal {
    /// Identifier used in the `thread/<id>` cache key.
    pub fn id(&self) -> Uuid {
        match self {
            Principal::User(id) | Principal::Anonymous(id) => *id,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous(_))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(id) => write!(f, "user:{id}"),
            Principal::Anonymous(id) => write!(f, "anon:{id}"),
        }
    }
}
