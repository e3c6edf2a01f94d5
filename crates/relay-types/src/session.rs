//! Session identity threaded through every emitted event.
//!
//! One session is created per process invocation. It is immutable and is
//! never persisted; it disappears when the process exits.

use serde::{Deserialize, Serialize};

use crate::{RelayError, SessionId};

/// Model label reported when no model is configured.
pub const DEFAULT_MODEL: &str = "opencode/zen-grok-code-fast-1";

/// Identity correlating all events of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    model: String,
}

impl Session {
    /// Start a session with a freshly generated id.
    pub fn new(model: impl Into<String>) -> Result<Self, RelayError> {
        Self::with_id(SessionId::generate(), model)
    }

    /// Start a session with a caller-chosen id.
    pub fn with_id(id: SessionId, model: impl Into<String>) -> Result<Self, RelayError> {
        let model = model.into();
        if id.is_empty() {
            return Err(RelayError::SessionError("session id must not be empty".into()));
        }
        if model.trim().is_empty() {
            return Err(RelayError::SessionError("model label must not be empty".into()));
        }
        Ok(Self { id, model })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
