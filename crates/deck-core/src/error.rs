use thiserror::Error;

/// Every failure the runtime can observe. Only `ConnectionFailure`,
/// `InvalidInfo` and a failed registration handshake end the process; the
/// rest are contained to the message that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("unserializable command '{event}': {reason}")]
    UnserializableCommand { event: String, reason: String },
    #[error("instance '{context}' is already registered")]
    DuplicateRegistration { context: String },
    #[error("no live instance for context '{context}'")]
    UnknownTargetInstance { context: String },
    #[error("no action registered with uuid '{uuid}'")]
    UnknownAction { uuid: String },
    #[error("invalid controller info: {0}")]
    InvalidInfo(String),
}

impl DeckError {
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::MalformedEnvelope(err.to_string())
    }

    /// Per-message failures that the receive loop logs and moves past.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            DeckError::ConnectionFailure(_) | DeckError::InvalidInfo(_)
        )
    }
}
