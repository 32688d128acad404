//! Unified error types surfaced by the runtime API.
//!
//! Wraps worker coordination failures and engine rejections so clients can
//! bubble them up with consistent context.
use encounter_core::{CombatError, EncounterId, EngineError, ErrorSeverity};
use thiserror::Error;
use tokio::sync::oneshot;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("encounter worker command channel closed")]
    CommandChannelClosed,

    #[error("encounter worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("encounter worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("{0} is not registered")]
    EncounterNotFound(EncounterId),

    #[error("runtime requires an ability catalog before building")]
    MissingCatalog,

    #[error("action provider failed: {0}")]
    Provider(String),

    #[error(transparent)]
    Combat(#[from] CombatError),
}

impl RuntimeError {
    /// The engine rejection behind this error, if any.
    pub fn as_combat(&self) -> Option<&CombatError> {
        match self {
            Self::Combat(err) => Some(err),
            _ => None,
        }
    }
}

impl EngineError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Combat(err) => err.severity(),
            Self::EncounterNotFound(_) | Self::MissingCatalog | Self::Provider(_) => {
                ErrorSeverity::Validation
            }
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Combat(err) => err.error_code(),
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::EncounterNotFound(_) => "RUNTIME_ENCOUNTER_NOT_FOUND",
            Self::MissingCatalog => "RUNTIME_MISSING_CATALOG",
            Self::Provider(_) => "RUNTIME_PROVIDER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combat_errors_keep_their_code() {
        let err = RuntimeError::from(CombatError::AbilityNotFound("zap".into()));
        assert_eq!(err.error_code(), "COMBAT_ABILITY_NOT_FOUND");
        assert!(err.as_combat().is_some());
        assert_eq!(RuntimeError::CommandChannelClosed.severity(), ErrorSeverity::Fatal);
    }
}
