//! Common error infrastructure for encounter-core.
//!
//! Each component defines its own error type next to the code that raises it
//! (`ResolveError`, `AbilityError`, `EncounterError`, `InventoryError`). The
//! orchestrator folds them into [`CombatError`], the single error reported
//! back to the requesting actor.
//!
//! None of the combat errors corrupt encounter state: a rejected request is
//! guaranteed to have had no side effects.

use crate::catalog::{AbilityId, ItemId, TargetType, UseContext};
use crate::combatant::CombatantId;
use crate::encounter::{EncounterError, EncounterPhase};
use crate::pipeline::AbilityError;
use crate::services::InventoryError;
use crate::targeting::ResolveError;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: may succeed later or with a different action
/// - **Validation**: invalid input, should not be retried unchanged
/// - **Internal**: unexpected state inconsistency that needs investigation
/// - **Fatal**: the encounter cannot continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Examples: not your turn, not enough actions left.
    Recoverable,

    /// Examples: unknown ability, unsupported target type.
    Validation,

    /// Examples: current turn entity missing from the roster.
    Internal,

    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all encounter-core errors.
///
/// Provides a uniform classification so the runtime can choose log levels and
/// clients can match on stable codes instead of display strings.
pub trait EngineError: std::fmt::Display + std::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Stable identifier of the variant, e.g. `COMBAT_NOT_YOUR_TURN`.
    fn error_code(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Every reason an inbound request can be rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error("it is not {actor}'s turn (current: {current:?})")]
    NotYourTurn {
        actor: CombatantId,
        current: Option<CombatantId>,
    },

    #[error("encounter is not active (phase: {phase})")]
    EncounterNotActive { phase: EncounterPhase },

    #[error("ability '{0}' not found in catalog")]
    AbilityNotFound(AbilityId),

    #[error("{actor} has not learned ability '{ability}'")]
    AbilityNotLearned {
        actor: CombatantId,
        ability: AbilityId,
    },

    #[error("ability '{ability}' cannot be used in context {context}")]
    AbilityContextDenied { ability: AbilityId, context: UseContext },

    #[error("ability '{ability}' does not support target type {target}")]
    TargetTypeUnsupported { ability: AbilityId, target: TargetType },

    #[error("target '{0}' not found")]
    TargetNotFound(String),

    #[error("insufficient actions: required {required}, remaining {remaining}")]
    InsufficientActions { required: u32, remaining: u32 },

    #[error("caster '{0}' not found")]
    CasterNotFound(CombatantId),

    #[error("item '{0}' not found in catalog")]
    ItemNotFound(ItemId),

    #[error("{actor} does not own item '{item}'")]
    ItemNotOwned { actor: CombatantId, item: ItemId },

    #[error("operation not valid in phase {phase}")]
    InvalidPhase { phase: EncounterPhase },

    #[error(transparent)]
    Encounter(EncounterError),
}

impl EngineError for CombatError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotYourTurn { .. }
            | Self::EncounterNotActive { .. }
            | Self::InsufficientActions { .. } => ErrorSeverity::Recoverable,
            Self::Encounter(inner) => inner.severity(),
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotYourTurn { .. } => "COMBAT_NOT_YOUR_TURN",
            Self::EncounterNotActive { .. } => "COMBAT_ENCOUNTER_NOT_ACTIVE",
            Self::AbilityNotFound(_) => "COMBAT_ABILITY_NOT_FOUND",
            Self::AbilityNotLearned { .. } => "COMBAT_ABILITY_NOT_LEARNED",
            Self::AbilityContextDenied { .. } => "COMBAT_ABILITY_CONTEXT_DENIED",
            Self::TargetTypeUnsupported { .. } => "COMBAT_TARGET_TYPE_UNSUPPORTED",
            Self::TargetNotFound(_) => "COMBAT_TARGET_NOT_FOUND",
            Self::InsufficientActions { .. } => "COMBAT_INSUFFICIENT_ACTIONS",
            Self::CasterNotFound(_) => "COMBAT_CASTER_NOT_FOUND",
            Self::ItemNotFound(_) => "COMBAT_ITEM_NOT_FOUND",
            Self::ItemNotOwned { .. } => "COMBAT_ITEM_NOT_OWNED",
            Self::InvalidPhase { .. } => "COMBAT_INVALID_PHASE",
            Self::Encounter(inner) => inner.error_code(),
        }
    }
}

impl From<ResolveError> for CombatError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::CasterNotFound(id) => Self::CasterNotFound(id),
            ResolveError::TargetNotFound(target) => Self::TargetNotFound(target),
        }
    }
}

impl From<AbilityError> for CombatError {
    fn from(value: AbilityError) -> Self {
        match value {
            AbilityError::CasterNotFound(id) => Self::CasterNotFound(id),
            AbilityError::ContextDenied { ability, context } => {
                Self::AbilityContextDenied { ability, context }
            }
            AbilityError::TargetTypeUnsupported { ability, target } => {
                Self::TargetTypeUnsupported { ability, target }
            }
            AbilityError::TargetNotFound(kind) => Self::TargetNotFound(kind.to_string()),
        }
    }
}

impl From<EncounterError> for CombatError {
    fn from(value: EncounterError) -> Self {
        match value {
            EncounterError::NotActive { phase } => Self::EncounterNotActive { phase },
            EncounterError::InvalidPhase { phase, .. } => Self::InvalidPhase { phase },
            other => Self::Encounter(other),
        }
    }
}

impl From<InventoryError> for CombatError {
    fn from(value: InventoryError) -> Self {
        match value {
            InventoryError::NotOwned { actor, item } => Self::ItemNotOwned { actor, item },
        }
    }
}

impl EngineError for ResolveError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CasterNotFound(_) => "RESOLVE_CASTER_NOT_FOUND",
            Self::TargetNotFound(_) => "RESOLVE_TARGET_NOT_FOUND",
        }
    }
}

impl EngineError for AbilityError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CasterNotFound(_) => "ABILITY_CASTER_NOT_FOUND",
            Self::ContextDenied { .. } => "ABILITY_CONTEXT_DENIED",
            Self::TargetTypeUnsupported { .. } => "ABILITY_TARGET_TYPE_UNSUPPORTED",
            Self::TargetNotFound(_) => "ABILITY_TARGET_NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_is_never_fatal() {
        let errors = [
            CombatError::NotYourTurn {
                actor: "p2".into(),
                current: Some("p1".into()),
            },
            CombatError::AbilityNotFound("nope".into()),
            CombatError::TargetNotFound("ghost".into()),
            CombatError::InsufficientActions {
                required: 2,
                remaining: 1,
            },
        ];
        for error in errors {
            assert!(!error.severity().is_internal(), "{error}");
        }
    }

    #[test]
    fn pipeline_errors_map_onto_the_combat_taxonomy() {
        let err: CombatError = AbilityError::TargetTypeUnsupported {
            ability: "strike".into(),
            target: TargetType::SelfOnly,
        }
        .into();
        assert_eq!(err.error_code(), "COMBAT_TARGET_TYPE_UNSUPPORTED");

        let err: CombatError = ResolveError::CasterNotFound("p9".into()).into();
        assert_eq!(err, CombatError::CasterNotFound("p9".into()));
    }
}
