//! Asynchronous abstraction for sourcing player intent.
//!
//! Enemy turns are driven inside the engine by its
//! [`EnemyPolicy`](encounter_core::EnemyPolicy). Player turns wait for input,
//! which runtime users plug in as [`ActionProvider`] implementations: human
//! input, scripted fixtures, or bots.
use async_trait::async_trait;
use encounter_core::{ActionRequest, CombatantId};

use super::errors::Result;
use super::status::EncounterStatus;

/// Trait for providing a player's next request.
#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Provide the next request for `actor`, whose turn it currently is.
    ///
    /// # Arguments
    /// * `actor` - The player that needs to act
    /// * `status` - Snapshot of the encounter taken just before asking
    async fn provide_action(
        &self,
        actor: &CombatantId,
        status: &EncounterStatus,
    ) -> Result<ActionRequest>;
}

/// Always ends the turn. Useful for testing or as a fallback.
pub struct EndTurnProvider;

#[async_trait]
impl ActionProvider for EndTurnProvider {
    async fn provide_action(
        &self,
        _actor: &CombatantId,
        _status: &EncounterStatus,
    ) -> Result<ActionRequest> {
        Ok(ActionRequest::EndTurn)
    }
}
