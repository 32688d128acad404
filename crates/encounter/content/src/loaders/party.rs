//! Party loader.

use std::path::Path;

use encounter_core::Combatant;

use crate::loaders::{LoadResult, read_file};
use crate::templates::PlayerTemplate;

const EMBEDDED_PARTY: &str = include_str!("../../data/party.ron");

/// Loader for player templates from RON files.
///
/// RON format: `Vec<PlayerTemplate>`
pub struct PartyLoader;

impl PartyLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<PlayerTemplate>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn load_embedded() -> LoadResult<Vec<PlayerTemplate>> {
        Self::parse(EMBEDDED_PARTY)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<PlayerTemplate>> {
        let party: Vec<PlayerTemplate> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse party RON: {}", e))?;
        if party.is_empty() {
            anyhow::bail!("Party file contains no players");
        }
        Ok(party)
    }

    /// Instantiates every template into a combatant.
    pub fn instantiate(party: &[PlayerTemplate]) -> Vec<Combatant> {
        party.iter().map(PlayerTemplate::instantiate).collect()
    }
}
