//! Data-driven combat content and loaders.
//!
//! This crate houses the static content an encounter is built from and
//! provides loaders for RON/TOML data files:
//! - Ability and item catalogs (RON)
//! - Enemy templates, instantiated into uniquely named combatants (RON)
//! - The default adventuring party (RON)
//! - Engine rules and tuning (TOML)
//!
//! Content is read once and handed to the engine as immutable values.

pub mod templates;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use templates::{Bestiary, EnemyTemplate, PlayerTemplate, TemplateError};

#[cfg(feature = "loaders")]
pub use loaders::{
    CatalogLoader, ContentBundle, ContentFactory, EnemyLoader, LoadResult, PartyLoader,
    RulesLoader,
};
