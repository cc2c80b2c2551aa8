//! Forgeline Data -- data-driven loading of machine content.
//!
//! Reads fluids, items, recipe maps, fuels and machine settings from a
//! directory of RON, TOML or JSON files and resolves them into the core's
//! [`RecipeBook`](forgeline_core::recipe::RecipeBook), fluid registry and
//! configuration.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, GameData, load_game_data};
