//! Serde data file structs for machine content definitions.
//!
//! These structs define the on-disk format for fluids, items, recipe maps,
//! fuels and machine settings. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into core types by the loader.

use forgeline_core::config::{BoilerType, MachineConfig};
use serde::Deserialize;

// ===========================================================================
// Materials
// ===========================================================================

/// A fluid definition. Water, distilled water and steam always exist and
/// may be listed again without conflict.
#[derive(Debug, Clone, Deserialize)]
pub struct FluidData {
    pub name: String,
}

/// An item type definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    /// Buckets, cells and the like. Never burnt whole by a boiler.
    #[serde(default)]
    pub fluid_container: bool,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A stack reference, supporting both short tuple form and full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StackData {
    /// Short form: `("name", amount)`.
    Short(String, u32),
    /// Full form with explicit fields.
    Full { name: String, amount: u32 },
}

impl StackData {
    pub fn name(&self) -> &str {
        match self {
            StackData::Short(name, _) | StackData::Full { name, .. } => name,
        }
    }

    pub fn amount(&self) -> u32 {
        match self {
            StackData::Short(_, amount) | StackData::Full { amount, .. } => *amount,
        }
    }
}

/// A recipe definition. Positive `eut` consumes power, negative produces it.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    #[serde(default)]
    pub item_inputs: Vec<StackData>,
    #[serde(default)]
    pub fluid_inputs: Vec<StackData>,
    #[serde(default)]
    pub item_outputs: Vec<StackData>,
    #[serde(default)]
    pub fluid_outputs: Vec<StackData>,
    pub duration: u32,
    pub eut: i64,
}

/// A named machine recipe map.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeMapData {
    pub name: String,
    pub recipes: Vec<RecipeData>,
}

/// Contents of `recipes.{ron,toml,json}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipesFile {
    pub machines: Vec<RecipeMapData>,
    /// Liquid fuels, keyed by their single fluid input.
    pub combustion_fuels: Vec<RecipeData>,
    pub semi_fluid_fuels: Vec<RecipeData>,
}

// ===========================================================================
// Fuels
// ===========================================================================

/// A solid fuel entry: vanilla furnace burn time of one item.
#[derive(Debug, Clone, Deserialize)]
pub struct FuelData {
    pub item: String,
    pub burn_time: u32,
}

// ===========================================================================
// Machines
// ===========================================================================

/// Contents of `machines.{ron,toml,json}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MachinesFile {
    pub config: MachineConfig,
    /// Extra boiler tiers. The four built-in tiers are always present and
    /// an entry with the same name replaces one.
    pub boilers: Vec<BoilerType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_short_and_full_forms() {
        let short: StackData = ron::from_str(r#"("ore", 3)"#).unwrap();
        assert_eq!((short.name(), short.amount()), ("ore", 3));

        let full: StackData = serde_json::from_str(r#"{"name":"water","amount":1000}"#).unwrap();
        assert_eq!((full.name(), full.amount()), ("water", 1000));
    }

    #[test]
    fn recipe_io_lists_default_empty() {
        let r: RecipeData = ron::from_str("(duration: 10, eut: -32)").unwrap();
        assert!(r.item_inputs.is_empty());
        assert!(r.fluid_outputs.is_empty());
        assert_eq!(r.eut, -32);
    }

    #[test]
    fn machines_file_defaults() {
        let m: MachinesFile = toml::from_str("").unwrap();
        assert!(m.config.enable_maintenance);
        assert!(m.boilers.is_empty());

        let m: MachinesFile = toml::from_str(
            r#"
            [config]
            enable_maintenance = false
            boiler_fluids = ["heavy_water"]
            "#,
        )
        .unwrap();
        assert!(!m.config.enable_maintenance);
        assert_eq!(m.config.boiler_fluids, vec!["heavy_water".to_string()]);
    }
}
