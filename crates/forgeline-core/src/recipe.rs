//! Recipe data and the lookup tables machines search.
//!
//! Recipe *content* lives outside the simulation: hosts build [`RecipeMap`]s
//! (usually through `forgeline-data`) and hand them to the plant inside a
//! [`RecipeBook`]. The engine only ever reads them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::container::{FluidStack, ItemStack};
use crate::id::{FluidId, ItemTypeId, RecipeId};

/// Power ceiling used when searching fuel maps: any recipe qualifies.
pub const MAX_VOLTAGE: u64 = i32::MAX as u64;

/// Errors raised when a recipe is registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    #[error("recipe duration must be at least 1 tick")]
    ZeroDuration,
    #[error("recipe has no inputs")]
    NoInputs,
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// A fixed-duration transformation of inputs into outputs.
///
/// `eut` is the power draw per tick: positive for consumers, negative for
/// generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub item_inputs: Vec<ItemStack>,
    pub fluid_inputs: Vec<FluidStack>,
    pub item_outputs: Vec<ItemStack>,
    pub fluid_outputs: Vec<FluidStack>,
    pub duration: u32,
    pub eut: i64,
}

impl Recipe {
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.duration == 0 {
            return Err(RecipeError::ZeroDuration);
        }
        if self.item_inputs.is_empty() && self.fluid_inputs.is_empty() {
            return Err(RecipeError::NoInputs);
        }
        Ok(())
    }

    pub fn is_generator(&self) -> bool {
        self.eut < 0
    }

    /// Whether the snapshot covers every input of this recipe. Inputs
    /// naming the same item or fluid twice are summed before checking.
    pub fn matches(&self, items: &[ItemStack], fluids: &[FluidStack]) -> bool {
        let mut item_need: HashMap<ItemTypeId, u64> = HashMap::new();
        for s in &self.item_inputs {
            *item_need.entry(s.item).or_default() += u64::from(s.count);
        }
        let mut fluid_need: HashMap<FluidId, u64> = HashMap::new();
        for s in &self.fluid_inputs {
            *fluid_need.entry(s.fluid).or_default() += u64::from(s.amount);
        }
        item_need.iter().all(|(&item, &need)| {
            let have: u64 = items
                .iter()
                .filter(|s| s.item == item)
                .map(|s| u64::from(s.count))
                .sum();
            have >= need
        }) && fluid_need.iter().all(|(&fluid, &need)| {
            let have: u64 = fluids
                .iter()
                .filter(|s| s.fluid == fluid)
                .map(|s| u64::from(s.amount))
                .sum();
            have >= need
        })
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Anything that can find a recipe for a set of available inputs.
pub trait RecipeTable {
    /// Find a recipe whose power draw does not exceed `power_ceiling` and
    /// whose inputs are all present in the snapshot.
    fn find_recipe(
        &self,
        power_ceiling: u64,
        items: &[ItemStack],
        fluids: &[FluidStack],
    ) -> Option<&Recipe>;
}

/// An ordered list of recipes. Earlier recipes win ties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeMap {
    pub name: String,
    recipes: Vec<Recipe>,
}

impl RecipeMap {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            recipes: Vec::new(),
        }
    }

    /// Add a recipe. Returns its id within this map.
    pub fn add(&mut self, recipe: Recipe) -> Result<RecipeId, RecipeError> {
        recipe.validate()?;
        let id = RecipeId(u32::try_from(self.recipes.len()).unwrap_or(u32::MAX));
        self.recipes.push(recipe);
        Ok(id)
    }

    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }
}

impl RecipeTable for RecipeMap {
    fn find_recipe(
        &self,
        power_ceiling: u64,
        items: &[ItemStack],
        fluids: &[FluidStack],
    ) -> Option<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.eut.unsigned_abs() <= power_ceiling)
            .find(|r| r.matches(items, fluids))
    }
}

// ---------------------------------------------------------------------------
// Solid fuels
// ---------------------------------------------------------------------------

/// Burn times of solid fuels, in vanilla furnace ticks.
pub trait FuelTable {
    fn burn_time(&self, item: &ItemStack) -> u32;

    /// Items that carry fluid (buckets, cells) are never burnt whole.
    fn is_fluid_container(&self, item: &ItemStack) -> bool;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuelMap {
    burn_times: HashMap<ItemTypeId, u32>,
    fluid_containers: HashSet<ItemTypeId>,
}

impl FuelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_burn_time(&mut self, item: ItemTypeId, ticks: u32) {
        self.burn_times.insert(item, ticks);
    }

    pub fn mark_fluid_container(&mut self, item: ItemTypeId) {
        self.fluid_containers.insert(item);
    }
}

impl FuelTable for FuelMap {
    fn burn_time(&self, item: &ItemStack) -> u32 {
        if item.is_empty() {
            return 0;
        }
        self.burn_times.get(&item.item).copied().unwrap_or(0)
    }

    fn is_fluid_container(&self, item: &ItemStack) -> bool {
        self.fluid_containers.contains(&item.item)
    }
}

// ---------------------------------------------------------------------------
// RecipeBook
// ---------------------------------------------------------------------------

/// All recipe data a plant needs, frozen for the duration of a tick.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    /// Liquid fuels burnt by combustion generators.
    pub combustion_fuels: RecipeMap,
    /// Dense / semi-fluid fuels.
    pub semi_fluid_fuels: RecipeMap,
    /// Solid item fuels.
    pub solid_fuels: FuelMap,
    /// Processing recipe maps, keyed by map name.
    pub machines: HashMap<String, RecipeMap>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self {
            combustion_fuels: RecipeMap::new("combustion_generator_fuels"),
            semi_fluid_fuels: RecipeMap::new("semi_fluid_generator_fuels"),
            solid_fuels: FuelMap::new(),
            machines: HashMap::new(),
        }
    }

    pub fn insert_map(&mut self, map: RecipeMap) {
        self.machines.insert(map.name.clone(), map);
    }

    pub fn machine_map(&self, name: &str) -> Option<&RecipeMap> {
        self.machines.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ore() -> ItemTypeId {
        ItemTypeId(0)
    }
    fn dust() -> ItemTypeId {
        ItemTypeId(1)
    }

    fn macerate(eut: i64) -> Recipe {
        Recipe {
            item_inputs: vec![ItemStack::new(ore(), 1)],
            fluid_inputs: vec![],
            item_outputs: vec![ItemStack::new(dust(), 2)],
            fluid_outputs: vec![],
            duration: 100,
            eut,
        }
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut map = RecipeMap::new("macerator");
        assert_eq!(map.add(macerate(2)), Ok(RecipeId(0)));
        assert_eq!(map.add(macerate(4)), Ok(RecipeId(1)));
        assert_eq!(map.get(RecipeId(1)).map(|r| r.eut), Some(4));
    }

    #[test]
    fn add_rejects_zero_duration() {
        let mut map = RecipeMap::new("macerator");
        let mut r = macerate(2);
        r.duration = 0;
        assert_eq!(map.add(r), Err(RecipeError::ZeroDuration));
    }

    #[test]
    fn add_rejects_no_inputs() {
        let mut map = RecipeMap::new("macerator");
        let mut r = macerate(2);
        r.item_inputs.clear();
        assert_eq!(map.add(r), Err(RecipeError::NoInputs));
    }

    #[test]
    fn find_respects_power_ceiling() {
        let mut map = RecipeMap::new("macerator");
        map.add(macerate(120)).unwrap();
        let items = [ItemStack::new(ore(), 4)];
        assert!(map.find_recipe(32, &items, &[]).is_none());
        assert!(map.find_recipe(128, &items, &[]).is_some());
    }

    #[test]
    fn find_requires_full_quantity() {
        let mut map = RecipeMap::new("macerator");
        let mut r = macerate(2);
        r.item_inputs[0].count = 3;
        map.add(r).unwrap();
        // Split across two stacks still counts.
        let items = [ItemStack::new(ore(), 2), ItemStack::new(ore(), 1)];
        assert!(map.find_recipe(32, &items, &[]).is_some());
        assert!(map.find_recipe(32, &items[..1], &[]).is_none());
    }

    #[test]
    fn find_prefers_earlier_recipe() {
        let mut map = RecipeMap::new("macerator");
        map.add(macerate(2)).unwrap();
        let mut second = macerate(4);
        second.duration = 7;
        map.add(second).unwrap();
        let items = [ItemStack::new(ore(), 1)];
        assert_eq!(map.find_recipe(32, &items, &[]).unwrap().duration, 100);
    }

    #[test]
    fn generator_sign() {
        assert!(macerate(-32).is_generator());
        assert!(!macerate(32).is_generator());
    }

    #[test]
    fn fluid_matching() {
        let diesel = FluidId(7);
        let r = Recipe {
            item_inputs: vec![],
            fluid_inputs: vec![FluidStack::new(diesel, 1)],
            item_outputs: vec![],
            fluid_outputs: vec![],
            duration: 10,
            eut: -32,
        };
        assert!(r.matches(&[], &[FluidStack::new(diesel, 1)]));
        assert!(!r.matches(&[], &[FluidStack::new(FluidId(8), 1)]));
    }

    #[test]
    fn fuel_map_lookup() {
        let mut fuels = FuelMap::new();
        fuels.set_burn_time(ore(), 1600);
        fuels.mark_fluid_container(dust());
        assert_eq!(fuels.burn_time(&ItemStack::new(ore(), 1)), 1600);
        assert_eq!(fuels.burn_time(&ItemStack::new(ore(), 0)), 0);
        assert_eq!(fuels.burn_time(&ItemStack::new(dust(), 1)), 0);
        assert!(fuels.is_fluid_container(&ItemStack::new(dust(), 1)));
    }
}
