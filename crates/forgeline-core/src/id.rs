use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a machine instance owned by a [`Plant`](crate::plant::Plant).
    pub struct MachineId;
}

/// Identifies a fluid type in the [`FluidRegistry`](crate::material::FluidRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FluidId(pub u32);

/// Identifies an item type. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a recipe inside its recipe map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluid_id_equality() {
        assert_eq!(FluidId(0), FluidId(0));
        assert_ne!(FluidId(0), FluidId(1));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ItemTypeId(0), "coal");
        map.insert(ItemTypeId(1), "charcoal");
        assert_eq!(map[&ItemTypeId(1)], "charcoal");
    }
}
