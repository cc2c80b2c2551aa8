//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::{BoilerType, MachineConfig};
use crate::container::{EnergyBuffer, FluidStack, ItemSlots, ItemStack, TankSet};
use crate::fixed::Fixed64;
use crate::id::*;
use crate::material::FluidRegistry;
use crate::plant::{Housing, Machine, Plant};
use crate::recipe::{Recipe, RecipeBook, RecipeMap};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Fluid constructors
// ===========================================================================

// The first three match the ids `FluidRegistry::new` hands out.
pub fn water() -> FluidId {
    FluidId(0)
}
pub fn distilled_water() -> FluidId {
    FluidId(1)
}
pub fn steam() -> FluidId {
    FluidId(2)
}
pub fn diesel() -> FluidId {
    FluidId(3)
}
pub fn creosote() -> FluidId {
    FluidId(4)
}

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn dust() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn coal() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn hull() -> ItemTypeId {
    ItemTypeId(3)
}
pub fn fluid_cell() -> ItemTypeId {
    ItemTypeId(4)
}

// ===========================================================================
// Recipe data
// ===========================================================================

pub const MACERATOR: &str = "macerator";

/// Ticks and EU/t of the test macerator recipe.
pub const MACERATE_TICKS: u32 = 4;
pub const MACERATE_EUT: i64 = 2;

/// Coal burns for 1600 furnace ticks, i.e. 20 boiler ticks.
pub const COAL_BURN_TIME: u32 = 1600;

pub fn fluid_fuel(fluid: FluidId, eut: i64, duration: u32) -> Recipe {
    Recipe {
        item_inputs: vec![],
        fluid_inputs: vec![FluidStack::new(fluid, 1)],
        item_outputs: vec![],
        fluid_outputs: vec![],
        duration,
        eut,
    }
}

pub fn macerate() -> Recipe {
    Recipe {
        item_inputs: vec![ItemStack::new(ore(), 1)],
        fluid_inputs: vec![],
        item_outputs: vec![ItemStack::new(dust(), 2)],
        fluid_outputs: vec![],
        duration: MACERATE_TICKS,
        eut: MACERATE_EUT,
    }
}

/// Water, distilled water, steam, diesel and creosote, in that id order.
pub fn test_registry() -> FluidRegistry {
    let mut reg = FluidRegistry::new();
    reg.register("diesel");
    reg.register("creosote");
    reg
}

pub fn test_book() -> RecipeBook {
    let mut book = RecipeBook::new();
    let mut macerator = RecipeMap::new(MACERATOR);
    macerator
        .add(macerate())
        .expect("macerate recipe is valid");
    book.insert_map(macerator);
    book.combustion_fuels
        .add(fluid_fuel(diesel(), -32, 20))
        .expect("diesel fuel is valid");
    book.semi_fluid_fuels
        .add(fluid_fuel(creosote(), -32, 10))
        .expect("creosote fuel is valid");
    book.solid_fuels.set_burn_time(coal(), COAL_BURN_TIME);
    book.solid_fuels.mark_fluid_container(fluid_cell());
    book
}

// ===========================================================================
// Machines
// ===========================================================================

/// Two input slots, one output slot, a full 10k EU buffer at 32 V.
pub fn generic_housing() -> Housing {
    let mut energy = EnergyBuffer::new(10_000, 32);
    energy.stored = 10_000;
    Housing {
        import_items: ItemSlots::new(2, 64),
        import_fluids: TankSet::new(1, 16_000),
        export_items: ItemSlots::new(1, 64),
        export_fluids: TankSet::new(1, 16_000),
        energy,
        ..Housing::default()
    }
}

/// Fuel slots, two large input tanks and an unbounded steam tank.
pub fn boiler_housing() -> Housing {
    Housing {
        import_items: ItemSlots::new(2, 64),
        import_fluids: TankSet::new(2, 1_000_000),
        export_fluids: TankSet::new(1, u32::MAX),
        ..Housing::default()
    }
}

pub fn test_macerator() -> Machine {
    Machine::generic(MACERATOR, generic_housing())
}

/// A fast-heating boiler: full heat after 4 running ticks.
pub fn quick_boiler_type() -> BoilerType {
    BoilerType::new("test", 800, 4, 100)
}

pub fn test_boiler() -> Machine {
    Machine::boiler(quick_boiler_type(), boiler_housing())
}

pub fn test_plant() -> Plant {
    Plant::new(test_book(), MachineConfig::default(), test_registry())
}

/// Step a plant `n` times, discarding sync packets.
pub fn run(plant: &mut Plant, n: u32) {
    for _ in 0..n {
        plant.step();
    }
}
