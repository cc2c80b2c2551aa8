//! Recipe and fuel selection.
//!
//! Selection works on a read-only snapshot of the input containers and only
//! touches the real containers once a match has been confirmed in full, so a
//! failed attempt never leaves a partial drain behind. A successful call
//! commits the consumption: these functions are not idempotent.

use crate::accumulator::RateQuantizer;
use crate::config::BoilerType;
use crate::container::{FluidHandler, FluidStack, ItemHandler, ItemStack};
use crate::fixed::saturating_u32;
use crate::material::WaterFluids;
use crate::recipe::{FuelTable, MAX_VOLTAGE, Recipe, RecipeBook, RecipeTable};

/// Multiplier applied to a fuel recipe's fluid input before it is drained.
pub const FLUID_DRAIN_MULTIPLIER: u32 = 100;

/// Energy units per tick of fluid fuel burn time.
pub const FLUID_BURNTIME_TO_EU: u64 = 8;

/// Vanilla furnace ticks per boiler burn tick.
pub const SOLID_FUEL_TICKS: u64 = 80;

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Everything a machine could feed into a recipe right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub items: Vec<ItemStack>,
    pub fluids: Vec<FluidStack>,
}

impl InputSnapshot {
    pub fn capture(items: &dyn ItemHandler, fluids: &dyn FluidHandler) -> Self {
        Self {
            items: (0..items.slot_count())
                .filter_map(|slot| items.stack_in_slot(slot).copied())
                .filter(|s| !s.is_empty())
                .collect(),
            fluids: (0..fluids.tank_count())
                .filter_map(|tank| fluids.peek(tank).copied())
                .filter(|s| s.amount > 0)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic selection
// ---------------------------------------------------------------------------

/// Why a generic search came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMiss {
    /// No recipe matches the available inputs.
    NoMatch,
    /// A recipe matched but its outputs would not fit.
    OutputsFull,
}

/// Find a recipe for the current inputs and, if its outputs fit, consume its
/// inputs.
pub fn select_and_consume<'r, T: RecipeTable + ?Sized>(
    table: &'r T,
    power_ceiling: u64,
    items: &mut dyn ItemHandler,
    fluids: &mut dyn FluidHandler,
    export_items: &dyn ItemHandler,
    export_fluids: &dyn FluidHandler,
) -> Result<&'r Recipe, SelectMiss> {
    let snapshot = InputSnapshot::capture(items, fluids);
    let recipe = table
        .find_recipe(power_ceiling, &snapshot.items, &snapshot.fluids)
        .ok_or(SelectMiss::NoMatch)?;

    if !export_items.can_insert_all(&recipe.item_outputs)
        || !export_fluids.can_fill_all(&recipe.fluid_outputs)
    {
        return Err(SelectMiss::OutputsFull);
    }
    if !can_drain_all(fluids, &recipe.fluid_inputs) {
        return Err(SelectMiss::NoMatch);
    }

    consume_items(items, &recipe.item_inputs);
    for need in &recipe.fluid_inputs {
        fluids.drain(need, false);
    }
    Ok(recipe)
}

fn can_drain_all(fluids: &dyn FluidHandler, needs: &[FluidStack]) -> bool {
    needs.iter().all(|need| {
        let have: u64 = (0..fluids.tank_count())
            .filter_map(|t| fluids.peek(t))
            .filter(|s| s.fluid == need.fluid)
            .map(|s| u64::from(s.amount))
            .sum();
        let total: u64 = needs
            .iter()
            .filter(|n| n.fluid == need.fluid)
            .map(|n| u64::from(n.amount))
            .sum();
        have >= total
    })
}

fn consume_items(items: &mut dyn ItemHandler, needs: &[ItemStack]) {
    for need in needs {
        let mut remaining = need.count;
        for slot in 0..items.slot_count() {
            if remaining == 0 {
                break;
            }
            if items.stack_in_slot(slot).is_some_and(|s| s.item == need.item) {
                remaining -= items.shrink(slot, remaining);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Boiler fuel selection
// ---------------------------------------------------------------------------

/// Which fuel source a boiler burn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelKind {
    Combustion,
    SemiFluid,
    Solid,
}

/// A committed fuel burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuelBurn {
    pub kind: FuelKind,
    /// Boosted burn time in boiler ticks, before throttle adjustment.
    pub ticks: u32,
    /// Whole ticks released from the solid-fuel remainder by this burn.
    /// Added after throttle adjustment.
    pub bonus_ticks: u32,
}

/// Pick and consume one unit of boiler fuel.
///
/// Each fluid tank is offered to the combustion fuels and then to the
/// semi-fluid fuels before the next tank is looked at. Only when no tank
/// yields a burn are the item slots scanned for a solid fuel. The first hit
/// wins. Tanks holding a water-equivalent fluid are never burnt.
pub fn select_boiler_fuel(
    book: &RecipeBook,
    boiler: &BoilerType,
    water: &WaterFluids,
    items: &mut dyn ItemHandler,
    fluids: &mut dyn FluidHandler,
    fuel_excess: &mut RateQuantizer,
) -> Option<FuelBurn> {
    let fluid_passes: [(FuelKind, &dyn RecipeTable); 2] = [
        (FuelKind::Combustion, &book.combustion_fuels),
        (FuelKind::SemiFluid, &book.semi_fluid_fuels),
    ];
    for tank in 0..fluids.tank_count() {
        let Some(&stack) = fluids.peek(tank) else {
            continue;
        };
        if stack.amount == 0 || water.contains(stack.fluid) {
            continue;
        }
        for (kind, table) in fluid_passes {
            if let Some(burn) = burn_fluid(kind, table, boiler, stack, tank, fluids) {
                return Some(burn);
            }
        }
    }
    burn_solid(&book.solid_fuels, boiler, items, fuel_excess)
}

fn burn_fluid(
    kind: FuelKind,
    table: &dyn RecipeTable,
    boiler: &BoilerType,
    stack: FluidStack,
    tank: usize,
    fluids: &mut dyn FluidHandler,
) -> Option<FuelBurn> {
    let recipe = table.find_recipe(MAX_VOLTAGE, &[], &[stack])?;
    let input = recipe.fluid_inputs.first()?;
    let needed = input.amount.saturating_mul(FLUID_DRAIN_MULTIPLIER);
    if stack.amount < needed {
        return None;
    }
    fluids.drain_tank(tank, needed, false);

    let energy = recipe
        .eut
        .unsigned_abs()
        .saturating_mul(u64::from(recipe.duration))
        / FLUID_BURNTIME_TO_EU;
    let raw = match kind {
        FuelKind::Combustion => energy / 2,
        _ => energy.saturating_mul(2),
    };
    Some(FuelBurn {
        kind,
        ticks: boiler.runtime_boost(saturating_u32(raw)).max(1),
        bonus_ticks: 0,
    })
}

fn burn_solid(
    fuels: &dyn FuelTable,
    boiler: &BoilerType,
    items: &mut dyn ItemHandler,
    fuel_excess: &mut RateQuantizer,
) -> Option<FuelBurn> {
    for slot in 0..items.slot_count() {
        let Some(&stack) = items.stack_in_slot(slot) else {
            continue;
        };
        let burn = u64::from(fuels.burn_time(&stack));
        if burn / SOLID_FUEL_TICKS == 0 || fuels.is_fluid_container(&stack) {
            continue;
        }
        if items.shrink(slot, 1) == 0 {
            continue;
        }
        let bonus = fuel_excess.bank(burn % SOLID_FUEL_TICKS);
        return Some(FuelBurn {
            kind: FuelKind::Solid,
            ticks: boiler.runtime_boost(saturating_u32(burn / SOLID_FUEL_TICKS)),
            bonus_ticks: saturating_u32(bonus),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ItemSlots, TankSet};
    use crate::id::{FluidId, ItemTypeId};
    use crate::recipe::RecipeMap;

    const WATER: FluidId = FluidId(0);
    const DISTILLED: FluidId = FluidId(1);
    const DIESEL: FluidId = FluidId(10);
    const CREOSOTE: FluidId = FluidId(11);
    const COAL: ItemTypeId = ItemTypeId(0);
    const BUCKET: ItemTypeId = ItemTypeId(1);
    const STICK: ItemTypeId = ItemTypeId(2);

    fn water() -> WaterFluids {
        WaterFluids::new(WATER, DISTILLED, &[])
    }

    fn fuel_recipe(fluid: FluidId, eut: i64, duration: u32) -> Recipe {
        Recipe {
            item_inputs: vec![],
            fluid_inputs: vec![FluidStack::new(fluid, 1)],
            item_outputs: vec![],
            fluid_outputs: vec![],
            duration,
            eut,
        }
    }

    fn book() -> RecipeBook {
        let mut book = RecipeBook::new();
        book.combustion_fuels
            .add(fuel_recipe(DIESEL, -32, 10))
            .unwrap();
        book.semi_fluid_fuels
            .add(fuel_recipe(CREOSOTE, -32, 10))
            .unwrap();
        book.solid_fuels.set_burn_time(COAL, 1600);
        book.solid_fuels.set_burn_time(BUCKET, 20000);
        book.solid_fuels.mark_fluid_container(BUCKET);
        book.solid_fuels.set_burn_time(STICK, 50);
        book
    }

    fn tungsten() -> BoilerType {
        BoilerType::tungstensteel()
    }

    #[test]
    fn combustion_fuel_burns_at_half_rate() {
        let mut tanks = TankSet::new(2, 16_000);
        tanks.fill(&FluidStack::new(DIESEL, 1000), false);
        let mut items = ItemSlots::new(1, 64);
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(&book(), &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        // 32 * 10 / 8 / 2 = 20
        assert_eq!(burn.kind, FuelKind::Combustion);
        assert_eq!(burn.ticks, 20);
        assert_eq!(tanks.amount_of(DIESEL), 900);
    }

    #[test]
    fn semi_fluid_fuel_burns_at_double_rate() {
        let mut tanks = TankSet::new(1, 16_000);
        tanks.fill(&FluidStack::new(CREOSOTE, 100), false);
        let mut items = ItemSlots::new(1, 64);
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(&book(), &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        assert_eq!(burn.kind, FuelKind::SemiFluid);
        assert_eq!(burn.ticks, 80);
        assert_eq!(tanks.amount_of(CREOSOTE), 0);
    }

    #[test]
    fn huge_fluid_fuel_saturates_burn_time() {
        let mut b = RecipeBook::new();
        b.semi_fluid_fuels
            .add(fuel_recipe(CREOSOTE, -i64::from(i32::MAX), u32::MAX))
            .unwrap();
        let mut tanks = TankSet::new(1, 16_000);
        tanks.fill(&FluidStack::new(CREOSOTE, 100), false);
        let mut items = ItemSlots::new(1, 64);
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(&b, &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        assert_eq!(burn.ticks, u32::MAX);
    }

    #[test]
    fn fluid_fuel_short_of_multiplier_is_skipped_untouched() {
        let mut tanks = TankSet::new(1, 16_000);
        tanks.fill(&FluidStack::new(DIESEL, 99), false);
        let mut items = ItemSlots::new(1, 64);
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(&book(), &tungsten(), &water(), &mut items, &mut tanks, &mut excess);
        assert!(burn.is_none());
        assert_eq!(tanks.amount_of(DIESEL), 99);
    }

    #[test]
    fn water_tanks_are_never_burnt() {
        let mut b = book();
        b.combustion_fuels.add(fuel_recipe(WATER, -32, 10)).unwrap();
        let mut tanks = TankSet::new(1, 16_000);
        tanks.fill(&FluidStack::new(WATER, 1000), false);
        let mut items = ItemSlots::new(1, 64);
        let mut excess = RateQuantizer::new(80);
        assert!(
            select_boiler_fuel(&b, &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
                .is_none()
        );
        assert_eq!(tanks.amount_of(WATER), 1000);
    }

    #[test]
    fn combustion_wins_over_solid() {
        let mut tanks = TankSet::new(1, 16_000);
        tanks.fill(&FluidStack::new(DIESEL, 100), false);
        let mut items = ItemSlots::new(1, 64);
        items.insert(&ItemStack::new(COAL, 4), false);
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(&book(), &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        assert_eq!(burn.kind, FuelKind::Combustion);
        assert_eq!(items.count_of(COAL), 4);
    }

    #[test]
    fn solid_fuel_rescales_and_banks_remainder() {
        let mut b = book();
        b.solid_fuels.set_burn_time(COAL, 1650);
        let mut tanks = TankSet::new(1, 16_000);
        let mut items = ItemSlots::new(1, 64);
        items.insert(&ItemStack::new(COAL, 2), false);
        let mut excess = RateQuantizer::new(80);

        let first = select_boiler_fuel(&b, &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        assert_eq!(first.ticks, 20);
        assert_eq!(first.bonus_ticks, 0);
        assert_eq!(excess.excess(), 50);

        let second = select_boiler_fuel(&b, &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        assert_eq!(second.bonus_ticks, 1);
        assert_eq!(excess.excess(), 20);
        assert_eq!(items.count_of(COAL), 0);
    }

    #[test]
    fn solid_fuel_applies_runtime_boost() {
        let mut tanks = TankSet::new(1, 16_000);
        let mut items = ItemSlots::new(1, 64);
        items.insert(&ItemStack::new(COAL, 1), false);
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(
            &book(),
            &BoilerType::bronze(),
            &water(),
            &mut items,
            &mut tanks,
            &mut excess,
        )
        .unwrap();
        assert_eq!(burn.ticks, 40);
    }

    #[test]
    fn solid_scan_skips_containers_and_short_burns() {
        let mut tanks = TankSet::new(1, 16_000);
        let mut items = ItemSlots::new(3, 64);
        items.set_slot(0, Some(ItemStack::new(BUCKET, 1)));
        items.set_slot(1, Some(ItemStack::new(STICK, 8)));
        items.set_slot(2, Some(ItemStack::new(COAL, 1)));
        let mut excess = RateQuantizer::new(80);
        let burn = select_boiler_fuel(&book(), &tungsten(), &water(), &mut items, &mut tanks, &mut excess)
            .unwrap();
        assert_eq!(burn.kind, FuelKind::Solid);
        assert_eq!(items.count_of(BUCKET), 1);
        assert_eq!(items.count_of(STICK), 8);
        assert_eq!(items.count_of(COAL), 0);
    }

    #[test]
    fn generic_selection_consumes_inputs() {
        let mut map = RecipeMap::new("mixer");
        map.add(Recipe {
            item_inputs: vec![ItemStack::new(COAL, 2)],
            fluid_inputs: vec![FluidStack::new(WATER, 100)],
            item_outputs: vec![ItemStack::new(STICK, 1)],
            fluid_outputs: vec![],
            duration: 20,
            eut: 8,
        })
        .unwrap();
        let mut items = ItemSlots::new(2, 64);
        items.set_slot(0, Some(ItemStack::new(COAL, 1)));
        items.set_slot(1, Some(ItemStack::new(COAL, 1)));
        let mut tanks = TankSet::new(1, 1000);
        tanks.fill(&FluidStack::new(WATER, 250), false);
        let out_items = ItemSlots::new(1, 64);
        let out_tanks = TankSet::new(1, 1000);

        let recipe =
            select_and_consume(&map, 32, &mut items, &mut tanks, &out_items, &out_tanks).unwrap();
        assert_eq!(recipe.duration, 20);
        assert_eq!(items.count_of(COAL), 0);
        assert_eq!(tanks.amount_of(WATER), 150);
    }

    #[test]
    fn generic_selection_with_full_outputs_consumes_nothing() {
        let mut map = RecipeMap::new("mixer");
        map.add(Recipe {
            item_inputs: vec![ItemStack::new(COAL, 1)],
            fluid_inputs: vec![],
            item_outputs: vec![ItemStack::new(STICK, 1)],
            fluid_outputs: vec![],
            duration: 20,
            eut: 8,
        })
        .unwrap();
        let mut items = ItemSlots::new(1, 64);
        items.set_slot(0, Some(ItemStack::new(COAL, 3)));
        let mut tanks = TankSet::new(1, 1000);
        let mut out_items = ItemSlots::new(1, 64);
        out_items.set_slot(0, Some(ItemStack::new(BUCKET, 1)));
        let out_tanks = TankSet::new(1, 1000);

        let miss = select_and_consume(&map, 32, &mut items, &mut tanks, &out_items, &out_tanks);
        assert_eq!(miss.err(), Some(SelectMiss::OutputsFull));
        assert_eq!(items.count_of(COAL), 3);
    }
}
