//! Large boiler logic: fuel in, water in, steam out.
//!
//! A boiler runs on the shared lifecycle but never produces discrete
//! outputs. Each running tick it turns water into steam at a rate set by
//! its tier, throttle and current heat. Heat climbs by one per running tick
//! up to the tier's maximum and bleeds off by one per tick while idle,
//! disabled or obstructed.
//!
//! If a running boiler needs water and cannot get all of it, it explodes.
//! There is no fallback: the machine is marked failed, an
//! [`Exploded`](MachineEvent::Exploded) event carries the blast force and
//! the owning plant removes it.

use crate::accumulator::RateQuantizer;
use crate::config::BoilerType;
use crate::container::FluidStack;
use crate::event::MachineEvent;
use crate::fixed::{Fixed64, ratio, saturating_u32};
use crate::logic::{MachineIo, ProcessingState, RecipeWorkflow, TickContext};
use crate::persist::{BoilerRecord, ProcessingRecord};
use crate::selector::{SOLID_FUEL_TICKS, select_boiler_fuel};

/// Steam produced per unit of water.
pub const STEAM_PER_WATER: u64 = 160;

/// Floor on the throttled steam rate.
pub const MIN_BOILER_EUT: u64 = 25;

/// More outstanding maintenance problems than this blocks new burns.
pub const MAX_MAINTENANCE_PROBLEMS: u32 = 5;

/// Blast force at full heat.
pub const EXPLOSION_POWER: i64 = 8;

pub const MIN_THROTTLE: u32 = 25;
pub const MAX_THROTTLE: u32 = 100;

#[derive(Debug, Clone)]
pub struct BoilerLogic {
    state: ProcessingState,
    boiler_type: BoilerType,
    throttle: u32,
    current_heat: u32,
    last_tick_steam: u64,
    fuel: RateQuantizer,
    water: RateQuantizer,
    projected_eu: RateQuantizer,
    exploded: bool,
}

impl BoilerLogic {
    pub fn new(boiler_type: BoilerType) -> Self {
        let mut logic = Self {
            state: ProcessingState::new(),
            boiler_type,
            throttle: MAX_THROTTLE,
            current_heat: 0,
            last_tick_steam: 0,
            fuel: RateQuantizer::new(SOLID_FUEL_TICKS),
            water: RateQuantizer::new(STEAM_PER_WATER),
            projected_eu: RateQuantizer::new(1),
            exploded: false,
        };
        logic.projected_eu.set_quantum(logic.adjusted_eut());
        logic
    }

    pub fn boiler_type(&self) -> &BoilerType {
        &self.boiler_type
    }

    pub fn throttle(&self) -> u32 {
        self.throttle
    }

    /// Set the throttle percentage, clamped to 25..=100. Takes effect on the
    /// next burn.
    pub fn set_throttle(&mut self, percent: u32) {
        self.throttle = percent.clamp(MIN_THROTTLE, MAX_THROTTLE);
    }

    pub fn current_heat(&self) -> u32 {
        self.current_heat
    }

    pub fn max_heat(&self) -> u32 {
        self.boiler_type.max_heat()
    }

    /// Heat as a rounded percentage of maximum.
    pub fn heat_scaled(&self) -> u32 {
        let max = u64::from(self.max_heat());
        saturating_u32((u64::from(self.current_heat) * 100 + max / 2) / max)
    }

    /// Heat as a fraction of maximum, in `0..=1`.
    pub fn heat_fraction(&self) -> Fixed64 {
        ratio(i64::from(self.current_heat), i64::from(self.max_heat()))
    }

    pub fn last_tick_steam(&self) -> u64 {
        self.last_tick_steam
    }

    /// Figure shown by info providers: steam produced last tick.
    pub fn info_eut(&self) -> u64 {
        self.last_tick_steam
    }

    pub fn consumes_energy(&self) -> bool {
        false
    }

    pub fn excess_fuel(&self) -> u64 {
        self.fuel.excess()
    }

    pub fn excess_water(&self) -> u64 {
        self.water.excess()
    }

    pub fn excess_projected_eu(&self) -> u64 {
        self.projected_eu.excess()
    }

    pub fn is_exploded(&self) -> bool {
        self.exploded
    }

    /// Steam per tick at the current throttle.
    pub fn adjusted_eut(&self) -> u64 {
        (self.boiler_type.steam_per_tick.saturating_mul(u64::from(self.throttle)) / 100)
            .max(MIN_BOILER_EUT)
    }

    /// Structure broken or reformed: drop the run.
    pub fn invalidate(&mut self) {
        self.state.clear();
        self.last_tick_steam = 0;
    }

    /// Stretch a raw burn so the total energy delivered at the throttled
    /// rate matches the unthrottled burn. The sub-tick remainder carries
    /// into the next burn.
    pub fn adjust_burn_time_for_throttle(&mut self, raw_ticks: u32) -> u32 {
        let adjusted = self.adjusted_eut();
        self.projected_eu.set_quantum(adjusted);
        let energy = self.boiler_type.steam_per_tick.saturating_mul(u64::from(raw_ticks));
        saturating_u32(self.projected_eu.carry(energy))
    }

    /// Heat available for boiling once maintenance problems are accounted
    /// for. Each problem removes a tenth of the maximum.
    fn effective_heat(&self, io: &MachineIo<'_>, ctx: &TickContext<'_>) -> u64 {
        let heat = u64::from(self.current_heat);
        if !ctx.config.enable_maintenance {
            return heat;
        }
        let problems = u64::from(io.maintenance.num_maintenance_problems());
        let ceiling = 10u64.saturating_sub(problems) * u64::from(self.max_heat()) / 10;
        heat.min(ceiling)
    }

    /// Drain `amount` of the first water-equivalent fluid that has all of
    /// it. Nothing is drained if none does.
    fn drain_water(io: &mut MachineIo<'_>, ctx: &TickContext<'_>, amount: u32) -> bool {
        for &fluid in ctx.water.candidates() {
            let request = FluidStack::new(fluid, amount);
            let full = io
                .import_fluids
                .drain(&request, true)
                .is_some_and(|d| d.amount >= amount);
            if full {
                io.import_fluids.drain(&request, false);
                return true;
            }
        }
        false
    }

    fn explode(&mut self, events: &mut Vec<MachineEvent>) {
        let force = ratio(
            i64::from(self.current_heat) * EXPLOSION_POWER,
            i64::from(self.max_heat()),
        );
        log::warn!(
            "{} boiler ran dry at heat {}/{}: exploding with force {force}",
            self.boiler_type.name,
            self.current_heat,
            self.max_heat()
        );
        self.exploded = true;
        self.last_tick_steam = 0;
        events.push(MachineEvent::Exploded { force });
    }

    pub fn to_record(&self) -> BoilerRecord {
        BoilerRecord {
            heat: self.current_heat,
            excess_fuel: self.fuel.excess(),
            excess_water: self.water.excess(),
            excess_projected_eu: self.projected_eu.excess(),
            throttle: self.throttle,
        }
    }

    pub fn restore(&mut self, processing: &ProcessingRecord, boiler: Option<&BoilerRecord>) {
        self.state = ProcessingState::from_record(processing);
        self.last_tick_steam = 0;
        self.exploded = false;
        let Some(record) = boiler else {
            return;
        };
        self.current_heat = record.heat.min(self.max_heat());
        self.set_throttle(record.throttle);
        self.fuel = RateQuantizer::with_excess(SOLID_FUEL_TICKS, record.excess_fuel);
        self.water = RateQuantizer::with_excess(STEAM_PER_WATER, record.excess_water);
        self.projected_eu =
            RateQuantizer::with_excess(self.adjusted_eut(), record.excess_projected_eu);
    }
}

impl RecipeWorkflow for BoilerLogic {
    fn state(&self) -> &ProcessingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessingState {
        &mut self.state
    }

    fn pre_tick(&mut self, io: &MachineIo<'_>) {
        let cooling =
            !self.state.is_active || !self.can_progress(io) || !self.state.is_working_enabled;
        if cooling && self.current_heat > 0 {
            self.current_heat -= 1;
            self.last_tick_steam = 0;
        }
    }

    fn should_search(&self) -> bool {
        !self.exploded
    }

    fn search_recipe(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    ) {
        if ctx.config.enable_maintenance
            && io.maintenance.num_maintenance_problems() > MAX_MAINTENANCE_PROBLEMS
        {
            return;
        }
        if !self.can_progress(io) {
            return;
        }
        let Some(burn) = select_boiler_fuel(
            ctx.book,
            &self.boiler_type,
            ctx.water,
            &mut *io.import_items,
            &mut *io.import_fluids,
            &mut self.fuel,
        ) else {
            return;
        };

        // Fuel is already spent, so a burn that throttles down to nothing
        // still runs for one tick. Its energy stays in the projected remainder.
        let max_progress = burn
            .bonus_ticks
            .saturating_add(self.adjust_burn_time_for_throttle(burn.ticks))
            .max(1);
        let eut = i64::try_from(self.adjusted_eut()).unwrap_or(i64::MAX);
        self.state.begin(max_progress, eut);
        log::debug!(
            "{} boiler: burning {:?} fuel for {max_progress} ticks at {eut} steam/t",
            self.boiler_type.name,
            burn.kind
        );
        events.push(MachineEvent::RecipeStarted {
            max_progress_time: max_progress,
            recipe_eut: eut,
        });
    }

    fn progress_recipe(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    ) {
        if !self.can_progress(io) {
            return;
        }
        let rate = u64::try_from(self.state.recipe_eut).unwrap_or(0);
        let heat = self.effective_heat(io, ctx);
        let steam = rate.saturating_mul(heat) / u64::from(self.max_heat());
        if steam > 0 {
            let water = saturating_u32(self.water.cover(steam));
            if water > 0 && !Self::drain_water(io, ctx, water) {
                self.explode(events);
                return;
            }
            self.last_tick_steam = steam;
            io.export_fluids
                .fill(&FluidStack::new(ctx.steam, saturating_u32(steam)), false);
            events.push(MachineEvent::SteamProduced { amount: steam });
        }
        if self.current_heat < self.max_heat() {
            self.current_heat += 1;
        }

        self.state.progress_time += 1;
        if self.state.progress_time > self.state.max_progress_time {
            self.complete_recipe(io, events);
        }
    }

    fn complete_recipe(&mut self, _io: &mut MachineIo<'_>, events: &mut Vec<MachineEvent>) {
        self.state.finish();
        events.push(MachineEvent::RecipeCompleted);
    }

    fn has_failed(&self) -> bool {
        self.exploded
    }
}
