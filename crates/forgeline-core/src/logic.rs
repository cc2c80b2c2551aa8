//! The shared processing lifecycle.
//!
//! Every machine owns one [`ProcessingState`] and is driven once per tick
//! through [`RecipeWorkflow::drive`]:
//!
//! 1. a kind-specific pre-step (the boiler bleeds heat here),
//! 2. if working is enabled, advance the running recipe,
//! 3. if no recipe is running, search for a new one,
//! 4. settle the "just completed" latch.
//!
//! A recipe that completes and restarts within the same tick consumes the
//! latch instead of toggling `is_active`, so observers never see a
//! false-then-true flicker.
//!
//! Machine kinds plug in through the [`RecipeWorkflow`] override points and
//! are selected at construction time via the [`MachineLogic`] enum.

use serde::{Deserialize, Serialize};

use crate::boiler::BoilerLogic;
use crate::config::MachineConfig;
use crate::container::{EnergyContainer, FluidHandler, FluidStack, ItemHandler, ItemStack};
use crate::event::MachineEvent;
use crate::fixed::{Fixed64, ratio};
use crate::id::FluidId;
use crate::material::WaterFluids;
use crate::persist::{MachineRecord, ProcessingRecord};
use crate::recipe::RecipeBook;
use crate::selector::{SelectMiss, select_and_consume};
use crate::sync::SyncValues;

// ---------------------------------------------------------------------------
// ProcessingState
// ---------------------------------------------------------------------------

/// Where a machine is in its recipe lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    /// Progress has passed the recipe length and outputs are due. Never
    /// observable between ticks.
    Completing,
}

/// Per-machine run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub progress_time: u32,
    /// 0 when no recipe is running.
    pub max_progress_time: u32,
    pub recipe_eut: i64,
    pub is_active: bool,
    pub is_working_enabled: bool,
    /// Set when a recipe completes; consumed by a same-tick restart or
    /// cleared (with `is_active`) at the end of the tick.
    pub was_active_and_needs_update: bool,
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self {
            progress_time: 0,
            max_progress_time: 0,
            recipe_eut: 0,
            is_active: false,
            is_working_enabled: true,
            was_active_and_needs_update: false,
        }
    }
}

impl ProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.max_progress_time == 0 {
            Phase::Idle
        } else if self.progress_time > self.max_progress_time {
            Phase::Completing
        } else {
            Phase::Running
        }
    }

    pub fn is_running(&self) -> bool {
        self.max_progress_time > 0
    }

    /// Fraction of the current recipe completed, in `0..=1`.
    pub fn progress_fraction(&self) -> Fixed64 {
        ratio(
            i64::from(self.progress_time.min(self.max_progress_time)),
            i64::from(self.max_progress_time),
        )
    }

    /// Lock in a new run. The start tick counts as the first tick of progress.
    pub fn begin(&mut self, max_progress_time: u32, recipe_eut: i64) {
        self.progress_time = 1;
        self.max_progress_time = max_progress_time;
        self.recipe_eut = recipe_eut;
        if self.was_active_and_needs_update {
            self.was_active_and_needs_update = false;
        } else {
            self.is_active = true;
        }
    }

    /// Reset after the last tick of a run.
    pub fn finish(&mut self) {
        self.progress_time = 0;
        self.max_progress_time = 0;
        self.recipe_eut = 0;
        self.was_active_and_needs_update = true;
    }

    /// Drop any run without producing outputs.
    pub fn clear(&mut self) {
        self.progress_time = 0;
        self.max_progress_time = 0;
        self.recipe_eut = 0;
        self.is_active = false;
        self.was_active_and_needs_update = false;
    }

    /// Disabling work also clears `is_active`; re-enabling restores it if a
    /// run is still pending.
    pub fn set_working_enabled(&mut self, enabled: bool) {
        self.is_working_enabled = enabled;
        self.is_active = enabled && self.is_running();
    }

    pub fn to_record(&self) -> ProcessingRecord {
        ProcessingRecord {
            progress_time: self.progress_time,
            max_progress_time: self.max_progress_time,
            recipe_eut: self.recipe_eut,
            is_active: self.is_active,
            is_working_enabled: self.is_working_enabled,
            pending_items: Vec::new(),
            pending_fluids: Vec::new(),
        }
    }

    pub fn from_record(record: &ProcessingRecord) -> Self {
        let mut state = Self {
            progress_time: record.progress_time,
            max_progress_time: record.max_progress_time,
            recipe_eut: record.recipe_eut,
            is_active: record.is_active,
            is_working_enabled: record.is_working_enabled,
            was_active_and_needs_update: false,
        };
        if state.max_progress_time == 0 {
            state.progress_time = 0;
        }
        state.is_active &= state.is_working_enabled;
        state
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Multiblock integrity check, computed elsewhere.
pub trait StructureOracle {
    fn is_structure_obstructed(&self) -> bool;
}

/// Source of the machine's outstanding maintenance problems.
pub trait MaintenanceCounter {
    fn num_maintenance_problems(&self) -> u32;
}

impl StructureOracle for bool {
    fn is_structure_obstructed(&self) -> bool {
        *self
    }
}

impl MaintenanceCounter for u32 {
    fn num_maintenance_problems(&self) -> u32 {
        *self
    }
}

/// Borrowed view of everything a machine touches during its tick.
pub struct MachineIo<'a> {
    pub import_items: &'a mut dyn ItemHandler,
    pub import_fluids: &'a mut dyn FluidHandler,
    pub export_items: &'a mut dyn ItemHandler,
    pub export_fluids: &'a mut dyn FluidHandler,
    pub energy: &'a mut dyn EnergyContainer,
    pub structure: &'a dyn StructureOracle,
    pub maintenance: &'a dyn MaintenanceCounter,
}

/// Plant-wide data shared by every machine during a tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub book: &'a RecipeBook,
    pub config: &'a MachineConfig,
    pub water: &'a WaterFluids,
    pub steam: FluidId,
}

// ---------------------------------------------------------------------------
// RecipeWorkflow
// ---------------------------------------------------------------------------

/// Override points of the processing lifecycle.
pub trait RecipeWorkflow {
    fn state(&self) -> &ProcessingState;
    fn state_mut(&mut self) -> &mut ProcessingState;

    /// Runs before anything else each tick, working enabled or not.
    fn pre_tick(&mut self, _io: &MachineIo<'_>) {}

    fn can_progress(&self, io: &MachineIo<'_>) -> bool {
        !io.structure.is_structure_obstructed()
    }

    fn should_search(&self) -> bool;

    fn search_recipe(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    );

    fn progress_recipe(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    );

    fn complete_recipe(&mut self, io: &mut MachineIo<'_>, events: &mut Vec<MachineEvent>);

    /// A failed machine is finished and must not be ticked again.
    fn has_failed(&self) -> bool {
        false
    }

    /// One tick of the lifecycle.
    fn drive(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    ) {
        if self.has_failed() {
            return;
        }
        let was_active = self.state().is_active;
        self.pre_tick(io);

        if self.state().is_working_enabled {
            if self.state().progress_time > 0 {
                self.progress_recipe(io, ctx, events);
                if self.has_failed() {
                    return;
                }
            }
            if self.state().progress_time == 0 && self.should_search() {
                self.search_recipe(io, ctx, events);
            }
        }

        let state = self.state_mut();
        if state.was_active_and_needs_update {
            state.was_active_and_needs_update = false;
            state.is_active = false;
        }
        if state.is_active != was_active {
            events.push(MachineEvent::ActiveChanged {
                active: state.is_active,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// GenericLogic
// ---------------------------------------------------------------------------

/// Input per second must exceed this multiple of the recipe draw before a
/// starved consumer tries again.
const ENERGY_RECOVERY_FACTOR: u64 = 19;

/// A recipe-map machine: consumes inputs, draws or produces power each
/// tick, and emits its outputs when the run completes.
#[derive(Debug, Clone)]
pub struct GenericLogic {
    state: ProcessingState,
    recipe_map: String,
    pending_items: Vec<ItemStack>,
    pending_fluids: Vec<FluidStack>,
    has_not_enough_energy: bool,
    invalid_inputs: bool,
    outputs_full: bool,
}

impl GenericLogic {
    pub fn new(recipe_map: &str) -> Self {
        Self {
            state: ProcessingState::new(),
            recipe_map: recipe_map.to_string(),
            pending_items: Vec::new(),
            pending_fluids: Vec::new(),
            has_not_enough_energy: false,
            invalid_inputs: false,
            outputs_full: false,
        }
    }

    pub fn recipe_map(&self) -> &str {
        &self.recipe_map
    }

    pub fn has_not_enough_energy(&self) -> bool {
        self.has_not_enough_energy
    }

    pub fn pending_items(&self) -> &[ItemStack] {
        &self.pending_items
    }

    pub fn pending_fluids(&self) -> &[FluidStack] {
        &self.pending_fluids
    }

    /// Inputs changed since the last failed search; look again.
    pub fn notify_inputs_changed(&mut self) {
        self.invalid_inputs = false;
    }

    /// Outputs gained space; look again.
    pub fn notify_outputs_changed(&mut self) {
        self.outputs_full = false;
    }

    pub fn to_record(&self) -> ProcessingRecord {
        ProcessingRecord {
            pending_items: self.pending_items.clone(),
            pending_fluids: self.pending_fluids.clone(),
            ..self.state.to_record()
        }
    }

    pub fn restore(&mut self, record: &ProcessingRecord) {
        self.state = ProcessingState::from_record(record);
        if self.state.is_running() {
            self.pending_items = record.pending_items.clone();
            self.pending_fluids = record.pending_fluids.clone();
        } else {
            self.pending_items.clear();
            self.pending_fluids.clear();
        }
        self.has_not_enough_energy = false;
        self.invalid_inputs = false;
        self.outputs_full = false;
    }
}

impl RecipeWorkflow for GenericLogic {
    fn state(&self) -> &ProcessingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessingState {
        &mut self.state
    }

    fn should_search(&self) -> bool {
        !self.invalid_inputs && !self.outputs_full
    }

    fn search_recipe(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    ) {
        if !self.can_progress(io) {
            return;
        }
        let Some(map) = ctx.book.machine_map(&self.recipe_map) else {
            log::error!("no recipe map named {:?}", self.recipe_map);
            self.invalid_inputs = true;
            return;
        };
        let found = select_and_consume(
            map,
            io.energy.max_voltage(),
            &mut *io.import_items,
            &mut *io.import_fluids,
            &*io.export_items,
            &*io.export_fluids,
        );
        match found {
            Ok(recipe) => {
                self.pending_items = recipe.item_outputs.clone();
                self.pending_fluids = recipe.fluid_outputs.clone();
                self.state.begin(recipe.duration, recipe.eut);
                log::debug!(
                    "{}: started recipe ({} ticks at {} EU/t)",
                    self.recipe_map,
                    recipe.duration,
                    recipe.eut
                );
                events.push(MachineEvent::RecipeStarted {
                    max_progress_time: recipe.duration,
                    recipe_eut: recipe.eut,
                });
            }
            Err(SelectMiss::NoMatch) => self.invalid_inputs = true,
            Err(SelectMiss::OutputsFull) => self.outputs_full = true,
        }
    }

    fn progress_recipe(
        &mut self,
        io: &mut MachineIo<'_>,
        _ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    ) {
        let eut = self.state.recipe_eut;
        if self.has_not_enough_energy
            && io.energy.input_per_second() > ENERGY_RECOVERY_FACTOR * eut.unsigned_abs()
        {
            self.has_not_enough_energy = false;
        }
        if !self.can_progress(io) {
            return;
        }

        if io.energy.draw(eut, true) {
            io.energy.draw(eut, false);
            self.state.progress_time += 1;
            if self.state.progress_time > self.state.max_progress_time {
                self.complete_recipe(io, events);
            }
        } else if eut > 0 {
            self.has_not_enough_energy = true;
            self.state.progress_time = self.state.progress_time.saturating_sub(2).max(1);
        }
    }

    fn complete_recipe(&mut self, io: &mut MachineIo<'_>, events: &mut Vec<MachineEvent>) {
        for stack in self.pending_items.drain(..) {
            let overflow = io.export_items.insert(&stack, false);
            if overflow > 0 {
                log::warn!("{}: voided {overflow} output items", self.recipe_map);
            }
        }
        for stack in self.pending_fluids.drain(..) {
            let accepted = io.export_fluids.fill(&stack, false);
            if accepted < stack.amount {
                log::warn!(
                    "{}: voided {} mB of output fluid",
                    self.recipe_map,
                    stack.amount - accepted
                );
            }
        }
        self.state.finish();
        log::trace!("{}: recipe complete", self.recipe_map);
        events.push(MachineEvent::RecipeCompleted);
    }
}

// ---------------------------------------------------------------------------
// MachineLogic
// ---------------------------------------------------------------------------

/// Machine kind, chosen at construction time.
#[derive(Debug, Clone)]
pub enum MachineLogic {
    Generic(GenericLogic),
    Boiler(BoilerLogic),
}

impl MachineLogic {
    pub fn tick(
        &mut self,
        io: &mut MachineIo<'_>,
        ctx: &TickContext<'_>,
        events: &mut Vec<MachineEvent>,
    ) {
        match self {
            MachineLogic::Generic(l) => l.drive(io, ctx, events),
            MachineLogic::Boiler(l) => l.drive(io, ctx, events),
        }
    }

    pub fn state(&self) -> &ProcessingState {
        match self {
            MachineLogic::Generic(l) => l.state(),
            MachineLogic::Boiler(l) => l.state(),
        }
    }

    pub fn set_working_enabled(&mut self, enabled: bool) {
        match self {
            MachineLogic::Generic(l) => l.state_mut().set_working_enabled(enabled),
            MachineLogic::Boiler(l) => l.state_mut().set_working_enabled(enabled),
        }
    }

    pub fn has_failed(&self) -> bool {
        match self {
            MachineLogic::Generic(l) => l.has_failed(),
            MachineLogic::Boiler(l) => l.has_failed(),
        }
    }

    pub fn notify_inputs_changed(&mut self) {
        if let MachineLogic::Generic(l) = self {
            l.notify_inputs_changed();
        }
    }

    pub fn notify_outputs_changed(&mut self) {
        if let MachineLogic::Generic(l) = self {
            l.notify_outputs_changed();
        }
    }

    /// Whether this machine draws from an energy container at all.
    pub fn consumes_energy(&self) -> bool {
        match self {
            MachineLogic::Generic(_) => true,
            MachineLogic::Boiler(l) => l.consumes_energy(),
        }
    }

    pub fn as_boiler(&self) -> Option<&BoilerLogic> {
        match self {
            MachineLogic::Boiler(l) => Some(l),
            MachineLogic::Generic(_) => None,
        }
    }

    pub fn as_boiler_mut(&mut self) -> Option<&mut BoilerLogic> {
        match self {
            MachineLogic::Boiler(l) => Some(l),
            MachineLogic::Generic(_) => None,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericLogic> {
        match self {
            MachineLogic::Generic(l) => Some(l),
            MachineLogic::Boiler(_) => None,
        }
    }

    /// Observable fields for remote sync.
    pub fn sync_values(&self) -> SyncValues {
        let state = self.state();
        SyncValues {
            is_active: state.is_active,
            is_working_enabled: state.is_working_enabled,
            progress_time: state.progress_time,
            max_progress_time: state.max_progress_time,
            boiler: self
                .as_boiler()
                .map(|b| (b.current_heat(), b.last_tick_steam())),
        }
    }

    pub fn save(&self) -> MachineRecord {
        match self {
            MachineLogic::Generic(l) => MachineRecord::new(l.to_record(), None),
            MachineLogic::Boiler(l) => {
                MachineRecord::new(l.state().to_record(), Some(l.to_record()))
            }
        }
    }

    /// Restore persisted state into a machine of the same kind. A boiler
    /// section on a generic machine (or its absence on a boiler) is ignored.
    pub fn restore(&mut self, record: &MachineRecord) {
        match self {
            MachineLogic::Generic(l) => l.restore(&record.processing),
            MachineLogic::Boiler(l) => l.restore(&record.processing, record.boiler.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{EnergyBuffer, ItemSlots, TankSet};
    use crate::id::ItemTypeId;
    use crate::recipe::{Recipe, RecipeMap};

    const ORE: ItemTypeId = ItemTypeId(0);
    const DUST: ItemTypeId = ItemTypeId(1);

    struct Rig {
        inputs: ItemSlots,
        in_tanks: TankSet,
        outputs: ItemSlots,
        out_tanks: TankSet,
        energy: EnergyBuffer,
        obstructed: bool,
        faults: u32,
    }

    impl Rig {
        fn new() -> Self {
            let mut energy = EnergyBuffer::new(10_000, 32);
            energy.stored = 10_000;
            Self {
                inputs: ItemSlots::new(2, 64),
                in_tanks: TankSet::new(1, 1000),
                outputs: ItemSlots::new(2, 64),
                out_tanks: TankSet::new(1, 1000),
                energy,
                obstructed: false,
                faults: 0,
            }
        }

        fn io(&mut self) -> MachineIo<'_> {
            MachineIo {
                import_items: &mut self.inputs,
                import_fluids: &mut self.in_tanks,
                export_items: &mut self.outputs,
                export_fluids: &mut self.out_tanks,
                energy: &mut self.energy,
                structure: &self.obstructed,
                maintenance: &self.faults,
            }
        }
    }

    fn book(duration: u32, eut: i64) -> RecipeBook {
        let mut map = RecipeMap::new("macerator");
        map.add(Recipe {
            item_inputs: vec![ItemStack::new(ORE, 1)],
            fluid_inputs: vec![],
            item_outputs: vec![ItemStack::new(DUST, 2)],
            fluid_outputs: vec![],
            duration,
            eut,
        })
        .unwrap();
        let mut book = RecipeBook::new();
        book.insert_map(map);
        book
    }

    fn tick(logic: &mut GenericLogic, rig: &mut Rig, book: &RecipeBook) -> Vec<MachineEvent> {
        let config = MachineConfig::default();
        let water = WaterFluids::new(FluidId(0), FluidId(1), &[]);
        let ctx = TickContext {
            book,
            config: &config,
            water: &water,
            steam: FluidId(2),
        };
        let mut events = Vec::new();
        logic.drive(&mut rig.io(), &ctx, &mut events);
        events
    }

    #[test]
    fn phases() {
        let mut s = ProcessingState::new();
        assert_eq!(s.phase(), Phase::Idle);
        s.begin(10, 2);
        assert_eq!(s.phase(), Phase::Running);
        s.progress_time = 11;
        assert_eq!(s.phase(), Phase::Completing);
    }

    #[test]
    fn progress_fraction_halfway() {
        let mut s = ProcessingState::new();
        s.begin(10, 2);
        s.progress_time = 5;
        assert_eq!(s.progress_fraction(), Fixed64::from_num(0.5));
        assert_eq!(ProcessingState::new().progress_fraction(), Fixed64::ZERO);
    }

    #[test]
    fn disabling_work_clears_active() {
        let mut s = ProcessingState::new();
        s.begin(10, 2);
        s.set_working_enabled(false);
        assert!(!s.is_active);
        s.set_working_enabled(true);
        assert!(s.is_active);
    }

    #[test]
    fn recipe_runs_for_its_duration() {
        let book = book(3, 2);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 1)));
        let mut logic = GenericLogic::new("macerator");

        let events = tick(&mut logic, &mut rig, &book);
        assert!(events.contains(&MachineEvent::ActiveChanged { active: true }));
        assert_eq!(logic.state().progress_time, 1);
        assert_eq!(rig.inputs.count_of(ORE), 0);

        tick(&mut logic, &mut rig, &book);
        tick(&mut logic, &mut rig, &book);
        assert_eq!(rig.outputs.count_of(DUST), 0);
        let events = tick(&mut logic, &mut rig, &book);
        assert!(events.contains(&MachineEvent::RecipeCompleted));
        assert!(events.contains(&MachineEvent::ActiveChanged { active: false }));
        assert_eq!(rig.outputs.count_of(DUST), 2);
        assert_eq!(rig.energy.stored, 10_000 - 3 * 2);
        assert!(!logic.state().is_active);
    }

    #[test]
    fn restart_on_completion_tick_keeps_active() {
        let book = book(1, 2);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 2)));
        let mut logic = GenericLogic::new("macerator");

        tick(&mut logic, &mut rig, &book);
        assert!(logic.state().is_active);
        let events = tick(&mut logic, &mut rig, &book);
        assert!(events.contains(&MachineEvent::RecipeCompleted));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, MachineEvent::ActiveChanged { .. }))
        );
        assert!(logic.state().is_active);
        assert!(!logic.state().was_active_and_needs_update);
        assert_eq!(logic.state().progress_time, 1);
    }

    #[test]
    fn failed_search_waits_for_input_change() {
        let book = book(3, 2);
        let mut rig = Rig::new();
        let mut logic = GenericLogic::new("macerator");
        tick(&mut logic, &mut rig, &book);
        assert!(!logic.should_search());

        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 1)));
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().phase(), Phase::Idle);

        logic.notify_inputs_changed();
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().phase(), Phase::Running);
    }

    #[test]
    fn starved_consumer_rolls_back() {
        let book = book(10, 2);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 1)));
        let mut logic = GenericLogic::new("macerator");
        tick(&mut logic, &mut rig, &book);
        for _ in 0..4 {
            tick(&mut logic, &mut rig, &book);
        }
        assert_eq!(logic.state().progress_time, 5);

        rig.energy.stored = 1;
        tick(&mut logic, &mut rig, &book);
        assert!(logic.has_not_enough_energy());
        assert_eq!(logic.state().progress_time, 3);

        rig.energy.stored = 1000;
        rig.energy.input_per_second = 39;
        tick(&mut logic, &mut rig, &book);
        assert!(!logic.has_not_enough_energy());
        assert_eq!(logic.state().progress_time, 4);
    }

    #[test]
    fn generator_stalls_when_buffer_full() {
        let book = book(10, -16);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 1)));
        let mut logic = GenericLogic::new("macerator");
        tick(&mut logic, &mut rig, &book);
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().progress_time, 1);
        assert!(!logic.has_not_enough_energy());

        rig.energy.stored = 0;
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().progress_time, 2);
        assert_eq!(rig.energy.stored, 16);
    }

    #[test]
    fn obstruction_freezes_and_blocks_search() {
        let book = book(3, 2);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 2)));
        rig.obstructed = true;
        let mut logic = GenericLogic::new("macerator");
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().phase(), Phase::Idle);
        assert_eq!(rig.inputs.count_of(ORE), 2);

        rig.obstructed = false;
        tick(&mut logic, &mut rig, &book);
        rig.obstructed = true;
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().progress_time, 1);
    }

    #[test]
    fn disabled_machine_does_not_start() {
        let book = book(3, 2);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 1)));
        let mut logic = GenericLogic::new("macerator");
        logic.state_mut().set_working_enabled(false);
        tick(&mut logic, &mut rig, &book);
        assert_eq!(logic.state().phase(), Phase::Idle);
        assert_eq!(rig.inputs.count_of(ORE), 1);
    }

    #[test]
    fn record_round_trip_keeps_pending_outputs() {
        let book = book(5, 2);
        let mut rig = Rig::new();
        rig.inputs.set_slot(0, Some(ItemStack::new(ORE, 1)));
        let mut logic = GenericLogic::new("macerator");
        tick(&mut logic, &mut rig, &book);

        let record = logic.to_record();
        let mut restored = GenericLogic::new("macerator");
        restored.restore(&record);
        assert_eq!(restored.state(), logic.state());
        assert_eq!(restored.pending_items(), &[ItemStack::new(DUST, 2)]);
    }
}
