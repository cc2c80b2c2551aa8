//! The plant: owns machines and ticks them.
//!
//! Scheduling is single-threaded and cooperative. Each [`Plant::step`]
//! ticks every machine once, in insertion order, records their events,
//! collects their sync packets and then removes any machine that failed
//! (exploded) during the step.

use slotmap::SlotMap;

use crate::config::{BoilerType, MachineConfig};
use crate::container::{
    EnergyBuffer, EnergyContainer, FluidHandler, FluidStack, ItemHandler, ItemSlots, ItemStack,
    TankSet,
};
use crate::event::{EventBuffer, PlantEvent};
use crate::fixed::Ticks;
use crate::id::{FluidId, MachineId};
use crate::logic::{GenericLogic, MachineIo, MachineLogic, TickContext};
use crate::boiler::BoilerLogic;
use crate::material::{FluidRegistry, WaterFluids};
use crate::persist::{MachineRecord, PersistError};
use crate::recipe::RecipeBook;
use crate::sync::{SyncChannel, SyncPacket, SyncValues};

// ---------------------------------------------------------------------------
// Housing
// ---------------------------------------------------------------------------

/// The containers and external signals around one machine.
#[derive(Debug, Clone, Default)]
pub struct Housing {
    pub import_items: ItemSlots,
    pub import_fluids: TankSet,
    pub export_items: ItemSlots,
    pub export_fluids: TankSet,
    pub energy: EnergyBuffer,
    pub structure_obstructed: bool,
    pub maintenance_problems: u32,
}

impl Housing {
    pub fn io(&mut self) -> MachineIo<'_> {
        MachineIo {
            import_items: &mut self.import_items,
            import_fluids: &mut self.import_fluids,
            export_items: &mut self.export_items,
            export_fluids: &mut self.export_fluids,
            energy: &mut self.energy,
            structure: &self.structure_obstructed,
            maintenance: &self.maintenance_problems,
        }
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Everything the block-break path needs, passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct BreakContext {
    /// Who broke the machine, if anyone.
    pub harvester: Option<String>,
    /// Leave the machine's inventory out of the drops.
    pub keeps_inventory: bool,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub logic: MachineLogic,
    pub housing: Housing,
    /// What the machine drops as an item.
    pub item_form: Option<ItemStack>,
    sync: SyncChannel,
}

impl Machine {
    pub fn new(logic: MachineLogic, housing: Housing) -> Self {
        Self {
            logic,
            housing,
            item_form: None,
            sync: SyncChannel::new(),
        }
    }

    pub fn generic(recipe_map: &str, housing: Housing) -> Self {
        Self::new(MachineLogic::Generic(GenericLogic::new(recipe_map)), housing)
    }

    pub fn boiler(boiler_type: BoilerType, housing: Housing) -> Self {
        Self::new(MachineLogic::Boiler(BoilerLogic::new(boiler_type)), housing)
    }

    pub fn with_item_form(mut self, stack: ItemStack) -> Self {
        self.item_form = Some(stack);
        self
    }

    pub fn is_boiler(&self) -> bool {
        matches!(self.logic, MachineLogic::Boiler(_))
    }

    pub fn sync_values(&self) -> SyncValues {
        self.logic.sync_values()
    }

    /// Logs when an energy accessor is called on a machine that has no
    /// energy buffer. Returns whether the call should be refused.
    fn refuse_energy_call(&self, what: &str) -> bool {
        if self.is_boiler() {
            log::error!("large boiler called {what}, this should not be possible");
            return true;
        }
        false
    }

    pub fn energy_stored(&self) -> u64 {
        if self.refuse_energy_call("energy_stored") {
            return 0;
        }
        self.housing.energy.stored()
    }

    pub fn energy_capacity(&self) -> u64 {
        if self.refuse_energy_call("energy_capacity") {
            return 0;
        }
        self.housing.energy.capacity()
    }

    pub fn energy_input_per_second(&self) -> u64 {
        if self.refuse_energy_call("energy_input_per_second") {
            return 0;
        }
        self.housing.energy.input_per_second()
    }

    pub fn max_voltage(&self) -> u64 {
        if self.refuse_energy_call("max_voltage") {
            return 0;
        }
        self.housing.energy.max_voltage()
    }

    pub fn draw_energy(&mut self, eut: i64, simulate: bool) -> bool {
        if self.refuse_energy_call("draw_energy") {
            return false;
        }
        self.housing.energy.draw(eut, simulate)
    }

    /// Encode this machine's persistent state.
    pub fn save(&self) -> Result<Vec<u8>, PersistError> {
        self.logic.save().encode()
    }

    /// Restore state written by [`save`](Self::save). Observers get a fresh
    /// snapshot on the next step.
    pub fn load(&mut self, data: &[u8]) -> Result<(), PersistError> {
        let record = MachineRecord::decode(data)?;
        self.logic.restore(&record);
        self.sync.reset();
        Ok(())
    }

    /// Empty the machine for block removal. Inventory first (unless kept),
    /// then the machine's own item form. Fluids are lost.
    pub fn drops(&mut self, ctx: &BreakContext) -> Vec<ItemStack> {
        let mut drops = Vec::new();
        if !ctx.keeps_inventory {
            drops.extend(self.housing.import_items.take_all());
            drops.extend(self.housing.export_items.take_all());
        }
        drops.extend(self.item_form);
        drops
    }
}

// ---------------------------------------------------------------------------
// Plant
// ---------------------------------------------------------------------------

pub struct Plant {
    machines: SlotMap<MachineId, Machine>,
    book: RecipeBook,
    config: MachineConfig,
    fluids: FluidRegistry,
    water: WaterFluids,
    steam: FluidId,
    events: EventBuffer,
    tick: Ticks,
}

impl Plant {
    pub fn new(book: RecipeBook, config: MachineConfig, fluids: FluidRegistry) -> Self {
        let water = WaterFluids::from_config(&fluids, &config);
        let steam = fluids.steam();
        let events = EventBuffer::new(config.event_capacity);
        Self {
            machines: SlotMap::with_key(),
            book,
            config,
            fluids,
            water,
            steam,
            events,
            tick: 0,
        }
    }

    pub fn book(&self) -> &RecipeBook {
        &self.book
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn fluids(&self) -> &FluidRegistry {
        &self.fluids
    }

    pub fn water_fluids(&self) -> &WaterFluids {
        &self.water
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn add_machine(&mut self, machine: Machine) -> MachineId {
        self.machines.insert(machine)
    }

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(id)
    }

    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut Machine> {
        self.machines.get_mut(id)
    }

    pub fn contains(&self, id: MachineId) -> bool {
        self.machines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = MachineId> + '_ {
        self.machines.keys()
    }

    /// Advance every machine by one tick. Returns the sync packets each
    /// machine's observers need, in tick order.
    pub fn step(&mut self) -> Vec<(MachineId, SyncPacket)> {
        let tick = self.tick;
        let ctx = TickContext {
            book: &self.book,
            config: &self.config,
            water: &self.water,
            steam: self.steam,
        };
        let mut packets = Vec::new();
        let mut failed = Vec::new();
        let mut scratch = Vec::new();

        for (id, machine) in self.machines.iter_mut() {
            machine
                .logic
                .tick(&mut machine.housing.io(), &ctx, &mut scratch);
            for event in scratch.drain(..) {
                self.events.push(PlantEvent {
                    machine: id,
                    tick,
                    event,
                });
            }
            let values = machine.logic.sync_values();
            packets.extend(machine.sync.collect(&values).into_iter().map(|p| (id, p)));
            if machine.logic.has_failed() {
                failed.push(id);
            }
        }

        for id in failed {
            self.machines.remove(id);
            log::info!("removed failed machine {id:?} at tick {tick}");
        }
        self.tick += 1;
        packets
    }

    // -- Events --

    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PlantEvent> {
        self.events.drain()
    }

    // -- External I/O --

    /// Offer items to a machine's input slots. Returns the count that did
    /// not fit.
    pub fn insert_items(&mut self, id: MachineId, stack: ItemStack) -> u32 {
        let Some(m) = self.machines.get_mut(id) else {
            return stack.count;
        };
        let overflow = m.housing.import_items.insert(&stack, false);
        if overflow < stack.count {
            m.logic.notify_inputs_changed();
        }
        overflow
    }

    /// Offer fluid to a machine's input tanks. Returns the amount accepted.
    pub fn fill_fluid(&mut self, id: MachineId, stack: FluidStack) -> u32 {
        let Some(m) = self.machines.get_mut(id) else {
            return 0;
        };
        let accepted = m.housing.import_fluids.fill(&stack, false);
        if accepted > 0 {
            m.logic.notify_inputs_changed();
        }
        accepted
    }

    /// Take everything out of a machine's output slots.
    pub fn take_output_items(&mut self, id: MachineId) -> Vec<ItemStack> {
        let Some(m) = self.machines.get_mut(id) else {
            return Vec::new();
        };
        let taken = m.housing.export_items.take_all();
        if !taken.is_empty() {
            m.logic.notify_outputs_changed();
        }
        taken
    }

    /// Drain fluid from a machine's output tanks.
    pub fn drain_output_fluid(&mut self, id: MachineId, request: FluidStack) -> Option<FluidStack> {
        let m = self.machines.get_mut(id)?;
        let drained = m.housing.export_fluids.drain(&request, false);
        if drained.is_some() {
            m.logic.notify_outputs_changed();
        }
        drained
    }

    // -- Control --

    pub fn set_working_enabled(&mut self, id: MachineId, enabled: bool) {
        if let Some(m) = self.machines.get_mut(id) {
            m.logic.set_working_enabled(enabled);
        }
    }

    pub fn set_structure_obstructed(&mut self, id: MachineId, obstructed: bool) {
        if let Some(m) = self.machines.get_mut(id) {
            m.housing.structure_obstructed = obstructed;
        }
    }

    pub fn set_maintenance_problems(&mut self, id: MachineId, problems: u32) {
        if let Some(m) = self.machines.get_mut(id) {
            m.housing.maintenance_problems = problems;
        }
    }

    /// The machine's structure was broken or rebuilt. Boilers drop their
    /// run; other machines are unaffected.
    pub fn invalidate_structure(&mut self, id: MachineId) {
        if let Some(b) = self
            .machines
            .get_mut(id)
            .and_then(|m| m.logic.as_boiler_mut())
        {
            b.invalidate();
        }
    }

    /// Remove a machine and return what it drops. `None` if the id is not
    /// in this plant.
    pub fn remove_machine(&mut self, id: MachineId, ctx: &BreakContext) -> Option<Vec<ItemStack>> {
        let mut machine = self.machines.remove(id)?;
        if let Some(who) = &ctx.harvester {
            log::debug!("machine {id:?} harvested by {who}");
        }
        Some(machine.drops(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MachineEvent;
    use crate::test_utils::*;

    #[test]
    fn step_ticks_every_machine_and_advances_clock() {
        let mut plant = test_plant();
        let a = plant.add_machine(test_macerator());
        let b = plant.add_machine(test_macerator());
        plant.insert_items(a, ItemStack::new(ore(), 1));
        plant.insert_items(b, ItemStack::new(ore(), 1));
        plant.step();
        assert_eq!(plant.tick(), 1);
        for id in [a, b] {
            assert!(plant.machine(id).unwrap().logic.state().is_running());
        }
    }

    #[test]
    fn first_step_sends_snapshots_then_deltas() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_macerator());
        let packets = plant.step();
        assert_eq!(packets.len(), 1);
        assert!(matches!(packets[0], (m, SyncPacket::Initial(_)) if m == id));
        assert!(plant.step().is_empty());

        plant.insert_items(id, ItemStack::new(ore(), 1));
        let packets = plant.step();
        assert!(packets.iter().all(|(_, p)| matches!(p, SyncPacket::Delta(_))));
        assert!(!packets.is_empty());
    }

    #[test]
    fn events_are_stamped() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_macerator());
        plant.step();
        plant.insert_items(id, ItemStack::new(ore(), 1));
        plant.step();
        let events = plant.drain_events();
        assert!(events.iter().any(|e| e.machine == id
            && e.tick == 1
            && matches!(e.event, MachineEvent::RecipeStarted { .. })));
    }

    #[test]
    fn exploded_boiler_is_removed() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_boiler());
        plant.insert_items(id, ItemStack::new(coal(), 1));
        // Heat starts at 0, so the first running ticks need no water. Run
        // until the boiler is hot enough to need some, with none supplied.
        for _ in 0..10 {
            plant.step();
        }
        assert!(!plant.contains(id));
        assert!(
            plant
                .drain_events()
                .iter()
                .any(|e| matches!(e.event, MachineEvent::Exploded { .. }))
        );
    }

    #[test]
    fn remove_machine_drops_inventory_then_item_form() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_macerator().with_item_form(ItemStack::new(hull(), 1)));
        plant.insert_items(id, ItemStack::new(ore(), 5));
        let drops = plant.remove_machine(id, &BreakContext::default()).unwrap();
        assert_eq!(
            drops,
            vec![ItemStack::new(ore(), 5), ItemStack::new(hull(), 1)]
        );
        assert!(!plant.contains(id));
        assert!(plant.remove_machine(id, &BreakContext::default()).is_none());
    }

    #[test]
    fn keeps_inventory_drops_only_item_form() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_macerator().with_item_form(ItemStack::new(hull(), 1)));
        plant.insert_items(id, ItemStack::new(ore(), 5));
        let ctx = BreakContext {
            harvester: Some("player".into()),
            keeps_inventory: true,
        };
        let drops = plant.remove_machine(id, &ctx).unwrap();
        assert_eq!(drops, vec![ItemStack::new(hull(), 1)]);
    }

    #[test]
    fn boiler_refuses_energy_calls() {
        let mut m = test_boiler();
        m.housing.energy = EnergyBuffer::new(100, 32);
        m.housing.energy.stored = 50;
        assert_eq!(m.energy_stored(), 0);
        assert_eq!(m.energy_capacity(), 0);
        assert_eq!(m.energy_input_per_second(), 0);
        assert_eq!(m.max_voltage(), 0);
        assert!(!m.draw_energy(1, true));

        let g = test_macerator();
        assert_eq!(g.max_voltage(), 32);
    }

    #[test]
    fn save_and_load_machine() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_macerator());
        plant.insert_items(id, ItemStack::new(ore(), 1));
        plant.step();
        plant.step();
        let bytes = plant.machine(id).unwrap().save().unwrap();

        let mut copy = test_macerator();
        copy.load(&bytes).unwrap();
        assert_eq!(
            copy.logic.state(),
            plant.machine(id).unwrap().logic.state()
        );
    }

    #[test]
    fn invalidate_structure_stops_boiler() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_boiler());
        plant.insert_items(id, ItemStack::new(coal(), 1));
        plant.step();
        assert!(plant.machine(id).unwrap().logic.state().is_running());
        plant.invalidate_structure(id);
        assert!(!plant.machine(id).unwrap().logic.state().is_running());
    }

    #[test]
    fn output_space_unblocks_search() {
        let mut plant = test_plant();
        let id = plant.add_machine(test_macerator());
        plant
            .machine_mut(id)
            .unwrap()
            .housing
            .export_items
            .set_slot(0, Some(ItemStack::new(hull(), 64)));
        plant.insert_items(id, ItemStack::new(ore(), 1));
        plant.step();
        assert!(!plant.machine(id).unwrap().logic.state().is_running());

        plant.take_output_items(id);
        plant.step();
        assert!(plant.machine(id).unwrap().logic.state().is_running());
    }
}
