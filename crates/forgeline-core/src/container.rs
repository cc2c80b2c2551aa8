//! Resource containers consumed by machine logic.
//!
//! The simulation never owns the world's inventories. It reaches them
//! through three narrow traits: [`ItemHandler`] (slots), [`FluidHandler`]
//! (tanks) and [`EnergyContainer`] (a battery buffer). Simple concrete
//! implementations ([`ItemSlots`], [`TankSet`], [`EnergyBuffer`]) are
//! provided for hosts that have nothing better, and for tests.

use crate::id::{FluidId, ItemTypeId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stacks
// ---------------------------------------------------------------------------

/// A quantity of one item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemTypeId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ItemTypeId, count: u32) -> Self {
        Self { item, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A quantity of one fluid, in millibuckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidId,
    pub amount: u32,
}

impl FluidStack {
    pub fn new(fluid: FluidId, amount: u32) -> Self {
        Self { fluid, amount }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Slot-based item storage.
pub trait ItemHandler {
    fn slot_count(&self) -> usize;

    /// The stack in `slot`, or `None` if the slot is empty or out of range.
    fn stack_in_slot(&self, slot: usize) -> Option<&ItemStack>;

    /// Remove up to `count` items from `slot`. Returns the amount removed.
    fn shrink(&mut self, slot: usize, count: u32) -> u32;

    /// Insert a stack. Returns the count that did not fit.
    fn insert(&mut self, stack: &ItemStack, simulate: bool) -> u32;

    /// Whether every stack in `stacks` fits at once.
    fn can_insert_all(&self, stacks: &[ItemStack]) -> bool;
}

/// Tank-based fluid storage.
pub trait FluidHandler {
    fn tank_count(&self) -> usize;

    /// Peek at the contents of `tank` without draining.
    fn peek(&self, tank: usize) -> Option<&FluidStack>;

    /// Drain up to `amount` from a specific tank, whatever fluid it holds.
    fn drain_tank(&mut self, tank: usize, amount: u32, simulate: bool) -> Option<FluidStack>;

    /// Drain up to `request.amount` of `request.fluid` across all tanks.
    /// Returns `None` if nothing was drained.
    fn drain(&mut self, request: &FluidStack, simulate: bool) -> Option<FluidStack>;

    /// Fill with `stack`. Returns the amount accepted.
    fn fill(&mut self, stack: &FluidStack, simulate: bool) -> u32;

    /// Whether every stack in `stacks` fits at once.
    fn can_fill_all(&self, stacks: &[FluidStack]) -> bool;
}

/// An energy buffer a machine draws from or charges.
pub trait EnergyContainer {
    fn stored(&self) -> u64;
    fn capacity(&self) -> u64;
    /// The highest voltage (EU/t) this container accepts or emits.
    fn max_voltage(&self) -> u64;
    /// Average energy received over the last second.
    fn input_per_second(&self) -> u64;

    /// Apply `-eut` to the stored energy if the result stays within
    /// `0..=capacity`. Positive `eut` consumes, negative `eut` produces.
    /// Returns whether the change was (or would be) applied.
    fn draw(&mut self, eut: i64, simulate: bool) -> bool {
        let result = i128::from(self.stored()) - i128::from(eut);
        if result < 0 || result > i128::from(self.capacity()) {
            return false;
        }
        if !simulate {
            self.set_stored(result as u64);
        }
        true
    }

    fn set_stored(&mut self, value: u64);
}

// ---------------------------------------------------------------------------
// ItemSlots
// ---------------------------------------------------------------------------

/// A fixed number of slots, each holding at most `slot_limit` items of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlots {
    slots: Vec<Option<ItemStack>>,
    slot_limit: u32,
}

impl ItemSlots {
    pub fn new(slots: usize, slot_limit: u32) -> Self {
        Self {
            slots: vec![None; slots],
            slot_limit,
        }
    }

    /// Replace the contents of a slot. Out-of-range slots are ignored.
    pub fn set_slot(&mut self, slot: usize, stack: Option<ItemStack>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = stack.filter(|st| !st.is_empty());
        }
    }

    /// Total count of one item type across all slots.
    pub fn count_of(&self, item: ItemTypeId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    /// Empty every slot and return what was in them.
    pub fn take_all(&mut self) -> Vec<ItemStack> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    fn insert_inner(&mut self, stack: &ItemStack) -> u32 {
        let mut remaining = stack.count;
        // Top up matching stacks first, then fill empty slots.
        for slot in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if slot.item == stack.item {
                let room = self.slot_limit.saturating_sub(slot.count);
                let moved = room.min(remaining);
                slot.count += moved;
                remaining -= moved;
            }
        }
        for slot in &mut self.slots {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = self.slot_limit.min(remaining);
                *slot = Some(ItemStack::new(stack.item, moved));
                remaining -= moved;
            }
        }
        remaining
    }
}

impl ItemHandler for ItemSlots {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn shrink(&mut self, slot: usize, count: u32) -> u32 {
        let Some(entry) = self.slots.get_mut(slot) else {
            return 0;
        };
        let Some(stack) = entry.as_mut() else {
            return 0;
        };
        let removed = count.min(stack.count);
        stack.count -= removed;
        if stack.count == 0 {
            *entry = None;
        }
        removed
    }

    fn insert(&mut self, stack: &ItemStack, simulate: bool) -> u32 {
        if stack.is_empty() {
            return 0;
        }
        if simulate {
            self.clone().insert_inner(stack)
        } else {
            self.insert_inner(stack)
        }
    }

    fn can_insert_all(&self, stacks: &[ItemStack]) -> bool {
        let mut scratch = self.clone();
        stacks.iter().all(|s| scratch.insert_inner(s) == 0)
    }
}

// ---------------------------------------------------------------------------
// TankSet
// ---------------------------------------------------------------------------

/// A single fluid tank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidTank {
    pub capacity: u32,
    pub contents: Option<FluidStack>,
}

impl FluidTank {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            contents: None,
        }
    }

    pub fn amount(&self) -> u32 {
        self.contents.map_or(0, |c| c.amount)
    }

    fn drain_inner(&mut self, amount: u32, simulate: bool) -> Option<FluidStack> {
        let contents = self.contents.as_mut()?;
        let drained = amount.min(contents.amount);
        if drained == 0 {
            return None;
        }
        let out = FluidStack::new(contents.fluid, drained);
        if !simulate {
            contents.amount -= drained;
            if contents.amount == 0 {
                self.contents = None;
            }
        }
        Some(out)
    }

    fn fill_inner(&mut self, stack: &FluidStack) -> u32 {
        match self.contents.as_mut() {
            Some(c) if c.fluid != stack.fluid => 0,
            Some(c) => {
                let accepted = self.capacity.saturating_sub(c.amount).min(stack.amount);
                c.amount += accepted;
                accepted
            }
            None => {
                let accepted = self.capacity.min(stack.amount);
                if accepted > 0 {
                    self.contents = Some(FluidStack::new(stack.fluid, accepted));
                }
                accepted
            }
        }
    }
}

/// An ordered group of tanks behaving as one handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankSet {
    pub tanks: Vec<FluidTank>,
}

impl TankSet {
    pub fn new(tanks: usize, capacity: u32) -> Self {
        Self {
            tanks: vec![FluidTank::new(capacity); tanks],
        }
    }

    /// Total amount of one fluid across all tanks.
    pub fn amount_of(&self, fluid: FluidId) -> u32 {
        self.tanks
            .iter()
            .filter_map(|t| t.contents)
            .filter(|c| c.fluid == fluid)
            .map(|c| c.amount)
            .sum()
    }

    /// Empty every tank and return what was in them.
    pub fn take_all(&mut self) -> Vec<FluidStack> {
        self.tanks.iter_mut().filter_map(|t| t.contents.take()).collect()
    }

    fn fill_inner(&mut self, stack: &FluidStack) -> u32 {
        let mut remaining = *stack;
        // Prefer tanks already holding this fluid, then empty ones.
        for pass in 0..2 {
            for tank in &mut self.tanks {
                if remaining.amount == 0 {
                    return stack.amount;
                }
                let eligible = match tank.contents {
                    Some(c) => pass == 0 && c.fluid == stack.fluid,
                    None => pass == 1,
                };
                if eligible {
                    remaining.amount -= tank.fill_inner(&remaining);
                }
            }
        }
        stack.amount - remaining.amount
    }
}

impl FluidHandler for TankSet {
    fn tank_count(&self) -> usize {
        self.tanks.len()
    }

    fn peek(&self, tank: usize) -> Option<&FluidStack> {
        self.tanks.get(tank).and_then(|t| t.contents.as_ref())
    }

    fn drain_tank(&mut self, tank: usize, amount: u32, simulate: bool) -> Option<FluidStack> {
        self.tanks.get_mut(tank)?.drain_inner(amount, simulate)
    }

    fn drain(&mut self, request: &FluidStack, simulate: bool) -> Option<FluidStack> {
        let mut drained = 0u32;
        for tank in &mut self.tanks {
            if drained >= request.amount {
                break;
            }
            if tank.contents.is_some_and(|c| c.fluid == request.fluid)
                && let Some(out) = tank.drain_inner(request.amount - drained, simulate)
            {
                drained += out.amount;
            }
        }
        (drained > 0).then(|| FluidStack::new(request.fluid, drained))
    }

    fn fill(&mut self, stack: &FluidStack, simulate: bool) -> u32 {
        if simulate {
            self.clone().fill_inner(stack)
        } else {
            self.fill_inner(stack)
        }
    }

    fn can_fill_all(&self, stacks: &[FluidStack]) -> bool {
        let mut scratch = self.clone();
        stacks
            .iter()
            .all(|s| scratch.fill_inner(s) == s.amount)
    }
}

// ---------------------------------------------------------------------------
// EnergyBuffer
// ---------------------------------------------------------------------------

/// A plain battery buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyBuffer {
    pub stored: u64,
    pub capacity: u64,
    pub voltage: u64,
    pub input_per_second: u64,
}

impl EnergyBuffer {
    pub fn new(capacity: u64, voltage: u64) -> Self {
        Self {
            stored: 0,
            capacity,
            voltage,
            input_per_second: 0,
        }
    }
}

impl EnergyContainer for EnergyBuffer {
    fn stored(&self) -> u64 {
        self.stored
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn max_voltage(&self) -> u64 {
        self.voltage
    }

    fn input_per_second(&self) -> u64 {
        self.input_per_second
    }

    fn set_stored(&mut self, value: u64) {
        self.stored = value.min(self.capacity);
    }
}
