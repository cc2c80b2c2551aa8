//! Machine events and the ring buffer that records them.
//!
//! Machines report what happened during their tick as [`MachineEvent`]s.
//! The [`Plant`](crate::plant::Plant) stamps each one with the machine id
//! and tick and records it in a fixed-capacity [`EventBuffer`]; when the
//! buffer is full the oldest events are dropped. Callers drain the buffer
//! between steps.

use crate::fixed::{Fixed64, Ticks};
use crate::id::MachineId;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something a single machine did during its tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    RecipeStarted {
        max_progress_time: u32,
        recipe_eut: i64,
    },
    RecipeCompleted,
    /// The observable run flag changed between the start and end of a tick.
    ActiveChanged {
        active: bool,
    },
    SteamProduced {
        amount: u64,
    },
    /// Water starvation while boiling. Terminal for the machine.
    Exploded {
        force: Fixed64,
    },
}

/// Discriminant tag for machine events, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RecipeStarted,
    RecipeCompleted,
    ActiveChanged,
    SteamProduced,
    Exploded,
}

impl MachineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MachineEvent::RecipeStarted { .. } => EventKind::RecipeStarted,
            MachineEvent::RecipeCompleted => EventKind::RecipeCompleted,
            MachineEvent::ActiveChanged { .. } => EventKind::ActiveChanged,
            MachineEvent::SteamProduced { .. } => EventKind::SteamProduced,
            MachineEvent::Exploded { .. } => EventKind::Exploded,
        }
    }
}

/// A machine event stamped with where and when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantEvent {
    pub machine: MachineId,
    pub tick: Ticks,
    pub event: MachineEvent,
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer of plant events.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<PlantEvent>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
    /// Events overwritten before anyone read them.
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    /// Record an event, overwriting the oldest one when full.
    pub fn push(&mut self, event: PlantEvent) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        } else {
            self.dropped += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events lost because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    fn oldest(&self) -> usize {
        if self.len < self.capacity() {
            0
        } else {
            self.head
        }
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PlantEvent> {
        let start = self.oldest();
        let cap = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % cap].as_ref())
    }

    /// Remove and return every stored event, oldest first.
    pub fn drain(&mut self) -> Vec<PlantEvent> {
        let start = self.oldest();
        let cap = self.capacity();
        let out = (0..self.len)
            .filter_map(|i| self.events[(start + i) % cap].take())
            .collect();
        self.head = 0;
        self.len = 0;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn machine() -> MachineId {
        let mut map: SlotMap<MachineId, ()> = SlotMap::with_key();
        map.insert(())
    }

    fn at(machine: MachineId, tick: Ticks) -> PlantEvent {
        PlantEvent {
            machine,
            tick,
            event: MachineEvent::RecipeCompleted,
        }
    }

    #[test]
    fn ring_buffer_overwrites_oldest() {
        let m = machine();
        let mut buf = EventBuffer::new(3);
        for t in 0..5 {
            buf.push(at(m, t));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.dropped_count(), 2);
        let ticks: Vec<Ticks> = buf.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn drain_empties_in_order() {
        let m = machine();
        let mut buf = EventBuffer::new(4);
        buf.push(at(m, 7));
        buf.push(at(m, 8));
        let drained: Vec<Ticks> = buf.drain().into_iter().map(|e| e.tick).collect();
        assert_eq!(drained, vec![7, 8]);
        assert!(buf.is_empty());
        assert_eq!(buf.total_written(), 2);
    }

    #[test]
    fn draining_does_not_count_as_dropping() {
        let m = machine();
        let mut buf = EventBuffer::new(3);
        buf.push(at(m, 0));
        buf.push(at(m, 1));
        assert_eq!(buf.drain().len(), 2);
        buf.push(at(m, 2));
        buf.push(at(m, 3));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.dropped_count(), 0);

        buf.push(at(m, 4));
        buf.push(at(m, 5));
        assert_eq!(buf.dropped_count(), 1);
        let ticks: Vec<Ticks> = buf.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn event_kind() {
        let e = MachineEvent::Exploded {
            force: Fixed64::from_num(4),
        };
        assert_eq!(e.kind(), EventKind::Exploded);
    }
}
