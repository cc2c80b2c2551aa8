//! Machine configuration and boiler tiers.

use serde::{Deserialize, Serialize};

use crate::fixed::saturating_u32;

/// Default capacity of the plant's event ring buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Global machine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Whether maintenance faults affect machines at all.
    pub enable_maintenance: bool,
    /// Extra fluid names a boiler accepts in place of water.
    pub boiler_fluids: Vec<String>,
    /// Capacity of the plant's event ring buffer.
    pub event_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            enable_maintenance: true,
            boiler_fluids: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Boiler tiers
// ---------------------------------------------------------------------------

/// Structural tier of a large boiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoilerType {
    pub name: String,
    /// Steam produced per tick at full heat and full throttle.
    pub steam_per_tick: u64,
    /// Ticks of continuous burning to reach full heat. This is the boiler's
    /// maximum heat.
    pub ticks_to_boiling: u32,
    /// Burn-duration multiplier, in percent.
    pub runtime_boost_percent: u32,
}

impl BoilerType {
    pub fn new(
        name: &str,
        steam_per_tick: u64,
        ticks_to_boiling: u32,
        runtime_boost_percent: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            steam_per_tick,
            ticks_to_boiling: ticks_to_boiling.max(1),
            runtime_boost_percent,
        }
    }

    pub fn bronze() -> Self {
        Self::new("bronze", 800, 400, 200)
    }

    pub fn steel() -> Self {
        Self::new("steel", 1800, 600, 150)
    }

    pub fn titanium() -> Self {
        Self::new("titanium", 3200, 800, 120)
    }

    pub fn tungstensteel() -> Self {
        Self::new("tungstensteel", 6400, 1000, 100)
    }

    pub fn max_heat(&self) -> u32 {
        self.ticks_to_boiling.max(1)
    }

    /// Scale a burn duration by this tier's runtime boost.
    pub fn runtime_boost(&self, ticks: u32) -> u32 {
        saturating_u32(u64::from(ticks) * u64::from(self.runtime_boost_percent) / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_maintenance() {
        let c = MachineConfig::default();
        assert!(c.enable_maintenance);
        assert!(c.boiler_fluids.is_empty());
        assert_eq!(c.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn runtime_boost_scales_by_percent() {
        assert_eq!(BoilerType::bronze().runtime_boost(100), 200);
        assert_eq!(BoilerType::steel().runtime_boost(101), 151);
        assert_eq!(BoilerType::tungstensteel().runtime_boost(37), 37);
    }

    #[test]
    fn runtime_boost_saturates() {
        let t = BoilerType::new("huge", 1, 1, 1000);
        assert_eq!(t.runtime_boost(u32::MAX), u32::MAX);
    }

    #[test]
    fn max_heat_is_never_zero() {
        let t = BoilerType::new("odd", 1, 0, 100);
        assert_eq!(t.max_heat(), 1);
    }
}
