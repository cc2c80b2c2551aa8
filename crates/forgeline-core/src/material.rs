//! Fluid registry and the water-equivalent fluid set used by boilers.

use std::collections::HashMap;

use crate::config::MachineConfig;
use crate::id::FluidId;

pub const WATER: &str = "water";
pub const DISTILLED_WATER: &str = "distilled_water";
pub const STEAM: &str = "steam";

/// Errors raised when a material reference cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialError {
    #[error("unknown fluid: {0}")]
    UnknownFluid(String),
}

// ---------------------------------------------------------------------------
// FluidRegistry
// ---------------------------------------------------------------------------

/// Name <-> id table for fluids, with a default substance used when a
/// reference cannot be resolved.
#[derive(Debug, Clone)]
pub struct FluidRegistry {
    names: Vec<String>,
    by_name: HashMap<String, FluidId>,
    default: FluidId,
}

impl FluidRegistry {
    /// A registry holding water, distilled water and steam, with water as
    /// the default substance.
    pub fn new() -> Self {
        let mut reg = Self {
            names: Vec::new(),
            by_name: HashMap::new(),
            default: FluidId(0),
        };
        reg.default = reg.register(WATER);
        reg.register(DISTILLED_WATER);
        reg.register(STEAM);
        reg
    }

    /// Register a fluid by name. Registering an existing name returns its id.
    pub fn register(&mut self, name: &str) -> FluidId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = FluidId(u32::try_from(self.names.len()).unwrap_or(u32::MAX));
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn resolve(&self, name: &str) -> Result<FluidId, MaterialError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| MaterialError::UnknownFluid(name.to_string()))
    }

    /// Resolve a name, substituting the default substance (and logging an
    /// error) when it is unknown.
    pub fn resolve_or_default(&self, name: &str) -> FluidId {
        self.resolve(name).unwrap_or_else(|e| {
            log::error!("{e}; falling back to {}", self.name(self.default).unwrap_or(WATER));
            self.default
        })
    }

    pub fn name(&self, id: FluidId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn default_fluid(&self) -> FluidId {
        self.default
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn water(&self) -> FluidId {
        self.resolve_or_default(WATER)
    }

    pub fn distilled_water(&self) -> FluidId {
        self.resolve_or_default(DISTILLED_WATER)
    }

    pub fn steam(&self) -> FluidId {
        self.resolve_or_default(STEAM)
    }
}

impl Default for FluidRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// WaterFluids
// ---------------------------------------------------------------------------

/// Fluids a boiler accepts as water, in drain-priority order: plain water,
/// distilled water, then the configured extras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterFluids {
    order: Vec<FluidId>,
}

impl WaterFluids {
    pub fn new(water: FluidId, alternate: FluidId, extra: &[FluidId]) -> Self {
        let mut order = vec![water];
        for &f in std::iter::once(&alternate).chain(extra) {
            if !order.contains(&f) {
                order.push(f);
            }
        }
        Self { order }
    }

    /// Build from configuration. Unknown extra names are skipped with a warning.
    pub fn from_config(registry: &FluidRegistry, config: &MachineConfig) -> Self {
        let extra: Vec<FluidId> = config
            .boiler_fluids
            .iter()
            .filter_map(|name| match registry.resolve(name) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("ignoring boiler fluid: {e}");
                    None
                }
            })
            .collect();
        Self::new(registry.water(), registry.distilled_water(), &extra)
    }

    pub fn contains(&self, fluid: FluidId) -> bool {
        self.order.contains(&fluid)
    }

    /// Candidates in drain-priority order.
    pub fn candidates(&self) -> &[FluidId] {
        &self.order
    }
}
