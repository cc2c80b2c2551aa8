//! Forgeline Core -- tick-based simulation of industrial processing machines.
//!
//! This crate provides the machine lifecycle, recipe selection, large boiler
//! thermodynamics, fractional-rate accumulation, observer sync and binary
//! persistence that every Forgeline host depends on. It never owns the
//! world: inventories, tanks and energy buffers are reached through narrow
//! traits in [`container`].
//!
//! # Per-Machine Tick
//!
//! Each call to [`plant::Plant::step`] ticks every machine once, in insertion
//! order. A single machine tick runs:
//!
//! 1. **Pre-tick** -- Kind-specific upkeep. Boilers lose heat while idle.
//! 2. **Progress** -- If a recipe is running and working is enabled, draw
//!    energy (or boil water) and advance progress. Completion emits outputs.
//! 3. **Search** -- If nothing is running, select a recipe (or fuel) and
//!    consume its inputs atomically.
//! 4. **Settle** -- Clear `is_active` unless a run restarted this tick.
//!
//! Afterwards the plant records events, collects sync packets and removes
//! machines that failed (exploded boilers).
//!
//! # Fractional Rates
//!
//! Integer-only containers cannot take fractional amounts. Rates such as
//! "160 steam per water" or "80 furnace ticks per boiler tick" go through a
//! [`accumulator::RateQuantizer`], which carries the remainder forward so
//! nothing is lost or created over time:
//!
//! ```rust,ignore
//! let mut water = RateQuantizer::new(STEAM_PER_WATER);
//! let drained = water.cover(4000); // 25, remainder 0
//! ```
//!
//! # Key Types
//!
//! - [`plant::Plant`] -- Owns machines, the recipe book and the event buffer.
//! - [`logic::RecipeWorkflow`] -- Override points of the shared lifecycle.
//! - [`logic::GenericLogic`] -- Recipe-map machines (consumers and generators).
//! - [`boiler::BoilerLogic`] -- Large boiler: heat, throttle, water, steam.
//! - [`selector`] -- Atomic recipe selection and boiler fuel selection.
//! - [`sync::SyncChannel`] -- Initial snapshot plus tagged delta packets.
//! - [`persist::MachineRecord`] -- Versioned machine state via bitcode.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic ratios.

pub mod accumulator;
pub mod boiler;
pub mod config;
pub mod container;
pub mod event;
pub mod fixed;
pub mod id;
pub mod logic;
pub mod material;
pub mod persist;
pub mod plant;
pub mod recipe;
pub mod selector;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
