//! Binary persistence of machine state.
//!
//! A [`MachineRecord`] holds what a machine needs to resume after a reload:
//! the run state, any outputs the run still owes, and for boilers the heat,
//! throttle and the three carried remainders. Records are encoded with
//! `bitcode` behind a magic number and format version.

use serde::{Deserialize, Serialize};

use crate::container::{FluidStack, ItemStack};

/// Magic number identifying a machine record.
pub const RECORD_MAGIC: u32 = 0xF0E6_11E0;

/// Current record format version. Increment when breaking the layout.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", RECORD_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub magic: u32,
    pub version: u32,
}

impl RecordHeader {
    pub fn new() -> Self {
        Self {
            magic: RECORD_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), PersistError> {
        if self.magic != RECORD_MAGIC {
            return Err(PersistError::InvalidMagic(self.magic));
        }
        if self.version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Run state shared by every machine kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub progress_time: u32,
    pub max_progress_time: u32,
    pub recipe_eut: i64,
    pub is_active: bool,
    pub is_working_enabled: bool,
    pub pending_items: Vec<ItemStack>,
    pub pending_fluids: Vec<FluidStack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoilerRecord {
    pub heat: u32,
    pub excess_fuel: u64,
    pub excess_water: u64,
    pub excess_projected_eu: u64,
    pub throttle: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub header: RecordHeader,
    pub processing: ProcessingRecord,
    pub boiler: Option<BoilerRecord>,
}

impl MachineRecord {
    pub fn new(processing: ProcessingRecord, boiler: Option<BoilerRecord>) -> Self {
        Self {
            header: RecordHeader::new(),
            processing,
            boiler,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PersistError> {
        bitcode::serialize(self).map_err(|e| PersistError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, PersistError> {
        let record: Self =
            bitcode::deserialize(data).map_err(|e| PersistError::Decode(e.to_string()))?;
        record.header.validate()?;
        Ok(record)
    }
}
