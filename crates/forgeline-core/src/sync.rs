//! Remote observer sync.
//!
//! A [`SyncChannel`] sits next to each authoritative machine. The first
//! time it is collected it emits a full [`SyncPacket::Initial`] snapshot;
//! after that it emits one [`SyncPacket::Delta`] per field whose value
//! actually changed since the previous collection. A [`RemoteView`] on the
//! other side applies the packets to rebuild the observable state.
//!
//! Wire encoding:
//!
//! | value            | encoding                                  |
//! |------------------|-------------------------------------------|
//! | field tag        | varint                                    |
//! | bool             | one byte, 0 or 1                          |
//! | progress, heat   | varint (7 bits per byte, low group first) |
//! | last-tick steam  | 8-byte big-endian signed long             |
//!
//! The initial snapshot lays out `is_active`, `is_working_enabled`,
//! `progress_time`, `max_progress_time` and, for boilers, `current_heat`
//! then `last_tick_steam`.

use serde::{Deserialize, Serialize};

/// Field tags carried by delta packets.
pub const WORKABLE_ACTIVE: u32 = 1;
pub const WORKING_ENABLED: u32 = 2;
pub const PROGRESS: u32 = 3;
pub const MAX_PROGRESS: u32 = 4;
pub const BOILER_HEAT: u32 = 5;
pub const BOILER_LAST_TICK_STEAM: u32 = 6;

const VARINT_MAX_BYTES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("packet ended early")]
    Truncated,
    #[error("varint longer than {VARINT_MAX_BYTES} bytes")]
    MalformedVarint,
    #[error("unknown field tag {0}")]
    UnknownField(u32),
    #[error("boiler field {0} sent to a non-boiler view")]
    NotABoiler(u32),
    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn write_varint(&mut self, mut v: u32) {
        loop {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn write_long(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8, SyncError> {
        let b = *self.buf.get(self.pos).ok_or(SyncError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bool(&mut self) -> Result<bool, SyncError> {
        Ok(self.byte()? != 0)
    }

    pub fn read_varint(&mut self) -> Result<u32, SyncError> {
        let mut value = 0u32;
        for i in 0..VARINT_MAX_BYTES {
            let b = self.byte()?;
            value |= u32::from(b & 0x7F) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(SyncError::MalformedVarint)
    }

    pub fn read_long(&mut self) -> Result<i64, SyncError> {
        let end = self.pos + 8;
        let bytes = self.buf.get(self.pos..end).ok_or(SyncError::Truncated)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        self.pos = end;
        Ok(i64::from_be_bytes(raw))
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn expect_end(&self) -> Result<(), SyncError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(SyncError::TrailingBytes(n)),
        }
    }
}

fn steam_to_wire(steam: u64) -> i64 {
    i64::try_from(steam).unwrap_or(i64::MAX)
}

fn steam_from_wire(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Values and packets
// ---------------------------------------------------------------------------

/// The observable subset of a machine's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncValues {
    pub is_active: bool,
    pub is_working_enabled: bool,
    pub progress_time: u32,
    pub max_progress_time: u32,
    /// `(current_heat, last_tick_steam)` for boilers.
    pub boiler: Option<(u32, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPacket {
    Initial(Vec<u8>),
    Delta(Vec<u8>),
}

impl SyncPacket {
    pub fn bytes(&self) -> &[u8] {
        match self {
            SyncPacket::Initial(b) | SyncPacket::Delta(b) => b,
        }
    }
}

fn encode_initial(v: &SyncValues) -> SyncPacket {
    let mut w = PacketWriter::new();
    w.write_bool(v.is_active);
    w.write_bool(v.is_working_enabled);
    w.write_varint(v.progress_time);
    w.write_varint(v.max_progress_time);
    if let Some((heat, steam)) = v.boiler {
        w.write_varint(heat);
        w.write_long(steam_to_wire(steam));
    }
    SyncPacket::Initial(w.finish())
}

fn delta(tag: u32, write: impl FnOnce(&mut PacketWriter)) -> SyncPacket {
    let mut w = PacketWriter::new();
    w.write_varint(tag);
    write(&mut w);
    SyncPacket::Delta(w.finish())
}

// ---------------------------------------------------------------------------
// SyncChannel
// ---------------------------------------------------------------------------

/// Authoritative side: turns successive snapshots into packets.
#[derive(Debug, Clone, Default)]
pub struct SyncChannel {
    last: Option<SyncValues>,
}

impl SyncChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what was sent; the next collection sends a full snapshot.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Packets needed to bring an observer up to `current`.
    pub fn collect(&mut self, current: &SyncValues) -> Vec<SyncPacket> {
        let Some(prev) = self.last.replace(current.clone()) else {
            return vec![encode_initial(current)];
        };
        let mut out = Vec::new();
        if prev.is_active != current.is_active {
            out.push(delta(WORKABLE_ACTIVE, |w| w.write_bool(current.is_active)));
        }
        if prev.is_working_enabled != current.is_working_enabled {
            out.push(delta(WORKING_ENABLED, |w| {
                w.write_bool(current.is_working_enabled)
            }));
        }
        if prev.progress_time != current.progress_time {
            out.push(delta(PROGRESS, |w| w.write_varint(current.progress_time)));
        }
        if prev.max_progress_time != current.max_progress_time {
            out.push(delta(MAX_PROGRESS, |w| {
                w.write_varint(current.max_progress_time)
            }));
        }
        if let (Some((old_heat, old_steam)), Some((heat, steam))) = (prev.boiler, current.boiler) {
            if old_heat != heat {
                out.push(delta(BOILER_HEAT, |w| w.write_varint(heat)));
            }
            if old_steam != steam {
                out.push(delta(BOILER_LAST_TICK_STEAM, |w| {
                    w.write_long(steam_to_wire(steam))
                }));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// RemoteView
// ---------------------------------------------------------------------------

/// Observer side: rebuilt from packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteView {
    is_boiler: bool,
    values: SyncValues,
}

impl RemoteView {
    pub fn new(is_boiler: bool) -> Self {
        Self {
            is_boiler,
            values: SyncValues {
                boiler: is_boiler.then_some((0, 0)),
                ..SyncValues::default()
            },
        }
    }

    pub fn values(&self) -> &SyncValues {
        &self.values
    }

    /// Apply a packet. On error the view is left unchanged.
    pub fn apply(&mut self, packet: &SyncPacket) -> Result<(), SyncError> {
        let mut r = PacketReader::new(packet.bytes());
        let mut next = self.values.clone();
        match packet {
            SyncPacket::Initial(_) => {
                next.is_active = r.read_bool()?;
                next.is_working_enabled = r.read_bool()?;
                next.progress_time = r.read_varint()?;
                next.max_progress_time = r.read_varint()?;
                if self.is_boiler {
                    let heat = r.read_varint()?;
                    let steam = steam_from_wire(r.read_long()?);
                    next.boiler = Some((heat, steam));
                }
            }
            SyncPacket::Delta(_) => {
                let tag = r.read_varint()?;
                match tag {
                    WORKABLE_ACTIVE => next.is_active = r.read_bool()?,
                    WORKING_ENABLED => next.is_working_enabled = r.read_bool()?,
                    PROGRESS => next.progress_time = r.read_varint()?,
                    MAX_PROGRESS => next.max_progress_time = r.read_varint()?,
                    BOILER_HEAT | BOILER_LAST_TICK_STEAM => {
                        let (heat, steam) =
                            next.boiler.as_mut().ok_or(SyncError::NotABoiler(tag))?;
                        if tag == BOILER_HEAT {
                            *heat = r.read_varint()?;
                        } else {
                            *steam = steam_from_wire(r.read_long()?);
                        }
                    }
                    other => return Err(SyncError::UnknownField(other)),
                }
            }
        }
        r.expect_end()?;
        self.values = next;
        Ok(())
    }
}
