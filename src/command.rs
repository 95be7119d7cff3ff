//! Command words exchanged with the device.
//!
//! Every request and every response is a single 64-bit word:
//!
//! ```text
//!  63    60 59          44 43                        12  11  10      0
//! +--------+--------------+----------------------------+----+---------+
//! | opcode |    sector    |           track            | st | reserved|
//! +--------+--------------+----------------------------+----+---------+
//! ```
//!
//! The status bit is only meaningful on a response; when set the request failed.

use crate::error::ErrorKind;
use log::warn;

const OPCODE_SHIFT: u32 = 60;
const SECTOR_SHIFT: u32 = 44;
const TRACK_SHIFT: u32 = 12;
const STATUS_SHIFT: u32 = 11;

pub(crate) const STATUS_BIT: u64 = 1 << STATUS_SHIFT;

const OPCODE_MASK: u64 = 0xF;
const SECTOR_MASK: u64 = 0xFFFF;
const TRACK_MASK: u64 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Mount = 0,
    SeekTrack = 1,
    ReadSector = 2,
    WriteSector = 3,
    Unmount = 4,
}

impl TryFrom<u8> for Opcode {
    type Error = ErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Mount),
            1 => Ok(Opcode::SeekTrack),
            2 => Ok(Opcode::ReadSector),
            3 => Ok(Opcode::WriteSector),
            4 => Ok(Opcode::Unmount),
            _ => Err(ErrorKind::MalformedCommand),
        }
    }
}

/// Decoded form of a command word. Field types match the on-wire widths so any value can be
/// encoded without truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: Opcode,
    pub sector: u16,
    pub track: u32,
    pub failed: bool,
}

impl Command {
    pub const fn new(opcode: Opcode, sector: u16, track: u32) -> Self {
        Command {
            opcode,
            sector,
            track,
            failed: false,
        }
    }

    pub const fn mount() -> Self {
        Self::new(Opcode::Mount, 0, 0)
    }

    pub const fn unmount() -> Self {
        Self::new(Opcode::Unmount, 0, 0)
    }

    pub const fn seek_track(track: u32) -> Self {
        Self::new(Opcode::SeekTrack, 0, track)
    }

    pub const fn read_sector(sector: u16) -> Self {
        Self::new(Opcode::ReadSector, sector, 0)
    }

    pub const fn write_sector(sector: u16) -> Self {
        Self::new(Opcode::WriteSector, sector, 0)
    }

    pub const fn with_status(self, failed: bool) -> Self {
        Command { failed, ..self }
    }

    /// True when the device reported that the request failed.
    pub const fn failed(&self) -> bool {
        self.failed
    }

    pub const fn encode(&self) -> u64 {
        ((self.opcode as u64) << OPCODE_SHIFT)
            | ((self.sector as u64) << SECTOR_SHIFT)
            | ((self.track as u64) << TRACK_SHIFT)
            | ((self.failed as u64) << STATUS_SHIFT)
    }

    /// Reserved bits are ignored. Fails only when the opcode nibble names no known opcode.
    pub fn decode(word: u64) -> Result<Self, ErrorKind> {
        let raw_opcode = ((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8;
        let opcode = Opcode::try_from(raw_opcode).map_err(|e| {
            warn!("Command word 0x{:016x} carries unknown opcode {}.", word, raw_opcode);
            e
        })?;
        Ok(Command {
            opcode,
            sector: ((word >> SECTOR_SHIFT) & SECTOR_MASK) as u16,
            track: ((word >> TRACK_SHIFT) & TRACK_MASK) as u32,
            failed: (word >> STATUS_SHIFT) & 1 == 1,
        })
    }
}
