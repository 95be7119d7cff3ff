use log::error;
use zerocopy::{AsBytes, FromBytes, LayoutVerified};

use crate::error::ErrorKind;

/// Number of bytes in a sector, the unit of every device transfer.
pub const SECTOR_SIZE: usize = 1024;

/// Number of sectors on a single track.
pub const TRACK_SECTORS: usize = 1024;

/// Number of tracks the device exposes.
pub const MAX_TRACKS: u32 = 64;

/// Largest file a single track can hold.
pub const MAX_FILE_SIZE: usize = TRACK_SECTORS * SECTOR_SIZE;

pub(crate) const CRC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_CKSUM);

/// One sector worth of raw bytes.
#[derive(AsBytes, FromBytes, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Sector([u8; SECTOR_SIZE]);

impl Default for Sector {
    fn default() -> Self {
        Sector([0u8; SECTOR_SIZE])
    }
}

impl core::fmt::Debug for Sector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Sector(crc: 0x{:08x})", self.checksum())
    }
}

impl Sector {
    pub const fn capacity() -> usize {
        SECTOR_SIZE
    }

    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, ErrorKind> {
        let sector: Option<LayoutVerified<_, Sector>> = LayoutVerified::new(bytes);
        if let Some(sector) = sector {
            return Ok((*sector).clone());
        }

        error!("Cannot view {} bytes as a sector.", bytes.len());
        Err(ErrorKind::InconsistentState)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.as_bytes()
    }

    pub fn checksum(&self) -> u32 {
        CRC.checksum(self.as_bytes())
    }

    /// Copy bytes starting at `offset` into `data`, stopping at the end of the sector.
    pub fn read(&self, offset: usize, data: &mut [u8]) -> usize {
        let offset = core::cmp::min(offset, SECTOR_SIZE);
        let num_bytes = core::cmp::min(SECTOR_SIZE - offset, data.len());
        data[..num_bytes].copy_from_slice(&self.0[offset..offset + num_bytes]);
        num_bytes
    }

    /// Splice `data` in at `offset`, stopping at the end of the sector. Bytes outside the
    /// spliced range are left untouched.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> usize {
        let offset = core::cmp::min(offset, SECTOR_SIZE);
        let num_bytes = core::cmp::min(SECTOR_SIZE - offset, data.len());
        self.0[offset..offset + num_bytes].copy_from_slice(&data[..num_bytes]);
        num_bytes
    }
}

/// File-relative sector covering byte position `pos`.
pub(crate) const fn sector_index(pos: usize) -> usize {
    pos / SECTOR_SIZE
}

/// Position of byte `pos` inside its sector.
pub(crate) const fn sector_offset(pos: usize) -> usize {
    pos % SECTOR_SIZE
}

/// Sectors needed to hold `size` bytes.
pub(crate) const fn sector_count(size: usize) -> usize {
    (size + SECTOR_SIZE - 1) / SECTOR_SIZE
}
