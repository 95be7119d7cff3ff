//! A byte-stream file API layered over a sector-addressed block device.
//!
//! Files are opened by name and read or written through a cursor. Each file owns one track of
//! the device; bytes are translated to file-relative sectors, sub-sector writes are merged with
//! the sector's current contents, and recently touched sectors are kept in a fixed-size LRU
//! cache so repeated reads do not go back to the device.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod cache;
pub mod command;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod file_table;
pub mod util;

#[cfg(test)]
mod tests_util;

pub use cache::{CacheKey, CacheStats, PutOutcome, SectorCache};
pub use command::{Command, Opcode};
pub use config::EngineConfig;
pub use device::{Device, DeviceStats, RamDevice};
pub use engine::Engine;
pub use error::ErrorKind;
pub use file_table::{FileRecord, FileStatus, FileTable, Handle};
pub use util::{Sector, MAX_FILE_SIZE, MAX_TRACKS, SECTOR_SIZE, TRACK_SECTORS};
