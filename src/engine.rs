use log::{debug, error, info, trace, warn};

use crate::cache::{CacheKey, CacheStats, PutOutcome, SectorCache};
use crate::command::Command;
use crate::config::EngineConfig;
use crate::device::Device;
use crate::error::ErrorKind;
use crate::file_table::{FileRecord, FileTable, Handle};
use crate::util::{sector_index, sector_offset, Sector, MAX_FILE_SIZE};

/// Device plus the state that outlives a mount: the sector cache and its statistics.
struct Controller<D: Device> {
    device: D,
    cache: SectorCache,
    stats: CacheStats,
}

impl<D: Device> Controller<D> {
    fn command(&mut self, cmd: Command, buf: Option<&mut Sector>) -> Result<(), ErrorKind> {
        debug!(
            "cmd {:?} sector: {} track: {}",
            cmd.opcode, cmd.sector, cmd.track
        );
        let response = Command::decode(self.device.call(cmd.encode(), buf))?;
        if response.failed {
            error!("Device failed {:?}.", cmd);
            return Err(ErrorKind::DeviceError);
        }
        Ok(())
    }

    fn read_at(
        &mut self,
        handle: Handle,
        track: u32,
        offset: usize,
        data: &mut [u8],
    ) -> Result<usize, ErrorKind> {
        self.command(Command::seek_track(track), None)?;

        let mut pos = 0;
        let mut sector = Sector::default();
        while pos < data.len() {
            let file_pos = offset + pos;
            let sector_idx = sector_index(file_pos);
            let key = CacheKey::new(handle, sector_idx);

            match self.cache.get(&key).cloned() {
                Some(cached) => {
                    self.stats.record_hit();
                    sector = cached;
                }
                None => {
                    self.stats.record_miss();
                    self.command(Command::read_sector(sector_idx as u16), Some(&mut sector))?;
                    self.cache.put(key, &sector);
                }
            }

            let num_bytes = sector.read(sector_offset(file_pos), &mut data[pos..]);
            trace!(
                "rd sector: {} pos: {} num_bytes: {}",
                sector_idx,
                file_pos,
                num_bytes
            );
            pos += num_bytes;
        }

        Ok(pos)
    }

    fn write_at(
        &mut self,
        handle: Handle,
        track: u32,
        offset: usize,
        data: &[u8],
    ) -> Result<usize, ErrorKind> {
        self.command(Command::seek_track(track), None)?;

        let mut pos = 0;
        while pos < data.len() {
            let file_pos = offset + pos;
            let sector_idx = sector_index(file_pos);

            // Merge into the sector as the device currently holds it.
            let mut sector = Sector::default();
            self.stats.record_miss();
            self.command(Command::read_sector(sector_idx as u16), Some(&mut sector))?;
            let num_bytes = sector.write(sector_offset(file_pos), &data[pos..]);
            self.command(Command::write_sector(sector_idx as u16), Some(&mut sector))?;

            let outcome = self.cache.put(CacheKey::new(handle, sector_idx), &sector);
            trace!(
                "wr sector: {} pos: {} num_bytes: {} cache: {:?}",
                sector_idx,
                file_pos,
                num_bytes,
                outcome
            );
            if let PutOutcome::Eviction(evicted) = outcome {
                debug!("cache dropped {:?}", evicted);
            }
            pos += num_bytes;
        }

        Ok(pos)
    }
}

/// File operations over a device, with sector caching.
///
/// The engine starts unmounted. `mount` creates the session's file table and `unmount` drops
/// it; every file operation in between works against that table. The cache keeps its capacity
/// and its statistics keep counting across sessions, but cached lines do not survive an
/// unmount since handles are only meaningful inside one session.
///
/// Each file lives on the track numbered by its handle. Opening more than `MAX_TRACKS` files
/// succeeds, but reads and writes on the extra files fail with `DeviceError` because the device
/// refuses to seek past its last track.
pub struct Engine<D: Device> {
    ctl: Controller<D>,
    session: Option<FileTable>,
}

impl<D: Device> Engine<D> {
    pub fn new(device: D, config: EngineConfig) -> Self {
        Engine {
            ctl: Controller {
                device,
                cache: SectorCache::new(config.cache_lines),
                stats: CacheStats::default(),
            },
            session: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    pub fn mount(&mut self) -> Result<(), ErrorKind> {
        if self.is_mounted() {
            warn!("mount: already mounted");
            return Err(ErrorKind::AlreadyMounted);
        }
        self.ctl.command(Command::mount(), None)?;
        self.session = Some(FileTable::new());
        info!("mounted, cache lines: {}", self.ctl.cache.capacity());
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<(), ErrorKind> {
        let table = self.session.as_mut().ok_or(ErrorKind::NotMounted)?;
        let released = table.len();
        *table = FileTable::new();
        self.ctl.cache.clear();

        self.ctl.command(Command::unmount(), None)?;
        self.session = None;
        info!("unmounted, released {} files", released);
        Ok(())
    }

    pub fn open(&mut self, path: &str) -> Result<Handle, ErrorKind> {
        self.table_mut()?.open(path)
    }

    pub fn close(&mut self, handle: Handle) -> Result<(), ErrorKind> {
        self.table_mut()?.close(handle)
    }

    pub fn seek(&mut self, handle: Handle, offset: usize) -> Result<(), ErrorKind> {
        self.table_mut()?.seek(handle, offset)
    }

    /// Fill `data` from the file's cursor onward. Either all of `data` is filled and the cursor
    /// moves past it, or the call fails and the cursor stays where it was.
    pub fn read(&mut self, handle: Handle, data: &mut [u8]) -> Result<usize, ErrorKind> {
        let table = self.session.as_mut().ok_or(ErrorKind::NotMounted)?;
        let record = table.get_mut(handle)?;
        if !record.is_open() {
            return Err(ErrorKind::AlreadyClosed);
        }
        if data.len() > record.size - record.pointer {
            warn!(
                "read {:?}: {} bytes requested, {} left",
                handle,
                data.len(),
                record.size - record.pointer
            );
            return Err(ErrorKind::OutOfRange);
        }

        info!(
            "rd {:?} offset: {} data len: {}",
            handle,
            record.pointer,
            data.len()
        );
        let num_bytes = self
            .ctl
            .read_at(handle, record.track(), record.pointer, data)?;
        record.pointer += num_bytes;
        Ok(num_bytes)
    }

    /// Write `data` at the file's cursor, growing the file when the cursor passes its end.
    ///
    /// A device failure part way through leaves the sectors written so far on the device, but
    /// the cursor and size stay as they were.
    pub fn write(&mut self, handle: Handle, data: &[u8]) -> Result<usize, ErrorKind> {
        let table = self.session.as_mut().ok_or(ErrorKind::NotMounted)?;
        let record = table.get_mut(handle)?;
        if !record.is_open() {
            return Err(ErrorKind::AlreadyClosed);
        }
        if record.pointer + data.len() > MAX_FILE_SIZE {
            warn!(
                "write {:?}: {} bytes at {} exceed the track",
                handle,
                data.len(),
                record.pointer
            );
            return Err(ErrorKind::OutOfRange);
        }

        info!(
            "wr {:?} offset: {} data len: {}",
            handle,
            record.pointer,
            data.len()
        );
        let num_bytes = self
            .ctl
            .write_at(handle, record.track(), record.pointer, data)?;
        record.pointer += num_bytes;
        record.size = core::cmp::max(record.size, record.pointer);
        Ok(num_bytes)
    }

    pub fn file(&self, handle: Handle) -> Result<&FileRecord, ErrorKind> {
        self.session
            .as_ref()
            .ok_or(ErrorKind::NotMounted)?
            .get(handle)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.ctl.stats
    }

    pub fn log_cache_metrics(&self) {
        let stats = self.ctl.stats;
        match stats.hit_ratio() {
            Some(ratio) => info!(
                "cache: {} hits, {} misses, hit ratio {:.3}",
                stats.hits, stats.misses, ratio
            ),
            None => info!("cache: no sector lookups yet"),
        }
    }

    pub fn device(&self) -> &D {
        &self.ctl.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.ctl.device
    }

    fn table_mut(&mut self) -> Result<&mut FileTable, ErrorKind> {
        self.session.as_mut().ok_or(ErrorKind::NotMounted)
    }
}
