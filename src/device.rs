use alloc::collections::BTreeMap;
use log::{debug, trace, warn};

use crate::command::{Command, Opcode, STATUS_BIT};
use crate::util::{Sector, MAX_TRACKS, TRACK_SECTORS};

/// The bus to the block device. A command word goes in, a response word comes back; `buf` is
/// present for sector transfers only. The response's status bit is the only error signal.
pub trait Device {
    fn call(&mut self, cmd: u64, buf: Option<&mut Sector>) -> u64;
}

impl<D: Device + ?Sized> Device for &mut D {
    fn call(&mut self, cmd: u64, buf: Option<&mut Sector>) -> u64 {
        (**self).call(cmd, buf)
    }
}

/// Commands seen by a device, per opcode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    pub mounts: u64,
    pub seeks: u64,
    pub reads: u64,
    pub writes: u64,
    pub unmounts: u64,
    pub failures: u64,
}

impl DeviceStats {
    pub fn total(&self) -> u64 {
        self.mounts + self.seeks + self.reads + self.writes + self.unmounts
    }

    fn record(&mut self, opcode: Opcode) {
        match opcode {
            Opcode::Mount => self.mounts += 1,
            Opcode::SeekTrack => self.seeks += 1,
            Opcode::ReadSector => self.reads += 1,
            Opcode::WriteSector => self.writes += 1,
            Opcode::Unmount => self.unmounts += 1,
        }
    }
}

struct StoredSector {
    data: Sector,
    crc: u32,
}

/// Block device kept entirely in memory.
///
/// Data survives unmount so a later session sees what an earlier one wrote. Every stored sector
/// is checksummed and a read whose payload no longer matches its checksum fails.
#[derive(Default)]
pub struct RamDevice {
    mounted: bool,
    track: Option<u32>,
    sectors: BTreeMap<(u32, u16), StoredSector>,
    stats: DeviceStats,
    fail_after: Option<u64>,
}

impl RamDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Let `n` more commands succeed, then fail the next one.
    pub fn fail_after(&mut self, n: u64) {
        self.fail_after = Some(n);
    }

    /// Damage the stored copy of a sector without updating its checksum.
    pub fn corrupt(&mut self, track: u32, sector: u16) {
        if let Some(stored) = self.sectors.get_mut(&(track, sector)) {
            let mut first = [0u8; 1];
            stored.data.read(0, &mut first);
            stored.data.write(0, &[!first[0]]);
        }
    }

    fn injected_failure(&mut self) -> bool {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                true
            }
            Some(n) => {
                self.fail_after = Some(n - 1);
                false
            }
            None => false,
        }
    }

    fn execute(&mut self, cmd: &Command, buf: Option<&mut Sector>) -> bool {
        if self.injected_failure() {
            warn!("Injected failure for {:?}.", cmd.opcode);
            return false;
        }

        match cmd.opcode {
            Opcode::Mount => {
                if self.mounted {
                    return false;
                }
                self.mounted = true;
                true
            }
            Opcode::Unmount => {
                if !self.mounted {
                    return false;
                }
                self.mounted = false;
                self.track = None;
                true
            }
            Opcode::SeekTrack => {
                if !self.mounted || cmd.track >= MAX_TRACKS {
                    return false;
                }
                self.track = Some(cmd.track);
                true
            }
            Opcode::ReadSector => {
                let (track, buf) = match (self.sector_target(cmd), buf) {
                    (Some(track), Some(buf)) => (track, buf),
                    _ => return false,
                };
                match self.sectors.get(&(track, cmd.sector)) {
                    Some(stored) => {
                        if stored.data.checksum() != stored.crc {
                            warn!("Checksum mismatch on track {} sector {}.", track, cmd.sector);
                            return false;
                        }
                        *buf = stored.data.clone();
                    }
                    None => *buf = Sector::default(),
                }
                true
            }
            Opcode::WriteSector => {
                let (track, buf) = match (self.sector_target(cmd), buf) {
                    (Some(track), Some(buf)) => (track, buf),
                    _ => return false,
                };
                let stored = StoredSector {
                    crc: buf.checksum(),
                    data: buf.clone(),
                };
                self.sectors.insert((track, cmd.sector), stored);
                true
            }
        }
    }

    fn sector_target(&self, cmd: &Command) -> Option<u32> {
        if !self.mounted || cmd.sector as usize >= TRACK_SECTORS {
            return None;
        }
        self.track
    }
}

impl Device for RamDevice {
    fn call(&mut self, cmd: u64, buf: Option<&mut Sector>) -> u64 {
        let request = match Command::decode(cmd) {
            Ok(request) => request,
            Err(_) => {
                self.stats.failures += 1;
                return cmd | STATUS_BIT;
            }
        };
        self.stats.record(request.opcode);

        let ok = self.execute(&request, buf);
        if !ok {
            self.stats.failures += 1;
        }
        trace!(
            "device {:?} sector: {} track: {} ok: {}",
            request.opcode,
            request.sector,
            request.track,
            ok
        );
        if !ok {
            debug!("Device refused {:?}.", request);
        }
        request.with_status(!ok).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_util::*;

    fn call(dev: &mut RamDevice, cmd: Command, buf: Option<&mut Sector>) -> Command {
        Command::decode(dev.call(cmd.encode(), buf)).unwrap()
    }

    #[test]
    fn test_requires_mount() {
        init();
        let mut dev = RamDevice::new();
        assert!(call(&mut dev, Command::seek_track(0), None).failed);
        assert!(call(&mut dev, Command::unmount(), None).failed);
        assert!(!call(&mut dev, Command::mount(), None).failed);
        assert!(call(&mut dev, Command::mount(), None).failed);
        assert!(!call(&mut dev, Command::seek_track(0), None).failed);
        assert_eq!(dev.stats().failures, 3);
        assert_eq!(dev.stats().total(), 5);
    }

    #[test]
    fn test_sector_round_trip_and_zero_fill() {
        init();
        let mut dev = RamDevice::new();
        call(&mut dev, Command::mount(), None);

        let mut buf = Sector::default();
        assert!(call(&mut dev, Command::read_sector(0), Some(&mut buf)).failed);

        call(&mut dev, Command::seek_track(3), None);
        let txt = rust_counter_strings::generate(Sector::capacity());
        let mut out = Sector::try_from_bytes(txt.as_bytes()).unwrap();
        assert!(!call(&mut dev, Command::write_sector(9), Some(&mut out)).failed);

        let mut back = Sector::default();
        assert!(!call(&mut dev, Command::read_sector(9), Some(&mut back)).failed);
        assert_eq!(back, out);

        let mut blank = out.clone();
        assert!(!call(&mut dev, Command::read_sector(10), Some(&mut blank)).failed);
        assert_eq!(blank, Sector::default());
    }

    #[test]
    fn test_geometry_limits() {
        init();
        let mut dev = RamDevice::new();
        call(&mut dev, Command::mount(), None);
        assert!(call(&mut dev, Command::seek_track(MAX_TRACKS), None).failed);
        assert!(!call(&mut dev, Command::seek_track(MAX_TRACKS - 1), None).failed);

        let mut buf = Sector::default();
        let past_end = TRACK_SECTORS as u16;
        assert!(call(&mut dev, Command::read_sector(past_end), Some(&mut buf)).failed);
        assert!(call(&mut dev, Command::read_sector(0), None).failed);
    }

    #[test]
    fn test_data_survives_remount() {
        init();
        let mut dev = RamDevice::new();
        call(&mut dev, Command::mount(), None);
        call(&mut dev, Command::seek_track(1), None);
        let mut out = Sector::try_from_bytes(&[0x5Au8; 1024]).unwrap();
        call(&mut dev, Command::write_sector(0), Some(&mut out));
        call(&mut dev, Command::unmount(), None);

        call(&mut dev, Command::mount(), None);
        call(&mut dev, Command::seek_track(1), None);
        let mut back = Sector::default();
        assert!(!call(&mut dev, Command::read_sector(0), Some(&mut back)).failed);
        assert_eq!(back, out);
    }

    #[test]
    fn test_corruption_detected() {
        init();
        let mut dev = RamDevice::new();
        call(&mut dev, Command::mount(), None);
        call(&mut dev, Command::seek_track(0), None);
        let mut out = Sector::default();
        call(&mut dev, Command::write_sector(2), Some(&mut out));
        dev.corrupt(0, 2);
        assert!(call(&mut dev, Command::read_sector(2), Some(&mut out)).failed);
    }

    #[test]
    fn test_fail_after() {
        init();
        let mut dev = RamDevice::new();
        dev.fail_after(1);
        assert!(!call(&mut dev, Command::mount(), None).failed);
        assert!(call(&mut dev, Command::seek_track(0), None).failed);
        assert!(!call(&mut dev, Command::seek_track(0), None).failed);
    }

    #[test]
    fn test_malformed_request_fails() {
        let mut dev = RamDevice::new();
        let word = dev.call(0xF000_0000_0000_0000, None);
        assert_eq!(word & STATUS_BIT, STATUS_BIT);
        assert_eq!(dev.stats().failures, 1);
    }
}
