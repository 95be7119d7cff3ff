use alloc::vec::Vec;
use log::trace;

use crate::file_table::Handle;
use crate::util::Sector;

/// Cache lines are keyed by file and file-relative sector, not by physical location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub handle: Handle,
    pub sector: usize,
}

impl CacheKey {
    pub const fn new(handle: Handle, sector: usize) -> Self {
        CacheKey { handle, sector }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was cached already; its payload was replaced.
    Update,
    Insert,
    /// The least recently used line made room; carries the key that was dropped.
    Eviction(CacheKey),
}

struct CacheLine {
    key: CacheKey,
    data: Sector,
    touched: u64,
}

/// Fixed-capacity least-recently-used sector cache.
pub struct SectorCache {
    lines: Vec<CacheLine>,
    capacity: usize,
    clock: u64,
}

impl SectorCache {
    /// A zero capacity is raised to one line.
    pub fn new(capacity: usize) -> Self {
        let capacity = core::cmp::max(capacity, 1);
        SectorCache {
            lines: Vec::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Membership test that leaves recency alone.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.position(key).is_some()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<&Sector> {
        let idx = self.position(key)?;
        let now = self.tick();
        let line = &mut self.lines[idx];
        line.touched = now;
        trace!("cache hit {:?} at line {}", key, idx);
        Some(&line.data)
    }

    pub fn put(&mut self, key: CacheKey, data: &Sector) -> PutOutcome {
        let now = self.tick();
        if let Some(idx) = self.position(&key) {
            let line = &mut self.lines[idx];
            line.data = data.clone();
            line.touched = now;
            return PutOutcome::Update;
        }

        if self.lines.len() < self.capacity {
            self.lines.push(CacheLine {
                key,
                data: data.clone(),
                touched: now,
            });
            return PutOutcome::Insert;
        }

        let victim = self.victim();
        let line = &mut self.lines[victim];
        let evicted = line.key;
        trace!("cache evicts {:?} from line {} for {:?}", evicted, victim, key);
        line.key = key;
        line.data = data.clone();
        line.touched = now;
        PutOutcome::Eviction(evicted)
    }

    fn position(&self, key: &CacheKey) -> Option<usize> {
        self.lines.iter().position(|line| line.key == *key)
    }

    /// Line with the oldest timestamp; the lowest index wins a tie.
    fn victim(&self) -> usize {
        let mut victim = 0;
        for (idx, line) in self.lines.iter().enumerate() {
            if line.touched < self.lines[victim].touched {
                victim = idx;
            }
        }
        victim
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Cumulative hit and miss counts for sector lookups.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_ratio(&self) -> Option<f64> {
        match self.accesses() {
            0 => None,
            n => Some(self.hits as f64 / n as f64),
        }
    }
}
