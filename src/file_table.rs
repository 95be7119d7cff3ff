use alloc::string::String;
use alloc::vec::Vec;
use log::{debug, info, warn};

use crate::error::ErrorKind;
use crate::util::sector_count;

/// Stable identifier of a file within one mounted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    name: String,
    handle: Handle,
    track: u32,
    pub(crate) pointer: usize,
    pub(crate) size: usize,
    status: FileStatus,
}

impl FileRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn track(&self) -> u32 {
        self.track
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sector_count(&self) -> usize {
        sector_count(self.size)
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == FileStatus::Open
    }
}

/// Name to handle mapping plus per-file cursor and size. Handles are indices into the record
/// list and are never reused while the table lives.
///
/// The table itself does not cap the number of files; a handle at or past [`MAX_TRACKS`] names a
/// track the device does not have.
///
/// [`MAX_TRACKS`]: crate::util::MAX_TRACKS
#[derive(Debug)]
pub struct FileTable {
    records: Vec<FileRecord>,
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    pub fn new() -> Self {
        FileTable {
            records: Vec::with_capacity(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    pub fn open(&mut self, path: &str) -> Result<Handle, ErrorKind> {
        if let Some(record) = self.records.iter_mut().find(|r| r.name == path) {
            if record.is_open() {
                warn!("open {}: already open as {:?}", path, record.handle);
                return Err(ErrorKind::AlreadyOpen);
            }
            record.status = FileStatus::Open;
            info!("reopened {} as {:?}", path, record.handle);
            return Ok(record.handle);
        }

        let handle = u16::try_from(self.records.len())
            .map(Handle)
            .map_err(|_| ErrorKind::AllocationFailure)?;
        self.grow()?;
        let mut name = String::new();
        name.try_reserve_exact(path.len())
            .map_err(|_| ErrorKind::AllocationFailure)?;
        name.push_str(path);

        self.records.push(FileRecord {
            name,
            handle,
            track: handle.0 as u32,
            pointer: 0,
            size: 0,
            status: FileStatus::Open,
        });
        info!("opened {} as {:?}", path, handle);
        Ok(handle)
    }

    /// Double the backing storage when it is full.
    fn grow(&mut self) -> Result<(), ErrorKind> {
        if self.records.len() < self.records.capacity() {
            return Ok(());
        }
        let additional = core::cmp::max(self.records.capacity(), 1);
        self.records.try_reserve_exact(additional).map_err(|_| {
            warn!("file table could not grow past {}", self.records.capacity());
            ErrorKind::AllocationFailure
        })?;
        debug!("file table capacity now {}", self.records.capacity());
        Ok(())
    }

    pub fn close(&mut self, handle: Handle) -> Result<(), ErrorKind> {
        let record = self.get_mut(handle)?;
        if !record.is_open() {
            return Err(ErrorKind::AlreadyClosed);
        }
        record.pointer = 0;
        record.status = FileStatus::Closed;
        info!("closed {:?}", handle);
        Ok(())
    }

    pub fn seek(&mut self, handle: Handle, offset: usize) -> Result<(), ErrorKind> {
        let record = self.get_mut(handle)?;
        if offset > record.size {
            warn!(
                "seek {:?} to {} past size {}",
                handle, offset, record.size
            );
            return Err(ErrorKind::OutOfRange);
        }
        record.pointer = offset;
        Ok(())
    }

    pub fn get(&self, handle: Handle) -> Result<&FileRecord, ErrorKind> {
        self.records
            .get(handle.0 as usize)
            .ok_or(ErrorKind::UnknownHandle)
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Result<&mut FileRecord, ErrorKind> {
        self.records
            .get_mut(handle.0 as usize)
            .ok_or(ErrorKind::UnknownHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_util::*;

    #[test]
    fn test_open_assigns_sequential_handles() {
        init();
        let mut table = FileTable::new();
        assert_eq!(table.open("a"), Ok(Handle(0)));
        assert_eq!(table.open("b"), Ok(Handle(1)));
        assert_eq!(table.get(Handle(1)).unwrap().name(), "b");
        assert_eq!(table.get(Handle(1)).unwrap().track(), 1);
    }

    #[test]
    fn test_open_twice_fails() {
        let mut table = FileTable::new();
        table.open("a").unwrap();
        assert_eq!(table.open("a"), Err(ErrorKind::AlreadyOpen));
    }

    #[test]
    fn test_reopen_keeps_handle_and_size() {
        let mut table = FileTable::new();
        let h = table.open("a").unwrap();
        table.get_mut(h).unwrap().size = 10;
        table.seek(h, 7).unwrap();
        table.close(h).unwrap();
        assert_eq!(table.get(h).unwrap().pointer(), 0);
        assert_eq!(table.get(h).unwrap().status(), FileStatus::Closed);

        assert_eq!(table.open("a"), Ok(h));
        assert_eq!(table.get(h).unwrap().size(), 10);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_close_errors() {
        let mut table = FileTable::new();
        assert_eq!(table.close(Handle(0)), Err(ErrorKind::UnknownHandle));
        let h = table.open("a").unwrap();
        table.close(h).unwrap();
        assert_eq!(table.close(h), Err(ErrorKind::AlreadyClosed));
    }

    #[test]
    fn test_seek_boundary() {
        let mut table = FileTable::new();
        let h = table.open("a").unwrap();
        table.get_mut(h).unwrap().size = 2048;
        assert_eq!(table.seek(h, 2048), Ok(()));
        assert_eq!(table.get(h).unwrap().pointer(), 2048);
        assert_eq!(table.seek(h, 2049), Err(ErrorKind::OutOfRange));
        assert_eq!(table.get(h).unwrap().pointer(), 2048);
        assert_eq!(table.seek(Handle(9), 0), Err(ErrorKind::UnknownHandle));
    }

    #[test]
    fn test_growth_doubles_capacity() {
        init();
        let mut table = FileTable::new();
        assert_eq!(table.capacity(), 1);
        let mut handles = Vec::new();
        for i in 0..9 {
            handles.push(table.open(&format!("file{}", i)).unwrap());
        }
        assert_eq!(table.capacity(), 16);
        for (i, h) in handles.iter().enumerate() {
            assert_eq!(h.0 as usize, i);
            assert_eq!(table.get(*h).unwrap().name(), format!("file{}", i));
        }
    }

    #[test]
    fn test_sector_count_tracks_size() {
        let mut table = FileTable::new();
        let h = table.open("a").unwrap();
        assert_eq!(table.get(h).unwrap().sector_count(), 0);
        table.get_mut(h).unwrap().size = 1025;
        assert_eq!(table.get(h).unwrap().sector_count(), 2);
    }
}
