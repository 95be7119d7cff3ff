#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file operation was attempted without a mounted device.
    NotMounted,
    AlreadyMounted,
    UnknownHandle,
    AlreadyOpen,
    AlreadyClosed,
    /// Seek past the end of a file, a read longer than the remaining bytes, or a write past the
    /// end of the file's track.
    OutOfRange,
    /// The device answered with the status bit set.
    DeviceError,
    AllocationFailure,
    /// The device answered with a word that does not carry a known opcode.
    MalformedCommand,
    InconsistentState,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            ErrorKind::NotMounted => "device is not mounted",
            ErrorKind::AlreadyMounted => "device is already mounted",
            ErrorKind::UnknownHandle => "unknown file handle",
            ErrorKind::AlreadyOpen => "file is already open",
            ErrorKind::AlreadyClosed => "file is closed",
            ErrorKind::OutOfRange => "offset or length out of range",
            ErrorKind::DeviceError => "device reported failure",
            ErrorKind::AllocationFailure => "could not grow file table",
            ErrorKind::MalformedCommand => "malformed command word",
            ErrorKind::InconsistentState => "inconsistent sector buffer",
        };
        f.write_str(msg)
    }
}
