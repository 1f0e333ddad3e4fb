use std::fmt;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that may occur when working with this crate.
#[derive(Debug)]
pub struct Error {
    kind: Kind,
}

impl Error {
    pub(crate) fn invalid_argument(msg: &'static str) -> Self {
        Self {
            kind: Kind::InvalidArgument(msg),
        }
    }

    /// Returns true if an invalid argument was passed to a constructor or call.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.kind, Kind::InvalidArgument(_))
    }

    pub(crate) fn unrecognized_format() -> Self {
        Self {
            kind: Kind::UnrecognizedFormat,
        }
    }

    /// Returns true if the source's leading bytes matched neither supported codec's magic number.
    pub fn is_unrecognized_format(&self) -> bool {
        matches!(self.kind, Kind::UnrecognizedFormat)
    }

    pub(crate) fn bad_magic() -> Self {
        Self {
            kind: Kind::BadMagic,
        }
    }

    /// Returns true if a skippable-frame or seek-table magic number didn't match.
    pub fn is_bad_magic(&self) -> bool {
        matches!(self.kind, Kind::BadMagic)
    }

    pub(crate) fn reserved_bits_set() -> Self {
        Self {
            kind: Kind::ReservedBitsSet,
        }
    }

    /// Returns true if reserved descriptor bits in the seek-table footer were set.
    pub fn is_reserved_bits_set(&self) -> bool {
        matches!(self.kind, Kind::ReservedBitsSet)
    }

    pub(crate) fn length_mismatch() -> Self {
        Self {
            kind: Kind::LengthMismatch,
        }
    }

    /// Returns true if the declared seek-table payload size didn't match its actual size.
    pub fn is_length_mismatch(&self) -> bool {
        matches!(self.kind, Kind::LengthMismatch)
    }

    pub(crate) fn frame_index_too_large() -> Self {
        Self {
            kind: Kind::FrameIndexTooLarge,
        }
    }

    /// Returns true if a frame/STE index or count exceeded [`crate::SEEKABLE_MAX_FRAMES`].
    pub fn is_frame_index_too_large(&self) -> bool {
        matches!(self.kind, Kind::FrameIndexTooLarge)
    }

    pub(crate) fn unexpected_eof() -> Self {
        Self {
            kind: Kind::UnexpectedEof,
        }
    }

    /// Returns true if the underlying source ran out of bytes before a structure was complete.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self.kind, Kind::UnexpectedEof)
    }

    pub(crate) fn decompress_failed(msg: String) -> Self {
        Self {
            kind: Kind::DecompressFailed(msg),
        }
    }

    /// Returns true if the back-end codec reported a decompression failure.
    pub fn is_decompress_failed(&self) -> bool {
        matches!(self.kind, Kind::DecompressFailed(_))
    }

    pub(crate) fn compress_failed(msg: String) -> Self {
        Self {
            kind: Kind::CompressFailed(msg),
        }
    }

    /// Returns true if the back-end codec reported a compression failure.
    pub fn is_compress_failed(&self) -> bool {
        matches!(self.kind, Kind::CompressFailed(_))
    }

    /// Returns true if the error originates from an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, Kind::Io(_))
    }

    pub(crate) fn closed() -> Self {
        Self {
            kind: Kind::Closed,
        }
    }

    /// Returns true if an operation was attempted on an already-closed writer.
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, Kind::Closed)
    }

    pub(crate) fn out_of_memory() -> Self {
        Self {
            kind: Kind::OutOfMemory,
        }
    }

    /// Returns true if an allocation needed to hold a parsed seek table failed.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self.kind, Kind::OutOfMemory)
    }

    #[allow(dead_code)]
    pub(crate) fn checksum_mismatch() -> Self {
        Self {
            kind: Kind::ChecksumMismatch,
        }
    }

    /// Returns true if a stored checksum didn't match recomputed data.
    ///
    /// Reserved for a future verifying reader; this crate never returns it today, since
    /// checksums are written but not verified on read.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self.kind, Kind::ChecksumMismatch)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Kind::UnrecognizedFormat => f.write_str("unrecognized codec format"),
            Kind::BadMagic => f.write_str("bad magic number in seek table"),
            Kind::ReservedBitsSet => f.write_str("reserved descriptor bits set"),
            Kind::LengthMismatch => f.write_str("seek table length mismatch"),
            Kind::FrameIndexTooLarge => f.write_str("frame index too large"),
            Kind::UnexpectedEof => f.write_str("unexpected eof"),
            Kind::DecompressFailed(msg) => write!(f, "decompression failed: {msg}"),
            Kind::CompressFailed(msg) => write!(f, "compression failed: {msg}"),
            Kind::Io(err) => write!(f, "io error: {err}"),
            Kind::Closed => f.write_str("operation attempted on a closed handle"),
            Kind::OutOfMemory => f.write_str("allocation failed while parsing seek table"),
            Kind::ChecksumMismatch => f.write_str("checksum mismatch"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self {
            kind: Kind::Io(value),
        }
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(_value: std::num::TryFromIntError) -> Self {
        Self::invalid_argument("integer conversion out of range")
    }
}

enum Kind {
    InvalidArgument(&'static str),
    UnrecognizedFormat,
    BadMagic,
    ReservedBitsSet,
    LengthMismatch,
    FrameIndexTooLarge,
    UnexpectedEof,
    DecompressFailed(String),
    CompressFailed(String),
    Io(std::io::Error),
    Closed,
    OutOfMemory,
    ChecksumMismatch,
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(m) => f.debug_tuple("InvalidArgument").field(m).finish(),
            Self::UnrecognizedFormat => write!(f, "UnrecognizedFormat"),
            Self::BadMagic => write!(f, "BadMagic"),
            Self::ReservedBitsSet => write!(f, "ReservedBitsSet"),
            Self::LengthMismatch => write!(f, "LengthMismatch"),
            Self::FrameIndexTooLarge => write!(f, "FrameIndexTooLarge"),
            Self::UnexpectedEof => write!(f, "UnexpectedEof"),
            Self::DecompressFailed(m) => f.debug_tuple("DecompressFailed").field(m).finish(),
            Self::CompressFailed(m) => f.debug_tuple("CompressFailed").field(m).finish(),
            Self::Io(e) => f.debug_tuple("Io").field(e).finish(),
            Self::Closed => write!(f, "Closed"),
            Self::OutOfMemory => write!(f, "OutOfMemory"),
            Self::ChecksumMismatch => write!(f, "ChecksumMismatch"),
        }
    }
}
