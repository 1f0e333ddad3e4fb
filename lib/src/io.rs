//! Pluggable I/O: the virtual read/write file interfaces the writer and reader are built on.
//!
//! These mirror the teacher crate's `Seekable` trait, generalized to cover writes as well, since
//! this crate's scope (unlike the teacher's embeddable `no_std` core) includes the writer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// A positional read source: the compressed file, as seen by the [`crate::Reader`].
///
/// Implementors provide their own request-scoped context (a `call_data` cookie, in spec terms) by
/// closing over whatever state they need; there is no separate opaque-pointer parameter.
pub trait ReadFile {
    /// Reads up to `buf.len()` bytes starting at `offset`. A short read is only permitted at EOF.
    fn pread(&self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// The total size, in bytes, of the underlying file.
    fn file_size(&self) -> Result<u64>;
}

/// An append-only write sink: the compressed file, as seen by the [`crate::Writer`].
pub trait WriteFile {
    /// Writes `buf` in its entirety. All-or-nothing: a partial write is treated as an error.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

impl ReadFile for File {
    fn pread(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.read_at(buf, offset)?)
        }
        #[cfg(not(unix))]
        {
            use std::io::Read as _;
            let mut file = self.try_clone()?;
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.read(buf)?)
        }
    }

    fn file_size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl WriteFile for File {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        Write::write_all(self, buf)?;
        Ok(())
    }
}

/// A read-only in-memory source, primarily useful for tests.
pub struct SliceReadFile<'a> {
    data: &'a [u8],
}

impl<'a> SliceReadFile<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ReadFile for SliceReadFile<'_> {
    fn pread(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let offset = usize::try_from(offset)?;
        if offset >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }

    fn file_size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

/// An append-only in-memory sink, primarily useful for tests.
#[derive(Default)]
pub struct VecWriteFile {
    pub data: Vec<u8>,
}

impl VecWriteFile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WriteFile for VecWriteFile {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.data.extend_from_slice(buf);
        Ok(())
    }
}

impl<T: WriteFile + ?Sized> WriteFile for &mut T {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_all(buf)
    }
}

/// Blanket support for any owned `Read + Seek` type, e.g. a memory-mapped file wrapped in a
/// `Cursor`.
pub struct SeekableReadFile<S> {
    inner: std::sync::Mutex<S>,
}

impl<S> SeekableReadFile<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: std::sync::Mutex::new(inner),
        }
    }
}

impl<S: Read + Seek> ReadFile for SeekableReadFile<S> {
    fn pread(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| crate::error::Error::invalid_argument("poisoned read file lock"))?;
        guard.seek(SeekFrom::Start(offset))?;
        Ok(guard.read(buf)?)
    }

    fn file_size(&self) -> Result<u64> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| crate::error::Error::invalid_argument("poisoned read file lock"))?;
        let pos = guard.stream_position()?;
        let len = guard.seek(SeekFrom::End(0))?;
        guard.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }
}
