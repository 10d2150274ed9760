//! Byte ranges of already opened streams, and the buffered copy that moves them into the output.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::{CdnCiaError, Result};

/// Size of the work buffer used by [`ChunkCopier::new`]
pub const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Boundary every CIA section starts on
pub const CIA_ALIGNMENT: u64 = 0x40;

/// A `[offset, offset + size)` range inside a source stream.
///
/// The chunk does not own the stream it was marked on, it's up to the caller to hand the same
/// stream back to [`ChunkCopier::append`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chunk {
    offset: u64,
    size: u64,
}

impl Chunk {
    #[must_use]
    pub const fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }
    /// Starts a chunk at the current position of `source`
    pub fn mark_start<S: Seek>(source: &mut S) -> Result<Self> {
        let offset = source.stream_position().map_err(CdnCiaError::Position)?;
        Ok(Self { offset, size: 0 })
    }
    /// Ends the chunk at the current position of `source`
    pub fn mark_end<S: Seek>(&mut self, source: &mut S) -> Result<()> {
        let end = source.stream_position().map_err(CdnCiaError::Position)?;
        debug_assert!(end >= self.offset, "chunk end before its start");
        self.size = end.saturating_sub(self.offset);
        Ok(())
    }
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Copies chunks through one reusable work buffer.
///
/// The buffer belongs to this value; concurrent copies need a copier each.
pub struct ChunkCopier {
    buf: Box<[u8]>,
}

impl ChunkCopier {
    /// Allocates a copier with a [`COPY_BUFFER_SIZE`] buffer
    pub fn new() -> Result<Self> {
        Self::with_buffer_size(COPY_BUFFER_SIZE)
    }
    /// Allocates a copier with a work buffer of `size` bytes, failing instead of aborting when
    /// the allocation can't be satisfied
    pub fn with_buffer_size(size: usize) -> Result<Self> {
        assert!(size != 0, "work buffer can't be empty");

        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| CdnCiaError::BufferAllocation(size))?;
        buf.resize(size, 0);
        Ok(Self {
            buf: buf.into_boxed_slice(),
        })
    }
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }
    /// Writes the bytes covered by `chunk` to `output`, leaving `output` right after them
    pub fn append<R, W>(&mut self, chunk: &Chunk, source: &mut R, output: &mut W) -> Result<()>
    where
        R: Read + Seek,
        W: Write,
    {
        source.seek(SeekFrom::Start(chunk.offset))?;
        self.copy(source, output, chunk.size)
    }
    /// Moves exactly `remaining` bytes from the current position of `source` into `output`
    pub fn copy<R: Read, W: Write>(
        &mut self,
        source: &mut R,
        output: &mut W,
        mut remaining: u64,
    ) -> Result<()> {
        let full = self.buf.len() as u64;
        while remaining > full {
            source.read_exact(&mut self.buf)?;
            output.write_all(&self.buf)?;
            remaining -= full;
        }

        if remaining != 0 {
            let tail = &mut self.buf[..remaining as usize];
            source.read_exact(tail)?;
            output.write_all(tail)?;
        }
        Ok(())
    }
}

/// Zero-fills `output` up to the next multiple of `boundary` and returns the new position.
///
/// # Panics
/// If `boundary` isn't a power of two.
pub fn align_to<W: Write + Seek>(output: &mut W, boundary: u64) -> Result<u64> {
    assert!(boundary.is_power_of_two(), "alignment must be a power of two");

    let pos = output.stream_position().map_err(CdnCiaError::Position)?;
    let used = pos & (boundary - 1);
    if used == 0 {
        return Ok(pos);
    }

    let padding = boundary - used;
    io::copy(&mut io::repeat(0).take(padding), output)?;
    Ok(pos + padding)
}

/// Moves `source` forward to the next multiple of `boundary` without reading anything and
/// returns the new position.
///
/// # Panics
/// If `boundary` isn't a power of two.
pub fn skip_to_alignment<S: Seek>(source: &mut S, boundary: u64) -> Result<u64> {
    assert!(boundary.is_power_of_two(), "alignment must be a power of two");

    let pos = source.stream_position().map_err(CdnCiaError::Position)?;
    let used = pos & (boundary - 1);
    if used == 0 {
        return Ok(pos);
    }

    Ok(source.seek(SeekFrom::Current((boundary - used) as i64))?)
}
