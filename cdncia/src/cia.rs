use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use log::{debug, info, warn};
use static_assertions::const_assert_eq;

use crate::chunk::{align_to, Chunk, ChunkCopier, CIA_ALIGNMENT};
use crate::content::{append_content, ContentSource};
use crate::ticket::TicketContext;
use crate::titleid::TitleId;
use crate::tmd::{ContentChunk, TmdContext};
use crate::util::bytes;
use crate::{CdnCiaError, Result};

/// Size of the CIA header, bitmap included
pub const CIA_HEADER_SIZE: u64 = 0x2020;
/// Size of the content index bitmap
pub const CONTENT_INDEX_SIZE: usize = 0x2000;

const_assert_eq!(CIA_HEADER_SIZE, 4 + 2 + 2 + 4 + 4 + 4 + 4 + 8 + CONTENT_INDEX_SIZE as u64);

fn align(what: u64) -> u64 {
    (what + (CIA_ALIGNMENT - 1)) & !(CIA_ALIGNMENT - 1)
}

/// One bit per possible content index, most significant bit of byte 0 being index 0
#[derive(Clone, PartialEq, Eq)]
pub struct ContentIndexBitmap([u8; CONTENT_INDEX_SIZE]);

impl ContentIndexBitmap {
    #[must_use]
    pub fn new() -> Self {
        Self([0; CONTENT_INDEX_SIZE])
    }
    pub fn set(&mut self, idx: u16) {
        self.0[usize::from(idx >> 3)] |= 0x80 >> (idx & 7);
    }
    #[must_use]
    pub fn contains(&self, idx: u16) -> bool {
        self.0[usize::from(idx >> 3)] & (0x80 >> (idx & 7)) != 0
    }
    /// Present indexes, ascending
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..=u16::MAX).filter(|idx| self.contains(*idx))
    }
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CONTENT_INDEX_SIZE] {
        &self.0
    }
}

impl Default for ContentIndexBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> FromIterator<&'a ContentChunk> for ContentIndexBitmap {
    fn from_iter<I: IntoIterator<Item = &'a ContentChunk>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        for chunk in iter {
            bitmap.set(chunk.idx());
        }
        bitmap
    }
}

impl fmt::Debug for ContentIndexBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The fixed header at the start of every CIA. All fields are little-endian on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiaHeader {
    hdr_size: u32,
    ty: u16,
    version: u16,
    cert_size: u32,
    ticket_size: u32,
    tmd_size: u32,
    meta_size: u32,
    content_size: u64,
    content_index: ContentIndexBitmap,
}

impl CiaHeader {
    /// Derives the header for a CIA built from `tik`, `tmd` and the contents the latter lists
    pub fn new<T, M>(tik: &TicketContext<T>, tmd: &TmdContext<M>) -> Result<Self> {
        let cert_size = tik.ca_cert().size() + tik.xs_cert().size() + tmd.cp_cert().size();
        let contents = tmd.content_chunks();

        Ok(Self {
            hdr_size: CIA_HEADER_SIZE as u32,
            ty: 0,
            version: 0,
            cert_size: cert_size as u32,
            ticket_size: tik.header_chunk().size() as u32,
            tmd_size: tmd.header_chunk().size() as u32,
            meta_size: 0,
            content_size: total_content_size(contents)?,
            content_index: contents.iter().collect(),
        })
    }
    /// Encodes all [`CIA_HEADER_SIZE`] bytes
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.hdr_size.to_le_bytes())?;
        w.write_all(&self.ty.to_le_bytes())?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.cert_size.to_le_bytes())?;
        w.write_all(&self.ticket_size.to_le_bytes())?;
        w.write_all(&self.tmd_size.to_le_bytes())?;
        w.write_all(&self.meta_size.to_le_bytes())?;
        w.write_all(&self.content_size.to_le_bytes())?;
        w.write_all(self.content_index.as_bytes())?;
        Ok(())
    }
    /// Decodes a header, refusing anything that doesn't declare the expected header size
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let hdr_size = u32::from_le_bytes(bytes(r)?);
        if u64::from(hdr_size) != CIA_HEADER_SIZE {
            return Err(CdnCiaError::InvalidHeaderSize);
        }

        Ok(Self {
            hdr_size,
            ty: u16::from_le_bytes(bytes(r)?),
            version: u16::from_le_bytes(bytes(r)?),
            cert_size: u32::from_le_bytes(bytes(r)?),
            ticket_size: u32::from_le_bytes(bytes(r)?),
            tmd_size: u32::from_le_bytes(bytes(r)?),
            meta_size: u32::from_le_bytes(bytes(r)?),
            content_size: u64::from_le_bytes(bytes(r)?),
            content_index: ContentIndexBitmap(bytes(r)?),
        })
    }
    #[must_use] pub fn hdr_size(&self) -> u32 { self.hdr_size }
    #[must_use] pub fn ty(&self) -> u16 { self.ty }
    #[must_use] pub fn version(&self) -> u16 { self.version }
    #[must_use] pub fn cert_size(&self) -> u32 { self.cert_size }
    #[must_use] pub fn ticket_size(&self) -> u32 { self.ticket_size }
    #[must_use] pub fn tmd_size(&self) -> u32 { self.tmd_size }
    #[must_use] pub fn meta_size(&self) -> u32 { self.meta_size }
    #[must_use] pub fn content_size(&self) -> u64 { self.content_size }
    #[must_use] pub fn content_index(&self) -> &ContentIndexBitmap { &self.content_index }
    #[must_use]
    pub fn layout(&self) -> CiaLayout {
        CiaLayout::from_header(self)
    }
}

/// Sum of the sizes of all contents, failing if it doesn't fit the 64-bit header field
pub fn total_content_size(contents: &[ContentChunk]) -> Result<u64> {
    contents
        .iter()
        .try_fold(0u64, |acc, chunk| acc.checked_add(chunk.size()))
        .ok_or(CdnCiaError::ContentSizeOverflow)
}

/// Where each section of a CIA lives, every one of them starting on a 0x40 boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CiaLayout {
    pub cert_chain: Chunk,
    pub ticket: Chunk,
    pub tmd: Chunk,
    pub content: Chunk,
}

impl CiaLayout {
    #[must_use]
    pub fn from_header(header: &CiaHeader) -> Self {
        let cert_chain = Chunk::new(align(u64::from(header.hdr_size)), header.cert_size.into());
        let ticket = Chunk::new(align(cert_chain.end()), header.ticket_size.into());
        let tmd = Chunk::new(align(ticket.end()), header.tmd_size.into());
        let content = Chunk::new(align(tmd.end()), header.content_size);
        Self {
            cert_chain,
            ticket,
            tmd,
            content,
        }
    }
    /// Total size of a CIA without a meta section
    #[must_use]
    pub fn end(&self) -> u64 {
        self.content.end()
    }
}

/// The ticket and title metadata were issued for different titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleIdMismatch {
    pub ticket: TitleId,
    pub tmd: TitleId,
}

impl fmt::Display for TitleIdMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CETK and TMD Title IDs do not match (CETK: {:#018X}, TMD: {:#018X})",
            self.ticket.to_u64(),
            self.tmd.to_u64()
        )
    }
}

/// Compares the title ids of both sides. A mismatch is worth a warning but doesn't stop the
/// CIA from being built.
pub fn check_title_ids<T, M>(tik: &TicketContext<T>, tmd: &TmdContext<M>) -> Option<TitleIdMismatch> {
    if tik.title_id() == tmd.title_id() {
        return None;
    }

    let mismatch = TitleIdMismatch {
        ticket: tik.title_id(),
        tmd: tmd.title_id(),
    };
    warn!("{mismatch}");
    Some(mismatch)
}

/// Writes a complete CIA to `out`: header, certificate chain (CA, XS, CP), ticket, title metadata
/// and every content the metadata lists, each section on a 0x40 boundary.
///
/// On error `out` is left as far as it got.
pub fn write_cia<T, M, S, W>(
    tik: &mut TicketContext<T>,
    tmd: &mut TmdContext<M>,
    contents: &mut S,
    out: &mut W,
    copier: &mut ChunkCopier,
) -> Result<CiaHeader>
where
    T: Read + Seek,
    M: Read + Seek,
    S: ContentSource + ?Sized,
    W: Write + Seek,
{
    let header = CiaHeader::new(tik, tmd)?;
    out.seek(SeekFrom::Start(0))?;
    header.write(out)?;

    let pos = align_to(out, CIA_ALIGNMENT)?;
    debug!("certificate chain at {pos:#x}");
    let ca_cert = *tik.ca_cert();
    copier.append(&ca_cert, tik.source(), out)?;
    let xs_cert = *tik.xs_cert();
    copier.append(&xs_cert, tik.source(), out)?;
    let cp_cert = *tmd.cp_cert();
    copier.append(&cp_cert, tmd.source(), out)?;

    let pos = align_to(out, CIA_ALIGNMENT)?;
    debug!("ticket at {pos:#x}");
    let ticket = *tik.header_chunk();
    copier.append(&ticket, tik.source(), out)?;

    let pos = align_to(out, CIA_ALIGNMENT)?;
    debug!("tmd at {pos:#x}");
    let tmd_chunk = *tmd.header_chunk();
    copier.append(&tmd_chunk, tmd.source(), out)?;

    let pos = align_to(out, CIA_ALIGNMENT)?;
    debug!("contents at {pos:#x}");
    for chunk in tmd.content_chunks() {
        append_content(contents, chunk, out)?;
    }

    info!(
        "built CIA for {} v{}: {} contents, {:#x} bytes of content",
        tmd.title_id(),
        tmd.title_version(),
        tmd.content_chunks().len(),
        header.content_size()
    );
    Ok(header)
}
