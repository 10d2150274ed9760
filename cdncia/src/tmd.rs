use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use bitflags::bitflags;
use derivative::Derivative;
use log::debug;
use static_assertions::const_assert_eq;

use crate::chunk::Chunk;
use crate::signature::{read_certificate, skip_signature, SignatureType};
use crate::string::SizedCString;
use crate::titleid::TitleId;
use crate::util::{be_u16, be_u32, be_u64, bytes, u8};
use crate::Result;

/// Size of the fixed part of the title metadata that follows the signature
pub const TMD_HEADER_SIZE: u64 = 0x9c4;
/// Size of a single content chunk record
pub const CONTENT_CHUNK_SIZE: u64 = 0x30;
/// Size of a single content info record
pub const CONTENT_INFO_SIZE: u64 = 0x24;

const_assert_eq!(
    TMD_HEADER_SIZE,
    0x40 + 4 + 8 + 8 + 4 + 2 + 4 + 4 + 4 + 1 + 0x31 + 4 + 2 + 2 + 2 + 2 + 0x20 + 64 * CONTENT_INFO_SIZE
);
const_assert_eq!(CONTENT_CHUNK_SIZE, 4 + 2 + 2 + 8 + 0x20);
const_assert_eq!(CONTENT_INFO_SIZE, 2 + 2 + 0x20);

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct TmdHeader {
    issuer: SizedCString<0x40>,
    version: u8,
    ca_crl_version: u8,
    signer_crl_version: u8,
    system_version: u64,
    title_id: TitleId,
    title_type: u32,
    group_id: u16,
    save_data_size: u32,
    srl_private_save_size: u32,
    srl_flag: u8,
    access_rights: u32,
    title_version: u16,
    content_count: u16,
    boot_content: u16,
    #[derivative(Debug = "ignore")]
    hash: [u8; 0x20],
    content_info_records: Vec<ContentInfo>,
}

impl TmdHeader {
    /// Decodes [`TMD_HEADER_SIZE`] bytes
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let issuer = SizedCString::from(bytes::<_, 0x40>(r)?);
        let version = u8(r)?;
        let ca_crl_version = u8(r)?;
        let signer_crl_version = u8(r)?;
        let _reserved0 = u8(r)?;
        let system_version = be_u64(r)?;
        let title_id = TitleId::from_bytes(bytes(r)?);
        let title_type = be_u32(r)?;
        let group_id = be_u16(r)?;
        let save_data_size = be_u32(r)?;
        let srl_private_save_size = be_u32(r)?;
        let _reserved1 = be_u32(r)?;
        let srl_flag = u8(r)?;
        let _reserved2 = bytes::<_, 0x31>(r)?;
        let access_rights = be_u32(r)?;
        let title_version = be_u16(r)?;
        let content_count = be_u16(r)?;
        let boot_content = be_u16(r)?;
        let _padding = be_u16(r)?;
        let hash = bytes(r)?;
        let content_info_records = (0..64)
            .map(|_| ContentInfo::read(r))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            issuer,
            version,
            ca_crl_version,
            signer_crl_version,
            system_version,
            title_id,
            title_type,
            group_id,
            save_data_size,
            srl_private_save_size,
            srl_flag,
            access_rights,
            title_version,
            content_count,
            boot_content,
            hash,
            content_info_records,
        })
    }
    #[must_use] pub fn issuer(&self) -> &SizedCString<0x40> { &self.issuer }
    #[must_use] pub fn version(&self) -> u8 { self.version }
    #[must_use] pub fn ca_crl_version(&self) -> u8 { self.ca_crl_version }
    #[must_use] pub fn signer_crl_version(&self) -> u8 { self.signer_crl_version }
    #[must_use] pub fn system_version(&self) -> u64 { self.system_version }
    #[must_use] pub fn title_id(&self) -> TitleId { self.title_id }
    #[must_use] pub fn title_type(&self) -> u32 { self.title_type }
    #[must_use] pub fn group_id(&self) -> u16 { self.group_id }
    #[must_use] pub fn save_data_size(&self) -> u32 { self.save_data_size }
    #[must_use] pub fn srl_private_save_size(&self) -> u32 { self.srl_private_save_size }
    #[must_use] pub fn srl_flag(&self) -> u8 { self.srl_flag }
    #[must_use] pub fn access_rights(&self) -> u32 { self.access_rights }
    #[must_use] pub fn title_version(&self) -> u16 { self.title_version }
    #[must_use] pub fn content_count(&self) -> u16 { self.content_count }
    #[must_use] pub fn boot_content(&self) -> u16 { self.boot_content }
    /// SHA-256 over the content info records
    #[must_use] pub fn info_records_hash(&self) -> &[u8; 0x20] { &self.hash }
    #[must_use] pub fn content_info(&self) -> &[ContentInfo] { &self.content_info_records }
}

#[derive(Copy, Clone)]
pub struct ContentInfo {
    index_offset: u16,
    cmd_count: u16,
    hash: [u8; 0x20],
}

impl ContentInfo {
    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            index_offset: be_u16(r)?,
            cmd_count: be_u16(r)?,
            hash: bytes(r)?,
        })
    }
    #[must_use] pub fn index_offset(&self) -> u16 { self.index_offset }
    #[must_use] pub fn cmd_count(&self) -> u16 { self.cmd_count }
    #[must_use] pub fn hash(&self) -> &[u8; 0x20] { &self.hash }
}

impl fmt::Debug for ContentInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cmd_count != 0 || self.hash.iter().any(|v| *v != 0) {
            f.debug_struct("ContentInfo")
                .field("index_offset", &self.index_offset)
                .field("cmd_count", &self.cmd_count)
                .field("hash", &self.hash)
                .finish()
        } else {
            f.debug_tuple("ContentInfo").field(&None::<()>).finish()
        }
    }
}

/// Well-known content indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ContentIndex {
    Main = 0,
    Manual = 1,
    Dlp = 2,
}

/// One content chunk record: which CDN file holds a content and where it goes
#[derive(Derivative, Copy, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ContentChunk {
    #[derivative(Debug(format_with = "fmt_content_id"))]
    id: u32,
    idx: u16,
    ty: ContentType,
    size: u64,
    #[derivative(Debug = "ignore")]
    hash: [u8; 0x20],
}

fn fmt_content_id(id: &u32, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{id:08x}")
}

impl ContentChunk {
    #[must_use]
    pub fn new(id: u32, idx: u16, ty: ContentType, size: u64, hash: [u8; 0x20]) -> Self {
        Self { id, idx, ty, size, hash }
    }
    /// Decodes [`CONTENT_CHUNK_SIZE`] bytes
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            id: be_u32(r)?,
            idx: be_u16(r)?,
            ty: ContentType::from_bits_retain(be_u16(r)?),
            size: be_u64(r)?,
            hash: bytes(r)?,
        })
    }
    #[must_use] pub fn id(&self) -> u32 { self.id }
    #[must_use] pub fn idx(&self) -> u16 { self.idx }
    #[must_use] pub fn ty(&self) -> ContentType { self.ty }
    #[must_use] pub fn size(&self) -> u64 { self.size }
    #[must_use] pub fn hash(&self) -> &[u8; 0x20] { &self.hash }
    #[must_use]
    pub fn kind(&self) -> Option<ContentIndex> {
        match self.idx {
            0 => Some(ContentIndex::Main),
            1 => Some(ContentIndex::Manual),
            2 => Some(ContentIndex::Dlp),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContentType: u16 {
        const ENCRYPTED = 0x1;
        const DISC = 0x2;
        const CFM = 0x4;
        const OPTIONAL = 0x4000;
        const SHARED = 0x8000;
        const _ = !0;
    }
}

/// A parsed `tmd`, with the regions the CIA needs marked on its stream
#[derive(Debug)]
pub struct TmdContext<R> {
    reader: R,
    sig_type: SignatureType,
    header: TmdHeader,
    header_chunk: Chunk,
    cp_cert: Chunk,
    ca_cert: Chunk,
    contents: Vec<ContentChunk>,
}

impl<R: Read + Seek> TmdContext<R> {
    /// Reads title metadata from the start of `reader`.
    ///
    /// The header chunk stays open until the whole content chunk table is read, so it covers
    /// signature, header and table. The CP and CA certificates follow.
    pub fn parse(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut header_chunk = Chunk::mark_start(&mut reader)?;
        let sig_type = skip_signature(&mut reader)?;
        let header = TmdHeader::read(&mut reader)?;
        let contents = (0..header.content_count())
            .map(|_| ContentChunk::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        header_chunk.mark_end(&mut reader)?;

        let cp_cert = read_certificate(&mut reader)?;
        let ca_cert = read_certificate(&mut reader)?;

        debug!(
            "tmd for {} v{}: {sig_type:?}, {} contents, {:#x} bytes",
            header.title_id(),
            header.title_version(),
            contents.len(),
            header_chunk.size()
        );

        Ok(Self {
            reader,
            sig_type,
            header,
            header_chunk,
            cp_cert,
            ca_cert,
            contents,
        })
    }
}

impl<R> TmdContext<R> {
    pub fn title_id(&self) -> TitleId {
        self.header.title_id()
    }
    pub fn title_version(&self) -> u16 {
        self.header.title_version()
    }
    pub fn sig_type(&self) -> SignatureType {
        self.sig_type
    }
    pub fn header(&self) -> &TmdHeader {
        &self.header
    }
    /// Signature, header and content chunk table
    pub fn header_chunk(&self) -> &Chunk {
        &self.header_chunk
    }
    pub fn cp_cert(&self) -> &Chunk {
        &self.cp_cert
    }
    pub fn ca_cert(&self) -> &Chunk {
        &self.ca_cert
    }
    pub fn content_chunks(&self) -> &[ContentChunk] {
        &self.contents
    }
    pub(crate) fn source(&mut self) -> &mut R {
        &mut self.reader
    }
    pub fn into_inner(self) -> R {
        self.reader
    }
}
