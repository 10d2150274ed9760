use std::io::{Read, Seek, SeekFrom};

use derivative::Derivative;
use log::debug;
use static_assertions::const_assert_eq;

use crate::chunk::Chunk;
use crate::signature::{read_certificate, skip_signature, SignatureType};
use crate::string::SizedCString;
use crate::titleid::TitleId;
use crate::util::{be_u16, be_u32, be_u64, bytes, u8};
use crate::Result;

/// Size of the signed part of a ticket that follows the signature
pub const TICKET_HEADER_SIZE: u64 = 0x210;
const_assert_eq!(
    TICKET_HEADER_SIZE,
    0x40 + 0x3c + 3 + 0x10 + 1 + 8 + 4 + 8 + 2 + 2 + 8 + 2 + 0x2a + 4 + 2 + 0x42 + 0x40 + 0xac
);

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct TicketHeader {
    issuer: SizedCString<0x40>,
    #[derivative(Debug = "ignore")]
    ecc_pubkey: [u8; 0x3c],
    version: u8,
    ca_crl_version: u8,
    signer_crl_version: u8,
    title_key: [u8; 0x10],
    ticket_id: u64,
    console_id: u32,
    title_id: TitleId,
    ticket_title_version: u16,
    license_type: u8,
    key_index: u8,
    eshop_account_id: u32,
    audit: u8,
    #[derivative(Debug = "ignore")]
    limits: [u8; 0x40],
    #[derivative(Debug = "ignore")]
    content_index: [u8; 0xac],
}

impl TicketHeader {
    /// Decodes [`TICKET_HEADER_SIZE`] bytes
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let issuer = SizedCString::from(bytes::<_, 0x40>(r)?);
        let ecc_pubkey = bytes(r)?;
        let version = u8(r)?;
        let ca_crl_version = u8(r)?;
        let signer_crl_version = u8(r)?;
        let title_key = bytes(r)?;
        let _reserved0 = u8(r)?;
        let ticket_id = be_u64(r)?;
        let console_id = be_u32(r)?;
        let title_id = TitleId::from_bytes(bytes(r)?);
        let _reserved1 = be_u16(r)?;
        let ticket_title_version = be_u16(r)?;
        let _reserved2 = be_u64(r)?;
        let license_type = u8(r)?;
        let key_index = u8(r)?;
        let _reserved3 = bytes::<_, 0x2a>(r)?;
        let eshop_account_id = be_u32(r)?;
        let _reserved4 = u8(r)?;
        let audit = u8(r)?;
        let _reserved5 = bytes::<_, 0x42>(r)?;
        let limits = bytes(r)?;
        let content_index = bytes(r)?;

        Ok(Self {
            issuer,
            ecc_pubkey,
            version,
            ca_crl_version,
            signer_crl_version,
            title_key,
            ticket_id,
            console_id,
            title_id,
            ticket_title_version,
            license_type,
            key_index,
            eshop_account_id,
            audit,
            limits,
            content_index,
        })
    }
    #[must_use] pub fn issuer(&self) -> &SizedCString<0x40> { &self.issuer }
    #[must_use] pub fn version(&self) -> u8 { self.version }
    #[must_use] pub fn ca_crl_version(&self) -> u8 { self.ca_crl_version }
    #[must_use] pub fn signer_crl_version(&self) -> u8 { self.signer_crl_version }
    #[must_use] pub fn ecc_pubkey(&self) -> &[u8; 0x3c] { &self.ecc_pubkey }
    #[must_use] pub fn title_id(&self) -> TitleId { self.title_id }
    #[must_use] pub fn title_version(&self) -> u16 { self.ticket_title_version }
    #[must_use] pub fn ticket_id(&self) -> u64 { self.ticket_id }
    #[must_use] pub fn console_id(&self) -> u32 { self.console_id }
    #[must_use] pub fn license_type(&self) -> u8 { self.license_type }
    #[must_use] pub fn audit(&self) -> u8 { self.audit }
    /// Title key as stored, still encrypted with the common key
    #[must_use] pub fn title_key_raw(&self) -> &[u8; 0x10] { &self.title_key }
    #[must_use] pub fn key_index(&self) -> u8 { self.key_index }
    #[must_use] pub fn eshop_account_id(&self) -> u32 { self.eshop_account_id }
    #[must_use] pub fn limits(&self) -> &[u8; 0x40] { &self.limits }
    /// Content index section as found in CDN tickets, kept verbatim
    #[must_use] pub fn content_index_raw(&self) -> &[u8; 0xac] { &self.content_index }
}

/// A parsed `cetk`, with the regions the CIA needs marked on its stream
#[derive(Debug)]
pub struct TicketContext<R> {
    reader: R,
    sig_type: SignatureType,
    header: TicketHeader,
    header_chunk: Chunk,
    xs_cert: Chunk,
    ca_cert: Chunk,
}

impl<R: Read + Seek> TicketContext<R> {
    /// Reads a ticket from the start of `reader`.
    ///
    /// The header chunk covers signature and ticket data together, followed by the XS and CA
    /// certificates of the chain.
    pub fn parse(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut header_chunk = Chunk::mark_start(&mut reader)?;
        let sig_type = skip_signature(&mut reader)?;
        let header = TicketHeader::read(&mut reader)?;
        header_chunk.mark_end(&mut reader)?;

        let xs_cert = read_certificate(&mut reader)?;
        let ca_cert = read_certificate(&mut reader)?;

        debug!(
            "ticket for {} v{}: {sig_type:?}, {:#x} bytes",
            header.title_id(),
            header.title_version(),
            header_chunk.size()
        );

        Ok(Self {
            reader,
            sig_type,
            header,
            header_chunk,
            xs_cert,
            ca_cert,
        })
    }
}

impl<R> TicketContext<R> {
    pub fn title_id(&self) -> TitleId {
        self.header.title_id()
    }
    pub fn title_version(&self) -> u16 {
        self.header.title_version()
    }
    pub fn sig_type(&self) -> SignatureType {
        self.sig_type
    }
    pub fn header(&self) -> &TicketHeader {
        &self.header
    }
    /// Signature and ticket data
    pub fn header_chunk(&self) -> &Chunk {
        &self.header_chunk
    }
    pub fn xs_cert(&self) -> &Chunk {
        &self.xs_cert
    }
    pub fn ca_cert(&self) -> &Chunk {
        &self.ca_cert
    }
    pub(crate) fn source(&mut self) -> &mut R {
        &mut self.reader
    }
    pub fn into_inner(self) -> R {
        self.reader
    }
}
