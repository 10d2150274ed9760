//! Synthetic tickets, title metadata and contents for unit tests.

use std::collections::HashMap;
use std::io::{self, Cursor};

use crate::content::ContentSource;
use crate::signature::SignatureType;
use crate::tmd::ContentType;

pub(crate) const TICKET_SIG: SignatureType = SignatureType::Rsa2048Sha256;
pub(crate) const TMD_SIG: SignatureType = SignatureType::Rsa2048Sha256;
pub(crate) const XS_CERT: SignatureType = SignatureType::Rsa2048Sha256;
pub(crate) const CP_CERT: SignatureType = SignatureType::EcdsaSha256;
pub(crate) const CA_CERT: SignatureType = SignatureType::Rsa4096Sha256;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TestContent {
    pub(crate) id: u32,
    pub(crate) idx: u16,
    pub(crate) ty: ContentType,
    pub(crate) size: u64,
}

impl TestContent {
    pub(crate) fn new(id: u32, idx: u16, ty: ContentType, size: u64) -> Self {
        Self { id, idx, ty, size }
    }
}

pub(crate) fn signature(ty: SignatureType) -> Vec<u8> {
    let mut out = (ty as u32).to_be_bytes().to_vec();
    out.resize(4 + ty.sig_size() as usize, 0xaa);
    let aligned = (out.len() + 0x3f) & !0x3f;
    out.resize(aligned, 0);
    out
}

pub(crate) fn certificate(ty: SignatureType, fill: u8) -> Vec<u8> {
    let mut out = (ty as u32).to_be_bytes().to_vec();
    out.resize(4 + ty.cert_size() as usize, fill);
    out
}

fn issuer(name: &str) -> [u8; 0x40] {
    let mut out = [0u8; 0x40];
    out[..name.len()].copy_from_slice(name.as_bytes());
    out
}

pub(crate) fn ticket(title_id: u64, version: u16) -> Vec<u8> {
    let mut header = vec![0u8; 0x210];
    header[..0x40].copy_from_slice(&issuer("Root-CA00000003-XS0000000c"));
    header[0x7c] = 1;
    header[0x7f..0x8f].copy_from_slice(&[0x5a; 0x10]);
    header[0x9c..0xa4].copy_from_slice(&title_id.to_be_bytes());
    header[0xa6..0xa8].copy_from_slice(&version.to_be_bytes());
    header[0xb1] = 1;

    let mut out = signature(TICKET_SIG);
    out.extend(header);
    out.extend(certificate(XS_CERT, 0xc2));
    out.extend(certificate(CA_CERT, 0xca));
    out
}

pub(crate) fn tmd(title_id: u64, version: u16, contents: &[TestContent]) -> Vec<u8> {
    let mut header = vec![0u8; 0x9c4];
    header[..0x40].copy_from_slice(&issuer("Root-CA00000003-CP0000000b"));
    header[0x40] = 1;
    header[0x4c..0x54].copy_from_slice(&title_id.to_be_bytes());
    header[0x54..0x58].copy_from_slice(&0x40u32.to_be_bytes());
    header[0x9c..0x9e].copy_from_slice(&version.to_be_bytes());
    header[0x9e..0xa0].copy_from_slice(&(contents.len() as u16).to_be_bytes());

    let mut out = signature(TMD_SIG);
    out.extend(header);
    for content in contents {
        out.extend(content.id.to_be_bytes());
        out.extend(content.idx.to_be_bytes());
        out.extend(content.ty.bits().to_be_bytes());
        out.extend(content.size.to_be_bytes());
        out.extend([content.idx as u8; 0x20]);
    }
    out.extend(certificate(CP_CERT, 0xc1));
    out.extend(certificate(CA_CERT, 0xca));
    out
}

/// Recognisable payload bytes for a content id
pub(crate) fn payload(id: u32, size: u64) -> Vec<u8> {
    let seed = id.to_be_bytes();
    (0..size as usize)
        .map(|i| seed[i % 4] ^ (i / 4) as u8)
        .collect()
}

/// Contents served from memory instead of a CDN directory
#[derive(Default)]
pub(crate) struct MemoryContents(HashMap<u32, Vec<u8>>);

impl<const N: usize> From<[(u32, Vec<u8>); N]> for MemoryContents {
    fn from(contents: [(u32, Vec<u8>); N]) -> Self {
        Self(HashMap::from(contents))
    }
}

impl MemoryContents {
    pub(crate) fn insert(&mut self, id: u32, data: Vec<u8>) {
        self.0.insert(id, data);
    }
}

impl ContentSource for MemoryContents {
    type Reader = Cursor<Vec<u8>>;

    fn open_content(&mut self, id: u32) -> io::Result<Self::Reader> {
        self.0
            .get(&id)
            .cloned()
            .map(Cursor::new)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}
