//! Signature and certificate blobs whose sizes depend on a leading big-endian type tag.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::chunk::{skip_to_alignment, Chunk, CIA_ALIGNMENT};
use crate::util::be_u32;
use crate::{CdnCiaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SignatureType {
    Rsa4096Sha1 = 0x0001_0000,
    Rsa2048Sha1 = 0x0001_0001,
    EcdsaSha1 = 0x0001_0002,
    Rsa4096Sha256 = 0x0001_0003,
    Rsa2048Sha256 = 0x0001_0004,
    EcdsaSha256 = 0x0001_0005,
}

impl SignatureType {
    /// Size of the signature following the tag
    #[must_use]
    pub const fn sig_size(self) -> u64 {
        match self {
            Self::Rsa4096Sha1 | Self::Rsa4096Sha256 => 0x200,
            Self::Rsa2048Sha1 | Self::Rsa2048Sha256 => 0x100,
            Self::EcdsaSha1 | Self::EcdsaSha256 => 0x3c,
        }
    }
    /// Size of a certificate signed this way, not counting the tag itself
    #[must_use]
    pub const fn cert_size(self) -> u64 {
        match self {
            Self::Rsa4096Sha1 | Self::Rsa4096Sha256 => 1020,
            Self::Rsa2048Sha1 | Self::Rsa2048Sha256 => 764,
            Self::EcdsaSha1 | Self::EcdsaSha256 => 140,
        }
    }
    /// Reads a 4-byte big-endian tag
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Self::try_from(be_u32(r)?)
    }
}

impl TryFrom<u32> for SignatureType {
    type Error = CdnCiaError;

    fn try_from(tag: u32) -> Result<Self> {
        Ok(match tag {
            0x0001_0000 => Self::Rsa4096Sha1,
            0x0001_0001 => Self::Rsa2048Sha1,
            0x0001_0002 => Self::EcdsaSha1,
            0x0001_0003 => Self::Rsa4096Sha256,
            0x0001_0004 => Self::Rsa2048Sha256,
            0x0001_0005 => Self::EcdsaSha256,
            other => return Err(CdnCiaError::UnknownTypeTag(other)),
        })
    }
}

/// Steps over the signature a ticket or title metadata starts with, including the padding that
/// puts the signed data on a 0x40 boundary
pub fn skip_signature<R: Read + Seek>(r: &mut R) -> Result<SignatureType> {
    let ty = SignatureType::read(r)?;
    r.seek(SeekFrom::Current(ty.sig_size() as i64))?;
    skip_to_alignment(r, CIA_ALIGNMENT)?;
    Ok(ty)
}

/// Records the certificate at the current position and steps over it.
///
/// Certificates follow each other directly, there is no alignment between them.
pub fn read_certificate<R: Read + Seek>(r: &mut R) -> Result<Chunk> {
    let mut cert = Chunk::mark_start(r)?;
    let ty = SignatureType::read(r)?;
    r.seek(SeekFrom::Current(ty.cert_size() as i64))?;
    cert.mark_end(r)?;

    debug!("{ty:?} certificate at {:#x}, {:#x} bytes", cert.offset(), cert.size());
    Ok(cert)
}
