//! Fixed-width big-endian readers. Each one reads exactly what it promises or fails.

use std::io::Read;

use crate::Result;

#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let [b] = bytes::<_, 1>(r)?;
    Ok(b)
}

#[inline]
pub(crate) fn be_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(u16::from_be_bytes(bytes(r)?))
}

#[inline]
pub(crate) fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_be_bytes(bytes(r)?))
}

#[inline]
pub(crate) fn be_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(u64::from_be_bytes(bytes(r)?))
}

#[inline]
pub(crate) fn bytes<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}
