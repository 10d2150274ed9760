//! Locating and streaming the content files of a CDN title.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::tmd::ContentChunk;
use crate::{CdnCiaError, Result};

/// Block size used when streaming a content into the CIA
pub const CONTENT_BLOCK_SIZE: usize = 1220;

/// Something that can hand out the payload of a content by its id
pub trait ContentSource {
    type Reader: Read;

    fn open_content(&mut self, id: u32) -> io::Result<Self::Reader>;
}

impl<T: ContentSource + ?Sized> ContentSource for &mut T {
    type Reader = T::Reader;

    fn open_content(&mut self, id: u32) -> io::Result<Self::Reader> {
        (**self).open_content(id)
    }
}

/// A directory laid out the way the CDN serves a title: `cetk`, `tmd`, and one file per content
/// named after its id in hex.
#[derive(Debug, Clone)]
pub struct CdnDirectory {
    root: PathBuf,
}

impl CdnDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
    pub fn open_ticket(&self) -> io::Result<File> {
        File::open(self.root.join("cetk"))
    }
    pub fn open_tmd(&self) -> io::Result<File> {
        File::open(self.root.join("tmd"))
    }
    /// File names tried for a content, in order: lowercase hex, then uppercase hex
    #[must_use]
    pub fn content_names(id: u32) -> [String; 2] {
        let raw = id.to_be_bytes();
        [hex::encode(raw), hex::encode_upper(raw)]
    }
}

impl ContentSource for CdnDirectory {
    type Reader = File;

    fn open_content(&mut self, id: u32) -> io::Result<File> {
        let [lower, upper] = Self::content_names(id);
        match File::open(self.root.join(&lower)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{lower} not found, trying {upper}");
                File::open(self.root.join(upper))
            }
            other => other,
        }
    }
}

/// Opens the content described by `chunk` and copies exactly `chunk.size()` bytes of it to
/// `output`, in [`CONTENT_BLOCK_SIZE`] blocks
pub fn append_content<S, W>(source: &mut S, chunk: &ContentChunk, output: &mut W) -> Result<()>
where
    S: ContentSource + ?Sized,
    W: Write,
{
    let id = chunk.id();
    let mut reader = source
        .open_content(id)
        .map_err(|e| CdnCiaError::Content { id, source: e })?;

    let mut buf = [0u8; CONTENT_BLOCK_SIZE];
    let mut left = chunk.size();
    while left > 0 {
        let block = &mut buf[..left.min(CONTENT_BLOCK_SIZE as u64) as usize];
        reader
            .read_exact(block)
            .map_err(|e| CdnCiaError::Content { id, source: e })?;
        output.write_all(block)?;
        left -= block.len() as u64;
    }

    debug!("appended content {id:08x} ({:#x} bytes)", chunk.size());
    Ok(())
}
