//! Assembly of CIA containers out of the pieces a 3DS CDN serves for a title:
//! the ticket (`cetk`), the title metadata (`tmd`) and the numbered contents.

pub mod cia;
pub mod chunk;
pub mod content;
pub mod error;
pub mod signature;
pub mod string;
pub mod ticket;
pub mod titleid;
pub mod tmd;

mod util;

#[cfg(test)]
mod testdata;

pub use error::{CdnCiaError, Result};

pub mod prelude {
    pub use crate::cia::{
        check_title_ids, write_cia, CiaHeader, CiaLayout, ContentIndexBitmap, TitleIdMismatch,
    };
    pub use crate::chunk::{Chunk, ChunkCopier};
    pub use crate::content::{CdnDirectory, ContentSource};
    pub use crate::signature::SignatureType;
    pub use crate::ticket::{TicketContext, TicketHeader};
    pub use crate::titleid::TitleId;
    pub use crate::tmd::{ContentChunk, ContentType, TmdContext, TmdHeader};
    pub use crate::{CdnCiaError, Result};
}
