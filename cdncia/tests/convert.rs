use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use cdncia::prelude::*;

const TITLE: u64 = 0x0004_0000_0003_0200;

fn blob(tag: u32, body: usize, fill: u8) -> Vec<u8> {
    let mut out = tag.to_be_bytes().to_vec();
    out.resize(4 + body, fill);
    out
}

fn signed(header: Vec<u8>) -> Vec<u8> {
    // RSA-4096 SHA-256 signature, padded to 0x240
    let mut out = blob(0x0001_0003, 0x200, 0x55);
    out.resize(0x240, 0);
    out.extend(header);
    out
}

fn write_ticket(dir: &Path, title_id: u64) {
    let mut header = vec![0u8; 0x210];
    header[0x9c..0xa4].copy_from_slice(&title_id.to_be_bytes());
    header[0xa6..0xa8].copy_from_slice(&0x0400u16.to_be_bytes());

    let mut data = signed(header);
    data.extend(blob(0x0001_0004, 764, 0x11));
    data.extend(blob(0x0001_0003, 1020, 0x22));
    fs::write(dir.join("cetk"), data).unwrap();
}

fn write_tmd(dir: &Path, title_id: u64, contents: &[(u32, u16, u64)]) {
    let mut header = vec![0u8; 0x9c4];
    header[0x4c..0x54].copy_from_slice(&title_id.to_be_bytes());
    header[0x9c..0x9e].copy_from_slice(&0x0400u16.to_be_bytes());
    header[0x9e..0xa0].copy_from_slice(&(contents.len() as u16).to_be_bytes());
    for (id, idx, size) in contents {
        header.extend(id.to_be_bytes());
        header.extend(idx.to_be_bytes());
        header.extend(1u16.to_be_bytes());
        header.extend(size.to_be_bytes());
        header.extend([0u8; 0x20]);
    }

    let mut data = signed(header);
    data.extend(blob(0x0001_0004, 764, 0x33));
    data.extend(blob(0x0001_0003, 1020, 0x22));
    fs::write(dir.join("tmd"), data).unwrap();
}

fn convert(dir: &Path, out: &Path) -> Result<CiaHeader> {
    let mut cdn = CdnDirectory::new(dir);
    let mut tik = TicketContext::parse(BufReader::new(cdn.open_ticket()?))?;
    let mut tmd = TmdContext::parse(BufReader::new(cdn.open_tmd()?))?;
    check_title_ids(&tik, &tmd);

    let mut output = BufWriter::new(File::create(out)?);
    let mut copier = ChunkCopier::new()?;
    let header = write_cia(&mut tik, &mut tmd, &mut cdn, &mut output, &mut copier)?;
    output.flush()?;
    Ok(header)
}

#[test]
fn converts_cdn_directory() {
    let dir = tempfile::tempdir().unwrap();
    let contents = [(0x0000_0000, 0, 0x3000), (0x0000_00ab, 1, 1221), (0xdead_beef, 2, 7)];
    write_ticket(dir.path(), TITLE);
    write_tmd(dir.path(), TITLE, &contents);
    fs::write(dir.path().join("00000000"), vec![0xa0; 0x3000]).unwrap();
    fs::write(dir.path().join("000000ab"), vec![0xab; 1221]).unwrap();
    // only the uppercase spelling exists for this one
    fs::write(dir.path().join("DEADBEEF"), vec![0xde; 7]).unwrap();

    let out = dir.path().join("title.cia");
    let header = convert(dir.path(), &out).unwrap();

    let mut cia = File::open(&out).unwrap();
    let reread = CiaHeader::read(&mut cia).unwrap();
    assert_eq!(reread, header);
    assert_eq!(reread.cert_size(), 1024 + 768 + 768);
    assert_eq!(reread.ticket_size(), 0x240 + 0x210);
    assert_eq!(reread.tmd_size(), 0x240 + 0x9c4 + 3 * 0x30);
    assert_eq!(reread.content_size(), 0x3000 + 1221 + 7);
    assert_eq!(reread.content_index().iter().collect::<Vec<_>>(), [0, 1, 2]);

    let layout = reread.layout();
    assert_eq!(fs::metadata(&out).unwrap().len(), layout.end());

    let mut tail = Vec::new();
    cia.seek(SeekFrom::Start(layout.content.end() - 7)).unwrap();
    cia.read_to_end(&mut tail).unwrap();
    assert_eq!(tail, [0xde; 7]);
}

#[test]
fn mismatched_title_ids_still_convert() {
    let dir = tempfile::tempdir().unwrap();
    write_ticket(dir.path(), TITLE);
    write_tmd(dir.path(), TITLE + 0x100, &[(0, 0, 16)]);
    fs::write(dir.path().join("00000000"), [0u8; 16]).unwrap();

    let cdn = CdnDirectory::new(dir.path());
    let tik = TicketContext::parse(BufReader::new(cdn.open_ticket().unwrap())).unwrap();
    let tmd = TmdContext::parse(BufReader::new(cdn.open_tmd().unwrap())).unwrap();
    let mismatch = check_title_ids(&tik, &tmd).unwrap();
    assert_eq!(
        mismatch.to_string(),
        "CETK and TMD Title IDs do not match (CETK: 0x0004000000030200, TMD: 0x0004000000030300)"
    );

    let out = dir.path().join("title.cia");
    let header = convert(dir.path(), &out).unwrap();
    assert_eq!(fs::metadata(&out).unwrap().len(), header.layout().end());
}

#[test]
fn missing_content_file() {
    let dir = tempfile::tempdir().unwrap();
    write_ticket(dir.path(), TITLE);
    write_tmd(dir.path(), TITLE, &[(0xdead_beef, 0, 16)]);

    let err = convert(dir.path(), &dir.path().join("title.cia")).unwrap_err();
    assert!(matches!(err, CdnCiaError::Content { id: 0xdead_beef, .. }));
}

#[test]
fn missing_ticket() {
    let dir = tempfile::tempdir().unwrap();
    write_tmd(dir.path(), TITLE, &[]);

    let err = convert(dir.path(), &dir.path().join("title.cia")).unwrap_err();
    assert!(err.is_io());
}
