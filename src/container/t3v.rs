//! `.t3v`: multi-frame container (§4.7).
//!
//! Header: magic `"T3V6"`, version, subword, W, H, frame_count, global meta
//! length, header CRC32, global meta, then a frame index of `frame_count`
//! entries `(offset: u64, words: u32, meta_len: u32)`, followed by each
//! frame's `(meta bytes, words payload, payload CRC32)` in sequence.
//!
//! Writers emit placeholder index entries, stream the frames, then seek back
//! and rewrite the index with true offsets - the write is atomic from the
//! caller's perspective only if the underlying writer is (e.g. write to a
//! temp file and rename).

use std::io::{Read, Seek, SeekFrom, Write};

use super::common::{
    bytes_to_words, crc32, payload_crc32, read_exact_vec, read_magic, read_u32_le, read_u64_le,
    read_u8, words_to_bytes, write_u32_le, write_u64_le, write_u8, VERSION, WORD_BYTES,
};
use crate::error::{CodecError, Result};
use crate::header::SubwordMode;
use crate::word::Word27;

pub const MAGIC: &str = "T3V6";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T3vHeader {
    pub version: u8,
    pub subword: SubwordMode,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexEntry {
    offset: u64,
    words: u32,
    meta_len: u32,
}

const INDEX_ENTRY_BYTES: usize = 8 + 4 + 4;

fn header_bytes(subword: SubwordMode, width: u32, height: u32, frame_count: u32, global_meta_len: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 1 + 1 + 4 + 4 + 4 + 4);
    buf.extend_from_slice(MAGIC.as_bytes());
    buf.push(VERSION);
    buf.push(subword.id());
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&frame_count.to_le_bytes());
    buf.extend_from_slice(&global_meta_len.to_le_bytes());
    buf
}

/// One frame to be written: its own meta bytes and its Word27 payload.
pub struct FrameIn<'a> {
    pub meta: &'a [u8],
    pub words: &'a [Word27],
}

pub fn write<W: Write + Seek>(
    w: &mut W,
    subword: SubwordMode,
    width: u32,
    height: u32,
    global_meta: &[u8],
    frames: &[FrameIn<'_>],
) -> Result<()> {
    let frame_count = frames.len() as u32;
    let header = header_bytes(subword, width, height, frame_count, global_meta.len() as u32);
    w.write_all(&header)?;
    write_u32_le(w, crc32(&header))?;
    w.write_all(global_meta)?;

    let index_pos = stream_position(w)?;
    let placeholder = IndexEntry { offset: 0, words: 0, meta_len: 0 };
    for _ in 0..frame_count {
        write_index_entry(w, &placeholder)?;
    }

    let mut entries = Vec::with_capacity(frames.len());
    for frame in frames {
        let offset = stream_position(w)?;
        w.write_all(frame.meta)?;
        let payload = words_to_bytes(frame.words);
        w.write_all(&payload)?;
        write_u32_le(w, payload_crc32(&payload))?;
        entries.push(IndexEntry {
            offset,
            words: frame.words.len() as u32,
            meta_len: frame.meta.len() as u32,
        });
    }

    w.seek(SeekFrom::Start(index_pos))?;
    for entry in &entries {
        write_index_entry(w, entry)?;
    }
    Ok(())
}

fn stream_position<W: Seek>(w: &mut W) -> std::io::Result<u64> {
    w.stream_position()
}

fn write_index_entry<W: Write>(w: &mut W, entry: &IndexEntry) -> std::io::Result<()> {
    write_u64_le(w, entry.offset)?;
    write_u32_le(w, entry.words)?;
    write_u32_le(w, entry.meta_len)
}

fn read_index_entry<R: Read>(r: &mut R) -> std::io::Result<IndexEntry> {
    let offset = read_u64_le(r)?;
    let words = read_u32_le(r)?;
    let meta_len = read_u32_le(r)?;
    Ok(IndexEntry { offset, words, meta_len })
}

/// One frame's location and framing, as recorded in the frame index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLocation {
    pub offset: u64,
    pub words: u32,
    pub meta_len: u32,
}

/// Read the header, global meta and frame index. Does not read any frame
/// payload; use [`read_frame`] with the returned locations for that.
pub fn read_header<R: Read>(r: &mut R) -> Result<(T3vHeader, Vec<u8>, Vec<FrameLocation>)> {
    read_magic(r, MAGIC)?;
    let version = read_u8(r)?;
    if version != VERSION {
        return Err(CodecError::BadVersion { found: version });
    }
    let subword = SubwordMode::from_id(read_u8(r)?)?;
    let width = read_u32_le(r)?;
    let height = read_u32_le(r)?;
    let frame_count = read_u32_le(r)?;
    let global_meta_len = read_u32_le(r)?;
    let header = header_bytes(subword, width, height, frame_count, global_meta_len);
    let stored_crc = read_u32_le(r)?;
    let computed_crc = crc32(&header);
    if stored_crc != computed_crc {
        return Err(CodecError::ContainerHeaderCrcMismatch {
            expected: computed_crc,
            found: stored_crc,
        });
    }
    let global_meta = read_exact_vec(r, global_meta_len as usize)?;
    let mut locations = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        let entry = read_index_entry(r)?;
        locations.push(FrameLocation {
            offset: entry.offset,
            words: entry.words,
            meta_len: entry.meta_len,
        });
    }
    let header = T3vHeader {
        version,
        subword,
        width,
        height,
        frame_count,
    };
    Ok((header, global_meta, locations))
}

/// Seek to a frame's recorded location, read its meta and (if approved) its
/// words, returning `None` when the approve callback refuses (§4.8 contract:
/// payload bytes are never read before approval).
pub fn read_frame<RS: Read + Seek, F: FnMut(&[u8]) -> bool>(
    r: &mut RS,
    loc: FrameLocation,
    mut approve: F,
) -> Result<Option<Vec<Word27>>> {
    r.seek(SeekFrom::Start(loc.offset))?;
    let meta = read_exact_vec(r, loc.meta_len as usize)?;
    if !approve(&meta) {
        return Ok(None);
    }
    let payload = read_exact_vec(r, loc.words as usize * WORD_BYTES)?;
    let stored_crc = read_u32_le(r)?;
    let computed_crc = payload_crc32(&payload);
    if stored_crc != computed_crc {
        return Err(CodecError::PayloadCrcMismatch {
            expected: computed_crc,
            found: stored_crc,
        });
    }
    Ok(Some(bytes_to_words(&payload, loc.words as usize)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_two_frames() {
        let frame_a_words = vec![Word27([1, 2, 3, 4, 5, 6, 7, 8, 9])];
        let frame_b_words = vec![Word27::zero(), Word27::zero()];
        let frames = vec![
            FrameIn { meta: b"{\"n\":0}", words: &frame_a_words },
            FrameIn { meta: b"{\"n\":1}", words: &frame_b_words },
        ];
        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, SubwordMode::S27, 4, 4, b"{}", &frames).unwrap();

        buf.set_position(0);
        let (header, global_meta, locations) = read_header(&mut buf).unwrap();
        assert_eq!(header.frame_count, 2);
        assert_eq!(global_meta, b"{}");
        assert_eq!(locations.len(), 2);

        for (i, &loc) in locations.iter().enumerate() {
            let got = read_frame(&mut buf, loc, |_m| true).unwrap().unwrap();
            assert_eq!(got, frames[i].words);
        }
    }

    #[test]
    fn random_access_reads_exactly_one_frame() {
        // Scenario 5: 3 frames of 500 words each; random access to frame 1
        // reads exactly its 500 words and validates CRC32.
        let frame_words: Vec<Vec<Word27>> = (0..3)
            .map(|f| (0..500).map(|i| Word27([(f * 7 + i) as u8 % 27; 9])).collect())
            .collect();
        let metas: Vec<String> = (0..3).map(|f| format!("{{\"frame_seq\":{f}}}")).collect();
        let frames: Vec<FrameIn<'_>> = frame_words
            .iter()
            .zip(metas.iter())
            .map(|(w, m)| FrameIn { meta: m.as_bytes(), words: w })
            .collect();
        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, SubwordMode::S27, 10, 10, b"{}", &frames).unwrap();

        buf.set_position(0);
        let (_header, _meta, locations) = read_header(&mut buf).unwrap();
        let got = read_frame(&mut buf, locations[1], |_m| true).unwrap().unwrap();
        assert_eq!(got.len(), 500);
        assert_eq!(got, frame_words[1]);
    }

    #[test]
    fn empty_video_has_zero_frames() {
        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, SubwordMode::S27, 0, 0, b"{}", &[]).unwrap();
        buf.set_position(0);
        let (header, _meta, locations) = read_header(&mut buf).unwrap();
        assert_eq!(header.frame_count, 0);
        assert!(locations.is_empty());
    }
}
