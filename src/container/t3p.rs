//! `.t3p`: single-frame container (§4.7).
//!
//! Write order: fixed header -> header CRC32 -> meta bytes -> words bytes ->
//! payload CRC32 over the words bytes. A read verifies the header CRC32,
//! hands the meta bytes to the caller's approve callback, and only allocates
//! and reads the words payload (validating its CRC32) once approved.

use std::io::{Read, Write};

use super::common::{
    crc32, payload_crc32, read_exact_vec, read_magic, read_u32_le, read_u8, words_to_bytes,
    bytes_to_words, write_magic, write_u32_le, write_u8, VERSION,
};
use crate::error::{CodecError, Result};
use crate::header::SubwordMode;
use crate::word::Word27;

pub const MAGIC: &str = "T3P6";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T3pInfo {
    pub version: u8,
    pub subword: SubwordMode,
    pub width: u32,
    pub height: u32,
    pub words_count: u32,
}

fn header_bytes(subword: SubwordMode, width: u32, height: u32, meta_len: u32, words_count: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 1 + 1 + 4 + 4 + 4 + 4);
    buf.extend_from_slice(MAGIC.as_bytes());
    buf.push(VERSION);
    buf.push(subword.id());
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&meta_len.to_le_bytes());
    buf.extend_from_slice(&words_count.to_le_bytes());
    buf
}

pub fn write<W: Write>(
    w: &mut W,
    subword: SubwordMode,
    width: u32,
    height: u32,
    meta: &[u8],
    words: &[Word27],
) -> Result<()> {
    let words_count = words.len() as u32;
    let header = header_bytes(subword, width, height, meta.len() as u32, words_count);
    w.write_all(&header)?;
    write_u32_le(w, crc32(&header))?;
    w.write_all(meta)?;
    let payload = words_to_bytes(words);
    w.write_all(&payload)?;
    write_u32_le(w, payload_crc32(&payload))?;
    Ok(())
}

/// Read a `.t3p` stream. `approve` receives the raw meta bytes and decides
/// whether the payload should be read at all (§4.8 contract).
pub fn read<R: Read, F: FnMut(&[u8]) -> bool>(r: &mut R, mut approve: F) -> Result<(T3pInfo, Vec<Word27>)> {
    read_magic(r, MAGIC)?;
    let version = read_u8(r)?;
    if version != VERSION {
        return Err(CodecError::BadVersion { found: version });
    }
    let subword_byte = read_u8(r)?;
    let subword = SubwordMode::from_id(subword_byte)?;
    let width = read_u32_le(r)?;
    let height = read_u32_le(r)?;
    let meta_len = read_u32_le(r)?;
    let words_count = read_u32_le(r)?;
    let header = header_bytes(subword, width, height, meta_len, words_count);
    let stored_crc = read_u32_le(r)?;
    let computed_crc = crc32(&header);
    if stored_crc != computed_crc {
        return Err(CodecError::ContainerHeaderCrcMismatch {
            expected: computed_crc,
            found: stored_crc,
        });
    }
    let meta = read_exact_vec(r, meta_len as usize)?;
    let info = T3pInfo {
        version,
        subword,
        width,
        height,
        words_count,
    };
    if !approve(&meta) {
        return Err(CodecError::MetaNotApproved);
    }
    let payload = read_exact_vec(r, words_count as usize * super::common::WORD_BYTES)?;
    let stored_payload_crc = read_u32_le(r)?;
    let computed_payload_crc = payload_crc32(&payload);
    if stored_payload_crc != computed_payload_crc {
        return Err(CodecError::PayloadCrcMismatch {
            expected: computed_payload_crc,
            found: stored_payload_crc,
        });
    }
    let words = bytes_to_words(&payload, words_count as usize)?;
    Ok((info, words))
}
