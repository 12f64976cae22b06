//! Shared container primitives: little-endian integer I/O, CRC32, magic
//! checks, and the Word27 <-> byte serialization used by `.t3p` and `.t3v`.
//!
//! All integers are little-endian. CRC32 uses the reflected IEEE polynomial
//! (poly `0xEDB88320`, init `0xFFFFFFFF`, xorout `0xFFFFFFFF`) via `crc32fast`
//! - the same algorithm used for the empty-payload special case below, since
//! that combination already yields 0 for an empty input; the explicit guard
//! exists to keep the `.t3v` empty-frame decision (§9) visible at the call
//! site rather than relying on that coincidence.

use std::io::{self, Read, Write};

use crate::error::{CodecError, Result};
use crate::trit::{pack243, unpack243};
use crate::word::Word27;

/// Bytes needed to serialize one Word27 (27 trits, base-243 packed: `ceil(27/5) = 6`).
pub const WORD_BYTES: usize = 6;

/// Container format version this build writes and accepts.
pub const VERSION: u8 = 1;

pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC32 with the `.t3v`/`.t3p` empty-payload special case (§9 Open Questions):
/// zero words always yields `0`, which the standard algorithm also produces,
/// but is pinned down explicitly here rather than left implicit.
pub fn payload_crc32(bytes: &[u8]) -> u32 {
    if bytes.is_empty() {
        0
    } else {
        crc32(bytes)
    }
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_all(&[v])
}

pub fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_u64_le<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn read_exact_vec<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Write `magic` verbatim (already ASCII, e.g. `b"T3P6"`).
pub fn write_magic<W: Write>(w: &mut W, magic: &[u8; 4]) -> io::Result<()> {
    w.write_all(magic)
}

/// Read 4 bytes and check them against `expected`.
pub fn read_magic<R: Read>(r: &mut R, expected: &'static str) -> Result<()> {
    let mut found = [0u8; 4];
    r.read_exact(&mut found)?;
    if &found != expected.as_bytes() {
        return Err(CodecError::BadMagic { expected, found });
    }
    Ok(())
}

pub fn word_to_bytes(word: &Word27) -> [u8; WORD_BYTES] {
    let trits = word.to_trits();
    let packed = pack243(&trits);
    let mut out = [0u8; WORD_BYTES];
    out.copy_from_slice(&packed);
    out
}

pub fn words_to_bytes(words: &[Word27]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * WORD_BYTES);
    for w in words {
        out.extend_from_slice(&word_to_bytes(w));
    }
    out
}

pub fn bytes_to_words(bytes: &[u8], count: usize) -> Result<Vec<Word27>> {
    if bytes.len() != count * WORD_BYTES {
        return Err(crate::error::out_of_range("t3_words_bytes", bytes.len(), count * WORD_BYTES));
    }
    let mut out = Vec::with_capacity(count);
    for chunk in bytes.chunks(WORD_BYTES) {
        let trits = unpack243(chunk, 27);
        let mut arr = [0u8; 27];
        arr.copy_from_slice(&trits);
        out.push(Word27::from_trits(&arr));
    }
    Ok(out)
}
