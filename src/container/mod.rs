//! Container formats: `.t3p` (single-frame), `.t3v` (multi-frame), and
//! `.t3proto` (prototype pipelines' raw trit/byte blob), plus the common
//! little-endian/CRC32/Word27-byte primitives they share (§4.7).

pub mod common;
pub mod t3p;
pub mod t3proto;
pub mod t3v;
