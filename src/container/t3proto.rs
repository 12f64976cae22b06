//! `.t3proto`: prototype-pipeline container (§3, §4.7).
//!
//! Unlike `.t3p`/`.t3v` this carries no Reed-Solomon-protected `Word27`
//! payload; it is the output contract for the Haar-ternary and anisotropic
//! Radon/Haar ("ridgelet-lite") prototype pipelines, which this core treats
//! as external collaborators (§1) and does not implement itself. The blob
//! carries whichever of the two optional trit representations the producer
//! chose - balanced trits as raw bytes (one trit per byte, `{-1,0,1}`) and/or
//! base-243-packed bytes (§4.1) - flagged by `PACK_PRESENT`/`BAL_PRESENT`, with
//! `n_trits` always present so either representation can be reconstructed
//! exactly. There is no CRC; integrity is left to upstream containers and
//! tooling, per §4.7.

use std::io::{Read, Write};

use super::common::{read_exact_vec, read_magic, read_u32_le, read_u8, write_u32_le, write_u8, VERSION};
use crate::error::{CodecError, Result};
use crate::trit::{pack243, pack243_len, unpack243, BalancedTrit};

pub const MAGIC: &str = "T3PT";

/// Prototype pipeline identifier carried in the header; opaque to this core
/// beyond being round-tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoProfile {
    Haar,
    AnisoRc,
}

impl ProtoProfile {
    fn code(self) -> u8 {
        match self {
            ProtoProfile::Haar => 0,
            ProtoProfile::AnisoRc => 1,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ProtoProfile::Haar),
            1 => Ok(ProtoProfile::AnisoRc),
            _ => Err(CodecError::InvalidProfile(code)),
        }
    }
}

const FLAG_PACK_PRESENT: u8 = 1 << 0;
const FLAG_BAL_PRESENT: u8 = 1 << 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct T3protoRecord {
    pub profile: ProtoProfile,
    pub width: u32,
    pub height: u32,
    pub n_trits: usize,
    pub meta: Vec<u8>,
    /// Balanced trits, one `{-1,0,1}` value per output byte, present iff `BAL_PRESENT`.
    pub balanced: Option<Vec<BalancedTrit>>,
    /// Base-243-packed bytes (§4.1), present iff `PACK_PRESENT`.
    pub packed: Option<Vec<u8>>,
}

/// Write one `.t3proto` record. At least one of `balanced`/`packed` should be
/// supplied by the producer; an empty record (neither present) is accepted
/// but carries no reconstructable trit data.
pub fn write<W: Write>(w: &mut W, rec: &T3protoRecord) -> Result<()> {
    let n_bytes = rec.packed.as_ref().map(|p| p.len()).unwrap_or(0);
    let mut flags = 0u8;
    if rec.packed.is_some() {
        flags |= FLAG_PACK_PRESENT;
    }
    if rec.balanced.is_some() {
        flags |= FLAG_BAL_PRESENT;
    }

    w.write_all(MAGIC.as_bytes())?;
    write_u8(w, VERSION)?;
    write_u8(w, rec.profile.code())?;
    write_u8(w, flags)?;
    write_u32_le(w, rec.width)?;
    write_u32_le(w, rec.height)?;
    write_u32_le(w, rec.n_trits as u32)?;
    write_u32_le(w, n_bytes as u32)?;
    write_u32_le(w, rec.meta.len() as u32)?;
    w.write_all(&rec.meta)?;

    if let Some(bal) = &rec.balanced {
        for &t in bal {
            write_u8(w, (t + 1) as u8)?; // store as unbalanced {0,1,2} on the wire
        }
    }
    if let Some(packed) = &rec.packed {
        w.write_all(packed)?;
    }
    Ok(())
}

/// Read one `.t3proto` record. `n_trits` is taken from the header directly
/// when stored, or inferred from the packed byte count when only packed bytes
/// are present and the header value is zero (defensive fallback - producers
/// are expected to always store `n_trits` explicitly).
pub fn read<R: Read>(r: &mut R) -> Result<T3protoRecord> {
    read_magic(r, MAGIC)?;
    let version = read_u8(r)?;
    if version != VERSION {
        return Err(CodecError::BadVersion { found: version });
    }
    let profile = ProtoProfile::from_code(read_u8(r)?)?;
    let flags = read_u8(r)?;
    let width = read_u32_le(r)?;
    let height = read_u32_le(r)?;
    let mut n_trits = read_u32_le(r)? as usize;
    let n_bytes = read_u32_le(r)? as usize;
    let meta_len = read_u32_le(r)? as usize;
    let meta = read_exact_vec(r, meta_len)?;

    let balanced = if flags & FLAG_BAL_PRESENT != 0 {
        let want = if n_trits > 0 { n_trits } else { n_bytes };
        let raw = read_exact_vec(r, want)?;
        Some(raw.into_iter().map(|u| u as BalancedTrit - 1).collect())
    } else {
        None
    };
    let packed = if flags & FLAG_PACK_PRESENT != 0 {
        let want = if n_bytes > 0 { n_bytes } else { pack243_len(n_trits) };
        Some(read_exact_vec(r, want)?)
    } else {
        None
    };
    if n_trits == 0 {
        if let Some(p) = &packed {
            n_trits = p.len() * 5;
        } else if let Some(b) = &balanced {
            n_trits = b.len();
        }
    }

    Ok(T3protoRecord {
        profile,
        width,
        height,
        n_trits,
        meta,
        balanced,
        packed,
    })
}

/// Derive base-243-packed bytes from balanced trits, for producers that only
/// hold the balanced representation but want `PACK_PRESENT` set too.
pub fn pack_from_balanced(bal: &[BalancedTrit]) -> Vec<u8> {
    let unb: Vec<u8> = bal.iter().map(|&b| (b + 1) as u8).collect();
    pack243(&unb)
}

/// Derive balanced trits from base-243-packed bytes, given the exact trit count.
pub fn unpack_to_balanced(packed: &[u8], n_trits: usize) -> Vec<BalancedTrit> {
    unpack243(packed, n_trits).into_iter().map(|u| u as BalancedTrit - 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_balanced_only() {
        let bal: Vec<BalancedTrit> = (0..17).map(|i| [-1, 0, 1][i % 3]).collect();
        let rec = T3protoRecord {
            profile: ProtoProfile::Haar,
            width: 4,
            height: 4,
            n_trits: bal.len(),
            meta: b"{}".to_vec(),
            balanced: Some(bal.clone()),
            packed: None,
        };
        let mut buf = Vec::new();
        write(&mut buf, &rec).unwrap();
        let mut cursor = buf.as_slice();
        let back = read(&mut cursor).unwrap();
        assert_eq!(back.balanced, Some(bal));
        assert!(back.packed.is_none());
        assert_eq!(back.n_trits, 17);
    }

    #[test]
    fn roundtrip_packed_only_infers_n_trits_from_bytes_when_absent() {
        let bal: Vec<BalancedTrit> = (0..13).map(|i| [-1, 0, 1][i % 3]).collect();
        let packed = pack_from_balanced(&bal);
        let rec = T3protoRecord {
            profile: ProtoProfile::AnisoRc,
            width: 8,
            height: 8,
            n_trits: bal.len(),
            meta: Vec::new(),
            balanced: None,
            packed: Some(packed),
        };
        let mut buf = Vec::new();
        write(&mut buf, &rec).unwrap();
        let mut cursor = buf.as_slice();
        let back = read(&mut cursor).unwrap();
        assert_eq!(back.n_trits, 13);
        assert_eq!(unpack_to_balanced(back.packed.as_ref().unwrap(), 13), bal);
    }

    #[test]
    fn roundtrip_both_present() {
        let bal: Vec<BalancedTrit> = vec![1, -1, 0, 0, 1, -1, 1];
        let packed = pack_from_balanced(&bal);
        let rec = T3protoRecord {
            profile: ProtoProfile::Haar,
            width: 1,
            height: 7,
            n_trits: bal.len(),
            meta: b"{\"tag\":\"x\"}".to_vec(),
            balanced: Some(bal.clone()),
            packed: Some(packed.clone()),
        };
        let mut buf = Vec::new();
        write(&mut buf, &rec).unwrap();
        let mut cursor = buf.as_slice();
        let back = read(&mut cursor).unwrap();
        assert_eq!(back.balanced, Some(bal));
        assert_eq!(back.packed, Some(packed));
        assert_eq!(back.meta, rec.meta);
    }
}
