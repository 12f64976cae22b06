//! Superframe header: fixed 27-symbol layout, ternary CRC-12, RS(26,18) transport
//!
//! The header packs frame-level configuration (profile, UEP layout, tile size,
//! scrambler seed, subword/centered code, coset, frame sequence, beacon config)
//! into the same 27-symbol shape as a body [`Word27`], protected by a 12-trit CRC
//! computed with a fixed-tap LFSR (§4.5) rather than by the naive polynomial
//! division the `x^12+x^7+x^4+x^3+1` literal would suggest. For transport the 27
//! symbols are split into two 18-symbol blocks (the second zero-padded from 9) and
//! each is carried by `RS(26, 18)`, landing in the first six words of a stream.

use crate::error::{CodecError, Result};
use crate::gf27::Gf27;
use crate::rs27::{Profile as RsProfile, Rs27};
use crate::word::{Symbol, Word27};

/// Arbitrary fixed marker distinguishing a superframe header from body words;
/// unrelated to the container-level magic strings in `container`.
const MAGIC: [Symbol; 2] = [19, 3];

/// Non-CRC symbol indices, in the fixed order their trit expansion feeds the CRC.
const NON_CRC_INDICES: [usize; 23] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 23, 24, 25,
];
const CRC_INDICES: [usize; 4] = [20, 21, 22, 26];

const CRC_TAPS: [usize; 4] = [0, 3, 4, 7];

fn digits_of(e: Symbol) -> [u8; 3] {
    let e = e as u16;
    [(e % 3) as u8, ((e / 3) % 3) as u8, ((e / 9) % 3) as u8]
}

fn symbol_of(d: [u8; 3]) -> Symbol {
    (d[0] as u16 + 3 * d[1] as u16 + 9 * d[2] as u16) as Symbol
}

fn to_base27(mut value: u32, n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push((value % 27) as u8);
        value /= 27;
    }
    out
}

fn from_base27(digits: &[u8]) -> u32 {
    let mut value = 0u32;
    let mut mult = 1u32;
    for &d in digits {
        value += d as u32 * mult;
        mult *= 27;
    }
    value
}

/// A 12-trit ternary CRC register with the §4.5 fixed tap pattern: on each input
/// trit, position 11's old value feeds back into the taps `{0, 3, 4, 7}` of a
/// rotate-right-by-one of the register.
#[derive(Debug, Clone, Copy)]
struct Crc12 {
    reg: [u8; 12],
}

impl Crc12 {
    fn new() -> Self {
        Crc12 { reg: [0; 12] }
    }

    fn update(&mut self, input: u8) {
        let fb = (input + self.reg[11]) % 3;
        let mut next = [0u8; 12];
        for i in 0..12 {
            next[i] = self.reg[(i + 11) % 12];
        }
        for &t in CRC_TAPS.iter() {
            next[t] = (next[t] + fb) % 3;
        }
        self.reg = next;
    }

    fn finish(mut self) -> [u8; 12] {
        for _ in 0..12 {
            self.update(0);
        }
        self.reg
    }
}

fn compute_crc(trits: &[u8]) -> [u8; 12] {
    let mut crc = Crc12::new();
    for &t in trits {
        crc.update(t);
    }
    crc.finish()
}

/// Logical width code carried in the header and containers; does not change RS
/// mechanics, only tags the stream's intended resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubwordMode {
    S27,
    S24,
    S21,
    S18,
    S15,
}

impl SubwordMode {
    pub fn id(self) -> u8 {
        match self {
            SubwordMode::S27 => 0,
            SubwordMode::S24 => 1,
            SubwordMode::S21 => 2,
            SubwordMode::S18 => 3,
            SubwordMode::S15 => 4,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(SubwordMode::S27),
            1 => Ok(SubwordMode::S24),
            2 => Ok(SubwordMode::S21),
            3 => Ok(SubwordMode::S18),
            4 => Ok(SubwordMode::S15),
            _ => Err(CodecError::InvalidSubword(id)),
        }
    }
}

/// Per-frame label, carried but opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coset {
    C0,
    C1,
    C2,
}

impl Coset {
    pub fn id(self) -> u8 {
        match self {
            Coset::C0 => 0,
            Coset::C1 => 1,
            Coset::C2 => 2,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Coset::C0),
            1 => Ok(Coset::C1),
            2 => Ok(Coset::C2),
            _ => Err(CodecError::InvalidRoute(format!("bad coset id {id}"))),
        }
    }
}

/// One of three per-band protection levels. The header's UEP symbols pack three
/// of these per symbol as base-3 digits, which only has room for three distinct
/// values per band; `P1` (the weakest whole-frame baseline) and `RAW`/`Hdr` are
/// not offered as per-band choices (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandProfile {
    Light,
    Standard,
    Heavy,
}

impl BandProfile {
    fn code(self) -> u8 {
        match self {
            BandProfile::Light => 0,
            BandProfile::Standard => 1,
            BandProfile::Heavy => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code % 3 {
            0 => BandProfile::Light,
            1 => BandProfile::Standard,
            _ => BandProfile::Heavy,
        }
    }

    pub fn rs_profile(self) -> RsProfile {
        match self {
            BandProfile::Light => RsProfile::P2,
            BandProfile::Standard => RsProfile::P3,
            BandProfile::Heavy => RsProfile::P4,
        }
    }
}

fn encode_uep(uep: &[BandProfile; 9]) -> [Symbol; 3] {
    let mut out = [0u8; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let d = [
            uep[3 * i].code(),
            uep[3 * i + 1].code(),
            uep[3 * i + 2].code(),
        ];
        *slot = symbol_of(d);
    }
    out
}

fn decode_uep(syms: &[Symbol; 3]) -> [BandProfile; 9] {
    let mut out = [BandProfile::Light; 9];
    for (i, &sym) in syms.iter().enumerate() {
        let d = digits_of(sym);
        out[3 * i] = BandProfile::from_code(d[0]);
        out[3 * i + 1] = BandProfile::from_code(d[1]);
        out[3 * i + 2] = BandProfile::from_code(d[2]);
    }
    out
}

/// Checksum-only summary of the UEP layout; not load-bearing for round-trip
/// correctness (the layout itself lives in symbols 4..7), carried for parity
/// with the field named in §3.
fn band_map_hash(uep: &[BandProfile; 9]) -> [Symbol; 3] {
    let mut h: u32 = 0x811c9dc5;
    for b in uep {
        h ^= b.code() as u32;
        h = h.wrapping_mul(0x01000193);
    }
    let digits = to_base27(h % (27 * 27 * 27), 3);
    [digits[0], digits[1], digits[2]]
}

/// Whole-frame profile: one of the four RS profiles, plus the `P5` interleave
/// flag (P5 is P2 with 2D tile interleave turned on, not a distinct RS code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProfile {
    pub base: RsProfile,
    pub interleave: bool,
}

impl FrameProfile {
    pub fn p5() -> Self {
        FrameProfile {
            base: RsProfile::P2,
            interleave: true,
        }
    }

    fn id(self) -> u8 {
        self.base.id() + if self.interleave { 5 } else { 0 }
    }

    fn from_id(id: u8) -> Result<Self> {
        let interleave = id >= 5;
        let base = RsProfile::from_id(id % 5)?;
        Ok(FrameProfile { base, interleave })
    }
}

/// Beacon insertion policy for one frame (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconConfig {
    pub enabled: bool,
    pub slot: u8,
    pub period: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperHeader {
    pub version: u8,
    pub frame_profile: FrameProfile,
    pub uep: [BandProfile; 9],
    pub tile: (u8, u8),
    pub scrambler_seed: (u8, u8, u8),
    pub subword: SubwordMode,
    pub centered: bool,
    pub coset: Coset,
    pub frame_seq: u32,
    pub beacon: BeaconConfig,
}

impl SuperHeader {
    /// Pack into the 27-symbol wire layout, computing and embedding the CRC-12.
    pub fn to_symbols(&self) -> [Symbol; 27] {
        let mut s = [0u8; 27];
        s[0] = MAGIC[0];
        s[1] = MAGIC[1];
        s[2] = self.version;
        s[3] = self.frame_profile.id();
        s[4..7].copy_from_slice(&encode_uep(&self.uep));
        s[7] = self.tile.0;
        s[8] = self.tile.1;
        s[9] = self.scrambler_seed.0;
        s[10] = self.scrambler_seed.1;
        s[11] = self.scrambler_seed.2;
        s[12] = self.subword.id() + 5 * self.centered as u8;
        s[13..16].copy_from_slice(&band_map_hash(&self.uep));
        s[16] = self.coset.id();
        let seq = to_base27(self.frame_seq % (27 * 27 * 27), 3);
        s[17..20].copy_from_slice(&seq);
        s[23] = self.beacon.enabled as u8 * 9 + self.beacon.slot;
        let period = to_base27(self.beacon.period as u32 % (27 * 27), 2);
        s[24..26].copy_from_slice(&period);

        let mut trits = Vec::with_capacity(69);
        for &idx in NON_CRC_INDICES.iter() {
            trits.extend_from_slice(&digits_of(s[idx]));
        }
        let crc = compute_crc(&trits);
        s[20] = symbol_of([crc[0], crc[1], crc[2]]);
        s[21] = symbol_of([crc[3], crc[4], crc[5]]);
        s[22] = symbol_of([crc[6], crc[7], crc[8]]);
        s[26] = symbol_of([crc[9], crc[10], crc[11]]);
        s
    }

    /// Recompute the CRC-12 over `syms`'s non-CRC symbols and compare to the four
    /// CRC symbols carried at `{20, 21, 22, 26}`.
    pub fn verify_crc(syms: &[Symbol; 27]) -> bool {
        let mut trits = Vec::with_capacity(69);
        for &idx in NON_CRC_INDICES.iter() {
            trits.extend_from_slice(&digits_of(syms[idx]));
        }
        let crc = compute_crc(&trits);
        let want = [
            symbol_of([crc[0], crc[1], crc[2]]),
            symbol_of([crc[3], crc[4], crc[5]]),
            symbol_of([crc[6], crc[7], crc[8]]),
            symbol_of([crc[9], crc[10], crc[11]]),
        ];
        CRC_INDICES
            .iter()
            .zip(want.iter())
            .all(|(&idx, &w)| syms[idx] == w)
    }

    /// Unpack from the 27-symbol wire layout, rejecting bad magic or a CRC
    /// mismatch.
    pub fn from_symbols(syms: &[Symbol; 27]) -> Result<Self> {
        if syms[0] != MAGIC[0] || syms[1] != MAGIC[1] {
            return Err(CodecError::BadMagic {
                expected: "HDR",
                found: [syms[0], syms[1], 0, 0],
            });
        }
        if !Self::verify_crc(syms) {
            return Err(CodecError::HeaderCrcMismatch);
        }
        let version = syms[2];
        let frame_profile = FrameProfile::from_id(syms[3])?;
        let uep = decode_uep(&[syms[4], syms[5], syms[6]]);
        let tile = (syms[7], syms[8]);
        let scrambler_seed = (syms[9], syms[10], syms[11]);
        let subword = SubwordMode::from_id(syms[12] % 5)?;
        let centered = syms[12] >= 5;
        let coset = Coset::from_id(syms[16])?;
        let frame_seq = from_base27(&syms[17..20]);
        let enabled = syms[23] >= 9;
        let slot = syms[23] % 9;
        let period = from_base27(&syms[24..26]) as u16;
        Ok(SuperHeader {
            version,
            frame_profile,
            uep,
            tile,
            scrambler_seed,
            subword,
            centered,
            coset,
            frame_seq,
            beacon: BeaconConfig {
                enabled,
                slot,
                period,
            },
        })
    }

    /// RS(26,18)-protect the header as two blocks (symbols 0..18, and 18..27
    /// zero-padded to 18), packed into six Word27 (54 symbol slots, two unused).
    pub fn encode_transport(&self, gf: &Gf27, rs_p4: &Rs27) -> Result<[Word27; 6]> {
        let syms = self.to_symbols();
        let block_a: Vec<Symbol> = syms[0..18].to_vec();
        let mut block_b: Vec<Symbol> = syms[18..27].to_vec();
        block_b.resize(18, 0);

        let cw_a = rs_p4.encode(gf, &block_a)?;
        let cw_b = rs_p4.encode(gf, &block_b)?;

        let mut flat: Vec<Symbol> = Vec::with_capacity(54);
        flat.extend_from_slice(&cw_a);
        flat.extend_from_slice(&cw_b);
        flat.resize(54, 0);

        let mut words = [Word27::zero(); 6];
        for (word, chunk) in words.iter_mut().zip(flat.chunks(9)) {
            let mut arr = [0u8; 9];
            arr.copy_from_slice(chunk);
            *word = Word27(arr);
        }
        Ok(words)
    }

    /// Inverse of [`SuperHeader::encode_transport`]; returns the recovered header
    /// plus the RS-corrected symbol positions from both blocks (for diagnostics).
    pub fn decode_transport(
        gf: &Gf27,
        rs_p4: &Rs27,
        words: &[Word27; 6],
    ) -> Result<(Self, Vec<usize>)> {
        let mut flat = Vec::with_capacity(54);
        for word in words {
            flat.extend_from_slice(word.symbols());
        }
        let cw_a = &flat[0..26];
        let cw_b = &flat[26..52];
        let decoded_a = rs_p4.decode(gf, cw_a)?;
        let decoded_b = rs_p4.decode(gf, cw_b)?;

        let mut syms = [0u8; 27];
        syms[0..18].copy_from_slice(&decoded_a.data);
        syms[18..27].copy_from_slice(&decoded_b.data[0..9]);

        let header = Self::from_symbols(&syms)?;
        let mut corrected = decoded_a.corrected_positions;
        corrected.extend(decoded_b.corrected_positions.iter().map(|p| p + 26));
        Ok((header, corrected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> SuperHeader {
        SuperHeader {
            version: 1,
            frame_profile: FrameProfile::p5(),
            uep: [BandProfile::Standard; 9],
            tile: (8, 8),
            scrambler_seed: (1, 1, 1),
            subword: SubwordMode::S24,
            centered: false,
            coset: Coset::C1,
            frame_seq: 42,
            beacon: BeaconConfig {
                enabled: true,
                slot: 2,
                period: 83,
            },
        }
    }

    #[test]
    fn pack_then_verify_crc_passes() {
        let h = sample_header();
        let syms = h.to_symbols();
        assert!(SuperHeader::verify_crc(&syms));
    }

    #[test]
    fn scenario_three_flip_trit_breaks_crc() {
        let h = sample_header();
        let mut syms = h.to_symbols();
        assert!(SuperHeader::verify_crc(&syms));
        let mut d = digits_of(syms[5]);
        d[0] = (d[0] + 1) % 3;
        syms[5] = symbol_of(d);
        assert!(!SuperHeader::verify_crc(&syms));
    }

    #[test]
    fn symbol_roundtrip_recovers_fields() {
        let h = sample_header();
        let syms = h.to_symbols();
        let back = SuperHeader::from_symbols(&syms).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let h = sample_header();
        let mut syms = h.to_symbols();
        syms[0] = syms[0].wrapping_add(1) % 27;
        assert!(matches!(
            SuperHeader::from_symbols(&syms),
            Err(CodecError::BadMagic { .. })
        ));
    }

    #[test]
    fn transport_roundtrip_without_errors() {
        let gf = Gf27::new();
        let rs_p4 = Rs27::new(&gf, RsProfile::P4);
        let h = sample_header();
        let words = h.encode_transport(&gf, &rs_p4).unwrap();
        let (back, corrected) = SuperHeader::decode_transport(&gf, &rs_p4, &words).unwrap();
        assert_eq!(back, h);
        assert!(corrected.is_empty());
    }

    #[test]
    fn transport_roundtrip_corrects_errors_within_t() {
        let gf = Gf27::new();
        let rs_p4 = Rs27::new(&gf, RsProfile::P4);
        let h = sample_header();
        let mut words = h.encode_transport(&gf, &rs_p4).unwrap();
        // Corrupt one symbol in each of the two RS(26,18) blocks (t=4 each).
        let mut flat: Vec<Symbol> = words.iter().flat_map(|w| w.symbols().to_vec()).collect();
        flat[2] = gf.add(flat[2], gf.pow_alpha(3));
        flat[30] = gf.add(flat[30], gf.pow_alpha(7));
        for (word, chunk) in words.iter_mut().zip(flat.chunks(9)) {
            let mut arr = [0u8; 9];
            arr.copy_from_slice(chunk);
            *word = Word27(arr);
        }
        let (back, corrected) = SuperHeader::decode_transport(&gf, &rs_p4, &words).unwrap();
        assert_eq!(back, h);
        assert!(!corrected.is_empty());
    }

    #[test]
    fn uep_layout_roundtrips_through_symbols() {
        let uep = [
            BandProfile::Light,
            BandProfile::Standard,
            BandProfile::Heavy,
            BandProfile::Light,
            BandProfile::Standard,
            BandProfile::Heavy,
            BandProfile::Light,
            BandProfile::Standard,
            BandProfile::Heavy,
        ];
        let syms = encode_uep(&uep);
        assert_eq!(decode_uep(&syms), uep);
    }
}
