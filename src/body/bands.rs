//! 9-band demultiplex and per-band UEP Reed-Solomon
//!
//! Useful symbols are dealt round-robin into nine bands (`band = index mod 9`);
//! each band is RS-encoded block-by-block using the per-band profile named by
//! the header's UEP layout. The wire order is band-major: all of band 0's coded
//! blocks, then band 1's, and so on.

use crate::error::Result;
use crate::gf27::Gf27;
use crate::header::BandProfile;
use crate::rs27::{Rs27, N};
use crate::word::Symbol;

pub const NUM_BANDS: usize = 9;

fn div_ceil(a: usize, b: usize) -> usize {
    if a == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}

/// How many of `total` round-robin-dealt symbols land in each of the 9 bands.
pub fn band_lengths(total: usize) -> [usize; NUM_BANDS] {
    let mut lens = [0usize; NUM_BANDS];
    for i in 0..total {
        lens[i % NUM_BANDS] += 1;
    }
    lens
}

/// Deal `symbols` round-robin into 9 bands.
pub fn split_bands(symbols: &[Symbol]) -> [Vec<Symbol>; NUM_BANDS] {
    let mut bands: [Vec<Symbol>; NUM_BANDS] = Default::default();
    for (i, &sym) in symbols.iter().enumerate() {
        bands[i % NUM_BANDS].push(sym);
    }
    bands
}

/// Inverse of [`split_bands`].
pub fn merge_bands(bands: &[Vec<Symbol>; NUM_BANDS]) -> Vec<Symbol> {
    let total: usize = bands.iter().map(|b| b.len()).sum();
    let mut cursors = [0usize; NUM_BANDS];
    let mut out = Vec::with_capacity(total);
    for i in 0..total {
        let b = i % NUM_BANDS;
        out.push(bands[b][cursors[b]]);
        cursors[b] += 1;
    }
    out
}

/// Per-band coded length (after RS) for a band carrying `orig_len` useful
/// symbols under `profile`.
pub fn coded_len(orig_len: usize, profile: BandProfile) -> usize {
    let k = profile.rs_profile().k();
    div_ceil(orig_len, k) * N
}

/// RS-encode one band's symbols, block by block (`k` symbols per block,
/// zero-padded in the final block).
pub fn encode_band(gf: &Gf27, profile: BandProfile, data: &[Symbol]) -> Result<Vec<Symbol>> {
    let rs = Rs27::new(gf, profile.rs_profile());
    let k = rs.profile().k();
    let mut out = Vec::with_capacity(coded_len(data.len(), profile));
    for chunk in data.chunks(k) {
        let mut buf = chunk.to_vec();
        buf.resize(k, 0);
        out.extend(rs.encode(gf, &buf)?);
    }
    Ok(out)
}

/// Decode one band's RS-coded symbols back to `orig_len` useful symbols, plus
/// the corrected positions (codeword-relative, offset by block).
pub fn decode_band(
    gf: &Gf27,
    profile: BandProfile,
    encoded: &[Symbol],
    orig_len: usize,
) -> Result<(Vec<Symbol>, Vec<usize>)> {
    let rs = Rs27::new(gf, profile.rs_profile());
    let mut data = Vec::with_capacity(orig_len);
    let mut corrected = Vec::new();
    for (block_idx, block) in encoded.chunks(N).enumerate() {
        let decoded = rs.decode(gf, block)?;
        corrected.extend(decoded.corrected_positions.iter().map(|p| p + block_idx * N));
        data.extend(decoded.data);
    }
    data.truncate(orig_len);
    Ok((data, corrected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_merge_roundtrip() {
        let symbols: Vec<Symbol> = (0..47u32).map(|i| (i % 27) as u8).collect();
        let bands = split_bands(&symbols);
        assert_eq!(merge_bands(&bands), symbols);
    }

    #[test]
    fn band_lengths_sum_to_total() {
        for total in [0usize, 1, 8, 9, 10, 100] {
            let lens = band_lengths(total);
            assert_eq!(lens.iter().sum::<usize>(), total);
        }
    }

    #[test]
    fn encode_decode_band_roundtrip() {
        let gf = Gf27::new();
        for profile in [BandProfile::Light, BandProfile::Standard, BandProfile::Heavy] {
            let data: Vec<Symbol> = (0..50u32).map(|i| (i * 7 % 27) as u8).collect();
            let encoded = encode_band(&gf, profile, &data).unwrap();
            let (decoded, corrected) = decode_band(&gf, profile, &encoded, data.len()).unwrap();
            assert_eq!(decoded, data);
            assert!(corrected.is_empty());
        }
    }

    #[test]
    fn encode_decode_band_empty() {
        let gf = Gf27::new();
        let encoded = encode_band(&gf, BandProfile::Standard, &[]).unwrap();
        assert!(encoded.is_empty());
        let (decoded, corrected) = decode_band(&gf, BandProfile::Standard, &encoded, 0).unwrap();
        assert!(decoded.is_empty());
        assert!(corrected.is_empty());
    }
}
