//! 2D boustrophedon tile interleave (P5 only)
//!
//! Useful symbols are processed in consecutive groups of `tile.w * tile.h`
//! (the final group may be shorter). Within a group, symbols are read in
//! row-major order and written out in boustrophedon scan order: row 0
//! left-to-right, row 1 right-to-left, row 2 left-to-right, and so on. A
//! partial final group keeps only the valid cells of the scan, in the same
//! relative order (§4.6, §8 boundary behaviour).

use crate::word::Symbol;

/// Row-major natural indices of a `tw x th` grid, visited in boustrophedon
/// order.
fn scan_order(tw: usize, th: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(tw * th);
    for row in 0..th {
        if row % 2 == 0 {
            for col in 0..tw {
                order.push(row * tw + col);
            }
        } else {
            for col in (0..tw).rev() {
                order.push(row * tw + col);
            }
        }
    }
    order
}

fn chunk_lengths(total: usize, tile_area: usize) -> Vec<usize> {
    if tile_area == 0 {
        return vec![total];
    }
    let mut lens = Vec::new();
    let mut remaining = total;
    while remaining > 0 {
        let take = remaining.min(tile_area);
        lens.push(take);
        remaining -= take;
    }
    lens
}

/// Apply the boustrophedon tile permutation to `symbols`.
pub fn interleave2d(symbols: &[Symbol], tw: usize, th: usize) -> Vec<Symbol> {
    let tile_area = tw * th;
    let order = scan_order(tw, th);
    let mut out = Vec::with_capacity(symbols.len());
    let mut pos = 0;
    for len in chunk_lengths(symbols.len(), tile_area) {
        let chunk = &symbols[pos..pos + len];
        for &nat_idx in &order {
            if nat_idx < chunk.len() {
                out.push(chunk[nat_idx]);
            }
        }
        pos += len;
    }
    out
}

/// Inverse of [`interleave2d`].
pub fn deinterleave2d(symbols: &[Symbol], tw: usize, th: usize) -> Vec<Symbol> {
    let tile_area = tw * th;
    let order = scan_order(tw, th);
    let mut out = vec![0u8; symbols.len()];
    let mut pos = 0;
    for len in chunk_lengths(symbols.len(), tile_area) {
        let filtered: Vec<usize> = order.iter().copied().filter(|&idx| idx < len).collect();
        for (i, &nat_idx) in filtered.iter().enumerate() {
            out[pos + nat_idx] = symbols[pos + i];
        }
        pos += len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boustrophedon_order_4x2() {
        // 4x2 grid: row0 -> 0,1,2,3 ; row1 -> 7,6,5,4
        assert_eq!(scan_order(4, 2), vec![0, 1, 2, 3, 7, 6, 5, 4]);
    }

    #[test]
    fn roundtrip_exact_multiple_of_tile() {
        let symbols: Vec<Symbol> = (0..32u8).map(|i| i % 27).collect();
        let interleaved = interleave2d(&symbols, 4, 4);
        assert_eq!(interleaved.len(), symbols.len());
        let back = deinterleave2d(&interleaved, 4, 4);
        assert_eq!(back, symbols);
    }

    #[test]
    fn roundtrip_partial_final_tile() {
        let symbols: Vec<Symbol> = (0..21u8).map(|i| (i * 5) % 27).collect();
        let interleaved = interleave2d(&symbols, 4, 4);
        let back = deinterleave2d(&interleaved, 4, 4);
        assert_eq!(back, symbols);
    }

    #[test]
    fn roundtrip_various_lengths_and_tile_sizes() {
        for (len, tw, th) in [(0usize, 8, 8), (1, 8, 8), (7, 3, 3), (100, 8, 8), (63, 9, 7)] {
            let symbols: Vec<Symbol> = (0..len as u32).map(|i| (i % 27) as u8).collect();
            let interleaved = interleave2d(&symbols, tw, th);
            let back = deinterleave2d(&interleaved, tw, th);
            assert_eq!(back, symbols, "len={len} tw={tw} th={th}");
        }
    }
}
