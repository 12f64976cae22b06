//! Raw image/video adapter surface (§4.9): RGB8 <-> quantized YCbCr, canvas
//! centering for the sub-S27 `SubwordMode`s, and pixel<->`Word27` bridging.
//!
//! Everything the core needs from an image is `ImageU8`: a row-major,
//! 3-channel-interleaved RGB8 buffer. Colour conversion and canvas placement
//! happen here, one layer above `word`'s pixel<->`Word27` packing, which only
//! ever sees already-quantized triples.

use crate::header::SubwordMode;
use crate::trit::{unb_to_bal, BalancedTrit};
use crate::word::{
    pixel_to_word_pair, pixel_to_word_singleton, word_to_pixel_pair, word_to_pixel_singleton,
    QuantizedPixel, Word27,
};

/// A decoded image: row-major RGB8, 3 interleaved channels per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageU8 {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl ImageU8 {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        debug_assert_eq!(rgb.len(), width as usize * height as usize * 3);
        ImageU8 { width, height, rgb }
    }

    pub fn black(width: u32, height: u32) -> Self {
        ImageU8 {
            width,
            height,
            rgb: vec![0u8; width as usize * height as usize * 3],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn pixel_at(&self, index: usize) -> (u8, u8, u8) {
        let o = index * 3;
        (self.rgb[o], self.rgb[o + 1], self.rgb[o + 2])
    }

    fn set_pixel_at(&mut self, index: usize, rgb: (u8, u8, u8)) {
        let o = index * 3;
        self.rgb[o] = rgb.0;
        self.rgb[o + 1] = rgb.1;
        self.rgb[o + 2] = rgb.2;
    }

    /// Quantized YCbCr triples for every pixel, row-major (§4.4 colour transform).
    pub fn to_quantized(&self) -> Vec<QuantizedPixel> {
        (0..self.pixel_count())
            .map(|i| rgb_to_quantized(self.pixel_at(i)))
            .collect()
    }

    /// Rebuild an image of the given size from quantized YCbCr triples,
    /// truncating or zero-filling to fit `width * height`.
    pub fn from_quantized(width: u32, height: u32, pixels: &[QuantizedPixel]) -> Self {
        let n = width as usize * height as usize;
        let mut img = ImageU8::black(width, height);
        for i in 0..n {
            let q = pixels.get(i).copied().unwrap_or(QuantizedPixel { y: 0, cb: 0, cr: 0 });
            img.set_pixel_at(i, quantized_to_rgb(q));
        }
        img
    }

    /// Pack this image's pixels two-per-word via [`pixel_to_word_pair`]; an odd
    /// trailing pixel is paired with a black filler pixel.
    pub fn to_words(&self) -> Vec<Word27> {
        let quantized = self.to_quantized();
        quantized
            .chunks(2)
            .map(|pair| {
                let p0 = pair[0];
                let p1 = pair.get(1).copied().unwrap_or(QuantizedPixel { y: 0, cb: 0, cr: 0 });
                pixel_to_word_pair(p0, p1)
            })
            .collect()
    }

    /// Inverse of [`ImageU8::to_words`]; the caller supplies the pixel count
    /// since a trailing filler pixel carries no width/height of its own.
    pub fn from_words(words: &[Word27], width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(words.len() * 2);
        for &w in words {
            let (p0, p1) = word_to_pixel_pair(w);
            pixels.push(p0);
            pixels.push(p1);
        }
        pixels.truncate(n);
        ImageU8::from_quantized(width, height, &pixels)
    }

    /// Flatten to balanced trits via the 13-trit singleton pixel packing
    /// (§4.4), for producers of `.t3proto` records that bypass RS transport
    /// entirely (the Haar/anisotropic pipelines this core does not implement
    /// - see `container::t3proto`).
    pub fn to_balanced_trits(&self) -> Vec<BalancedTrit> {
        let mut out = Vec::with_capacity(self.pixel_count() * 13);
        for q in self.to_quantized() {
            let word = pixel_to_word_singleton(q);
            let trits = word.to_trits();
            out.extend(trits[0..13].iter().map(|&t| unb_to_bal(t)));
        }
        out
    }

    /// Inverse of [`ImageU8::to_balanced_trits`].
    pub fn from_balanced_trits(width: u32, height: u32, trits: &[BalancedTrit]) -> Self {
        let n = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(n);
        for chunk in trits.chunks(13).take(n) {
            let mut t27 = [0u8; 27];
            for (i, &t) in chunk.iter().enumerate() {
                t27[i] = crate::trit::bal_to_unb(t);
            }
            pixels.push(word_to_pixel_singleton(Word27::from_trits(&t27)));
        }
        ImageU8::from_quantized(width, height, &pixels)
    }

    /// Place this image at the centre of a square canvas of side `canvas_dim`,
    /// padding with black pixels. No-op (returns a copy) if this image is
    /// already that size (§4.9 "centered" contract).
    pub fn center_on_canvas(&self, canvas_dim: u32) -> ImageU8 {
        if self.width == canvas_dim && self.height == canvas_dim {
            return self.clone();
        }
        let mut canvas = ImageU8::black(canvas_dim, canvas_dim);
        let x0 = canvas_dim.saturating_sub(self.width) / 2;
        let y0 = canvas_dim.saturating_sub(self.height) / 2;
        for y in 0..self.height.min(canvas_dim) {
            for x in 0..self.width.min(canvas_dim) {
                let src = (y * self.width + x) as usize;
                let dst = ((y0 + y) * canvas_dim + (x0 + x)) as usize;
                canvas.set_pixel_at(dst, self.pixel_at(src));
            }
        }
        canvas
    }

    /// Extract the centred `width x height` window out of a square canvas -
    /// the inverse placement of [`ImageU8::center_on_canvas`].
    pub fn extract_centered(&self, width: u32, height: u32) -> ImageU8 {
        if self.width == width && self.height == height {
            return self.clone();
        }
        let x0 = self.width.saturating_sub(width) / 2;
        let y0 = self.height.saturating_sub(height) / 2;
        let mut out = ImageU8::black(width, height);
        for y in 0..height {
            for x in 0..width {
                let src = ((y0 + y) * self.width + (x0 + x)) as usize;
                out.set_pixel_at((y * width + x) as usize, self.pixel_at(src));
            }
        }
        out
    }
}

/// Canonical square canvas side for each subword tag (§4.9 "centered" mode;
/// decreasing multiples of 3 mirroring the header's own `27 -> 15` stride).
pub fn subword_canvas_dim(mode: SubwordMode) -> u32 {
    match mode {
        SubwordMode::S27 => 27,
        SubwordMode::S24 => 24,
        SubwordMode::S21 => 21,
        SubwordMode::S18 => 18,
        SubwordMode::S15 => 15,
    }
}

/// BT.601-style integer RGB -> quantized YCbCr, clamped into the transport's
/// narrow ranges by [`QuantizedPixel::quantize`] (§4.4).
pub fn rgb_to_quantized((r, g, b): (u8, u8, u8)) -> QuantizedPixel {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = (77 * r + 150 * g + 29 * b) >> 8;
    let cb = ((-43 * r - 85 * g + 128 * b) >> 8) * 40 / 128;
    let cr = ((128 * r - 107 * g - 21 * b) >> 8) * 40 / 128;
    QuantizedPixel::quantize(y, cb, cr)
}

/// Inverse colour transform; lossy beyond the quantized ranges already lost
/// in [`rgb_to_quantized`] (§8 "exact up to documented quantization loss").
pub fn quantized_to_rgb(q: QuantizedPixel) -> (u8, u8, u8) {
    let y = q.y as i32;
    let cb = q.cb as i32 * 128 / 40;
    let cr = q.cr as i32 * 128 / 40;
    let r = y + (cr * 359) / 256;
    let g = y - (cb * 88) / 256 - (cr * 183) / 256;
    let b = y + (cb * 454) / 256;
    (r.clamp(0, 255) as u8, g.clamp(0, 255) as u8, b.clamp(0, 255) as u8)
}

/// A source of decoded video frames; timestamp/fps are carried as per-frame
/// meta only and never influence codec behaviour (§4.9).
pub trait VideoFrameSource {
    fn next_frame(&mut self) -> Option<(ImageU8, f64, f64)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_dequantize_is_a_lossy_roundtrip_within_tolerance() {
        for &(r, g, b) in &[(255u8, 0u8, 0u8), (0, 255, 0), (0, 0, 255), (128, 128, 128), (10, 200, 60)] {
            let q = rgb_to_quantized((r, g, b));
            let (r2, g2, b2) = quantized_to_rgb(q);
            // Chroma is squeezed into +/-40 before transport; allow generous slack.
            assert!((r as i32 - r2 as i32).abs() <= 80, "r drifted too far: {r} vs {r2}");
            assert!((g as i32 - g2 as i32).abs() <= 80, "g drifted too far: {g} vs {g2}");
            assert!((b as i32 - b2 as i32).abs() <= 80, "b drifted too far: {b} vs {b2}");
        }
    }

    #[test]
    fn to_words_from_words_roundtrips_even_pixel_count() {
        let img = ImageU8::new(2, 2, vec![
            255, 0, 0, 0, 255, 0,
            0, 0, 255, 128, 128, 128,
        ]);
        let words = img.to_words();
        assert_eq!(words.len(), 2);
        let back = ImageU8::from_words(&words, 2, 2);
        assert_eq!(back.width, 2);
        assert_eq!(back.height, 2);
        assert_eq!(back.rgb.len(), img.rgb.len());
    }

    #[test]
    fn to_words_from_words_roundtrips_odd_pixel_count() {
        let img = ImageU8::new(1, 3, vec![10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let words = img.to_words();
        assert_eq!(words.len(), 2); // 3 pixels -> 2 words, second half-filled with black
        let back = ImageU8::from_words(&words, 1, 3);
        assert_eq!(back.pixel_count(), 3);
    }

    #[test]
    fn center_on_canvas_and_extract_centered_roundtrip() {
        let small = ImageU8::new(2, 2, vec![9, 9, 9, 8, 8, 8, 7, 7, 7, 6, 6, 6]);
        let canvas = small.center_on_canvas(subword_canvas_dim(SubwordMode::S15));
        assert_eq!(canvas.width, 15);
        assert_eq!(canvas.height, 15);
        let back = canvas.extract_centered(2, 2);
        assert_eq!(back, small);
    }

    #[test]
    fn center_on_canvas_is_noop_for_matching_size() {
        let img = ImageU8::black(27, 27);
        let canvas = img.center_on_canvas(subword_canvas_dim(SubwordMode::S27));
        assert_eq!(canvas, img);
    }

    #[test]
    fn balanced_trit_roundtrip_recovers_the_packed_quantized_pixel() {
        // The singleton trit packing itself is exact (proven directly on
        // `Word27` in `word.rs`); this just exercises it end to end through
        // the image adapter rather than re-deriving the field's algebra.
        let pixels = [QuantizedPixel::quantize(200, -12, 30), QuantizedPixel::quantize(20, 8, -9)];
        let trits: Vec<BalancedTrit> = pixels
            .iter()
            .flat_map(|&p| {
                let word = pixel_to_word_singleton(p);
                word.to_trits()[0..13].iter().map(|&t| unb_to_bal(t)).collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(trits.len(), 2 * 13);
        let back = ImageU8::from_balanced_trits(2, 1, &trits);
        let expected = ImageU8::from_quantized(2, 1, &pixels);
        assert_eq!(back, expected);
    }
}
