//! Body pipeline: ties useful-symbol extraction, interleave, banding, RS,
//! scrambling and beacons into whole-frame encode/decode, and the per-frame
//! state machine of §4.6.

use crate::error::Result;
use crate::gf27::Gf27;
use crate::header::SuperHeader;
use crate::rs27::{Profile as RsProfile, Rs27};
use crate::word::{pixel_to_word_pair, word_to_pixel_pair, QuantizedPixel, Symbol, Word27};

use super::bands;
use super::beacon;
use super::interleave;
use super::scrambler::Scrambler;

/// Per-frame decode progress, per §4.6. Any RS failure outside the `t`-bound
/// aborts before the next state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    HeaderOk,
    BodyDecoded,
    Emitted,
}

fn digits_of(e: Symbol) -> [u8; 3] {
    let e = e as u16;
    [(e % 3) as u8, ((e / 3) % 3) as u8, ((e / 9) % 3) as u8]
}

fn symbol_of(d: [u8; 3]) -> Symbol {
    (d[0] as u16 + 3 * d[1] as u16 + 9 * d[2] as u16) as Symbol
}

fn div_ceil(a: usize, b: usize) -> usize {
    if a == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}

/// Number of RAW words needed to pair-pack `num_pixels` pixels (two per word,
/// the final word's second pixel zero-padded if `num_pixels` is odd).
pub fn num_words_for_pixels(num_pixels: usize) -> usize {
    div_ceil(num_pixels, 2)
}

/// Number of useful symbols carried by `num_words` RAW words after extracting
/// 26 of their 27 trits each and regrouping into 3-trit symbols.
pub fn useful_len_for_words(num_words: usize) -> usize {
    div_ceil(26 * num_words, 3)
}

/// Concatenate the first 26 trits of every RAW word and regroup into GF(27)
/// symbols, zero-padding the final partial symbol (§4.6).
pub fn extract_useful_symbols(words: &[Word27]) -> Vec<Symbol> {
    let mut trits = Vec::with_capacity(words.len() * 26);
    for w in words {
        trits.extend_from_slice(&w.to_trits()[0..26]);
    }
    while trits.len() % 3 != 0 {
        trits.push(0);
    }
    trits
        .chunks(3)
        .map(|c| symbol_of([c[0], c[1], c[2]]))
        .collect()
}

/// Inverse of [`extract_useful_symbols`]: expand symbols back to a flat trit
/// stream and regroup into `num_words` RAW words, restoring the structurally
/// zero 27th trit of each.
pub fn repack_words_from_symbols(symbols: &[Symbol], num_words: usize) -> Vec<Word27> {
    let mut trits = Vec::with_capacity(symbols.len() * 3);
    for &s in symbols {
        trits.extend_from_slice(&digits_of(s));
    }
    let mut words = Vec::with_capacity(num_words);
    for word_idx in 0..num_words {
        let mut t27 = [0u8; 27];
        let start = word_idx * 26;
        for i in 0..26 {
            t27[i] = trits.get(start + i).copied().unwrap_or(0);
        }
        words.push(Word27::from_trits(&t27));
    }
    words
}

pub struct EncodedFrame {
    pub header_words: [Word27; 6],
    pub body_words: Vec<Word27>,
    pub num_pixels: usize,
}

pub struct DecodedFrame {
    pub header: SuperHeader,
    pub pixels: Vec<QuantizedPixel>,
    pub header_corrected: Vec<usize>,
    pub body_corrected: Vec<usize>,
    pub beacon_values: Vec<Symbol>,
    pub state: FrameState,
}

/// Owns the shared GF(27) context and the `P4` RS instance used for header
/// transport; per-band RS instances are constructed on demand since they are
/// cheap (table lookups only, no per-call table rebuild cost beyond the
/// generator polynomial).
pub struct BodyPipeline {
    gf: Gf27,
    rs_p4: Rs27,
}

impl BodyPipeline {
    pub fn new() -> Self {
        let gf = Gf27::new();
        let rs_p4 = Rs27::new(&gf, RsProfile::P4);
        BodyPipeline { gf, rs_p4 }
    }

    pub fn gf(&self) -> &Gf27 {
        &self.gf
    }

    pub fn encode_frame(&self, header: &SuperHeader, pixels: &[QuantizedPixel]) -> Result<EncodedFrame> {
        let mut padded = pixels.to_vec();
        if padded.len() % 2 == 1 {
            padded.push(QuantizedPixel::quantize(0, 0, 0));
        }
        let raw_words: Vec<Word27> = padded
            .chunks(2)
            .map(|c| pixel_to_word_pair(c[0], c[1]))
            .collect();
        let num_words = raw_words.len();

        let useful = extract_useful_symbols(&raw_words);
        let pre_band = if header.frame_profile.interleave {
            interleave::interleave2d(&useful, header.tile.0 as usize, header.tile.1 as usize)
        } else {
            useful
        };

        // `RsProfile::Raw` is the one whole-frame profile that is more than a
        // header label (see `DESIGN.md`): it bypasses per-band RS entirely, so
        // the body carries exactly the useful symbols with no added parity.
        // Any other whole-frame base (P1..P4) leaves per-band ECC selection to
        // the UEP layout, which is the finer-grained selector.
        let coded_stream = if header.frame_profile.base == RsProfile::Raw {
            pre_band
        } else {
            let banded = bands::split_bands(&pre_band);
            let mut coded_stream = Vec::new();
            for i in 0..bands::NUM_BANDS {
                coded_stream.extend(bands::encode_band(&self.gf, header.uep[i], &banded[i])?);
            }
            coded_stream
        };

        let mut scr = Scrambler::new(
            header.scrambler_seed.0,
            header.scrambler_seed.1,
            header.scrambler_seed.2,
        );
        let scrambled = scr.scramble_all(&coded_stream);

        let profile_id = header.frame_profile.base.id();
        let body_words = beacon::assemble_words_with_beacons(
            &scrambled,
            &header.beacon,
            profile_id,
            header.frame_seq,
            0,
        );

        let header_words = header.encode_transport(&self.gf, &self.rs_p4)?;
        let _ = num_words; // retained for symmetry with decode_frame's explicit length plumbing

        Ok(EncodedFrame {
            header_words,
            body_words,
            num_pixels: pixels.len(),
        })
    }

    /// Decode a frame, reporting §4.6's state-machine transitions to `on_state`
    /// as each stage completes. A failure at any stage aborts before the next
    /// transition is reported, matching "any RS failure outside the t-bound is
    /// terminal for that frame" (§4.6).
    pub fn decode_frame_observed(
        &self,
        header_words: &[Word27; 6],
        body_words: &[Word27],
        num_pixels: usize,
        mut on_state: impl FnMut(FrameState),
    ) -> Result<DecodedFrame> {
        on_state(FrameState::Idle);

        let (header, header_corrected) =
            SuperHeader::decode_transport(&self.gf, &self.rs_p4, header_words)?;
        on_state(FrameState::HeaderOk);

        let (stream, beacon_values) =
            beacon::disassemble_words_with_beacons(body_words, &header.beacon);

        let mut scr = Scrambler::new(
            header.scrambler_seed.0,
            header.scrambler_seed.1,
            header.scrambler_seed.2,
        );
        let coded_stream_full = scr.descramble_all(&stream);

        let num_words = num_words_for_pixels(num_pixels);
        let useful_len = useful_len_for_words(num_words);

        let (merged, body_corrected) = if header.frame_profile.base == RsProfile::Raw {
            let end = useful_len.min(coded_stream_full.len());
            (coded_stream_full[0..end].to_vec(), Vec::new())
        } else {
            let orig_lens = bands::band_lengths(useful_len);
            let mut coded_lens = [0usize; 9];
            for i in 0..9 {
                coded_lens[i] = bands::coded_len(orig_lens[i], header.uep[i]);
            }
            let total_coded: usize = coded_lens.iter().sum();
            let end = total_coded.min(coded_stream_full.len());
            let coded_stream = &coded_stream_full[0..end];

            let mut band_data: [Vec<Symbol>; 9] = Default::default();
            let mut body_corrected = Vec::new();
            let mut pos = 0usize;
            for i in 0..9 {
                let take = coded_lens[i].min(coded_stream.len().saturating_sub(pos));
                let chunk = &coded_stream[pos..pos + take];
                let (data, corrected) = bands::decode_band(&self.gf, header.uep[i], chunk, orig_lens[i])?;
                body_corrected.extend(corrected.iter().map(|p| p + pos));
                band_data[i] = data;
                pos += take;
            }
            (bands::merge_bands(&band_data), body_corrected)
        };
        on_state(FrameState::BodyDecoded);

        let pre_band = if header.frame_profile.interleave {
            interleave::deinterleave2d(&merged, header.tile.0 as usize, header.tile.1 as usize)
        } else {
            merged
        };

        let raw_words = repack_words_from_symbols(&pre_band, num_words);
        let mut pixels = Vec::with_capacity(num_words * 2);
        for w in &raw_words {
            let (p0, p1) = word_to_pixel_pair(*w);
            pixels.push(p0);
            pixels.push(p1);
        }
        pixels.truncate(num_pixels);

        on_state(FrameState::Emitted);
        Ok(DecodedFrame {
            header,
            pixels,
            header_corrected,
            body_corrected,
            beacon_values,
            state: FrameState::Emitted,
        })
    }

    pub fn decode_frame(
        &self,
        header_words: &[Word27; 6],
        body_words: &[Word27],
        num_pixels: usize,
    ) -> Result<DecodedFrame> {
        self.decode_frame_observed(header_words, body_words, num_pixels, |_| {})
    }
}

impl Default for BodyPipeline {
    fn default() -> Self {
        Self::new()
    }
}
