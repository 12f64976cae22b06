//! Sparse beacon insertion and stripping
//!
//! When enabled with period `P` and slot `s`, every `P`-th word reserves slot
//! `s` for a pilot symbol instead of real payload: `(profile + 5*fsq5 +
//! 15*hflag) mod 27`, where `fsq5` is the frame sequence mod 5 and `hflag` is a
//! 3-valued health flag. Beacons cost capacity — the coded stream is assembled
//! with those slots held back for the pilot rather than overwritten after the
//! fact — so decoders strip them out before the remaining slots are handed to
//! band demultiplex (§4.6).

use crate::header::BeaconConfig;
use crate::word::{Symbol, Word27};

/// Compute the pilot symbol for one beacon word.
pub fn beacon_symbol(profile_id: u8, frame_seq: u32, health_flag: u8) -> Symbol {
    let fsq5 = frame_seq % 5;
    let v = profile_id as u32 + 5 * fsq5 + 15 * (health_flag as u32 % 3);
    (v % 27) as Symbol
}

fn is_beacon_word(word_idx: usize, beacon: &BeaconConfig) -> bool {
    beacon.enabled && beacon.period > 0 && word_idx % beacon.period as usize == 0
}

/// Pack a coded/scrambled symbol stream into words, reserving the beacon slot
/// of every `P`-th word for the pilot symbol instead of a stream symbol.
pub fn assemble_words_with_beacons(
    stream: &[Symbol],
    beacon: &BeaconConfig,
    profile_id: u8,
    frame_seq: u32,
    health_flag: u8,
) -> Vec<Word27> {
    if stream.is_empty() {
        return Vec::new();
    }
    let mut words = Vec::new();
    let mut cursor = 0usize;
    let mut word_idx = 0usize;
    while cursor < stream.len() {
        let mut arr = [0u8; 9];
        let beacon_here = is_beacon_word(word_idx, beacon);
        for (slot, out) in arr.iter_mut().enumerate() {
            if beacon_here && slot == beacon.slot as usize {
                *out = beacon_symbol(profile_id, frame_seq, health_flag);
            } else {
                *out = stream.get(cursor).copied().unwrap_or(0);
                cursor += 1;
            }
        }
        words.push(Word27(arr));
        word_idx += 1;
    }
    words
}

/// Inverse of [`assemble_words_with_beacons`]: returns the reconstructed stream
/// (with beacon slots excluded) and the pilot values read, in word order, for
/// diagnostics.
pub fn disassemble_words_with_beacons(
    words: &[Word27],
    beacon: &BeaconConfig,
) -> (Vec<Symbol>, Vec<Symbol>) {
    let mut stream = Vec::new();
    let mut beacon_values = Vec::new();
    for (word_idx, word) in words.iter().enumerate() {
        let beacon_here = is_beacon_word(word_idx, beacon);
        for (slot, &sym) in word.symbols().iter().enumerate() {
            if beacon_here && slot == beacon.slot as usize {
                beacon_values.push(sym);
            } else {
                stream.push(sym);
            }
        }
    }
    (stream, beacon_values)
}
