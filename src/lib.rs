//! # t3codec - ternary transport codec
//!
//! A trit-native transport codec for still images and video: GF(27) Reed-Solomon
//! coding, a fixed-layout superframe header protected by a ternary CRC-12, a
//! 9-band UEP body pipeline with 2D interleave, an affine scrambler and sparse
//! beacons, and the `.t3p`/`.t3v`/`.t3proto` container formats that carry the
//! result to disk.
//!
//! ## Layout
//!
//! - [`trit`] - balanced/unbalanced trit conversion and base-243 byte packing.
//! - [`gf27`] - GF(27) field arithmetic (log/exp tables, a primitive element).
//! - [`rs27`] - RS(26, k) encode/decode over GF(27) (syndromes, Berlekamp-Massey,
//!   Chien search, Forney).
//! - [`word`] - the 9-symbol `Word27` transport unit and its pixel packing.
//! - [`header`] - the 27-symbol superframe header, its CRC-12, and RS(26,18)
//!   transport framing.
//! - [`body`] - the band/interleave/scrambler/beacon pipeline tying a frame's
//!   words together.
//! - [`container`] - `.t3p`, `.t3v`, and `.t3proto` on-disk formats.
//! - [`image`] - raw RGB <-> quantized YCbCr bridging and canvas centering.
//! - [`meta`] - tolerant bracket-aware key lookup over a meta blob.
//! - [`policy`] - the metadata-only access-policy overlay and PREP/ACCEPT redirect.
//! - [`error`] - the crate's single error type.
//!
//! None of this core depends on an image or video file already existing in
//! `.t3p`/`.t3v` form; encoding starts from [`image::ImageU8`] pixels and a
//! chosen [`header::SuperHeader`], and decoding ends the same way.

pub mod body;
pub mod container;
pub mod error;
pub mod gf27;
pub mod header;
pub mod image;
pub mod meta;
pub mod policy;
pub mod rs27;
pub mod trit;
pub mod word;

pub use body::{BodyPipeline, DecodedFrame, EncodedFrame, FrameState};
pub use error::{CodecError, Result};
pub use gf27::{Gf27, Gf27Elem};
pub use header::{BandProfile, BeaconConfig, Coset, FrameProfile, SubwordMode, SuperHeader};
pub use image::ImageU8;
pub use policy::{Decision, PolicyConfig, PolicyOverlay, RequestMeta};
pub use rs27::{Profile as RsProfile, Rs27};
pub use word::{QuantizedPixel, Symbol, Word27};
