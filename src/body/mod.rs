//! Body pipeline: interleave, 9-band UEP, scrambler, beacons, and the
//! whole-frame encode/decode pipeline that ties them together (§4.6).

pub mod bands;
pub mod beacon;
pub mod interleave;
pub mod pipeline;
pub mod scrambler;

pub use pipeline::{BodyPipeline, DecodedFrame, EncodedFrame, FrameState};
