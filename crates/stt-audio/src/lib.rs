pub mod convert;
pub mod decoder;
pub mod progress;
pub mod source;

pub use convert::{effective_sample_rate, encode_frame, to_linear16};
pub use decoder::{AudioAsset, AudioSource, DecodedStream, Frames};
pub use progress::{Progress, ProgressSource, SATURATION};
pub use source::{FrameSource, ScriptedSource};
