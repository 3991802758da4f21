pub mod config;
pub mod error;
pub mod format;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, DecodeError, ProtocolError, RecognitionError, SttError, TransportError};
pub use format::{format_result, format_results, Transcript};
pub use types::{
    AudioEncoding, AudioFormat, EncodedChunk, Offset, RecognitionConfig, RecognitionResult,
    SampleFrame, ServiceStatus, SpeechAlternative, StreamingFrame, StreamingResponse, WordInfo,
};
