pub mod batch;
pub mod channel;
#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(test)]
mod log_capture;
pub mod null_channel;
pub mod pipeline;
pub mod session;
pub mod streaming;

pub use batch::BatchRecognizer;
pub use channel::{RecognizerChannel, ResponseStream};
pub use null_channel::NullChannel;
pub use pipeline::{transcribe_batch, transcribe_streaming, PipelineOptions};
pub use session::{SessionState, StreamingSession};
pub use streaming::StreamingRecognizer;
