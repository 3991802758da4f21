use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Arc;
use stt_core::{
    EncodedChunk, RecognitionConfig, RecognitionError, RecognitionResult, StreamingFrame,
    StreamingResponse, TransportError,
};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Inbound half of a streaming session.
pub type ResponseStream =
    Pin<Box<dyn Stream<Item = Result<StreamingResponse, TransportError>> + Send>>;

/// A connection to a speech recognition service.
///
/// Implementations attach credentials themselves; callers only deal in
/// domain frames and results.
#[async_trait]
pub trait RecognizerChannel: Send + Sync {
    /// Short name used in logs (e.g. `"grpc"`, `"null"`).
    fn name(&self) -> &str;

    /// Unary recognition of a complete LINEAR16 buffer.
    async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: EncodedChunk,
    ) -> Result<Vec<RecognitionResult>, RecognitionError>;

    /// Open a duplex session. Frames written to the sender side of
    /// `outbound` are forwarded in order; dropping that sender half-closes
    /// the session. The returned stream ends once the peer is done.
    async fn streaming_recognize(
        &self,
        outbound: mpsc::Receiver<StreamingFrame>,
    ) -> Result<ResponseStream, TransportError>;
}

#[async_trait]
impl<T: RecognizerChannel + ?Sized> RecognizerChannel for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: EncodedChunk,
    ) -> Result<Vec<RecognitionResult>, RecognitionError> {
        (**self).recognize(config, audio).await
    }

    async fn streaming_recognize(
        &self,
        outbound: mpsc::Receiver<StreamingFrame>,
    ) -> Result<ResponseStream, TransportError> {
        (**self).streaming_recognize(outbound).await
    }
}
