use crate::channel::{RecognizerChannel, ResponseStream};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stt_core::{
    EncodedChunk, RecognitionConfig, RecognitionError, RecognitionResult, StreamingFrame,
    StreamingResponse, TransportError,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Default)]
struct SessionLog {
    frames: Vec<(Instant, StreamingFrame)>,
    half_closed_at: Option<Instant>,
}

/// In-process recognizer that never touches the network.
///
/// Every frame it receives is recorded. Unless responses are scripted, it
/// answers with a single summary result (`[null] <n> bytes at <rate> Hz`)
/// once the caller half-closes the stream.
pub struct NullChannel {
    log: Arc<Mutex<SessionLog>>,
    scripted: Mutex<Option<Vec<StreamingResponse>>>,
    stream_failure: Mutex<Option<(usize, TransportError)>>,
    batch_results: Mutex<Option<Result<Vec<RecognitionResult>, RecognitionError>>>,
    streaming_calls: AtomicUsize,
    recognize_calls: AtomicUsize,
}

impl NullChannel {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SessionLog::default())),
            scripted: Mutex::new(None),
            stream_failure: Mutex::new(None),
            batch_results: Mutex::new(None),
            streaming_calls: AtomicUsize::new(0),
            recognize_calls: AtomicUsize::new(0),
        }
    }

    /// Reply with these responses, in order, after the half-close.
    pub fn with_responses(self, responses: Vec<StreamingResponse>) -> Self {
        *self.scripted.lock().unwrap() = Some(responses);
        self
    }

    /// Fail the inbound stream with `error` once `frames` frames have arrived.
    pub fn failing_after(self, frames: usize, error: TransportError) -> Self {
        *self.stream_failure.lock().unwrap() = Some((frames, error));
        self
    }

    pub fn with_batch_results(self, results: Result<Vec<RecognitionResult>, RecognitionError>) -> Self {
        *self.batch_results.lock().unwrap() = Some(results);
        self
    }

    pub fn frames(&self) -> Vec<StreamingFrame> {
        self.log
            .lock()
            .unwrap()
            .frames
            .iter()
            .map(|(_, f)| f.clone())
            .collect()
    }

    pub fn frame_times(&self) -> Vec<Instant> {
        self.log.lock().unwrap().frames.iter().map(|(t, _)| *t).collect()
    }

    pub fn half_closed_at(&self) -> Option<Instant> {
        self.log.lock().unwrap().half_closed_at
    }

    pub fn streaming_calls(&self) -> usize {
        self.streaming_calls.load(Ordering::Relaxed)
    }

    pub fn recognize_calls(&self) -> usize {
        self.recognize_calls.load(Ordering::Relaxed)
    }
}

impl Default for NullChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn summary(bytes: usize, sample_rate_hz: u32) -> RecognitionResult {
    RecognitionResult::from_transcript(format!("[null] {bytes} bytes at {sample_rate_hz} Hz"))
}

#[async_trait]
impl RecognizerChannel for NullChannel {
    fn name(&self) -> &str {
        "null"
    }

    async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: EncodedChunk,
    ) -> Result<Vec<RecognitionResult>, RecognitionError> {
        self.recognize_calls.fetch_add(1, Ordering::Relaxed);
        match self.batch_results.lock().unwrap().take() {
            Some(scripted) => scripted,
            None => Ok(vec![summary(audio.len(), config.sample_rate_hz)]),
        }
    }

    async fn streaming_recognize(
        &self,
        mut outbound: mpsc::Receiver<StreamingFrame>,
    ) -> Result<ResponseStream, TransportError> {
        self.streaming_calls.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let log = Arc::clone(&self.log);
        let scripted = self.scripted.lock().unwrap().take();
        let mut failure = self.stream_failure.lock().unwrap().take();

        tokio::spawn(async move {
            let mut received = 0usize;
            let mut audio_bytes = 0usize;
            let mut sample_rate_hz = 0u32;

            while let Some(frame) = outbound.recv().await {
                match &frame {
                    StreamingFrame::Config(config) => sample_rate_hz = config.sample_rate_hz,
                    StreamingFrame::Audio(chunk) => audio_bytes += chunk.len(),
                }
                if let Ok(mut log) = log.lock() {
                    log.frames.push((Instant::now(), frame));
                }
                received += 1;
                tracing::trace!("NullChannel received frame #{received}");

                if matches!(&failure, Some((after, _)) if received >= *after) {
                    if let Some((_, error)) = failure.take() {
                        let _ = tx.send(Err(error));
                    }
                    return;
                }
            }

            if let Ok(mut log) = log.lock() {
                log.half_closed_at = Some(Instant::now());
            }

            let responses = scripted.unwrap_or_else(|| {
                vec![StreamingResponse::with_results(vec![summary(
                    audio_bytes,
                    sample_rate_hz,
                )])]
            });
            for response in responses {
                if tx.send(Ok(response)).is_err() {
                    break;
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn test_null_channel_name() {
        assert_eq!(NullChannel::new().name(), "null");
    }

    #[test]
    fn test_null_channel_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullChannel>();
    }

    #[tokio::test]
    async fn test_null_channel_recognize_summarises_audio() {
        let channel = NullChannel::new();
        let config = RecognitionConfig::linear16(16000, "ko-KR");
        let results = channel
            .recognize(&config, EncodedChunk::new(vec![0; 320]))
            .await
            .unwrap();
        assert_eq!(results[0].alternatives[0].transcript, "[null] 320 bytes at 16000 Hz");
        assert_eq!(channel.recognize_calls(), 1);
    }

    #[tokio::test]
    async fn test_null_channel_streaming_answers_after_half_close() {
        let channel = NullChannel::new();
        let (tx, rx) = mpsc::channel(8);
        let mut responses = channel.streaming_recognize(rx).await.unwrap();

        tx.send(StreamingFrame::Config(RecognitionConfig::linear16(8000, "en-US")))
            .await
            .unwrap();
        tx.send(StreamingFrame::Audio(EncodedChunk::new(vec![0; 100])))
            .await
            .unwrap();
        drop(tx);

        let response = responses.next().await.unwrap().unwrap();
        assert_eq!(
            response.results[0].alternatives[0].transcript,
            "[null] 100 bytes at 8000 Hz"
        );
        assert!(responses.next().await.is_none());
        assert_eq!(channel.frames().len(), 2);
        assert!(channel.half_closed_at().is_some());
    }

    #[tokio::test]
    async fn test_null_channel_scripted_failure() {
        let channel = NullChannel::new().failing_after(1, TransportError::ChannelClosed);
        let (tx, rx) = mpsc::channel(8);
        let mut responses = channel.streaming_recognize(rx).await.unwrap();
        tx.send(StreamingFrame::Config(RecognitionConfig::linear16(8000, "en-US")))
            .await
            .unwrap();

        assert!(matches!(
            responses.next().await,
            Some(Err(TransportError::ChannelClosed))
        ));
    }

    #[tokio::test]
    async fn test_null_channel_scripted_batch_error() {
        let channel = NullChannel::new().with_batch_results(Err(RecognitionError::Service {
            code: "InvalidArgument".to_string(),
            message: "bad audio".to_string(),
        }));
        let config = RecognitionConfig::linear16(16000, "ko-KR");
        let result = channel.recognize(&config, EncodedChunk::default()).await;
        assert!(matches!(result, Err(RecognitionError::Service { .. })));
    }
}
