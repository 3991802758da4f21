use crate::channel::RecognizerChannel;
use stt_core::{EncodedChunk, RecognitionConfig, RecognitionResult, SttError};

/// One request, one response. Holds no session state.
pub struct BatchRecognizer<'a, C: RecognizerChannel + ?Sized> {
    channel: &'a C,
}

impl<'a, C: RecognizerChannel + ?Sized> BatchRecognizer<'a, C> {
    pub fn new(channel: &'a C) -> Self {
        Self { channel }
    }

    pub async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: EncodedChunk,
    ) -> Result<Vec<RecognitionResult>, SttError> {
        let bytes = audio.len();
        tracing::info!(
            channel = self.channel.name(),
            bytes,
            sample_rate = config.sample_rate_hz,
            "sending recognize request"
        );
        let results = self.channel.recognize(config, audio).await.map_err(|e| {
            tracing::error!("recognize failed: {e}");
            e
        })?;
        tracing::debug!(results = results.len(), "recognize response received");
        Ok(results)
    }
}
