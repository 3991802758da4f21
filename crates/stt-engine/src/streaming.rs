use crate::channel::RecognizerChannel;
use crate::session::StreamingSession;
use std::io::Write;
use std::time::Duration;
use stt_audio::{to_linear16, FrameSource};
use stt_core::{RecognitionConfig, RecognitionError, SttError, Transcript};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::StreamExt;

const DEFAULT_OUTBOUND_CAPACITY: usize = 32;

/// Drives one streaming session from a frame source to formatted output.
pub struct StreamingRecognizer<'a, C: RecognizerChannel + ?Sized> {
    channel: &'a C,
    debounce: Duration,
    outbound_capacity: usize,
}

impl<'a, C: RecognizerChannel + ?Sized> StreamingRecognizer<'a, C> {
    pub fn new(channel: &'a C, debounce: Duration) -> Self {
        Self {
            channel,
            debounce,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    /// Frames allowed to queue between the session and the transport.
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Stream `source` to the recognizer and write every response to `out`
    /// as it arrives. Returns once the service has finished answering.
    pub async fn run<S, W>(
        &self,
        source: &mut S,
        config: RecognitionConfig,
        out: &mut W,
    ) -> Result<Transcript, SttError>
    where
        S: FrameSource + ?Sized,
        W: Write,
    {
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let mut session = StreamingSession::new(tx, self.debounce);
        let mut transcript = Transcript::new(config.word_time_offsets);

        // Queued ahead of the call so it is the first frame on the wire.
        session.send_config(config).await?;
        let mut responses = match self.channel.streaming_recognize(rx).await {
            Ok(responses) => responses,
            Err(e) => {
                session.fail();
                return Err(e.into());
            }
        };
        tracing::info!(channel = self.channel.name(), "streaming session opened");

        let mut source_done = false;
        loop {
            let deadline = session.quiet_deadline();
            let reading = !source_done && session.accepts_audio();

            tokio::select! {
                frame = source.next_frame(), if reading => match frame {
                    Some(Ok(frame)) => {
                        let (chunk, _) = to_linear16(&frame.samples, &frame.format);
                        if !chunk.is_empty() {
                            session.send_audio(chunk).await?;
                        }
                        session.observe_progress(source.buffered());
                    }
                    Some(Err(e)) => {
                        session.fail();
                        return Err(e.into());
                    }
                    None => {
                        tracing::debug!(chunks = session.chunks_sent(), "source exhausted");
                        source_done = true;
                        session.observe_source_end();
                    }
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if !source_done {
                        tracing::warn!(
                            debounce_ms = self.debounce.as_millis() as u64,
                            "source stalled after reporting fully buffered; remaining audio is dropped"
                        );
                    }
                    tracing::debug!(chunks = session.chunks_sent(), "half-closing session");
                    session.half_close();
                }
                response = responses.next() => match response {
                    Some(Ok(response)) => {
                        if let Some(status) = response.error.filter(|s| !s.is_ok()) {
                            session.fail();
                            return Err(RecognitionError::Service {
                                code: status.code.to_string(),
                                message: status.message,
                            }
                            .into());
                        }
                        match transcript.append(&response.results) {
                            Some(block) => writeln!(out, "Transcription: {block}")?,
                            None => writeln!(out, "Empty result.")?,
                        }
                        out.flush()?;
                    }
                    Some(Err(e)) => {
                        tracing::error!("streaming session failed: {e}");
                        session.fail();
                        return Err(e.into());
                    }
                    None => {
                        session.close();
                        break;
                    }
                },
            }
        }

        tracing::info!(lines = transcript.lines().len(), "streaming session closed");
        Ok(transcript)
    }
}
