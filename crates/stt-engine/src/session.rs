use std::time::Duration;
use stt_audio::SATURATION;
use stt_core::{
    EncodedChunk, ProtocolError, RecognitionConfig, StreamingFrame, SttError, TransportError,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configured,
    Streaming,
    Draining,
    Closed,
    Error,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Error)
    }
}

/// Write side of one duplex recognition session.
///
/// The session owns the outbound sender; dropping it is the half-close. The
/// quiet timer is kept as a deadline that the driver polls, so cancelling it
/// is just clearing the deadline.
pub struct StreamingSession {
    writer: Option<mpsc::Sender<StreamingFrame>>,
    state: SessionState,
    config_sent: bool,
    chunks_sent: usize,
    debounce: Duration,
    quiet_deadline: Option<Instant>,
}

impl StreamingSession {
    pub fn new(writer: mpsc::Sender<StreamingFrame>, debounce: Duration) -> Self {
        Self {
            writer: Some(writer),
            state: SessionState::Idle,
            config_sent: false,
            chunks_sent: 0,
            debounce,
            quiet_deadline: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config_sent(&self) -> bool {
        self.config_sent
    }

    pub fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }

    /// When the pending quiet timer fires, if one is armed.
    pub fn quiet_deadline(&self) -> Option<Instant> {
        self.quiet_deadline
    }

    pub fn accepts_audio(&self) -> bool {
        matches!(self.state, SessionState::Configured | SessionState::Streaming)
    }

    pub async fn send_config(&mut self, config: RecognitionConfig) -> Result<(), SttError> {
        match self.state {
            SessionState::Idle => {}
            _ if self.config_sent => return Err(ProtocolError::ConfigAlreadySent.into()),
            _ => return Err(ProtocolError::SessionClosed.into()),
        }
        tracing::debug!(
            sample_rate = config.sample_rate_hz,
            language = %config.language_code,
            phrases = config.context_phrases.len(),
            "sending recognition config"
        );
        self.write(StreamingFrame::Config(config)).await?;
        self.config_sent = true;
        self.transition(SessionState::Configured);
        Ok(())
    }

    pub async fn send_audio(&mut self, chunk: EncodedChunk) -> Result<(), SttError> {
        match self.state {
            SessionState::Idle => return Err(ProtocolError::AudioBeforeConfig.into()),
            SessionState::Configured | SessionState::Streaming => {}
            _ => return Err(ProtocolError::SessionClosed.into()),
        }
        self.quiet_deadline = None;
        let bytes = chunk.len();
        self.write(StreamingFrame::Audio(chunk)).await?;
        self.chunks_sent += 1;
        tracing::trace!(bytes, chunk = self.chunks_sent, "audio chunk sent");
        if self.state == SessionState::Configured {
            self.transition(SessionState::Streaming);
        }
        Ok(())
    }

    /// Feed the source's buffered progress; arms a fresh quiet timer once it
    /// reports saturation.
    pub fn observe_progress(&mut self, buffered: u8) {
        if self.state == SessionState::Streaming && buffered >= SATURATION {
            self.arm();
        }
    }

    /// The source ran dry. Arms a timer unless one is already pending.
    pub fn observe_source_end(&mut self) {
        if self.accepts_audio() && self.quiet_deadline.is_none() {
            self.arm();
        }
    }

    /// Stop writing. Responses may still arrive on the inbound half.
    pub fn half_close(&mut self) {
        if !self.accepts_audio() {
            return;
        }
        self.quiet_deadline = None;
        self.writer = None;
        self.transition(SessionState::Draining);
    }

    /// The inbound half ended.
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.quiet_deadline = None;
        self.writer = None;
        self.transition(SessionState::Closed);
    }

    pub fn fail(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.quiet_deadline = None;
        self.writer = None;
        self.transition(SessionState::Error);
    }

    fn arm(&mut self) {
        let deadline = Instant::now() + self.debounce;
        tracing::trace!(debounce_ms = self.debounce.as_millis() as u64, "quiet timer armed");
        self.quiet_deadline = Some(deadline);
    }

    async fn write(&mut self, frame: StreamingFrame) -> Result<(), SttError> {
        let sent = match &self.writer {
            Some(writer) => writer.send(frame).await.is_ok(),
            None => false,
        };
        if !sent {
            self.fail();
            return Err(TransportError::ChannelClosed.into());
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}
