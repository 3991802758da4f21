use crate::progress::SATURATION;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use stt_core::{AudioFormat, DecodeError, SampleFrame};
use tokio::time::Instant;

/// A push-style audio source seen as an ordered, finite sequence of frames.
///
/// [`buffered`](Self::buffered) reports how much of the underlying input has
/// been consumed, reaching [`SATURATION`] when it has been read completely.
/// It may saturate before the last frames are delivered.
#[async_trait]
pub trait FrameSource: Send {
    fn format(&self) -> AudioFormat;
    /// Next decoded frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Option<Result<SampleFrame, DecodeError>>;
    fn buffered(&self) -> u8;
}

struct ScriptStep {
    delay: Duration,
    item: Result<Vec<f32>, DecodeError>,
    buffered: u8,
}

/// In-memory [`FrameSource`] that replays a fixed script of frames, delays
/// and progress values.
///
/// `next_frame` is cancel safe: a step whose delay was interrupted is still
/// delivered, at its original time, by the next call.
pub struct ScriptedSource {
    format: AudioFormat,
    steps: VecDeque<ScriptStep>,
    buffered: u8,
    ready_at: Option<Instant>,
}

impl ScriptedSource {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            steps: VecDeque::new(),
            buffered: 0,
            ready_at: None,
        }
    }

    /// Queue a frame delivered immediately; progress reads `buffered` once
    /// it has been handed out.
    pub fn frame(self, samples: Vec<f32>, buffered: u8) -> Self {
        self.frame_after(Duration::ZERO, samples, buffered)
    }

    pub fn frame_after(mut self, delay: Duration, samples: Vec<f32>, buffered: u8) -> Self {
        self.steps.push_back(ScriptStep {
            delay,
            item: Ok(samples),
            buffered: buffered.min(SATURATION),
        });
        self
    }

    pub fn fail(mut self, error: DecodeError) -> Self {
        self.steps.push_back(ScriptStep {
            delay: Duration::ZERO,
            item: Err(error),
            buffered: self.buffered,
        });
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn next_frame(&mut self) -> Option<Result<SampleFrame, DecodeError>> {
        let delay = self.steps.front()?.delay;
        if !delay.is_zero() {
            let ready_at = *self.ready_at.get_or_insert_with(|| Instant::now() + delay);
            tokio::time::sleep_until(ready_at).await;
        }
        self.ready_at = None;
        let step = self.steps.pop_front()?;
        self.buffered = self.buffered.max(step.buffered);
        let format = self.format;
        Some(step.item.map(|samples| SampleFrame::new(samples, format)))
    }

    fn buffered(&self) -> u8 {
        self.buffered
    }
}
