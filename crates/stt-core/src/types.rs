use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub channel_count: u16,
}

impl AudioFormat {
    pub fn new(sample_rate_hz: u32, channel_count: u16) -> Self {
        Self {
            sample_rate_hz,
            channel_count: channel_count.max(1),
        }
    }

    pub fn is_mono(&self) -> bool {
        self.channel_count == 1
    }
}

/// Interleaved `f32` samples decoded from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFrame {
    pub samples: Vec<f32>,
    pub format: AudioFormat,
}

impl SampleFrame {
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Number of sample instants, i.e. samples divided by channels.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.format.channel_count as usize
    }
}

/// LINEAR16 little-endian bytes. Carries no format of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedChunk(Vec<u8>);

impl EncodedChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.0.len() / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Linear16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hz: u32,
    pub language_code: String,
    pub context_phrases: Vec<String>,
    pub word_time_offsets: bool,
    pub interim_results: bool,
}

impl RecognitionConfig {
    /// LINEAR16 config with interim results disabled.
    pub fn linear16(sample_rate_hz: u32, language_code: impl Into<String>) -> Self {
        Self {
            encoding: AudioEncoding::Linear16,
            sample_rate_hz,
            language_code: language_code.into(),
            context_phrases: Vec::new(),
            word_time_offsets: false,
            interim_results: false,
        }
    }

    pub fn with_context_phrases(mut self, phrases: Vec<String>) -> Self {
        self.context_phrases = phrases;
        self
    }

    pub fn with_word_time_offsets(mut self, enabled: bool) -> Self {
        self.word_time_offsets = enabled;
        self
    }
}

/// A single write on the duplex channel. The first frame of a session is
/// always `Config`; every later frame is `Audio`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamingFrame {
    Config(RecognitionConfig),
    Audio(EncodedChunk),
}

/// A protobuf-style duration, rendered as `<seconds>.<fraction>s`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Offset {
    pub seconds: i64,
    pub nanos: i32,
}

impl Offset {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self {
            seconds: (millis / 1000) as i64,
            nanos: ((millis % 1000) * 1_000_000) as i32,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Seconds and nanos share a sign, so `-0.5s` is `{0, -500_000_000}`.
        let sign = if self.seconds < 0 || self.nanos < 0 { "-" } else { "" };
        let seconds = self.seconds.unsigned_abs();
        if self.nanos == 0 {
            return write!(f, "{sign}{seconds}.0s");
        }
        let fraction = format!("{:09}", self.nanos.unsigned_abs());
        write!(f, "{sign}{seconds}.{}s", fraction.trim_end_matches('0'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordInfo {
    pub word: String,
    pub start: Offset,
    pub end: Offset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechAlternative {
    pub transcript: String,
    pub confidence: f32,
    pub words: Vec<WordInfo>,
}

/// One recognized segment; alternatives are ordered best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    pub alternatives: Vec<SpeechAlternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    /// Single-alternative final result without word timing.
    pub fn from_transcript(transcript: impl Into<String>) -> Self {
        Self {
            alternatives: vec![SpeechAlternative {
                transcript: transcript.into(),
                ..Default::default()
            }],
            is_final: true,
        }
    }

    pub fn best(&self) -> Option<&SpeechAlternative> {
        self.alternatives.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub code: i32,
    pub message: String,
}

impl ServiceStatus {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// One message of the inbound half of a streaming session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingResponse {
    pub results: Vec<RecognitionResult>,
    pub error: Option<ServiceStatus>,
}

impl StreamingResponse {
    pub fn with_results(results: Vec<RecognitionResult>) -> Self {
        Self {
            results,
            error: None,
        }
    }
}
