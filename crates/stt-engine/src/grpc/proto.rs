//! Hand-declared subset of `google.cloud.speech.v1` and `google.rpc.Status`.
//!
//! Field tags follow the published protos; fields this client never reads or
//! writes are left out and skipped by the decoder.

use stt_core::{
    AudioEncoding as DomainEncoding, Offset, RecognitionConfig as DomainConfig,
    RecognitionResult, ServiceStatus, SpeechAlternative, StreamingFrame, StreamingResponse,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AudioEncoding {
    EncodingUnspecified = 0,
    Linear16 = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpeechContext {
    #[prost(string, repeated, tag = "1")]
    pub phrases: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognitionConfig {
    #[prost(enumeration = "AudioEncoding", tag = "1")]
    pub encoding: i32,
    #[prost(int32, tag = "2")]
    pub sample_rate_hertz: i32,
    #[prost(string, tag = "3")]
    pub language_code: String,
    #[prost(int32, tag = "4")]
    pub max_alternatives: i32,
    #[prost(message, repeated, tag = "6")]
    pub speech_contexts: Vec<SpeechContext>,
    #[prost(bool, tag = "8")]
    pub enable_word_time_offsets: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognitionConfig {
    #[prost(message, optional, tag = "1")]
    pub config: Option<RecognitionConfig>,
    #[prost(bool, tag = "2")]
    pub single_utterance: bool,
    #[prost(bool, tag = "3")]
    pub interim_results: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognizeRequest {
    #[prost(oneof = "streaming_recognize_request::StreamingRequest", tags = "1, 2")]
    pub streaming_request: Option<streaming_recognize_request::StreamingRequest>,
}

pub mod streaming_recognize_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum StreamingRequest {
        #[prost(message, tag = "1")]
        StreamingConfig(super::StreamingRecognitionConfig),
        #[prost(bytes = "vec", tag = "2")]
        AudioContent(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognitionAudio {
    #[prost(oneof = "recognition_audio::AudioSource", tags = "1, 2")]
    pub audio_source: Option<recognition_audio::AudioSource>,
}

pub mod recognition_audio {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum AudioSource {
        #[prost(bytes = "vec", tag = "1")]
        Content(Vec<u8>),
        #[prost(string, tag = "2")]
        Uri(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognizeRequest {
    #[prost(message, optional, tag = "1")]
    pub config: Option<RecognitionConfig>,
    #[prost(message, optional, tag = "2")]
    pub audio: Option<RecognitionAudio>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WordInfo {
    #[prost(message, optional, tag = "1")]
    pub start_time: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "2")]
    pub end_time: Option<::prost_types::Duration>,
    #[prost(string, tag = "3")]
    pub word: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpeechRecognitionAlternative {
    #[prost(string, tag = "1")]
    pub transcript: String,
    #[prost(float, tag = "2")]
    pub confidence: f32,
    #[prost(message, repeated, tag = "3")]
    pub words: Vec<WordInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpeechRecognitionResult {
    #[prost(message, repeated, tag = "1")]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
    #[prost(int32, tag = "2")]
    pub channel_tag: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognizeResponse {
    #[prost(message, repeated, tag = "2")]
    pub results: Vec<SpeechRecognitionResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognitionResult {
    #[prost(message, repeated, tag = "1")]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
    #[prost(bool, tag = "2")]
    pub is_final: bool,
    #[prost(float, tag = "3")]
    pub stability: f32,
    #[prost(message, optional, tag = "4")]
    pub result_end_time: Option<::prost_types::Duration>,
    #[prost(int32, tag = "5")]
    pub channel_tag: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognizeResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<Status>,
    #[prost(message, repeated, tag = "2")]
    pub results: Vec<StreamingRecognitionResult>,
    #[prost(int32, tag = "4")]
    pub speech_event_type: i32,
}

impl From<&DomainConfig> for RecognitionConfig {
    fn from(config: &DomainConfig) -> Self {
        let encoding = match config.encoding {
            DomainEncoding::Linear16 => AudioEncoding::Linear16,
        };
        let speech_contexts = if config.context_phrases.is_empty() {
            Vec::new()
        } else {
            vec![SpeechContext {
                phrases: config.context_phrases.clone(),
            }]
        };
        let sample_rate_hertz = i32::try_from(config.sample_rate_hz).unwrap_or_else(|_| {
            tracing::warn!(
                sample_rate = config.sample_rate_hz,
                sent = i32::MAX,
                "sample rate does not fit the wire field; clamping"
            );
            i32::MAX
        });
        Self {
            encoding: encoding as i32,
            sample_rate_hertz,
            language_code: config.language_code.clone(),
            max_alternatives: 0,
            speech_contexts,
            enable_word_time_offsets: config.word_time_offsets,
        }
    }
}

impl From<StreamingFrame> for StreamingRecognizeRequest {
    fn from(frame: StreamingFrame) -> Self {
        use streaming_recognize_request::StreamingRequest;

        let request = match frame {
            StreamingFrame::Config(config) => StreamingRequest::StreamingConfig(StreamingRecognitionConfig {
                config: Some(RecognitionConfig::from(&config)),
                single_utterance: false,
                interim_results: config.interim_results,
            }),
            StreamingFrame::Audio(chunk) => StreamingRequest::AudioContent(chunk.into_bytes()),
        };
        Self {
            streaming_request: Some(request),
        }
    }
}

impl RecognizeRequest {
    pub fn new(config: &DomainConfig, audio: Vec<u8>) -> Self {
        Self {
            config: Some(RecognitionConfig::from(config)),
            audio: Some(RecognitionAudio {
                audio_source: Some(recognition_audio::AudioSource::Content(audio)),
            }),
        }
    }
}

fn offset(duration: Option<::prost_types::Duration>) -> Offset {
    duration
        .map(|d| Offset::new(d.seconds, d.nanos))
        .unwrap_or_default()
}

impl From<SpeechRecognitionAlternative> for SpeechAlternative {
    fn from(alt: SpeechRecognitionAlternative) -> Self {
        Self {
            transcript: alt.transcript,
            confidence: alt.confidence,
            words: alt
                .words
                .into_iter()
                .map(|w| stt_core::WordInfo {
                    word: w.word,
                    start: offset(w.start_time),
                    end: offset(w.end_time),
                })
                .collect(),
        }
    }
}

impl From<SpeechRecognitionResult> for RecognitionResult {
    fn from(result: SpeechRecognitionResult) -> Self {
        Self {
            alternatives: result.alternatives.into_iter().map(Into::into).collect(),
            is_final: true,
        }
    }
}

impl From<StreamingRecognitionResult> for RecognitionResult {
    fn from(result: StreamingRecognitionResult) -> Self {
        Self {
            alternatives: result.alternatives.into_iter().map(Into::into).collect(),
            is_final: result.is_final,
        }
    }
}

impl From<StreamingRecognizeResponse> for StreamingResponse {
    fn from(response: StreamingRecognizeResponse) -> Self {
        Self {
            results: response.results.into_iter().map(Into::into).collect(),
            error: response.error.map(|s| ServiceStatus {
                code: s.code,
                message: s.message,
            }),
        }
    }
}
