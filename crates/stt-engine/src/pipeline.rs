use crate::batch::BatchRecognizer;
use crate::channel::RecognizerChannel;
use crate::streaming::StreamingRecognizer;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use stt_audio::{effective_sample_rate, encode_frame, AudioAsset, AudioSource};
use stt_core::{
    AppConfig, AudioFormat, DecodeError, RecognitionConfig, SttError, Transcript, TransportError,
};

/// Everything the pipelines need besides the audio and the channel.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub language_code: String,
    pub context_phrases: Vec<String>,
    pub word_time_offsets: bool,
    pub debounce: Duration,
    pub frame_buffer: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language_code: config.recognition.language_code.clone(),
            context_phrases: config.recognition.context_phrases.clone(),
            word_time_offsets: config.recognition.word_time_offsets,
            debounce: config.streaming.debounce(),
            frame_buffer: config.streaming.frame_buffer,
        }
    }

    /// Config for audio of `format`. Multi-channel input is sent as a faster
    /// mono stream rather than mixed down, so the rate is scaled and a
    /// warning logged.
    pub fn recognition_config(&self, format: &AudioFormat) -> RecognitionConfig {
        let sample_rate = effective_sample_rate(format);
        if !format.is_mono() {
            tracing::warn!(
                channels = format.channel_count,
                sample_rate = format.sample_rate_hz,
                effective_rate = sample_rate,
                "input is not mono; channels are sent interleaved at a scaled sample rate"
            );
        }
        RecognitionConfig::linear16(sample_rate, self.language_code.clone())
            .with_context_phrases(self.context_phrases.clone())
            .with_word_time_offsets(self.word_time_offsets)
    }
}

async fn open(source: AudioSource) -> Result<AudioAsset, DecodeError> {
    tokio::task::spawn_blocking(move || AudioAsset::open(source))
        .await
        .map_err(|e| DecodeError::Decode(e.to_string()))?
}

/// Decode `source` incrementally and stream it to the channel produced by
/// `connect`. The source is opened and probed before `connect` is invoked.
pub async fn transcribe_streaming<C, F, Fut, W>(
    source: AudioSource,
    options: &PipelineOptions,
    connect: F,
    out: &mut W,
) -> Result<Transcript, SttError>
where
    C: RecognizerChannel,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, TransportError>>,
    W: Write,
{
    let asset = open(source).await?;
    let config = options.recognition_config(&asset.format());
    let mut frames = asset.into_stream(options.frame_buffer);

    let channel = connect().await?;
    StreamingRecognizer::new(&channel, options.debounce)
        .run(&mut frames, config, out)
        .await
}

/// Decode `source` completely, then send it in a single recognize call.
pub async fn transcribe_batch<C, F, Fut, W>(
    source: AudioSource,
    options: &PipelineOptions,
    connect: F,
    out: &mut W,
) -> Result<Transcript, SttError>
where
    C: RecognizerChannel,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, TransportError>>,
    W: Write,
{
    let asset = open(source).await?;
    let frame = tokio::task::spawn_blocking(move || asset.decode_all())
        .await
        .map_err(|e| DecodeError::Decode(e.to_string()))??;
    tracing::debug!(samples = frame.samples.len(), "source decoded");

    let config = options.recognition_config(&frame.format);
    let (audio, _) = encode_frame(&frame);

    let channel = connect().await?;
    let results = BatchRecognizer::new(&channel).recognize(&config, audio).await?;

    let mut transcript = Transcript::new(options.word_time_offsets);
    let block = transcript.append(&results).unwrap_or_default();
    writeln!(out, "Transcription: {block}")?;
    out.flush()?;
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_channel::NullChannel;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_options_from_config() {
        let config = AppConfig::from_toml_str(
            r#"
[recognition]
language_code = "en-US"
context_phrases = ["AIQ"]
word_time_offsets = true

[streaming]
debounce_ms = 250
frame_buffer = 4
"#,
        )
        .unwrap();
        let options = PipelineOptions::from_config(&config);
        assert_eq!(options.language_code, "en-US");
        assert_eq!(options.context_phrases, vec!["AIQ"]);
        assert!(options.word_time_offsets);
        assert_eq!(options.debounce, Duration::from_millis(250));
        assert_eq!(options.frame_buffer, 4);
    }

    #[test]
    fn test_recognition_config_scales_rate_for_stereo() {
        let options = PipelineOptions::default();
        let mono = options.recognition_config(&AudioFormat::new(16000, 1));
        let stereo = options.recognition_config(&AudioFormat::new(16000, 2));
        assert_eq!(mono.sample_rate_hz, 16000);
        assert_eq!(stereo.sample_rate_hz, 32000);
        assert_eq!(stereo.language_code, "ko-KR");
        assert!(!stereo.interim_results);
    }

    #[test]
    fn test_only_multichannel_input_warns() {
        let options = PipelineOptions::default();
        let mono = crate::log_capture::warnings(|| {
            options.recognition_config(&AudioFormat::new(16000, 1));
        });
        assert!(mono.is_empty(), "{mono:?}");

        let stereo = crate::log_capture::warnings(|| {
            options.recognition_config(&AudioFormat::new(22050, 2));
        });
        assert_eq!(stereo.len(), 1);
        assert!(stereo[0].starts_with("input is not mono"), "{stereo:?}");
        assert!(stereo[0].contains("channels=2"));
        assert!(stereo[0].contains("effective_rate=44100"));
    }

    #[tokio::test]
    async fn test_decode_error_never_connects() {
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);
        let result = transcribe_streaming(
            AudioSource::Path(PathBuf::from("/nonexistent/hello.wav")),
            &PipelineOptions::default(),
            move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, TransportError>(NullChannel::new())
            },
            &mut Vec::<u8>::new(),
        )
        .await;

        assert!(matches!(result, Err(SttError::Decode(_))));
        assert!(!connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_corrupt_source_never_connects_in_batch() {
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);
        let result = transcribe_batch(
            AudioSource::Buffer(b"RIFF but not really".to_vec()),
            &PipelineOptions::default(),
            move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, TransportError>(NullChannel::new())
            },
            &mut Vec::<u8>::new(),
        )
        .await;

        assert!(matches!(result, Err(SttError::Decode(_))));
        assert!(!connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_as_transport_error() {
        let bytes = {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 16000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut cursor = std::io::Cursor::new(Vec::new());
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..160 {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
            cursor.into_inner()
        };
        let result = transcribe_batch(
            AudioSource::Buffer(bytes),
            &PipelineOptions::default(),
            || async { Err::<Arc<NullChannel>, _>(TransportError::Connect("refused".to_string())) },
            &mut Vec::<u8>::new(),
        )
        .await;
        assert!(matches!(result, Err(SttError::Transport(TransportError::Connect(_)))));
    }
}
