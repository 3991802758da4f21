use crate::progress::{Progress, ProgressSource};
use crate::source::FrameSource;
use async_trait::async_trait;
use std::fs::File;
use std::io::{Cursor, ErrorKind};
use std::path::PathBuf;
use stt_core::{AudioFormat, DecodeError, SampleFrame};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;

/// Where the audio comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    Path(PathBuf),
    Buffer(Vec<u8>),
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        AudioSource::Path(path)
    }
}

impl From<Vec<u8>> for AudioSource {
    fn from(bytes: Vec<u8>) -> Self {
        AudioSource::Buffer(bytes)
    }
}

/// An opened, probed audio container with a decoder for its first audio track.
pub struct AudioAsset {
    format: AudioFormat,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    progress: Progress,
}

impl AudioAsset {
    pub fn open(source: AudioSource) -> Result<Self, DecodeError> {
        let progress = Progress::new();
        let mut hint = Hint::new();

        let media: Box<dyn MediaSource> = match source {
            AudioSource::Path(path) => {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    hint.with_extension(ext);
                }
                let file = File::open(&path)?;
                let len = file.metadata()?.len();
                Box::new(ProgressSource::new(file, Some(len), progress.clone()))
            }
            AudioSource::Buffer(bytes) => {
                let len = bytes.len() as u64;
                Box::new(ProgressSource::new(Cursor::new(bytes), Some(len), progress.clone()))
            }
        };
        let mss = MediaSourceStream::new(media, Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedCodec(e.to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .or(decoder.codec_params().sample_rate)
            .ok_or(DecodeError::MissingParameter("a sample rate"))?;
        let channels = track
            .codec_params
            .channels
            .or(decoder.codec_params().channels)
            .map(|c| c.count())
            .ok_or(DecodeError::MissingParameter("a channel layout"))?;

        let format = AudioFormat::new(sample_rate, channels as u16);
        tracing::debug!(
            sample_rate = format.sample_rate_hz,
            channels = format.channel_count,
            track_id,
            "audio source opened"
        );

        Ok(Self {
            format,
            reader,
            decoder,
            track_id,
            progress,
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Lazily decode the source frame by frame. Consumes the asset; open the
    /// source again to replay it.
    pub fn frames(self) -> Frames {
        Frames {
            format: self.format,
            reader: self.reader,
            decoder: self.decoder,
            track_id: self.track_id,
            done: false,
        }
    }

    /// Decode the whole source into a single frame.
    pub fn decode_all(self) -> Result<SampleFrame, DecodeError> {
        let format = self.format;
        let mut samples = Vec::new();
        for frame in self.frames() {
            samples.extend_from_slice(&frame?.samples);
        }
        Ok(SampleFrame::new(samples, format))
    }

    /// Decode on a blocking worker and hand frames over as they are produced.
    /// Must be called from within a tokio runtime.
    pub fn into_stream(self, capacity: usize) -> DecodedStream {
        let format = self.format;
        let progress = self.progress.clone();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let frames = self.frames();

        // The worker stops on its own once the receiver is dropped.
        tokio::task::spawn_blocking(move || {
            for frame in frames {
                if tx.blocking_send(frame).is_err() {
                    tracing::debug!("frame receiver dropped, stopping decode");
                    break;
                }
            }
        });

        DecodedStream {
            format,
            frames_rx: rx,
            progress,
        }
    }
}

/// Ordered, finite sequence of decoded frames.
pub struct Frames {
    format: AudioFormat,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    done: bool,
}

impl Iterator for Frames {
    type Item = Result<SampleFrame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    self.done = true;
                    return None;
                }
                Err(SymphoniaError::ResetRequired) => {
                    // Chained streams are not followed; the first one is the source.
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(DecodeError::Decode(e.to_string())));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                    buf.copy_interleaved_ref(decoded);
                    if buf.samples().is_empty() {
                        continue;
                    }
                    return Some(Ok(SampleFrame::new(buf.samples().to_vec(), self.format)));
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    tracing::warn!("skipping undecodable packet: {msg}");
                    continue;
                }
                Err(SymphoniaError::IoError(e)) => {
                    tracing::warn!("skipping packet after read error: {e}");
                    continue;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(DecodeError::Decode(e.to_string())));
                }
            }
        }
    }
}

/// Frames decoded in the background, delivered in decode order.
pub struct DecodedStream {
    format: AudioFormat,
    frames_rx: mpsc::Receiver<Result<SampleFrame, DecodeError>>,
    progress: Progress,
}

#[async_trait]
impl FrameSource for DecodedStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn next_frame(&mut self) -> Option<Result<SampleFrame, DecodeError>> {
        self.frames_rx.recv().await
    }

    fn buffered(&self) -> u8 {
        self.progress.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SATURATION;

    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_open_reports_format() {
        let bytes = wav_bytes(16000, 1, &[0; 1600]);
        let asset = AudioAsset::open(AudioSource::Buffer(bytes)).unwrap();
        assert_eq!(asset.format(), AudioFormat::new(16000, 1));
    }

    #[test]
    fn test_open_stereo_format() {
        let bytes = wav_bytes(44100, 2, &[0; 882]);
        let asset = AudioAsset::open(AudioSource::Buffer(bytes)).unwrap();
        assert_eq!(asset.format().channel_count, 2);
        assert_eq!(asset.format().sample_rate_hz, 44100);
    }

    #[test]
    fn test_decode_all_returns_every_sample() {
        let samples: Vec<i16> = (0..4000).map(|i| ((i % 200) as i16 - 100) * 100).collect();
        let bytes = wav_bytes(8000, 1, &samples);
        let frame = AudioAsset::open(AudioSource::Buffer(bytes))
            .unwrap()
            .decode_all()
            .unwrap();
        assert_eq!(frame.samples.len(), samples.len());
        for (decoded, original) in frame.samples.iter().zip(&samples) {
            let expected = *original as f32 / 32768.0;
            assert!((decoded - expected).abs() < 1e-3, "{decoded} vs {expected}");
        }
    }

    #[test]
    fn test_frames_preserve_order() {
        let samples: Vec<i16> = (0..10000).map(|i| (i % 30000) as i16).collect();
        let bytes = wav_bytes(16000, 1, &samples);
        let decoded: Vec<f32> = AudioAsset::open(AudioSource::Buffer(bytes))
            .unwrap()
            .frames()
            .flat_map(|f| f.unwrap().samples)
            .collect();
        assert_eq!(decoded.len(), samples.len());
        assert!(decoded.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_corrupt_buffer_is_decode_error() {
        let result = AudioAsset::open(AudioSource::Buffer(b"definitely not audio".to_vec()));
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let result = AudioAsset::open(AudioSource::Path(PathBuf::from("/nonexistent/hello.wav")));
        assert!(matches!(result, Err(DecodeError::Open(_))));
    }

    #[test]
    fn test_open_from_path() {
        let dir = std::env::temp_dir().join("stt_audio_decoder_path");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tone.wav");
        std::fs::write(&path, wav_bytes(16000, 1, &[1000; 3200])).unwrap();

        let frame = AudioAsset::open(AudioSource::Path(path.clone()))
            .unwrap()
            .decode_all()
            .unwrap();
        assert_eq!(frame.samples.len(), 3200);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_stream_delivers_all_frames_and_saturates() {
        let samples: Vec<i16> = vec![500; 16000];
        let bytes = wav_bytes(16000, 1, &samples);
        let mut stream = AudioAsset::open(AudioSource::Buffer(bytes))
            .unwrap()
            .into_stream(2);

        let mut total = 0;
        while let Some(frame) = stream.next_frame().await {
            total += frame.unwrap().samples.len();
        }
        assert_eq!(total, samples.len());
        assert_eq!(stream.buffered(), SATURATION);
    }
}
