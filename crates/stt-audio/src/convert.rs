use stt_core::{AudioFormat, EncodedChunk, SampleFrame};

/// Map one float sample to LINEAR16. Input outside `[-1.0, 1.0]` saturates;
/// NaN becomes silence.
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Sample rate presented to the recognizer.
///
/// Interleaved multi-channel audio is sent bit-for-bit as a faster mono
/// stream, so the rate is multiplied by the channel count instead of mixing
/// channels down.
pub fn effective_sample_rate(format: &AudioFormat) -> u32 {
    format.sample_rate_hz * u32::from(format.channel_count)
}

/// Convert interleaved float samples to little-endian LINEAR16 bytes and the
/// effective sample rate for `format`.
pub fn to_linear16(samples: &[f32], format: &AudioFormat) -> (EncodedChunk, u32) {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    (EncodedChunk::new(bytes), effective_sample_rate(format))
}

pub fn encode_frame(frame: &SampleFrame) -> (EncodedChunk, u32) {
    to_linear16(&frame.samples, &frame.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_le(chunk: &EncodedChunk) -> Vec<i16> {
        chunk
            .as_bytes()
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_output_length_is_two_bytes_per_sample() {
        for &(rate, channels) in &[(8000u32, 1u16), (16000, 1), (44100, 2), (48000, 6)] {
            let format = AudioFormat::new(rate, channels);
            let samples: Vec<f32> = (0..(channels as usize * 37))
                .map(|i| (i as f32 * 0.1).sin())
                .collect();
            let (chunk, _) = to_linear16(&samples, &format);
            assert_eq!(chunk.len(), samples.len() * 2);
        }
    }

    #[test]
    fn test_scaling_and_rounding() {
        let format = AudioFormat::new(16000, 1);
        let (chunk, _) = to_linear16(&[0.0, 1.0, -1.0, 0.5, -0.5, 0.25], &format);
        assert_eq!(
            decode_le(&chunk),
            vec![0, 32767, -32767, 16384, -16384, 8192]
        );
    }

    #[test]
    fn test_out_of_range_saturates() {
        let format = AudioFormat::new(16000, 1);
        let (chunk, _) = to_linear16(&[1.5, -2.0, f32::INFINITY, f32::NEG_INFINITY], &format);
        assert_eq!(decode_le(&chunk), vec![32767, -32767, 32767, -32767]);
    }

    #[test]
    fn test_nan_is_silence() {
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_little_endian_layout() {
        let format = AudioFormat::new(16000, 1);
        let (chunk, _) = to_linear16(&[1.0], &format);
        assert_eq!(chunk.as_bytes(), &[0xff, 0x7f]);
    }

    #[test]
    fn test_mono_rate_unchanged() {
        for rate in [8000, 16000, 22050, 44100, 48000] {
            assert_eq!(effective_sample_rate(&AudioFormat::new(rate, 1)), rate);
        }
    }

    #[test]
    fn test_multichannel_rate_scaled() {
        for channels in 2..=8u16 {
            let format = AudioFormat::new(44100, channels);
            let (_, rate) = to_linear16(&[0.0; 8], &format);
            assert_eq!(rate, 44100 * channels as u32);
        }
    }

    #[test]
    fn test_encode_frame_keeps_every_channel() {
        let frame = SampleFrame::new(vec![0.5, -0.5, 0.5, -0.5], AudioFormat::new(16000, 2));
        let (chunk, rate) = encode_frame(&frame);
        assert_eq!(chunk.sample_count(), 4);
        assert_eq!(rate, 32000);
        assert_eq!(decode_le(&chunk), vec![16384, -16384, 16384, -16384]);
    }
}
