use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use symphonia::core::io::MediaSource;

/// Progress value meaning the whole source has been buffered.
pub const SATURATION: u8 = 100;

/// Shared, monotonically non-decreasing buffering progress in `0..=100`.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU8>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    fn raise(&self, value: u8) {
        self.0.fetch_max(value.min(SATURATION), Ordering::Relaxed);
    }
}

/// Byte source wrapper that publishes how far the decoder has read into it.
///
/// The media stream reads ahead of the decoder, so this saturates a little
/// before the last frames come out of the decoder.
pub struct ProgressSource<R> {
    inner: R,
    len: Option<u64>,
    position: u64,
    progress: Progress,
}

impl<R> ProgressSource<R> {
    pub fn new(inner: R, len: Option<u64>, progress: Progress) -> Self {
        Self {
            inner,
            len,
            position: 0,
            progress,
        }
    }

    fn publish(&self) {
        if let Some(len) = self.len {
            let pct = if len == 0 {
                SATURATION as u64
            } else {
                self.position.saturating_mul(100) / len
            };
            self.progress.raise(pct.min(SATURATION as u64) as u8);
        }
    }
}

impl<R: Read> Read for ProgressSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.progress.raise(SATURATION);
        } else {
            self.position += n as u64;
            self.publish();
        }
        Ok(n)
    }
}

impl<R: Seek> Seek for ProgressSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        self.publish();
        Ok(self.position)
    }
}

impl<R: Read + Seek + Send + Sync> MediaSource for ProgressSource<R> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_progress_tracks_bytes_read() {
        let progress = Progress::new();
        let mut source = ProgressSource::new(Cursor::new(vec![0u8; 200]), Some(200), progress.clone());
        let mut buf = [0u8; 50];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(progress.get(), 25);
        source.read_exact(&mut buf).unwrap();
        assert_eq!(progress.get(), 50);
        assert!(progress.get() < SATURATION);
    }

    #[test]
    fn test_progress_saturates_at_end() {
        let progress = Progress::new();
        let mut source = ProgressSource::new(Cursor::new(vec![1u8; 64]), Some(64), progress.clone());
        let mut out = Vec::new();
        source.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 64);
        assert_eq!(progress.get(), SATURATION);
    }

    #[test]
    fn test_progress_never_decreases_on_seek_back() {
        let progress = Progress::new();
        let mut source = ProgressSource::new(Cursor::new(vec![0u8; 100]), Some(100), progress.clone());
        let mut buf = [0u8; 80];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(progress.get(), 80);
        source.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(progress.get(), 80);
    }

    #[test]
    fn test_progress_unknown_length_saturates_on_eof() {
        let progress = Progress::new();
        let mut source = ProgressSource::new(Cursor::new(vec![0u8; 10]), None, progress.clone());
        let mut buf = [0u8; 10];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(progress.get(), 0);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert_eq!(progress.get(), SATURATION);
    }

    #[test]
    fn test_media_source_reports_length() {
        let source = ProgressSource::new(Cursor::new(vec![0u8; 10]), Some(10), Progress::new());
        assert!(source.is_seekable());
        assert_eq!(source.byte_len(), Some(10));
    }
}
